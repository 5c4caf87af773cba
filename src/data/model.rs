use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Facet – a categorical dimension of a job posting
// ---------------------------------------------------------------------------

/// A categorical dimension a chart can group by, highlight or filter on.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Facet {
    #[default]
    ExperienceLevel,
    EmploymentType,
    Location,
    Industry,
    JobTitle,
}

impl Facet {
    /// Facets that have a set in [`crate::store::FilterSelection`].
    pub const FILTERABLE: [Facet; 4] = [
        Facet::ExperienceLevel,
        Facet::EmploymentType,
        Facet::Location,
        Facet::Industry,
    ];

    pub fn label(self) -> &'static str {
        match self {
            Facet::ExperienceLevel => "Experience level",
            Facet::EmploymentType => "Employment type",
            Facet::Location => "Location",
            Facet::Industry => "Industry",
            Facet::JobTitle => "Job title",
        }
    }

    /// Job titles can be hovered but have no filter set.
    pub fn is_filterable(self) -> bool {
        !matches!(self, Facet::JobTitle)
    }
}

impl fmt::Display for Facet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

// ---------------------------------------------------------------------------
// ExperienceLevel / EmploymentType – closed vocabularies with an escape hatch
// ---------------------------------------------------------------------------

/// Seniority of a posting.  Unknown labels are kept verbatim in `Other`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ExperienceLevel {
    Entry,
    Mid,
    Senior,
    Executive,
    Other(String),
}

impl ExperienceLevel {
    /// Parse a display label ("Senior-level") or a short code ("SE").
    pub fn parse(label: &str) -> Self {
        let trimmed = label.trim();
        match trimmed.to_ascii_lowercase().as_str() {
            "en" | "entry" | "entry-level" | "entry level" | "junior" => ExperienceLevel::Entry,
            "mi" | "mid" | "mid-level" | "mid level" | "intermediate" => ExperienceLevel::Mid,
            "se" | "senior" | "senior-level" | "senior level" => ExperienceLevel::Senior,
            "ex" | "executive" | "executive-level" | "executive level" | "director" => {
                ExperienceLevel::Executive
            }
            _ => ExperienceLevel::Other(trimmed.to_string()),
        }
    }

    pub fn label(&self) -> &str {
        match self {
            ExperienceLevel::Entry => "Entry-level",
            ExperienceLevel::Mid => "Mid-level",
            ExperienceLevel::Senior => "Senior-level",
            ExperienceLevel::Executive => "Executive-level",
            ExperienceLevel::Other(s) => s,
        }
    }
}

impl fmt::Display for ExperienceLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Contract type of a posting.  Unknown labels are kept verbatim in `Other`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum EmploymentType {
    FullTime,
    PartTime,
    Contract,
    Freelance,
    Other(String),
}

impl EmploymentType {
    pub fn parse(label: &str) -> Self {
        let trimmed = label.trim();
        match trimmed.to_ascii_lowercase().as_str() {
            "ft" | "full-time" | "full time" | "fulltime" => EmploymentType::FullTime,
            "pt" | "part-time" | "part time" | "parttime" => EmploymentType::PartTime,
            "ct" | "contract" | "contractor" => EmploymentType::Contract,
            "fl" | "freelance" | "freelancer" => EmploymentType::Freelance,
            _ => EmploymentType::Other(trimmed.to_string()),
        }
    }

    pub fn label(&self) -> &str {
        match self {
            EmploymentType::FullTime => "Full-time",
            EmploymentType::PartTime => "Part-time",
            EmploymentType::Contract => "Contract",
            EmploymentType::Freelance => "Freelance",
            EmploymentType::Other(s) => s,
        }
    }
}

impl fmt::Display for EmploymentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

// ---------------------------------------------------------------------------
// JobPosting – one row of the source table
// ---------------------------------------------------------------------------

/// A single job posting.
#[derive(Debug, Clone, PartialEq)]
pub struct JobPosting {
    pub job_title: String,
    pub experience_level: ExperienceLevel,
    pub employment_type: EmploymentType,
    pub location: String,
    pub industry: String,
    /// Annual salary in USD; postings without a published salary still count
    /// toward hiring volume.
    pub salary_usd: Option<f64>,
    pub posted_date: NaiveDate,
}

impl JobPosting {
    /// The posting's category label for `facet`.
    pub fn value_for(&self, facet: Facet) -> &str {
        match facet {
            Facet::ExperienceLevel => self.experience_level.label(),
            Facet::EmploymentType => self.employment_type.label(),
            Facet::Location => &self.location,
            Facet::Industry => &self.industry,
            Facet::JobTitle => &self.job_title,
        }
    }
}

// ---------------------------------------------------------------------------
// JobDataset – the complete loaded dataset
// ---------------------------------------------------------------------------

/// The full parsed dataset with pre-computed facet indices.
#[derive(Debug, Clone, Default)]
pub struct JobDataset {
    pub postings: Vec<JobPosting>,
    /// For each facet the sorted set of distinct labels.
    pub unique_values: BTreeMap<Facet, BTreeSet<String>>,
    /// Earliest and latest posting dates.
    pub date_range: Option<(NaiveDate, NaiveDate)>,
}

impl JobDataset {
    /// Build facet indices from the loaded postings.
    pub fn from_postings(postings: Vec<JobPosting>) -> Self {
        let mut unique_values: BTreeMap<Facet, BTreeSet<String>> = BTreeMap::new();
        let mut date_range: Option<(NaiveDate, NaiveDate)> = None;

        for posting in &postings {
            for facet in [
                Facet::ExperienceLevel,
                Facet::EmploymentType,
                Facet::Location,
                Facet::Industry,
                Facet::JobTitle,
            ] {
                unique_values
                    .entry(facet)
                    .or_default()
                    .insert(posting.value_for(facet).to_string());
            }
            let d = posting.posted_date;
            date_range = Some(match date_range {
                Some((lo, hi)) => (lo.min(d), hi.max(d)),
                None => (d, d),
            });
        }

        JobDataset {
            postings,
            unique_values,
            date_range,
        }
    }

    /// Distinct labels of a facet, in display order.
    ///
    /// Experience levels follow seniority rather than the alphabet.
    pub fn values(&self, facet: Facet) -> Vec<String> {
        let Some(set) = self.unique_values.get(&facet) else {
            return Vec::new();
        };
        let mut values: Vec<String> = set.iter().cloned().collect();
        if facet == Facet::ExperienceLevel {
            values.sort_by_key(|v| ExperienceLevel::parse(v));
        }
        values
    }

    pub fn len(&self) -> usize {
        self.postings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.postings.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::fixtures::posting;

    #[test]
    fn experience_level_accepts_codes_and_labels() {
        assert_eq!(ExperienceLevel::parse("SE"), ExperienceLevel::Senior);
        assert_eq!(ExperienceLevel::parse("Entry-level"), ExperienceLevel::Entry);
        assert_eq!(
            ExperienceLevel::parse(" Principal "),
            ExperienceLevel::Other("Principal".into())
        );
        assert_eq!(ExperienceLevel::Senior.label(), "Senior-level");
    }

    #[test]
    fn employment_type_round_trips_through_label() {
        for ty in [
            EmploymentType::FullTime,
            EmploymentType::PartTime,
            EmploymentType::Contract,
            EmploymentType::Freelance,
        ] {
            assert_eq!(EmploymentType::parse(ty.label()), ty);
        }
    }

    #[test]
    fn dataset_indexes_facets_and_dates() {
        let ds = JobDataset::from_postings(vec![
            posting("Senior-level", "Berlin", Some(90_000.0), "2024-03-05"),
            posting("Entry-level", "Austin", None, "2024-01-10"),
            posting("Mid-level", "Berlin", Some(70_000.0), "2024-02-01"),
        ]);
        assert_eq!(ds.len(), 3);
        assert_eq!(
            ds.values(Facet::ExperienceLevel),
            vec!["Entry-level", "Mid-level", "Senior-level"]
        );
        assert_eq!(ds.values(Facet::Location), vec!["Austin", "Berlin"]);
        let (lo, hi) = ds.date_range.unwrap();
        assert_eq!(lo.to_string(), "2024-01-10");
        assert_eq!(hi.to_string(), "2024-03-05");
    }

    #[test]
    fn empty_dataset_has_no_range() {
        let ds = JobDataset::from_postings(Vec::new());
        assert!(ds.is_empty());
        assert!(ds.date_range.is_none());
        assert!(ds.values(Facet::Industry).is_empty());
    }
}
