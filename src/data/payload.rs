use std::collections::{BTreeMap, BTreeSet};

use chrono::NaiveDate;

use super::filter::{DateWindow, matches_except, within_window};
use super::model::{ExperienceLevel, Facet, JobDataset, JobPosting};
use crate::store::FilterSelection;

// ---------------------------------------------------------------------------
// Typed chart payloads
// ---------------------------------------------------------------------------
//
// These are the raw inputs the charts consume.  They carry observations, not
// statistics: every chart derives its own aggregates from them.

/// Salary observations grouped by one facet.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SalaryDistributionData {
    pub facet: Facet,
    pub categories: Vec<String>,
    pub salaries: BTreeMap<String, Vec<f64>>,
}

/// Salaries and posting counts per location, split by experience level.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LocationBreakdownData {
    pub locations: Vec<String>,
    pub levels: Vec<String>,
    /// `salaries[location][level]`
    pub salaries: BTreeMap<String, BTreeMap<String, Vec<f64>>>,
    /// `counts[location][level]`
    pub counts: BTreeMap<String, BTreeMap<String, usize>>,
}

/// Daily posting counts per category on a shared axis of ISO date labels.
///
/// Days without postings are present with a zero so that bucket averages
/// are per-day rates.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TimeSeriesData {
    pub facet: Facet,
    pub categories: Vec<String>,
    pub time_labels: Vec<String>,
    pub values: BTreeMap<String, Vec<f64>>,
}

/// Everything the dashboard's charts draw, rebuilt whenever the dataset, the
/// date window or the filter selection changes.
#[derive(Debug, Clone, Default)]
pub struct DashboardPayloads {
    pub salary: BTreeMap<Facet, SalaryDistributionData>,
    pub breakdown: LocationBreakdownData,
    pub industry_trend: TimeSeriesData,
    pub level_timeline: TimeSeriesData,
    /// Bumped on every rebuild; charts key their derived caches on it.
    pub generation: u64,
}

/// Facets the salary distribution chart can group by.
pub const DISTRIBUTION_FACETS: [Facet; 3] =
    [Facet::ExperienceLevel, Facet::JobTitle, Facet::Industry];

/// Facets the location breakdown draws.
const BREAKDOWN_FACETS: [Facet; 2] = [Facet::Location, Facet::ExperienceLevel];

impl DashboardPayloads {
    /// Build every payload from the postings inside `window`.
    ///
    /// Each payload is restricted by the filters on the facets it does not
    /// draw.  Filters on a facet a chart draws are left to the chart, which
    /// fades that facet's non-members.
    pub fn build(
        dataset: &JobDataset,
        window: DateWindow,
        selection: &FilterSelection,
        generation: u64,
    ) -> Self {
        let postings: Vec<&JobPosting> = dataset
            .postings
            .iter()
            .filter(|p| within_window(p, window))
            .collect();
        let scope = |drawn: &[Facet]| scoped(&postings, selection, drawn);

        let salary = DISTRIBUTION_FACETS
            .iter()
            .map(|&facet| (facet, salary_distribution(&scope(&[facet]), facet)))
            .collect();

        DashboardPayloads {
            salary,
            breakdown: location_breakdown(&scope(&BREAKDOWN_FACETS)),
            industry_trend: daily_counts(&scope(&[Facet::Industry]), Facet::Industry),
            level_timeline: daily_counts(
                &scope(&[Facet::ExperienceLevel]),
                Facet::ExperienceLevel,
            ),
            generation,
        }
    }
}

/// Postings passing every filter except those on `drawn`.
fn scoped<'a>(
    postings: &[&'a JobPosting],
    selection: &FilterSelection,
    drawn: &[Facet],
) -> Vec<&'a JobPosting> {
    postings
        .iter()
        .copied()
        .filter(|p| matches_except(p, selection, drawn))
        .collect()
}

/// Labels of `facet` present in `postings`, in display order.
fn categories(postings: &[&JobPosting], facet: Facet) -> Vec<String> {
    let set: BTreeSet<&str> = postings.iter().map(|p| p.value_for(facet)).collect();
    let mut out: Vec<String> = set.into_iter().map(str::to_string).collect();
    if facet == Facet::ExperienceLevel {
        out.sort_by_key(|v| ExperienceLevel::parse(v));
    }
    out
}

pub fn salary_distribution(postings: &[&JobPosting], facet: Facet) -> SalaryDistributionData {
    let mut salaries: BTreeMap<String, Vec<f64>> = BTreeMap::new();
    for p in postings {
        if let Some(s) = p.salary_usd {
            salaries.entry(p.value_for(facet).to_string()).or_default().push(s);
        }
    }
    let categories = categories(postings, facet)
        .into_iter()
        .filter(|c| salaries.contains_key(c))
        .collect();
    SalaryDistributionData {
        facet,
        categories,
        salaries,
    }
}

pub fn location_breakdown(postings: &[&JobPosting]) -> LocationBreakdownData {
    let mut salaries: BTreeMap<String, BTreeMap<String, Vec<f64>>> = BTreeMap::new();
    let mut counts: BTreeMap<String, BTreeMap<String, usize>> = BTreeMap::new();
    for p in postings {
        let level = p.experience_level.label().to_string();
        *counts
            .entry(p.location.clone())
            .or_default()
            .entry(level.clone())
            .or_default() += 1;
        if let Some(s) = p.salary_usd {
            salaries
                .entry(p.location.clone())
                .or_default()
                .entry(level)
                .or_default()
                .push(s);
        }
    }
    LocationBreakdownData {
        locations: categories(postings, Facet::Location),
        levels: categories(postings, Facet::ExperienceLevel),
        salaries,
        counts,
    }
}

pub fn daily_counts(postings: &[&JobPosting], facet: Facet) -> TimeSeriesData {
    let Some(first) = postings.iter().map(|p| p.posted_date).min() else {
        return TimeSeriesData {
            facet,
            ..Default::default()
        };
    };
    let last = postings.iter().map(|p| p.posted_date).max().unwrap_or(first);

    let days: Vec<NaiveDate> = first.iter_days().take_while(|d| *d <= last).collect();
    let index_of = |d: NaiveDate| (d - first).num_days() as usize;

    let categories = categories(postings, facet);
    let mut values: BTreeMap<String, Vec<f64>> = categories
        .iter()
        .map(|c| (c.clone(), vec![0.0; days.len()]))
        .collect();
    for p in postings {
        if let Some(series) = values.get_mut(p.value_for(facet)) {
            series[index_of(p.posted_date)] += 1.0;
        }
    }

    TimeSeriesData {
        facet,
        categories,
        time_labels: days.iter().map(|d| d.format("%Y-%m-%d").to_string()).collect(),
        values,
    }
}
