use chrono::NaiveDate;

use super::model::{Facet, JobDataset, JobPosting};
use crate::store::FilterSelection;

// ---------------------------------------------------------------------------
// Filter predicates over postings
// ---------------------------------------------------------------------------

/// Inclusive date window; `None` means the whole dataset.
pub type DateWindow = Option<(NaiveDate, NaiveDate)>;

/// Whether a posting passes every active facet filter.
///
/// A posting passes a facet when:
/// * the facet's set is empty → no constraint
/// * the posting's label for that facet is in the set
pub fn matches(posting: &JobPosting, selection: &FilterSelection) -> bool {
    matches_except(posting, selection, &[])
}

/// Like [`matches`], ignoring the filters on `skip`.  A chart drawing a
/// facet fades that facet's non-members instead of dropping them.
pub fn matches_except(posting: &JobPosting, selection: &FilterSelection, skip: &[Facet]) -> bool {
    Facet::FILTERABLE
        .iter()
        .filter(|facet| !skip.contains(facet))
        .all(|&facet| {
            selection
                .field(facet)
                .map_or(true, |set| set.is_empty() || set.contains(posting.value_for(facet)))
        })
}

pub fn within_window(posting: &JobPosting, window: DateWindow) -> bool {
    match window {
        Some((from, to)) => posting.posted_date >= from && posting.posted_date <= to,
        None => true,
    }
}

/// Return indices of postings inside `window` that pass all active filters.
pub fn filtered_indices(
    dataset: &JobDataset,
    selection: &FilterSelection,
    window: DateWindow,
) -> Vec<usize> {
    dataset
        .postings
        .iter()
        .enumerate()
        .filter(|(_, p)| within_window(p, window) && matches(p, selection))
        .map(|(i, _)| i)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::fixtures::posting;

    fn dataset() -> JobDataset {
        JobDataset::from_postings(vec![
            posting("Senior-level", "Berlin", Some(90_000.0), "2024-03-05"),
            posting("Entry-level", "Austin", Some(50_000.0), "2024-01-10"),
            posting("Senior-level", "Austin", Some(95_000.0), "2024-02-01"),
        ])
    }

    #[test]
    fn empty_selection_matches_everything() {
        let ds = dataset();
        assert_eq!(
            filtered_indices(&ds, &FilterSelection::default(), None),
            vec![0, 1, 2]
        );
    }

    #[test]
    fn facets_combine_conjunctively() {
        let ds = dataset();
        let mut sel = FilterSelection::default();
        sel.toggle(Facet::ExperienceLevel, "Senior-level");
        assert_eq!(filtered_indices(&ds, &sel, None), vec![0, 2]);
        sel.toggle(Facet::Location, "Austin");
        assert_eq!(filtered_indices(&ds, &sel, None), vec![2]);
    }

    #[test]
    fn skipped_facets_do_not_constrain() {
        let ds = dataset();
        let mut sel = FilterSelection::default();
        sel.toggle(Facet::Location, "Austin");
        sel.toggle(Facet::ExperienceLevel, "Senior-level");
        let berlin = &ds.postings[0];
        assert!(!matches(berlin, &sel));
        assert!(matches_except(berlin, &sel, &[Facet::Location]));
        assert!(!matches_except(berlin, &sel, &[Facet::ExperienceLevel]));
    }

    #[test]
    fn window_is_inclusive() {
        let ds = dataset();
        let from = NaiveDate::from_ymd_opt(2024, 2, 1).unwrap();
        let to = NaiveDate::from_ymd_opt(2024, 3, 5).unwrap();
        assert_eq!(
            filtered_indices(&ds, &FilterSelection::default(), Some((from, to))),
            vec![0, 2]
        );
    }
}
