//! Chart components.
//!
//! Every chart follows the same lifecycle each frame:
//!
//! ```text
//!   (data, is_loading) ──prepare──▶ Loading | NoData | Ready(model)
//!                                                        │
//!                     store ──HighlightHandle──▶ styling ┤
//!                                                        ▼
//!                                            egui_plot rendering
//!                                                        │
//!                   store ◀──Interaction (enter/leave/click)
//! ```
//!
//! Models are derived by pure functions and cached on the payload
//! generation plus the chart's own settings.

pub mod breakdown;
pub mod distribution;
pub mod timeline;
pub mod trend_pulse;

use std::ops::RangeInclusive;

use egui_plot::GridMark;
use serde::{Deserialize, Serialize};

use crate::color::CategoryColors;
use crate::data::model::Facet;
use crate::data::payload::{
    DashboardPayloads, LocationBreakdownData, SalaryDistributionData, TimeSeriesData,
};
use crate::interaction::{ElementKey, Interaction};
use crate::store::FilterStore;
use crate::ui::widgets::LegendResponse;

// ---------------------------------------------------------------------------
// Input and render phase
// ---------------------------------------------------------------------------

/// What a chart receives from the dashboard each frame.
#[derive(Debug)]
pub struct ChartInput<'a, D> {
    pub data: Option<&'a D>,
    pub is_loading: bool,
    /// Payload generation, for cache invalidation.
    pub generation: u64,
}

impl<D> Clone for ChartInput<'_, D> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<D> Copy for ChartInput<'_, D> {}

impl<'a, D> ChartInput<'a, D> {
    pub fn new(data: Option<&'a D>, is_loading: bool, generation: u64) -> Self {
        ChartInput {
            data,
            is_loading,
            generation,
        }
    }
}

/// Everything shared by the charts for one frame.
#[derive(Debug, Clone, Copy)]
pub struct ChartContext<'a> {
    pub payloads: Option<&'a DashboardPayloads>,
    pub is_loading: bool,
    pub colors: &'a CategoryColors,
    /// Height available to the plot area.
    pub height: f32,
    /// Extra step offered by the "Top N" pickers.
    pub default_top_n: usize,
}

impl<'a> ChartContext<'a> {
    pub fn generation(&self) -> u64 {
        self.payloads.map_or(0, |p| p.generation)
    }

    /// Input for a chart drawing the payload picked by `select`.
    pub fn input<D>(
        &self,
        select: impl FnOnce(&'a DashboardPayloads) -> Option<&'a D>,
    ) -> ChartInput<'a, D> {
        let data = self.payloads.and_then(select);
        ChartInput::new(data, self.is_loading, self.generation())
    }
}

/// What the pointer did inside a chart this frame.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct PlotHit {
    pub hovered: Option<ElementKey>,
    pub clicked: bool,
}

impl PlotHit {
    /// Activity on a legend naming values of `facet`, if any.
    pub fn from_legend(facet: Facet, legend: LegendResponse) -> Option<PlotHit> {
        let clicked = legend.clicked.is_some();
        legend.clicked.or(legend.hovered).map(|value| PlotHit {
            hovered: Some(ElementKey::new(facet, value)),
            clicked,
        })
    }

    /// Forward the frame's pointer activity to the store.
    pub fn apply(self, interaction: &mut Interaction, store: &mut FilterStore) {
        interaction.track_hover(store, self.hovered.clone());
        if self.clicked {
            if let Some(key) = self.hovered {
                interaction.click(store, key);
            }
        }
    }
}

/// Index of the unit-spaced band (centred on `0, 1, .. n-1`) that contains
/// `coord`, leaving a small gap between bands.
pub fn nearest_band(n: usize, coord: f64) -> Option<usize> {
    let r = coord.round();
    if n == 0 || (coord - r).abs() > 0.45 || r < 0.0 || r >= n as f64 {
        return None;
    }
    Some(r as usize)
}

/// Axis formatter labelling integer grid marks `0..n` with `labels`.  With
/// `top_down` the first label sits at the highest mark.
pub fn band_labels(
    labels: Vec<String>,
    top_down: bool,
) -> impl Fn(GridMark, &RangeInclusive<f64>) -> String {
    move |mark, _range| {
        let n = labels.len();
        let r = mark.value.round();
        if (mark.value - r).abs() > 1e-6 || r < 0.0 || r >= n as f64 {
            return String::new();
        }
        let i = if top_down {
            n - 1 - r as usize
        } else {
            r as usize
        };
        labels.get(i).cloned().unwrap_or_default()
    }
}

/// Payloads that can be structurally empty.
pub trait ChartData {
    fn is_structurally_empty(&self) -> bool;
}

impl ChartData for SalaryDistributionData {
    fn is_structurally_empty(&self) -> bool {
        self.categories.is_empty()
    }
}

impl ChartData for LocationBreakdownData {
    fn is_structurally_empty(&self) -> bool {
        self.locations.is_empty() || self.levels.is_empty()
    }
}

impl ChartData for TimeSeriesData {
    fn is_structurally_empty(&self) -> bool {
        self.categories.is_empty() || self.time_labels.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ChartPhase<M> {
    Loading,
    NoData,
    Ready(M),
}

/// Decide a chart's phase.  `derive` runs only when there is data to show.
pub fn prepare<'a, D, M>(input: ChartInput<'a, D>, derive: impl FnOnce(&'a D) -> M) -> ChartPhase<M>
where
    D: ChartData,
{
    if input.is_loading {
        return ChartPhase::Loading;
    }
    match input.data {
        Some(d) if !d.is_structurally_empty() => ChartPhase::Ready(derive(d)),
        _ => ChartPhase::NoData,
    }
}

// ---------------------------------------------------------------------------
// Derived-model cache
// ---------------------------------------------------------------------------

/// Holds the last derived model and the key it was derived for.
#[derive(Debug)]
pub struct DerivedCache<K, M> {
    entry: Option<(K, M)>,
}

impl<K, M> Default for DerivedCache<K, M> {
    fn default() -> Self {
        DerivedCache { entry: None }
    }
}

impl<K: PartialEq, M> DerivedCache<K, M> {
    /// Return the cached model for `key`, deriving it first if the key
    /// changed.
    pub fn get_or_derive(&mut self, key: K, derive: impl FnOnce() -> M) -> &M {
        let stale = self.entry.as_ref().map_or(true, |(k, _)| *k != key);
        if stale {
            self.entry = None;
        }
        let (_, m) = self.entry.get_or_insert_with(|| (key, derive()));
        m
    }

    pub fn invalidate(&mut self) {
        self.entry = None;
    }
}

/// Look up a cached model, deriving through `prepare` on a miss.  Loading and
/// no-data phases are never cached.
pub fn prepare_cached<'c, D, K, M>(
    cache: &'c mut DerivedCache<K, M>,
    key: K,
    input: ChartInput<'_, D>,
    derive: impl FnOnce(&D) -> M,
) -> ChartPhase<&'c M>
where
    D: ChartData,
    K: PartialEq,
{
    match prepare(input, |d| d) {
        ChartPhase::Loading => ChartPhase::Loading,
        ChartPhase::NoData => {
            cache.invalidate();
            ChartPhase::NoData
        }
        ChartPhase::Ready(d) => ChartPhase::Ready(cache.get_or_derive(key, || derive(d))),
    }
}

// ---------------------------------------------------------------------------
// Shared display settings
// ---------------------------------------------------------------------------

/// Show only the largest `n` categories, or all of them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TopN {
    Top(usize),
    All,
}

impl Default for TopN {
    fn default() -> Self {
        TopN::Top(10)
    }
}

impl TopN {
    pub fn limit(self) -> Option<usize> {
        match self {
            TopN::Top(n) => Some(n),
            TopN::All => None,
        }
    }

    /// Keep the first `n` items of an already ranked list.
    pub fn apply<T>(self, mut items: Vec<T>) -> Vec<T> {
        if let Some(n) = self.limit() {
            items.truncate(n);
        }
        items
    }

    pub fn label(self) -> String {
        match self {
            TopN::Top(n) => format!("Top {n}"),
            TopN::All => "All".to_string(),
        }
    }

    /// `Top(0)` would hide every category; it falls back to the default.
    pub fn or_default_if_empty(self) -> TopN {
        match self {
            TopN::Top(0) => TopN::default(),
            other => other,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;

    use super::*;

    fn distribution(categories: &[&str]) -> SalaryDistributionData {
        SalaryDistributionData {
            facet: Facet::Industry,
            categories: categories.iter().map(|s| s.to_string()).collect(),
            salaries: Default::default(),
        }
    }

    #[test]
    fn loading_and_missing_data_skip_derivation() {
        let calls = Cell::new(0);
        let derive = |_: &SalaryDistributionData| calls.set(calls.get() + 1);

        let data = distribution(&["Retail"]);
        assert_eq!(prepare(ChartInput::new(Some(&data), true, 0), derive), ChartPhase::Loading);
        let missing = ChartInput::<SalaryDistributionData>::new(None, false, 0);
        assert_eq!(prepare(missing, derive), ChartPhase::NoData);
        let empty = distribution(&[]);
        assert_eq!(prepare(ChartInput::new(Some(&empty), false, 0), derive), ChartPhase::NoData);
        assert_eq!(calls.get(), 0);

        assert_eq!(prepare(ChartInput::new(Some(&data), false, 0), derive), ChartPhase::Ready(()));
        assert_eq!(calls.get(), 1);
    }

    #[test]
    fn cache_rederives_only_on_key_change() {
        let mut cache: DerivedCache<(u64, bool), usize> = DerivedCache::default();
        let calls = Cell::new(0);
        let derive = |v: usize| {
            calls.set(calls.get() + 1);
            v
        };
        assert_eq!(*cache.get_or_derive((1, true), || derive(7)), 7);
        assert_eq!(*cache.get_or_derive((1, true), || derive(8)), 7);
        assert_eq!(*cache.get_or_derive((2, true), || derive(9)), 9);
        assert_eq!(calls.get(), 2);
    }

    #[test]
    fn cached_prepare_drops_model_when_data_disappears() {
        let mut cache: DerivedCache<u64, usize> = DerivedCache::default();
        let data = distribution(&["Retail"]);
        let phase = prepare_cached(&mut cache, 1, ChartInput::new(Some(&data), false, 1), |d| {
            d.categories.len()
        });
        assert_eq!(phase, ChartPhase::Ready(&1));

        let empty = distribution(&[]);
        let input = ChartInput::new(Some(&empty), false, 1);
        let phase = prepare_cached(&mut cache, 1, input, |_| 99);
        assert_eq!(phase, ChartPhase::NoData);

        let input = ChartInput::new(Some(&data), false, 1);
        let phase = prepare_cached(&mut cache, 1, input, |_| 5);
        assert_eq!(phase, ChartPhase::Ready(&5));
    }

    #[test]
    fn bands_are_centred_on_integers() {
        assert_eq!(nearest_band(3, 0.2), Some(0));
        assert_eq!(nearest_band(3, 1.9), Some(2));
        assert_eq!(nearest_band(3, 0.5), None);
        assert_eq!(nearest_band(3, 3.1), None);
        assert_eq!(nearest_band(0, 0.0), None);
    }

    #[test]
    fn legend_clicks_win_over_hover() {
        let legend = LegendResponse {
            hovered: Some("Entry-level".into()),
            clicked: Some("Senior-level".into()),
        };
        let hit = PlotHit::from_legend(Facet::ExperienceLevel, legend).unwrap();
        assert_eq!(hit.hovered, Some(ElementKey::new(Facet::ExperienceLevel, "Senior-level")));
        assert!(hit.clicked);
        assert_eq!(PlotHit::from_legend(Facet::ExperienceLevel, LegendResponse::default()), None);
    }

    #[test]
    fn band_labels_only_label_integer_marks() {
        let labels = vec!["a".to_string(), "b".to_string(), "c".to_string()];
        let fmt = band_labels(labels.clone(), false);
        let mark = |value: f64| GridMark {
            value,
            step_size: 1.0,
        };
        assert_eq!(fmt(mark(1.0), &(0.0..=2.0)), "b");
        assert_eq!(fmt(mark(0.5), &(0.0..=2.0)), "");
        assert_eq!(fmt(mark(3.0), &(0.0..=2.0)), "");
        let top_down = band_labels(labels, true);
        assert_eq!(top_down(mark(2.0), &(0.0..=2.0)), "a");
    }

    #[test]
    fn top_n_truncates() {
        assert_eq!(TopN::Top(2).apply(vec![1, 2, 3]), vec![1, 2]);
        assert_eq!(TopN::All.apply(vec![1, 2, 3]), vec![1, 2, 3]);
        assert_eq!(TopN::Top(5).apply(vec![1]), vec![1]);
    }
}
