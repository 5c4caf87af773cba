use eframe::egui::{RichText, Ui};
use egui_plot::{Bar, BarChart, Plot};
use serde::{Deserialize, Serialize};

use super::{
    ChartContext, ChartPhase, DerivedCache, PlotHit, TopN, band_labels, nearest_band,
    prepare_cached,
};
use crate::aggregate::median;
use crate::data::model::Facet;
use crate::data::payload::LocationBreakdownData;
use crate::interaction::{
    ElementKey, ElementStyle, Highlight, HighlightHandle, Interaction, element_style,
};
use crate::store::FilterStore;
use crate::ui::widgets;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum BreakdownMetric {
    #[default]
    MedianSalary,
    PostingCount,
}

impl BreakdownMetric {
    fn label(self) -> &'static str {
        match self {
            BreakdownMetric::MedianSalary => "Median salary",
            BreakdownMetric::PostingCount => "Postings",
        }
    }

    fn format(self, value: f64) -> String {
        match self {
            BreakdownMetric::MedianSalary => widgets::salary_label(value),
            BreakdownMetric::PostingCount => format!("{value:.0}"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct BreakdownSettings {
    pub metric: BreakdownMetric,
    pub top_n: TopN,
}

// ---------------------------------------------------------------------------
// Derived model
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub struct BreakdownModel {
    pub metric: BreakdownMetric,
    /// Busiest first.
    pub locations: Vec<String>,
    pub levels: Vec<String>,
    /// `values[location][level]`, zero where a combination has no postings.
    pub values: Vec<Vec<f64>>,
    pub max_value: f64,
}

/// One bar per (location, level), for the `top_n` locations with the most
/// postings.
pub fn derive_breakdown(
    data: &LocationBreakdownData,
    metric: BreakdownMetric,
    top_n: TopN,
) -> BreakdownModel {
    let total = |loc: &str| -> usize { data.counts.get(loc).map_or(0, |m| m.values().sum()) };
    let mut locations = data.locations.clone();
    locations.sort_by(|a, b| total(b).cmp(&total(a)).then_with(|| a.cmp(b)));
    let locations = top_n.apply(locations);

    let values: Vec<Vec<f64>> = locations
        .iter()
        .map(|loc| {
            data.levels
                .iter()
                .map(|level| match metric {
                    BreakdownMetric::MedianSalary => data
                        .salaries
                        .get(loc)
                        .and_then(|m| m.get(level))
                        .and_then(|v| median(v))
                        .unwrap_or(0.0),
                    BreakdownMetric::PostingCount => data
                        .counts
                        .get(loc)
                        .and_then(|m| m.get(level))
                        .copied()
                        .unwrap_or(0) as f64,
                })
                .collect()
        })
        .collect();

    let max_value = values.iter().flatten().copied().fold(0.0, f64::max);
    BreakdownModel {
        metric,
        locations,
        levels: data.levels.clone(),
        values,
        max_value,
    }
}

/// Centre of the bar for `level` inside the group at `location`.
fn bar_x(location: usize, level: usize, n_levels: usize) -> f64 {
    let width = GROUP_WIDTH / n_levels.max(1) as f64;
    location as f64 + (level as f64 - (n_levels as f64 - 1.0) / 2.0) * width
}

const GROUP_WIDTH: f64 = 0.8;

/// Style of one bar.  A bar encodes a location and a level, so both facets
/// contribute to its emphasis and state.
pub fn bar_style(
    highlight: &Highlight,
    interaction: &Interaction,
    location: &str,
    level: &str,
) -> ElementStyle {
    let emphasis = highlight
        .emphasis(Facet::Location, location)
        .combine(highlight.emphasis(Facet::ExperienceLevel, level));
    let state = interaction
        .state_of(highlight, Facet::Location, location)
        .merge(interaction.state_of(highlight, Facet::ExperienceLevel, level));
    element_style(state, emphasis)
}

// ---------------------------------------------------------------------------
// Chart
// ---------------------------------------------------------------------------

type CacheKey = (u64, BreakdownMetric, TopN);

/// Grouped bars: locations along the x axis, one bar per experience level.
pub struct LocationBreakdownChart {
    pub settings: BreakdownSettings,
    highlight: HighlightHandle,
    interaction: Interaction,
    cache: DerivedCache<CacheKey, BreakdownModel>,
}

impl LocationBreakdownChart {
    pub fn new(store: &mut FilterStore, settings: BreakdownSettings) -> Self {
        LocationBreakdownChart {
            settings,
            highlight: HighlightHandle::subscribe(store),
            interaction: Interaction::default(),
            cache: DerivedCache::default(),
        }
    }

    pub fn show(&mut self, ui: &mut Ui, cx: &ChartContext<'_>, store: &mut FilterStore) {
        widgets::chart_header(ui, "Location breakdown", Some(self.settings.metric.label()));
        ui.horizontal_wrapped(|ui: &mut Ui| {
            widgets::choice(
                ui,
                "breakdown_metric",
                "Metric",
                &mut self.settings.metric,
                &[BreakdownMetric::MedianSalary, BreakdownMetric::PostingCount]
                    .map(|m| (m, m.label())),
            );
            ui.label("Locations");
            widgets::top_n_picker(
                ui,
                "breakdown_top_n",
                &mut self.settings.top_n,
                cx.default_top_n,
            );
        });

        let settings = self.settings;
        let input = cx.input(|p| Some(&p.breakdown));
        let key = (input.generation, settings.metric, settings.top_n);
        let highlight = self.highlight.snapshot();

        let hit = match prepare_cached(&mut self.cache, key, input, |d| {
            derive_breakdown(d, settings.metric, settings.top_n)
        }) {
            ChartPhase::Loading => {
                widgets::loading_skeleton(ui, cx.height);
                return;
            }
            ChartPhase::NoData => {
                widgets::no_data(ui, cx.height);
                return;
            }
            ChartPhase::Ready(model) => {
                let entries: Vec<_> = model
                    .levels
                    .iter()
                    .map(|l| (l.clone(), cx.colors.color_for(Facet::ExperienceLevel, l)))
                    .collect();
                let legend = widgets::legend(
                    ui,
                    Facet::ExperienceLevel,
                    &entries,
                    &highlight,
                    &self.interaction,
                );
                let plot_hit = render(ui, model, cx, &highlight, &self.interaction);

                // The legend names levels; the plot names locations.
                PlotHit::from_legend(Facet::ExperienceLevel, legend).unwrap_or(plot_hit)
            }
        };

        hit.apply(&mut self.interaction, store);
    }

    pub fn unsubscribe(self, store: &mut FilterStore) {
        self.highlight.unsubscribe(store);
    }
}

fn render(
    ui: &mut Ui,
    model: &BreakdownModel,
    cx: &ChartContext<'_>,
    highlight: &Highlight,
    interaction: &Interaction,
) -> PlotHit {
    let n_loc = model.locations.len();
    let n_levels = model.levels.len();
    let bar_width = GROUP_WIDTH / n_levels.max(1) as f64 * 0.9;
    let names = model.locations.clone();
    let metric = model.metric;

    let response = Plot::new("location_breakdown")
        .height(cx.height)
        .allow_drag(false)
        .allow_zoom(false)
        .allow_scroll(false)
        .allow_boxed_zoom(false)
        .show_grid([false, true])
        .include_x(-0.5)
        .include_x(n_loc as f64 - 0.5)
        .include_y(0.0)
        .include_y(model.max_value.max(1.0) * 1.05)
        .y_axis_formatter(move |mark, _range| metric.format(mark.value))
        .x_grid_spacer(egui_plot::uniform_grid_spacer(|_| [1.0, 1.0, 1.0]))
        .x_axis_formatter(band_labels(names, false))
        .show(ui, |plot_ui| {
            for (j, level) in model.levels.iter().enumerate() {
                let color = cx.colors.color_for(Facet::ExperienceLevel, level);
                let bars: Vec<Bar> = model
                    .locations
                    .iter()
                    .enumerate()
                    .map(|(i, loc)| {
                        let look = bar_style(highlight, interaction, loc, level);
                        Bar::new(bar_x(i, j, n_levels), model.values[i][j])
                            .name(format!("{loc} · {level}"))
                            .width(bar_width)
                            .fill(look.fill(color))
                            .stroke(look.stroke(color))
                    })
                    .collect();
                plot_ui.bar_chart(BarChart::new(bars).name(level));
            }
            plot_ui.pointer_coordinate()
        });

    let hovered = response.inner.and_then(|p| nearest_band(n_loc, p.x));
    let readout = hovered
        .map(|i| {
            let parts: Vec<String> = model
                .levels
                .iter()
                .zip(&model.values[i])
                .map(|(level, v)| format!("{level} {}", metric.format(*v)))
                .collect();
            format!("{}: {}", model.locations[i], parts.join(", "))
        })
        .unwrap_or_else(|| " ".to_string());
    ui.label(RichText::new(readout).small());

    PlotHit {
        hovered: hovered.map(|i| ElementKey::new(Facet::Location, model.locations[i].clone())),
        clicked: response.response.clicked(),
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use super::*;
    use crate::data::fixtures::posting;
    use crate::data::model::{EmploymentType, JobDataset};
    use crate::data::payload::DashboardPayloads;
    use crate::store::{ActiveItem, FilterSelection};

    fn data() -> LocationBreakdownData {
        let mut salaries: BTreeMap<String, BTreeMap<String, Vec<f64>>> = BTreeMap::new();
        let mut counts: BTreeMap<String, BTreeMap<String, usize>> = BTreeMap::new();
        let rows = [
            ("Austin", "Entry-level", 50.0),
            ("Austin", "Entry-level", 60.0),
            ("Austin", "Senior-level", 120.0),
            ("Berlin", "Senior-level", 100.0),
            ("Lagos", "Entry-level", 30.0),
            ("Lagos", "Entry-level", 34.0),
            ("Lagos", "Entry-level", 38.0),
        ];
        for (loc, level, salary) in rows {
            salaries
                .entry(loc.to_string())
                .or_default()
                .entry(level.to_string())
                .or_default()
                .push(salary);
            *counts
                .entry(loc.to_string())
                .or_default()
                .entry(level.to_string())
                .or_default() += 1;
        }
        LocationBreakdownData {
            locations: vec!["Austin".into(), "Berlin".into(), "Lagos".into()],
            levels: vec!["Entry-level".into(), "Senior-level".into()],
            salaries,
            counts,
        }
    }

    #[test]
    fn missing_combinations_are_zero() {
        let model = derive_breakdown(&data(), BreakdownMetric::MedianSalary, TopN::All);
        let berlin = model.locations.iter().position(|l| l == "Berlin").unwrap();
        assert_eq!(model.values[berlin], vec![0.0, 100.0]);
        let austin = model.locations.iter().position(|l| l == "Austin").unwrap();
        assert_eq!(model.values[austin], vec![55.0, 120.0]);
        assert_eq!(model.max_value, 120.0);
    }

    #[test]
    fn locations_rank_by_postings() {
        let model = derive_breakdown(&data(), BreakdownMetric::PostingCount, TopN::Top(2));
        assert_eq!(model.locations, vec!["Austin", "Lagos"]);
        assert_eq!(model.values[1], vec![3.0, 0.0]);
    }

    #[test]
    fn bars_are_centred_in_their_group() {
        assert_eq!(bar_x(2, 0, 1), 2.0);
        let left = bar_x(1, 0, 2);
        let right = bar_x(1, 1, 2);
        assert!(((left + right) / 2.0 - 1.0).abs() < 1e-12);
        assert!(right > left);
    }

    #[test]
    fn bars_fade_on_either_facet() {
        let mut store = FilterStore::default();
        let handle = HighlightHandle::subscribe(&mut store);
        let interaction = Interaction::default();
        store.toggle(Facet::ExperienceLevel, "Senior-level");

        let h = handle.snapshot();
        let kept = bar_style(&h, &interaction, "Austin", "Senior-level");
        let faded = bar_style(&h, &interaction, "Austin", "Entry-level");
        assert!(faded.opacity < kept.opacity);

        store.toggle(Facet::ExperienceLevel, "Senior-level");
        store.set_active_item(ActiveItem::item(Facet::Location, "Berlin"));
        let h = handle.snapshot();
        let other_city = bar_style(&h, &interaction, "Austin", "Senior-level");
        let active_city = bar_style(&h, &interaction, "Berlin", "Senior-level");
        assert!(other_city.opacity < active_city.opacity);
    }

    #[test]
    fn employment_filter_changes_the_model() {
        let mut postings = vec![
            posting("Senior-level", "Berlin", Some(90_000.0), "2024-03-05"),
            posting("Entry-level", "Austin", Some(48_000.0), "2024-03-03"),
            posting("Senior-level", "Austin", Some(95_000.0), "2024-03-04"),
        ];
        postings[1].employment_type = EmploymentType::Contract;
        let ds = JobDataset::from_postings(postings);
        let model = |sel: &FilterSelection| {
            let payloads = DashboardPayloads::build(&ds, None, sel, 0);
            let metric = BreakdownMetric::PostingCount;
            derive_breakdown(&payloads.breakdown, metric, TopN::All)
        };

        let unfiltered = model(&FilterSelection::default());
        assert_eq!(unfiltered.locations, vec!["Austin", "Berlin"]);

        let mut sel = FilterSelection::default();
        sel.toggle(Facet::EmploymentType, "Contract");
        let contract = model(&sel);
        assert_ne!(contract, unfiltered);
        assert_eq!(contract.locations, vec!["Austin"]);
        assert_eq!(contract.levels, vec!["Entry-level"]);
        assert_eq!(contract.values, vec![vec![1.0]]);
    }
}
