use eframe::egui::{RichText, Stroke, Ui};
use egui_plot::{Plot, PlotPoints, Points, Polygon};
use serde::{Deserialize, Serialize};

use super::{
    ChartContext, ChartPhase, DerivedCache, PlotHit, TopN, band_labels, nearest_band,
    prepare_cached,
};
use crate::aggregate::{Granularity, bucket_series};
use crate::color::sequential_color;
use crate::data::model::Facet;
use crate::data::payload::TimeSeriesData;
use crate::interaction::{ElementKey, Highlight, HighlightHandle, Interaction};
use crate::store::FilterStore;
use crate::ui::widgets;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum PulseStyle {
    #[default]
    Heatmap,
    Bubble,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TrendPulseSettings {
    pub style: PulseStyle,
    pub granularity: Granularity,
    pub top_n: TopN,
}

// ---------------------------------------------------------------------------
// Derived model
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub struct TrendPulseModel {
    pub facet: Facet,
    /// Busiest first, drawn top to bottom.
    pub rows: Vec<String>,
    pub buckets: Vec<String>,
    /// `values[row][bucket]`: average postings per day in the bucket.
    pub values: Vec<Vec<f64>>,
    pub min: f64,
    pub max: f64,
}

/// Bucket the daily counts and keep the `top_n` categories with the most
/// postings overall.
pub fn derive_trend_pulse(
    data: &TimeSeriesData,
    granularity: Granularity,
    top_n: TopN,
) -> TrendPulseModel {
    let total = |c: &str| -> f64 { data.values.get(c).map_or(0.0, |v| v.iter().sum()) };
    let mut rows = data.categories.clone();
    rows.sort_by(|a, b| total(b).total_cmp(&total(a)).then_with(|| a.cmp(b)));
    let rows = top_n.apply(rows);

    let bucketed = bucket_series(&data.time_labels, &data.values, &rows, granularity);
    let values: Vec<Vec<f64>> = rows
        .iter()
        .map(|r| bucketed.values.get(r).cloned().unwrap_or_default())
        .collect();

    let min = values.iter().flatten().copied().fold(f64::INFINITY, f64::min);
    let max = bucketed.max_value();
    TrendPulseModel {
        facet: data.facet,
        rows,
        buckets: bucketed.buckets.into_iter().map(|(_, label)| label).collect(),
        values,
        min: if min.is_finite() { min } else { 0.0 },
        max,
    }
}

/// Bubble radius in points: area proportional to the value.
fn bubble_radius(value: f64, max: f64) -> f32 {
    if max <= 0.0 || value <= 0.0 {
        return 0.0;
    }
    (MAX_BUBBLE_RADIUS * (value / max).sqrt()) as f32
}

const MAX_BUBBLE_RADIUS: f64 = 12.0;

// ---------------------------------------------------------------------------
// Chart
// ---------------------------------------------------------------------------

type CacheKey = (u64, Granularity, TopN);

/// Industry activity over time as a heatmap or bubble grid.
pub struct TrendPulseChart {
    pub settings: TrendPulseSettings,
    highlight: HighlightHandle,
    interaction: Interaction,
    cache: DerivedCache<CacheKey, TrendPulseModel>,
}

impl TrendPulseChart {
    pub fn new(store: &mut FilterStore, settings: TrendPulseSettings) -> Self {
        TrendPulseChart {
            settings,
            highlight: HighlightHandle::subscribe(store),
            interaction: Interaction::default(),
            cache: DerivedCache::default(),
        }
    }

    pub fn show(&mut self, ui: &mut Ui, cx: &ChartContext<'_>, store: &mut FilterStore) {
        widgets::chart_header(ui, "Industry pulse", Some("postings per day"));
        ui.horizontal_wrapped(|ui: &mut Ui| {
            widgets::choice(
                ui,
                "pulse_style",
                "Style",
                &mut self.settings.style,
                &[(PulseStyle::Heatmap, "Heatmap"), (PulseStyle::Bubble, "Bubbles")],
            );
            let granularities: Vec<(Granularity, &str)> =
                Granularity::ALL.iter().map(|&g| (g, g.label())).collect();
            widgets::choice(
                ui,
                "pulse_granularity",
                "Buckets",
                &mut self.settings.granularity,
                &granularities,
            );
            ui.label("Industries");
            widgets::top_n_picker(
                ui,
                "pulse_top_n",
                &mut self.settings.top_n,
                cx.default_top_n,
            );
        });

        let settings = self.settings;
        let input = cx.input(|p| Some(&p.industry_trend));
        let key = (input.generation, settings.granularity, settings.top_n);
        let highlight = self.highlight.snapshot();

        let hit = match prepare_cached(&mut self.cache, key, input, |d| {
            derive_trend_pulse(d, settings.granularity, settings.top_n)
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
                render(ui, model, settings.style, cx, &highlight, &self.interaction)
            }
        };

        hit.apply(&mut self.interaction, store);
    }

    pub fn unsubscribe(self, store: &mut FilterStore) {
        self.highlight.unsubscribe(store);
    }
}

fn cell(x: f64, y: f64) -> PlotPoints<'static> {
    let h = 0.48;
    PlotPoints::from(vec![
        [x - h, y - h],
        [x + h, y - h],
        [x + h, y + h],
        [x - h, y + h],
    ])
}

fn render(
    ui: &mut Ui,
    model: &TrendPulseModel,
    style: PulseStyle,
    cx: &ChartContext<'_>,
    highlight: &Highlight,
    interaction: &Interaction,
) -> PlotHit {
    let n_rows = model.rows.len();
    let n_buckets = model.buckets.len();
    let facet = model.facet;

    let response = Plot::new("trend_pulse")
        .height(cx.height)
        .allow_drag(false)
        .allow_zoom(false)
        .allow_scroll(false)
        .allow_boxed_zoom(false)
        .show_grid(false)
        .include_x(-0.5)
        .include_x(n_buckets as f64 - 0.5)
        .include_y(-0.5)
        .include_y(n_rows as f64 - 0.5)
        .x_grid_spacer(egui_plot::uniform_grid_spacer(|_| [1.0, 1.0, 1.0]))
        .y_grid_spacer(egui_plot::uniform_grid_spacer(|_| [1.0, 1.0, 1.0]))
        .x_axis_formatter(band_labels(model.buckets.clone(), false))
        .y_axis_formatter(band_labels(model.rows.clone(), true))
        .show(ui, |plot_ui| {
            for (i, row) in model.rows.iter().enumerate() {
                let y = (n_rows - 1 - i) as f64;
                let look = interaction.style(highlight, facet, row);
                let row_color = cx.colors.color_for(facet, row);
                for (j, &value) in model.values[i].iter().enumerate() {
                    let x = j as f64;
                    match style {
                        PulseStyle::Heatmap => {
                            let fill = sequential_color(value, model.min, model.max);
                            let stroke = if look.stroke_width > 1.0 {
                                look.stroke(row_color)
                            } else {
                                Stroke::NONE
                            };
                            plot_ui.polygon(
                                Polygon::new(cell(x, y))
                                    .fill_color(look.fill(fill))
                                    .stroke(stroke),
                            );
                        }
                        PulseStyle::Bubble => {
                            let radius = bubble_radius(value, model.max);
                            if radius > 0.0 {
                                plot_ui.points(
                                    Points::new(vec![[x, y]])
                                        .radius(radius)
                                        .color(look.fill(row_color)),
                                );
                            }
                        }
                    }
                }
            }
            plot_ui.pointer_coordinate()
        });

    let under = response.inner.and_then(|p| {
        let row = nearest_band(n_rows, p.y).map(|band| n_rows - 1 - band)?;
        let bucket = nearest_band(n_buckets, p.x)?;
        Some((row, bucket))
    });
    let readout = under
        .map(|(row, bucket)| {
            format!(
                "{} · {}: {:.0} / day",
                model.rows[row], model.buckets[bucket], model.values[row][bucket]
            )
        })
        .unwrap_or_else(|| " ".to_string());
    ui.label(RichText::new(readout).small());

    PlotHit {
        hovered: under.map(|(row, _)| ElementKey::new(facet, model.rows[row].clone())),
        clicked: response.response.clicked(),
    }
}
