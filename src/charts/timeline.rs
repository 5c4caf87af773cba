use std::ops::Range;

use chrono::NaiveDate;
use eframe::egui::{Color32, RichText, Ui};
use egui_plot::{Line, Plot, PlotPoints, Polygon};
use serde::{Deserialize, Serialize};

use super::{ChartContext, ChartPhase, DerivedCache, PlotHit, band_labels, prepare_cached};
use crate::aggregate::{Granularity, bucket_series};
use crate::data::model::Facet;
use crate::data::payload::TimeSeriesData;
use crate::interaction::{ElementKey, Highlight, HighlightHandle, Interaction};
use crate::store::FilterStore;
use crate::ui::widgets;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TimelineSettings {
    pub granularity: Granularity,
}

// ---------------------------------------------------------------------------
// Derived model
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub struct TimelineModel {
    pub levels: Vec<String>,
    pub starts: Vec<NaiveDate>,
    pub labels: Vec<String>,
    /// `values[level][bucket]`
    pub values: Vec<Vec<f64>>,
    pub max: f64,
}

impl TimelineModel {
    /// Buckets covered by `brush`, or every bucket without one.
    pub fn visible(&self, brush: Option<&Brush>) -> Range<usize> {
        match brush {
            None => 0..self.starts.len(),
            Some(b) => {
                let first = self.starts.iter().position(|d| b.contains(*d));
                let last = self.starts.iter().rposition(|d| b.contains(*d));
                match (first, last) {
                    (Some(f), Some(l)) if f <= l => f..l + 1,
                    _ => 0..0,
                }
            }
        }
    }

    /// `brush`, unless it covers none of this model's buckets.  A brush
    /// picked on an earlier dataset or date window is dropped that way.
    pub fn keep_brush(&self, brush: Option<Brush>) -> Option<Brush> {
        brush.filter(|b| !self.visible(Some(b)).is_empty())
    }

    /// Bucket nearest to plot x coordinate `x`, clamped to the axis.
    fn bucket_at(&self, x: f64) -> Option<usize> {
        let n = self.starts.len();
        if n == 0 || !x.is_finite() {
            return None;
        }
        Some(x.round().clamp(0.0, (n - 1) as f64) as usize)
    }

    /// Series whose value at the bucket nearest `x` is closest to `y`,
    /// within a tenth of the axis height.
    pub fn nearest_series(&self, range: &Range<usize>, x: f64, y: f64) -> Option<usize> {
        let bucket = self.bucket_at(x).filter(|b| range.contains(b))?;
        let tolerance = self.max.max(1.0) * 0.1;
        self.values
            .iter()
            .enumerate()
            .map(|(i, series)| (i, (series[bucket] - y).abs()))
            .filter(|(_, d)| *d <= tolerance)
            .min_by(|a, b| a.1.total_cmp(&b.1))
            .map(|(i, _)| i)
    }
}

pub fn derive_timeline(data: &TimeSeriesData, granularity: Granularity) -> TimelineModel {
    let bucketed = bucket_series(
        &data.time_labels,
        &data.values,
        &data.categories,
        granularity,
    );
    let values = data
        .categories
        .iter()
        .map(|c| bucketed.values.get(c).cloned().unwrap_or_default())
        .collect();
    let max = bucketed.max_value();
    let (starts, labels) = bucketed.buckets.into_iter().unzip();
    TimelineModel {
        levels: data.categories.clone(),
        starts,
        labels,
        values,
        max,
    }
}

// ---------------------------------------------------------------------------
// Brush
// ---------------------------------------------------------------------------

/// Inclusive date window picked on the overview strip.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Brush {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl Brush {
    pub fn new(a: NaiveDate, b: NaiveDate) -> Self {
        Brush {
            start: a.min(b),
            end: a.max(b),
        }
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start <= date && date <= self.end
    }
}

/// Pointer-drag state of the overview strip.
#[derive(Debug, Default)]
struct BrushDrag {
    anchor: Option<NaiveDate>,
}

impl BrushDrag {
    fn begin(&mut self, at: NaiveDate) {
        self.anchor = Some(at);
    }

    fn extend(&self, to: NaiveDate) -> Option<Brush> {
        self.anchor.map(|a| Brush::new(a, to))
    }

    fn end(&mut self) {
        self.anchor = None;
    }
}

// ---------------------------------------------------------------------------
// Chart
// ---------------------------------------------------------------------------

type CacheKey = (u64, Granularity);

/// Postings per experience level over time: an overview strip with a
/// draggable brush above a detail plot of the brushed window.
pub struct HiringTimelineChart {
    pub settings: TimelineSettings,
    pub brush: Option<Brush>,
    drag: BrushDrag,
    highlight: HighlightHandle,
    interaction: Interaction,
    cache: DerivedCache<CacheKey, TimelineModel>,
}

impl HiringTimelineChart {
    pub fn new(store: &mut FilterStore, settings: TimelineSettings) -> Self {
        HiringTimelineChart {
            settings,
            brush: None,
            drag: BrushDrag::default(),
            highlight: HighlightHandle::subscribe(store),
            interaction: Interaction::default(),
            cache: DerivedCache::default(),
        }
    }

    pub fn show(&mut self, ui: &mut Ui, cx: &ChartContext<'_>, store: &mut FilterStore) {
        widgets::chart_header(
            ui,
            "Hiring timeline",
            Some("postings per day by experience level"),
        );
        ui.horizontal_wrapped(|ui: &mut Ui| {
            let granularities: Vec<(Granularity, &str)> =
                Granularity::ALL.iter().map(|&g| (g, g.label())).collect();
            widgets::choice(
                ui,
                "timeline_granularity",
                "Buckets",
                &mut self.settings.granularity,
                &granularities,
            );
            if let Some(b) = self.brush {
                ui.label(RichText::new(format!("{} → {}", b.start, b.end)).small());
                if ui.small_button("Reset").clicked() {
                    self.brush = None;
                }
            } else {
                ui.label(RichText::new("drag on the strip to zoom").weak().small());
            }
        });

        let settings = self.settings;
        let input = cx.input(|p| Some(&p.level_timeline));
        let key = (input.generation, settings.granularity);
        let highlight = self.highlight.snapshot();

        let hit = match prepare_cached(&mut self.cache, key, input, |d| {
            derive_timeline(d, settings.granularity)
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

                self.brush = model.keep_brush(self.brush);
                let overview_height = (cx.height * 0.25).max(40.0);
                let brushed = overview(ui, model, overview_height, cx, self.brush, &mut self.drag);
                if let Some(next) = brushed {
                    self.brush = next;
                }

                let range = model.visible(self.brush.as_ref());
                let detail_height = (cx.height - overview_height).max(80.0);
                let plot_hit = detail(
                    ui,
                    model,
                    range,
                    detail_height,
                    cx,
                    &highlight,
                    &self.interaction,
                );
                PlotHit::from_legend(Facet::ExperienceLevel, legend).unwrap_or(plot_hit)
            }
        };

        hit.apply(&mut self.interaction, store);
    }

    pub fn unsubscribe(self, store: &mut FilterStore) {
        self.highlight.unsubscribe(store);
    }
}

fn series_points(series: &[f64], range: Range<usize>) -> PlotPoints<'static> {
    range
        .filter_map(|j| series.get(j).map(|v| [j as f64, *v]))
        .collect()
}

/// Overview strip.  Returns `Some(new_brush)` when the pointer changed the
/// brush this frame (`Some(None)` clears it).
fn overview(
    ui: &mut Ui,
    model: &TimelineModel,
    height: f32,
    cx: &ChartContext<'_>,
    brush: Option<Brush>,
    drag: &mut BrushDrag,
) -> Option<Option<Brush>> {
    let n = model.starts.len();
    let top = model.max.max(1.0) * 1.05;

    let response = Plot::new("timeline_overview")
        .height(height)
        .allow_drag(false)
        .allow_zoom(false)
        .allow_scroll(false)
        .allow_boxed_zoom(false)
        .allow_double_click_reset(false)
        .show_axes([false, false])
        .show_grid(false)
        .include_x(-0.5)
        .include_x(n as f64 - 0.5)
        .include_y(0.0)
        .include_y(top)
        .show(ui, |plot_ui| {
            for (level, series) in model.levels.iter().zip(&model.values) {
                let color = cx.colors.color_for(Facet::ExperienceLevel, level);
                plot_ui.line(
                    Line::new(series_points(series, 0..n))
                        .color(color.gamma_multiply(0.6))
                        .width(1.0),
                );
            }
            let range = model.visible(brush.as_ref());
            if brush.is_some() && !range.is_empty() {
                let lo = range.start as f64 - 0.5;
                let hi = range.end as f64 - 0.5;
                let band = vec![[lo, 0.0], [hi, 0.0], [hi, top], [lo, top]];
                plot_ui.polygon(
                    Polygon::new(PlotPoints::from(band))
                        .fill_color(Color32::from_white_alpha(24))
                        .stroke((1.0, Color32::GRAY)),
                );
            }
            plot_ui.pointer_coordinate()
        });

    let resp = &response.response;
    let at = response
        .inner
        .and_then(|p| model.bucket_at(p.x))
        .and_then(|i| model.starts.get(i).copied());

    if resp.double_clicked() {
        drag.end();
        return Some(None);
    }
    if resp.drag_started() {
        if let Some(d) = at {
            drag.begin(d);
        }
    }
    let mut out = None;
    if resp.dragged() || resp.drag_stopped() {
        if let Some(next) = at.and_then(|d| drag.extend(d)) {
            out = Some(Some(next));
        }
    }
    if resp.drag_stopped() {
        drag.end();
    }
    out
}

fn detail(
    ui: &mut Ui,
    model: &TimelineModel,
    range: Range<usize>,
    height: f32,
    cx: &ChartContext<'_>,
    highlight: &Highlight,
    interaction: &Interaction,
) -> PlotHit {
    if range.is_empty() {
        widgets::no_data(ui, height);
        return PlotHit::default();
    }
    let (lo, hi) = (range.start as f64, (range.end - 1) as f64);

    let response = Plot::new("timeline_detail")
        .height(height)
        .allow_drag(false)
        .allow_zoom(false)
        .allow_scroll(false)
        .allow_boxed_zoom(false)
        .include_x(lo - 0.25)
        .include_x(hi + 0.25)
        .include_y(0.0)
        .include_y(model.max.max(1.0) * 1.05)
        .y_axis_label("postings / day")
        .x_axis_formatter(band_labels(model.labels.clone(), false))
        .show(ui, |plot_ui| {
            for (level, series) in model.levels.iter().zip(&model.values) {
                let color = cx.colors.color_for(Facet::ExperienceLevel, level);
                let look = interaction.style(highlight, Facet::ExperienceLevel, level);
                plot_ui.line(
                    Line::new(series_points(series, range.clone()))
                        .name(level)
                        .color(look.fill(color))
                        .width(look.stroke_width * 1.5),
                );
            }
            plot_ui.pointer_coordinate()
        });

    let hovered = response
        .inner
        .and_then(|p| model.nearest_series(&range, p.x, p.y));
    let readout = match (hovered, response.inner.and_then(|p| model.bucket_at(p.x))) {
        (Some(i), Some(b)) => format!(
            "{} · {}: {:.0} / day",
            model.levels[i], model.labels[b], model.values[i][b]
        ),
        _ => " ".to_string(),
    };
    ui.label(RichText::new(readout).small());

    PlotHit {
        hovered: hovered.map(|i| ElementKey::new(Facet::ExperienceLevel, model.levels[i].clone())),
        clicked: response.response.clicked(),
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use super::*;
    use crate::interaction::ElementStyle;
    use crate::store::ActiveItem;
    use crate::ui::widgets::LegendResponse;

    impl HiringTimelineChart {
        /// A frame in which the legend entry for `level` was clicked.
        fn legend_click(&mut self, store: &mut FilterStore, level: &str) {
            let legend = LegendResponse {
                hovered: Some(level.to_string()),
                clicked: Some(level.to_string()),
            };
            let hit = PlotHit::from_legend(Facet::ExperienceLevel, legend);
            hit.unwrap_or_default().apply(&mut self.interaction, store);
        }

        fn series_style(&self, level: &str) -> ElementStyle {
            self.interaction
                .style(&self.highlight.snapshot(), Facet::ExperienceLevel, level)
        }
    }

    fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    /// Two levels over two months.
    fn data() -> TimeSeriesData {
        let labels: Vec<String> = ["2024-01-10", "2024-01-11", "2024-02-10", "2024-02-11"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        let mut values = BTreeMap::new();
        values.insert("Entry-level".to_string(), vec![2.0, 4.0, 1.0, 1.0]);
        values.insert("Senior-level".to_string(), vec![1.0, 1.0, 6.0, 8.0]);
        TimeSeriesData {
            facet: Facet::ExperienceLevel,
            categories: vec!["Entry-level".into(), "Senior-level".into()],
            time_labels: labels,
            values,
        }
    }

    #[test]
    fn monthly_lines_average_per_day() {
        let model = derive_timeline(&data(), Granularity::Monthly);
        assert_eq!(model.labels, vec!["2024-01", "2024-02"]);
        assert_eq!(model.starts, vec![ymd(2024, 1, 1), ymd(2024, 2, 1)]);
        assert_eq!(model.values[0], vec![3.0, 1.0]);
        assert_eq!(model.values[1], vec![1.0, 7.0]);
        assert_eq!(model.max, 7.0);
    }

    #[test]
    fn brush_selects_buckets_inside_it() {
        let model = derive_timeline(&data(), Granularity::Monthly);
        assert_eq!(model.visible(None), 0..2);
        let feb = Brush::new(ymd(2024, 2, 20), ymd(2024, 1, 15));
        assert_eq!(feb.start, ymd(2024, 1, 15));
        assert_eq!(model.visible(Some(&feb)), 1..2);
        let before = Brush::new(ymd(2023, 1, 1), ymd(2023, 6, 1));
        assert!(model.visible(Some(&before)).is_empty());
        assert!(Brush::new(ymd(2024, 1, 1), ymd(2024, 1, 31)).contains(ymd(2024, 1, 31)));
    }

    #[test]
    fn brush_from_an_older_dataset_is_dropped() {
        let model = derive_timeline(&data(), Granularity::Monthly);
        let stale = Brush::new(ymd(2023, 1, 1), ymd(2023, 3, 31));
        assert_eq!(model.keep_brush(Some(stale)), None);
        assert_eq!(model.visible(model.keep_brush(Some(stale)).as_ref()), 0..2);

        let feb = Brush::new(ymd(2024, 2, 1), ymd(2024, 2, 28));
        assert_eq!(model.keep_brush(Some(feb)), Some(feb));
        assert_eq!(model.keep_brush(None), None);
    }

    #[test]
    fn dragging_extends_from_the_anchor() {
        let mut drag = BrushDrag::default();
        assert_eq!(drag.extend(ymd(2024, 1, 1)), None);
        drag.begin(ymd(2024, 3, 1));
        assert_eq!(
            drag.extend(ymd(2024, 1, 1)),
            Some(Brush::new(ymd(2024, 1, 1), ymd(2024, 3, 1)))
        );
        drag.end();
        assert_eq!(drag.extend(ymd(2024, 5, 1)), None);
    }

    #[test]
    fn pointer_picks_the_closest_line() {
        let model = derive_timeline(&data(), Granularity::Monthly);
        let all = model.visible(None);
        assert_eq!(model.nearest_series(&all, 1.1, 6.8), Some(1));
        assert_eq!(model.nearest_series(&all, 0.0, 3.2), Some(0));
        assert_eq!(model.nearest_series(&all, 0.0, 5.0), None);
        assert_eq!(model.nearest_series(&(0..1), 1.0, 7.0), None);
    }

    #[test]
    fn legend_click_filters_and_fades_other_levels() {
        let mut store = FilterStore::default();
        let mut chart = HiringTimelineChart::new(&mut store, TimelineSettings::default());
        let model = derive_timeline(&data(), chart.settings.granularity);
        assert_eq!(model.levels, vec!["Entry-level", "Senior-level"]);

        let entry_before = chart.series_style("Entry-level");
        assert_eq!(entry_before, chart.series_style("Senior-level"));

        chart.legend_click(&mut store, "Senior-level");

        assert!(store.read().experience_levels.contains("Senior-level"));
        assert_eq!(
            *store.read_active_item(),
            ActiveItem::item(Facet::ExperienceLevel, "Senior-level")
        );
        let entry_after = chart.series_style("Entry-level");
        assert!(entry_after.opacity < entry_before.opacity);
        assert!(entry_after.opacity < chart.series_style("Senior-level").opacity);
    }

    #[test]
    fn second_legend_click_removes_the_filter() {
        let mut store = FilterStore::default();
        let mut chart = HiringTimelineChart::new(&mut store, TimelineSettings::default());
        chart.legend_click(&mut store, "Senior-level");
        chart.legend_click(&mut store, "Senior-level");
        assert!(store.read().experience_levels.is_empty());
        assert!(chart.series_style("Entry-level").opacity > 0.2);
        chart.unsubscribe(&mut store);
        assert_eq!(store.subscriber_count(), 0);
    }
}
