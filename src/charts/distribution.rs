use eframe::egui::{RichText, Ui};
use egui_plot::{Bar, BarChart, BoxElem, BoxPlot, BoxSpread, Line, Plot, PlotPoints, Points};
use serde::{Deserialize, Serialize};

use super::{
    ChartContext, ChartPhase, DerivedCache, PlotHit, TopN, band_labels, nearest_band,
    prepare_cached,
};
use crate::aggregate::{Summary, density_curve, padded_range, summarize};
use crate::color::CategoryColors;
use crate::data::model::Facet;
use crate::data::payload::{DISTRIBUTION_FACETS, SalaryDistributionData};
use crate::interaction::{ElementKey, Highlight, HighlightHandle, Interaction};
use crate::store::FilterStore;
use crate::ui::widgets;

// ---------------------------------------------------------------------------
// Settings
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum DistributionStyle {
    #[default]
    BoxPlot,
    /// Ridgeline of density curves.
    Density,
    /// Median bars.
    Bar,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum SortOrder {
    #[default]
    Median,
    Range,
    Alphabetical,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DistributionSettings {
    pub style: DistributionStyle,
    pub sort: SortOrder,
    pub group_by: Facet,
    pub top_n: TopN,
}

// ---------------------------------------------------------------------------
// Derived model
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub struct CategoryDistribution {
    pub name: String,
    pub summary: Summary,
    /// `None` when the category has too few distinct observations.
    pub density: Option<Vec<[f64; 2]>>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DistributionModel {
    pub facet: Facet,
    /// Top to bottom.
    pub rows: Vec<CategoryDistribution>,
    pub x_range: (f64, f64),
    pub max_density: f64,
}

/// Summaries and density curves per category, limited to the `top_n`
/// categories with the most observations and ordered by `sort`.
pub fn derive_distribution(
    data: &SalaryDistributionData,
    sort: SortOrder,
    top_n: TopN,
) -> DistributionModel {
    let mut rows: Vec<CategoryDistribution> = data
        .categories
        .iter()
        .filter_map(|name| {
            let values = data.salaries.get(name)?;
            let summary = summarize(values)?;
            Some(CategoryDistribution {
                name: name.clone(),
                summary,
                density: density_curve(values),
            })
        })
        .collect();

    rows.sort_by(|a, b| {
        b.summary
            .count
            .cmp(&a.summary.count)
            .then_with(|| a.name.cmp(&b.name))
    });
    let mut rows = top_n.apply(rows);
    sort_rows(&mut rows, sort);

    let lo = rows.iter().map(|r| r.summary.min).fold(f64::INFINITY, f64::min);
    let hi = rows.iter().map(|r| r.summary.max).fold(f64::NEG_INFINITY, f64::max);
    let max_density = rows
        .iter()
        .filter_map(|r| r.density.as_ref())
        .flatten()
        .map(|p| p[1])
        .fold(0.0, f64::max);

    DistributionModel {
        facet: data.facet,
        rows,
        x_range: padded_range(lo, hi),
        max_density,
    }
}

fn sort_rows(rows: &mut [CategoryDistribution], sort: SortOrder) {
    let by_name = |a: &CategoryDistribution, b: &CategoryDistribution| a.name.cmp(&b.name);
    match sort {
        SortOrder::Median => rows.sort_by(|a, b| {
            b.summary
                .median
                .total_cmp(&a.summary.median)
                .then_with(|| by_name(a, b))
        }),
        SortOrder::Range => rows.sort_by(|a, b| {
            b.summary
                .range()
                .total_cmp(&a.summary.range())
                .then_with(|| by_name(a, b))
        }),
        SortOrder::Alphabetical => rows.sort_by(by_name),
    }
}

/// Plot y coordinate of row `i`; the first row is drawn on top.
fn row_y(i: usize, n: usize) -> f64 {
    (n - 1 - i) as f64
}

/// Row under plot coordinate `y`, if the pointer is inside a row's band.
pub fn hit_row(n: usize, y: f64) -> Option<usize> {
    nearest_band(n, y).map(|band| n - 1 - band)
}

// ---------------------------------------------------------------------------
// Chart
// ---------------------------------------------------------------------------

type CacheKey = (u64, Facet, SortOrder, TopN);

/// Salary distribution per category as box plots, a ridgeline of density
/// curves, or median bars.
pub struct SalaryDistributionChart {
    pub settings: DistributionSettings,
    highlight: HighlightHandle,
    interaction: Interaction,
    cache: DerivedCache<CacheKey, DistributionModel>,
}

impl SalaryDistributionChart {
    pub fn new(store: &mut FilterStore, settings: DistributionSettings) -> Self {
        SalaryDistributionChart {
            settings,
            highlight: HighlightHandle::subscribe(store),
            interaction: Interaction::default(),
            cache: DerivedCache::default(),
        }
    }

    pub fn show(&mut self, ui: &mut Ui, cx: &ChartContext<'_>, store: &mut FilterStore) {
        let subtitle = self.settings.group_by.label();
        widgets::chart_header(ui, "Salary distribution", Some(subtitle));
        self.controls(ui, cx.default_top_n);

        let settings = self.settings;
        let input = cx.input(|p| p.salary.get(&settings.group_by));
        let key = (
            input.generation,
            settings.group_by,
            settings.sort,
            settings.top_n,
        );
        let highlight = self.highlight.snapshot();

        let hit = match prepare_cached(&mut self.cache, key, input, |d| {
            derive_distribution(d, settings.sort, settings.top_n)
        }) {
            ChartPhase::Loading => {
                widgets::loading_skeleton(ui, cx.height);
                return;
            }
            ChartPhase::NoData => {
                widgets::no_data(ui, cx.height);
                return;
            }
            ChartPhase::Ready(model) if model.rows.is_empty() => {
                widgets::no_data(ui, cx.height);
                return;
            }
            ChartPhase::Ready(model) => render(
                ui,
                model,
                settings.style,
                cx,
                &highlight,
                &self.interaction,
            ),
        };

        hit.apply(&mut self.interaction, store);
    }

    fn controls(&mut self, ui: &mut Ui, default_top_n: usize) {
        ui.horizontal_wrapped(|ui: &mut Ui| {
            let facets: Vec<(Facet, &str)> =
                DISTRIBUTION_FACETS.iter().map(|&f| (f, f.label())).collect();
            widgets::choice(
                ui,
                "dist_group_by",
                "Group by",
                &mut self.settings.group_by,
                &facets,
            );
            widgets::choice(
                ui,
                "dist_style",
                "Style",
                &mut self.settings.style,
                &[
                    (DistributionStyle::BoxPlot, "Box plot"),
                    (DistributionStyle::Density, "Ridgeline"),
                    (DistributionStyle::Bar, "Median bars"),
                ],
            );
            widgets::choice(
                ui,
                "dist_sort",
                "Sort",
                &mut self.settings.sort,
                &[
                    (SortOrder::Median, "Median"),
                    (SortOrder::Range, "Range"),
                    (SortOrder::Alphabetical, "A–Z"),
                ],
            );
            widgets::top_n_picker(ui, "dist_top_n", &mut self.settings.top_n, default_top_n);
        });
    }

    pub fn unsubscribe(self, store: &mut FilterStore) {
        self.highlight.unsubscribe(store);
    }
}

fn render(
    ui: &mut Ui,
    model: &DistributionModel,
    style: DistributionStyle,
    cx: &ChartContext<'_>,
    highlight: &Highlight,
    interaction: &Interaction,
) -> PlotHit {
    let n = model.rows.len();
    let facet = model.facet;
    let names: Vec<String> = model.rows.iter().map(|r| r.name.clone()).collect();
    let (x_lo, x_hi) = model.x_range;
    let colors: &CategoryColors = cx.colors;

    let plot = Plot::new("salary_distribution")
        .height(cx.height)
        .allow_drag(false)
        .allow_zoom(false)
        .allow_scroll(false)
        .allow_boxed_zoom(false)
        .show_grid([true, false])
        .include_x(x_lo)
        .include_x(x_hi)
        .include_y(-0.5)
        .include_y(n as f64 - 0.5)
        .x_axis_label("Salary (USD)")
        .x_axis_formatter(|mark, _range| widgets::salary_label(mark.value))
        .y_grid_spacer(egui_plot::uniform_grid_spacer(|_| [1.0, 1.0, 1.0]))
        .y_axis_formatter(band_labels(names, true));

    let response = plot.show(ui, |plot_ui| {
        match style {
            DistributionStyle::BoxPlot => {
                let boxes: Vec<BoxElem> = model
                    .rows
                    .iter()
                    .enumerate()
                    .map(|(i, row)| {
                        let s = &row.summary;
                        let color = colors.color_for(facet, &row.name);
                        let look = interaction.style(highlight, facet, &row.name);
                        let spread = BoxSpread::new(s.min, s.q1, s.median, s.q3, s.max);
                        BoxElem::new(row_y(i, n), spread)
                            .name(&row.name)
                            .box_width(0.6)
                            .whisker_width(0.3)
                            .fill(look.fill(color).gamma_multiply(0.6))
                            .stroke(look.stroke(color))
                    })
                    .collect();
                plot_ui.box_plot(BoxPlot::new(boxes).horizontal());
            }
            DistributionStyle::Density => {
                let scale = if model.max_density > 0.0 {
                    0.9 / model.max_density
                } else {
                    0.0
                };
                for (i, row) in model.rows.iter().enumerate() {
                    let base = row_y(i, n);
                    let color = colors.color_for(facet, &row.name);
                    let look = interaction.style(highlight, facet, &row.name);
                    match &row.density {
                        Some(curve) => {
                            let points: PlotPoints =
                                curve.iter().map(|p| [p[0], base + p[1] * scale]).collect();
                            plot_ui.line(
                                Line::new(points)
                                    .name(&row.name)
                                    .color(look.fill(color))
                                    .width(look.stroke_width)
                                    .fill(base as f32),
                            );
                        }
                        None => {
                            plot_ui.points(
                                Points::new(vec![[row.summary.median, base]])
                                    .name(&row.name)
                                    .color(look.fill(color))
                                    .radius(2.0 + look.stroke_width),
                            );
                        }
                    }
                }
            }
            DistributionStyle::Bar => {
                let bars: Vec<Bar> = model
                    .rows
                    .iter()
                    .enumerate()
                    .map(|(i, row)| {
                        let color = colors.color_for(facet, &row.name);
                        let look = interaction.style(highlight, facet, &row.name);
                        Bar::new(row_y(i, n), row.summary.median)
                            .name(&row.name)
                            .width(0.6)
                            .fill(look.fill(color))
                            .stroke(look.stroke(color))
                    })
                    .collect();
                plot_ui.bar_chart(BarChart::new(bars).horizontal());
            }
        }
        plot_ui.pointer_coordinate()
    });

    let hovered_row = response
        .inner
        .filter(|p| p.x >= x_lo && p.x <= x_hi)
        .and_then(|p| hit_row(n, p.y));

    match hovered_row.and_then(|i| model.rows.get(i)) {
        Some(row) => {
            let s = &row.summary;
            ui.label(
                RichText::new(format!(
                    "{}: median {}, IQR {} – {}, n = {}",
                    row.name,
                    widgets::salary_label(s.median),
                    widgets::salary_label(s.q1),
                    widgets::salary_label(s.q3),
                    s.count
                ))
                .small(),
            );
        }
        None => {
            ui.label(RichText::new(" ").small());
        }
    }

    PlotHit {
        hovered: hovered_row
            .and_then(|i| model.rows.get(i))
            .map(|row| ElementKey::new(facet, row.name.clone())),
        clicked: response.response.clicked(),
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use super::*;

    fn data(entries: &[(&str, &[f64])]) -> SalaryDistributionData {
        let mut salaries = BTreeMap::new();
        for (name, values) in entries {
            salaries.insert(name.to_string(), values.to_vec());
        }
        SalaryDistributionData {
            facet: Facet::Industry,
            categories: entries.iter().map(|(n, _)| n.to_string()).collect(),
            salaries,
        }
    }

    fn names(model: &DistributionModel) -> Vec<&str> {
        model.rows.iter().map(|r| r.name.as_str()).collect()
    }

    #[test]
    fn rows_sort_by_median_descending() {
        let d = data(&[
            ("Retail", &[40.0, 50.0, 60.0]),
            ("Finance", &[90.0, 100.0, 110.0]),
            ("Energy", &[70.0, 75.0, 80.0]),
        ]);
        let model = derive_distribution(&d, SortOrder::Median, TopN::All);
        assert_eq!(names(&model), vec!["Finance", "Energy", "Retail"]);
        assert_eq!(model.rows[0].summary.median, 100.0);
    }

    #[test]
    fn rows_sort_by_range_and_name() {
        let d = data(&[
            ("Retail", &[10.0, 100.0]),
            ("Finance", &[50.0, 60.0]),
            ("Energy", &[0.0, 200.0]),
        ]);
        let by_range = derive_distribution(&d, SortOrder::Range, TopN::All);
        assert_eq!(names(&by_range), vec!["Energy", "Retail", "Finance"]);
        let by_name = derive_distribution(&d, SortOrder::Alphabetical, TopN::All);
        assert_eq!(names(&by_name), vec!["Energy", "Finance", "Retail"]);
    }

    #[test]
    fn top_n_keeps_the_largest_categories() {
        let d = data(&[
            ("Retail", &[1.0]),
            ("Finance", &[1.0, 2.0, 3.0]),
            ("Energy", &[5.0, 6.0]),
        ]);
        let model = derive_distribution(&d, SortOrder::Alphabetical, TopN::Top(2));
        assert_eq!(names(&model), vec!["Energy", "Finance"]);
    }

    #[test]
    fn single_observations_get_no_curve_but_a_padded_box() {
        let d = data(&[("Retail", &[50.0]), ("Finance", &[40.0, 80.0])]);
        let model = derive_distribution(&d, SortOrder::Median, TopN::All);
        let retail = model.rows.iter().find(|r| r.name == "Retail").unwrap();
        assert!(retail.density.is_none());
        assert_eq!(retail.summary.min, 45.0);
        assert_eq!(retail.summary.max, 55.0);
        assert!(model.rows.iter().find(|r| r.name == "Finance").unwrap().density.is_some());
        assert!(model.max_density > 0.0);
        assert_eq!(model.x_range, (40.0, 80.0));
    }

    #[test]
    fn categories_without_salaries_are_skipped() {
        let mut d = data(&[("Retail", &[50.0, 60.0])]);
        d.categories.push("Mining".to_string());
        let model = derive_distribution(&d, SortOrder::Median, TopN::All);
        assert_eq!(names(&model), vec!["Retail"]);
    }

    #[test]
    fn pointer_rows_map_top_to_bottom() {
        assert_eq!(hit_row(3, 2.1), Some(0));
        assert_eq!(hit_row(3, 0.0), Some(2));
        assert_eq!(hit_row(3, 1.5), None);
        assert_eq!(hit_row(3, 3.0), None);
        assert_eq!(hit_row(3, -0.2), Some(2));
        assert_eq!(hit_row(0, 0.0), None);
    }
}
