use eframe::egui::{self, Color32, RichText, Sense, Ui};

use crate::charts::TopN;
use crate::data::model::Facet;
use crate::interaction::{Highlight, Interaction};

// ---------------------------------------------------------------------------
// Placeholder states
// ---------------------------------------------------------------------------

/// Grey skeleton bars shown while a chart's data is loading.
pub fn loading_skeleton(ui: &mut Ui, height: f32) {
    let width = ui.available_width();
    let (rect, _) = ui.allocate_exact_size(egui::vec2(width, height), Sense::hover());
    let painter = ui.painter_at(rect);
    let fill = ui.visuals().faint_bg_color;
    let rows = 5;
    let row_h = rect.height() / (rows as f32 * 1.6);
    for i in 0..rows {
        let top = rect.top() + row_h * 0.3 + i as f32 * row_h * 1.6;
        let frac = 0.45 + 0.1 * ((i * 3) % 5) as f32;
        let bar = egui::Rect::from_min_size(
            egui::pos2(rect.left() + 8.0, top),
            egui::vec2((rect.width() - 16.0) * frac, row_h),
        );
        painter.rect_filled(bar, 4.0, fill);
    }
    painter.text(
        rect.center(),
        egui::Align2::CENTER_CENTER,
        "Loading…",
        egui::FontId::proportional(14.0),
        ui.visuals().weak_text_color(),
    );
    ui.ctx().request_repaint();
}

/// Terminal state for a chart without anything to draw.
pub fn no_data(ui: &mut Ui, height: f32) {
    let width = ui.available_width();
    ui.allocate_ui(egui::vec2(width, height), |ui: &mut Ui| {
        ui.set_min_size(egui::vec2(width, height));
        ui.centered_and_justified(|ui: &mut Ui| {
            ui.label(RichText::new("No Data Available").weak().size(16.0));
        });
    });
}

/// Chart title with an optional subtitle.
pub fn chart_header(ui: &mut Ui, title: &str, subtitle: Option<&str>) {
    ui.horizontal(|ui: &mut Ui| {
        ui.strong(title);
        if let Some(sub) = subtitle {
            ui.label(RichText::new(sub).weak().small());
        }
    });
}

// ---------------------------------------------------------------------------
// Chart controls
// ---------------------------------------------------------------------------

/// Labelled combo box over a fixed set of options.  Returns true when the
/// value changed.
pub fn choice<T: PartialEq + Copy>(
    ui: &mut Ui,
    id: &str,
    label: &str,
    current: &mut T,
    options: &[(T, &str)],
) -> bool {
    let before = *current;
    let selected = options
        .iter()
        .find(|(v, _)| *v == *current)
        .map_or("", |(_, name)| *name);
    ui.label(label);
    egui::ComboBox::from_id_salt(id)
        .selected_text(selected)
        .show_ui(ui, |ui: &mut Ui| {
            for (value, name) in options {
                ui.selectable_value(current, *value, *name);
            }
        });
    *current != before
}

const TOP_N_STEPS: [usize; 3] = [5, 10, 20];

/// "Top N / All" picker.  `default_n` (from the command line) is offered
/// alongside the fixed steps.
pub fn top_n_picker(ui: &mut Ui, id: &str, current: &mut TopN, default_n: usize) -> bool {
    let mut steps: Vec<usize> = TOP_N_STEPS.to_vec();
    if !steps.contains(&default_n) && default_n > 0 {
        steps.push(default_n);
        steps.sort_unstable();
    }
    let before = *current;
    egui::ComboBox::from_id_salt(id)
        .selected_text(current.label())
        .show_ui(ui, |ui: &mut Ui| {
            for n in steps {
                ui.selectable_value(current, TopN::Top(n), TopN::Top(n).label());
            }
            ui.selectable_value(current, TopN::All, TopN::All.label());
        });
    *current != before
}

// ---------------------------------------------------------------------------
// Interactive legend
// ---------------------------------------------------------------------------

/// Which legend entry the pointer is over, and whether it was clicked.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct LegendResponse {
    pub hovered: Option<String>,
    pub clicked: Option<String>,
}

/// Horizontal legend whose entries are styled like the chart elements they
/// name.
pub fn legend(
    ui: &mut Ui,
    facet: Facet,
    entries: &[(String, Color32)],
    highlight: &Highlight,
    interaction: &Interaction,
) -> LegendResponse {
    let mut out = LegendResponse::default();
    ui.horizontal_wrapped(|ui: &mut Ui| {
        for (value, color) in entries {
            let style = interaction.style(highlight, facet, value);
            let (swatch, _) = ui.allocate_exact_size(egui::vec2(10.0, 10.0), Sense::hover());
            ui.painter().rect_filled(swatch, 2.0, style.fill(*color));

            let selected = highlight.is_selected(facet, value);
            let text = RichText::new(value).color(style.fill(ui.visuals().text_color()));
            let resp = ui.selectable_label(selected, text);
            if resp.hovered() {
                out.hovered = Some(value.clone());
            }
            if resp.clicked() {
                out.clicked = Some(value.clone());
            }
        }
    });
    out
}

/// Format a salary for axis ticks and readouts ("$85k").
pub fn salary_label(value: f64) -> String {
    if value.abs() >= 1000.0 {
        format!("${:.0}k", value / 1000.0)
    } else {
        format!("${value:.0}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn salaries_are_shortened() {
        assert_eq!(salary_label(85_000.0), "$85k");
        assert_eq!(salary_label(123_456.0), "$123k");
        assert_eq!(salary_label(950.0), "$950");
    }
}
