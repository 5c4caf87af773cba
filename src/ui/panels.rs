use std::path::PathBuf;

use eframe::egui::{self, Color32, RichText, ScrollArea, Ui};
use egui_extras::DatePickerButton;

use crate::data::model::Facet;
use crate::state::AppState;

// ---------------------------------------------------------------------------
// Left side panel – filter widgets
// ---------------------------------------------------------------------------

/// Render the left filter panel.
pub fn side_panel(ui: &mut Ui, state: &mut AppState) {
    ui.heading("Filters");
    ui.separator();

    let Some(dataset) = &state.dataset else {
        ui.label("No dataset loaded.");
        return;
    };
    if dataset.is_empty() {
        ui.label("Dataset has no postings.");
        return;
    }

    // Clone what we need so we can mutate the store inside the loop.
    let facets: Vec<(Facet, Vec<String>)> = Facet::FILTERABLE
        .iter()
        .map(|&f| (f, dataset.values(f)))
        .collect();

    active_item_readout(ui, state);
    ui.separator();

    ScrollArea::vertical()
        .auto_shrink([false, false])
        .show(ui, |ui: &mut Ui| {
            for (facet, all_values) in &facets {
                let facet = *facet;
                let n_selected = state.store.read().field(facet).map_or(0, |s| s.len());
                let header_text = format!("{}  ({n_selected}/{})", facet.label(), all_values.len());

                egui::CollapsingHeader::new(RichText::new(header_text).strong())
                    .id_salt(facet.label())
                    .default_open(facet == Facet::ExperienceLevel)
                    .show(ui, |ui: &mut Ui| {
                        ui.horizontal(|ui: &mut Ui| {
                            if ui.small_button("All").clicked() {
                                state.store.update(|sel| {
                                    if let Some(set) = sel.field_mut(facet) {
                                        set.extend(all_values.iter().cloned());
                                    }
                                });
                            }
                            if ui.small_button("None").clicked() {
                                state.store.update(|sel| {
                                    if let Some(set) = sel.field_mut(facet) {
                                        set.clear();
                                    }
                                });
                            }
                        });

                        for val in all_values {
                            let text = RichText::new(val).color(state.colors.color_for(facet, val));
                            let mut checked = state.store.read().contains(facet, val);
                            if ui.checkbox(&mut checked, text).changed() {
                                state.store.toggle(facet, val);
                            }
                        }
                    });
            }
        });
}

fn active_item_readout(ui: &mut Ui, state: &AppState) {
    let active = state.store.read_active_item();
    match (active.kind(), active.value()) {
        (Some(kind), Some(value)) => {
            ui.horizontal_wrapped(|ui: &mut Ui| {
                ui.label(RichText::new(format!("{}:", kind.label())).weak());
                let color = state.colors.color_for(kind, value);
                ui.label(RichText::new(value).color(color).strong());
            });
        }
        _ => {
            ui.label(RichText::new("Hover a chart element to focus it").weak().small());
        }
    }
}

// ---------------------------------------------------------------------------
// Top bar
// ---------------------------------------------------------------------------

/// Requests from the top bar that the app, which owns the charts, handles.
#[derive(Debug, Clone, PartialEq)]
pub enum SettingsAction {
    Save(PathBuf),
    Load(PathBuf),
}

/// Render the top menu / toolbar.
pub fn top_bar(ui: &mut Ui, state: &mut AppState) -> Option<SettingsAction> {
    let mut action = None;
    egui::menu::bar(ui, |ui: &mut Ui| {
        ui.menu_button("File", |ui: &mut Ui| {
            if ui.button("Open…").clicked() {
                open_file_dialog(state);
                ui.close_menu();
            }
            ui.separator();
            if ui.button("Save chart settings…").clicked() {
                action = settings_dialog(true).map(SettingsAction::Save);
                ui.close_menu();
            }
            if ui.button("Load chart settings…").clicked() {
                action = settings_dialog(false).map(SettingsAction::Load);
                ui.close_menu();
            }
        });

        ui.separator();

        if let Some(ds) = &state.dataset {
            ui.label(format!(
                "{} postings loaded, {} match the filters",
                ds.len(),
                state.visible_count
            ));
            ui.separator();
            date_window(ui, state);
            ui.separator();
        }

        let any_filter =
            !state.store.read().is_empty() || !state.store.read_active_item().is_none();
        if ui.add_enabled(any_filter, egui::Button::new("Clear filters")).clicked() {
            state.store.clear();
        }

        if state.loading {
            ui.spinner();
        }
        if let Some(msg) = &state.status_message {
            ui.label(RichText::new(msg).color(Color32::RED));
        }
    });
    action
}

/// Optional date window restricting every chart.
fn date_window(ui: &mut Ui, state: &mut AppState) {
    let Some((first, last)) = state.dataset.as_ref().and_then(|ds| ds.date_range) else {
        return;
    };
    let mut enabled = state.date_window.is_some();
    let (mut from, mut to) = state.date_window.unwrap_or((first, last));

    ui.checkbox(&mut enabled, "Window");
    ui.add_enabled_ui(enabled, |ui: &mut Ui| {
        ui.add(DatePickerButton::new(&mut from).id_salt("window_from"));
        ui.label("–");
        ui.add(DatePickerButton::new(&mut to).id_salt("window_to"));
    });

    let next = enabled.then(|| (from.min(to), from.max(to)));
    state.set_date_window(next);
}

// ---------------------------------------------------------------------------
// File dialogs
// ---------------------------------------------------------------------------

pub fn open_file_dialog(state: &mut AppState) {
    let file = rfd::FileDialog::new()
        .set_title("Open job postings")
        .add_filter("Supported files", &["parquet", "pq", "json", "csv"])
        .add_filter("Parquet", &["parquet", "pq"])
        .add_filter("JSON", &["json"])
        .add_filter("CSV", &["csv"])
        .pick_file();

    if let Some(path) = file {
        state.start_load(&path);
    }
}

fn settings_dialog(save: bool) -> Option<PathBuf> {
    let dialog = rfd::FileDialog::new()
        .set_title("Chart settings")
        .add_filter("JSON", &["json"]);
    if save {
        dialog.set_file_name("jobscope-settings.json").save_file()
    } else {
        dialog.pick_file()
    }
}
