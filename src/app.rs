use std::path::PathBuf;
use std::time::Duration;

use eframe::egui::{self, Ui};

use crate::charts::ChartContext;
use crate::charts::breakdown::LocationBreakdownChart;
use crate::charts::distribution::SalaryDistributionChart;
use crate::charts::timeline::HiringTimelineChart;
use crate::charts::trend_pulse::TrendPulseChart;
use crate::settings::DashboardSettings;
use crate::state::AppState;
use crate::ui::panels::{self, SettingsAction};

// ---------------------------------------------------------------------------
// eframe App implementation
// ---------------------------------------------------------------------------

pub struct JobscopeApp {
    pub state: AppState,
    distribution: SalaryDistributionChart,
    breakdown: LocationBreakdownChart,
    trend_pulse: TrendPulseChart,
    timeline: HiringTimelineChart,
    default_top_n: usize,
}

impl JobscopeApp {
    pub fn new(
        settings: DashboardSettings,
        default_top_n: usize,
        initial_file: Option<PathBuf>,
    ) -> Self {
        let mut state = AppState::default();
        let store = &mut state.store;
        let distribution = SalaryDistributionChart::new(store, settings.distribution);
        let breakdown = LocationBreakdownChart::new(store, settings.breakdown);
        let trend_pulse = TrendPulseChart::new(store, settings.trend_pulse);
        let timeline = HiringTimelineChart::new(store, settings.timeline);

        if let Some(path) = initial_file {
            state.start_load(&path);
        }

        Self {
            state,
            distribution,
            breakdown,
            trend_pulse,
            timeline,
            default_top_n,
        }
    }

    pub fn settings(&self) -> DashboardSettings {
        DashboardSettings {
            distribution: self.distribution.settings,
            breakdown: self.breakdown.settings,
            trend_pulse: self.trend_pulse.settings,
            timeline: self.timeline.settings,
        }
    }

    /// Replace every chart with a fresh one using `settings`.  Cached models
    /// and brushes are dropped along with the old charts.
    pub fn apply_settings(&mut self, settings: DashboardSettings) {
        let store = &mut self.state.store;
        let old = std::mem::replace(
            &mut self.distribution,
            SalaryDistributionChart::new(store, settings.distribution),
        );
        old.unsubscribe(store);
        let old = std::mem::replace(
            &mut self.breakdown,
            LocationBreakdownChart::new(store, settings.breakdown),
        );
        old.unsubscribe(store);
        let old = std::mem::replace(
            &mut self.trend_pulse,
            TrendPulseChart::new(store, settings.trend_pulse),
        );
        old.unsubscribe(store);
        let old = std::mem::replace(
            &mut self.timeline,
            HiringTimelineChart::new(store, settings.timeline),
        );
        old.unsubscribe(store);
    }

    fn handle_settings_action(&mut self, action: SettingsAction) {
        let result = match &action {
            SettingsAction::Save(path) => self.settings().save(path),
            SettingsAction::Load(path) => {
                DashboardSettings::load(path).map(|settings| self.apply_settings(settings))
            }
        };
        if let Err(e) = result {
            log::error!("{e:#}");
            self.state.status_message = Some(format!("Error: {e:#}"));
        }
    }

    fn chart_grid(&mut self, ui: &mut Ui) {
        let cell_height = (ui.available_height() / 2.0 - 110.0).max(140.0);
        let cx = ChartContext {
            payloads: self.state.payloads.as_ref(),
            is_loading: self.state.loading,
            colors: &self.state.colors,
            height: cell_height,
            default_top_n: self.default_top_n,
        };
        let store = &mut self.state.store;

        ui.columns(2, |cols: &mut [Ui]| {
            cols[0].group(|ui: &mut Ui| self.distribution.show(ui, &cx, store));
            cols[1].group(|ui: &mut Ui| self.breakdown.show(ui, &cx, store));
        });
        ui.add_space(6.0);
        ui.columns(2, |cols: &mut [Ui]| {
            cols[0].group(|ui: &mut Ui| self.trend_pulse.show(ui, &cx, store));
            cols[1].group(|ui: &mut Ui| self.timeline.show(ui, &cx, store));
        });
    }
}

impl eframe::App for JobscopeApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        if self.state.poll_load() {
            ctx.request_repaint();
        }
        if self.state.loading {
            ctx.request_repaint_after(Duration::from_millis(100));
        }

        // ---- Top panel: menu bar ----
        let action = egui::TopBottomPanel::top("top_bar")
            .show(ctx, |ui| panels::top_bar(ui, &mut self.state))
            .inner;
        if let Some(action) = action {
            self.handle_settings_action(action);
        }

        // ---- Left side panel: filters ----
        egui::SidePanel::left("filter_panel")
            .default_width(220.0)
            .resizable(true)
            .show(ctx, |ui| {
                panels::side_panel(ui, &mut self.state);
            });
        self.state.sync_filters();

        // ---- Central panel: charts ----
        egui::CentralPanel::default().show(ctx, |ui| {
            if self.state.dataset.is_none() && !self.state.loading {
                ui.centered_and_justified(|ui: &mut Ui| {
                    ui.heading("Open a file to explore job postings  (File → Open…)");
                });
                return;
            }
            egui::ScrollArea::vertical()
                .auto_shrink([false, false])
                .show(ui, |ui: &mut Ui| self.chart_grid(ui));
        });

        // Clicks inside the charts change the filters after they were drawn.
        if self.state.sync_filters() {
            ctx.request_repaint();
        }
    }
}
