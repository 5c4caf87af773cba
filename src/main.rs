mod aggregate;
mod app;
mod charts;
mod color;
mod data;
mod interaction;
mod settings;
mod state;
mod store;
mod ui;

use std::path::PathBuf;

use app::JobscopeApp;
use clap::Parser;
use eframe::egui;
use settings::DashboardSettings;

#[derive(Parser)]
#[command(name = "jobscope", version, about = "Interactive job market dashboard")]
struct Cli {
    /// Postings file to open at startup (.parquet, .json or .csv).
    path: Option<PathBuf>,

    /// Default size of the "top N" displays.
    #[arg(
        long,
        default_value_t = 10,
        value_parser = clap::builder::RangedU64ValueParser::<usize>::new().range(1..)
    )]
    top_n: usize,

    /// Chart settings saved from a previous session.
    #[arg(long)]
    settings: Option<PathBuf>,
}

fn main() -> eframe::Result {
    env_logger::init();
    let cli = Cli::parse();

    let settings = match &cli.settings {
        Some(path) => DashboardSettings::load(path).unwrap_or_else(|e| {
            log::warn!("{e:#}; using default chart settings");
            DashboardSettings::with_top_n(cli.top_n)
        }),
        None => DashboardSettings::with_top_n(cli.top_n),
    };

    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([1400.0, 900.0])
            .with_min_inner_size([800.0, 600.0]),
        ..Default::default()
    };

    eframe::run_native(
        "Jobscope – Job Market Dashboard",
        options,
        Box::new(move |_cc| Ok(Box::new(JobscopeApp::new(settings, cli.top_n, cli.path)))),
    )
}
