mod app;
mod color;
mod config;
mod data;
mod state;
mod ui;

use anyhow::Result;
use app::MortalityExplorerApp;
use config::DashboardConfig;
use eframe::egui;

fn main() -> Result<()> {
    env_logger::init();

    let config = DashboardConfig::load()?;
    let table = data::loader::load_cached(&config)?;

    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([1200.0, 850.0])
            .with_min_inner_size([700.0, 500.0]),
        ..Default::default()
    };

    eframe::run_native(
        "Mortality Explorer – Age-specific cancer mortality",
        options,
        Box::new(move |_cc| Ok(Box::new(MortalityExplorerApp::new(config, table)))),
    )
    .map_err(|e| anyhow::anyhow!("eframe: {e}"))
}
