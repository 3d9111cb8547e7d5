use std::sync::Arc;

use eframe::egui;

use crate::config::DashboardConfig;
use crate::data::model::MortalityTable;
use crate::state::AppState;
use crate::ui::{panels, plot, table};

// ---------------------------------------------------------------------------
// eframe App implementation
// ---------------------------------------------------------------------------

pub struct MortalityExplorerApp {
    pub state: AppState,
}

impl MortalityExplorerApp {
    pub fn new(config: DashboardConfig, table: Arc<MortalityTable>) -> Self {
        let mut state = AppState::new(config);
        state.set_table(table);
        Self { state }
    }
}

impl eframe::App for MortalityExplorerApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        // ---- Top panel: menu bar ----
        egui::TopBottomPanel::top("top_bar").show(ctx, |ui| {
            panels::top_bar(ui, &mut self.state);
        });

        // ---- Left side panel: filters ----
        egui::SidePanel::left("filter_panel")
            .default_width(240.0)
            .resizable(true)
            .show(ctx, |ui| {
                panels::side_panel(ui, &mut self.state);
            });

        // ---- Bottom panel: filtered rows ----
        if self.state.show_table {
            egui::TopBottomPanel::bottom("data_table")
                .resizable(true)
                .default_height(220.0)
                .show(ctx, |ui| {
                    table::data_table(ui, &self.state);
                });
        }

        // ---- Central panel: charts ----
        egui::CentralPanel::default().show(ctx, |ui| {
            plot::dashboard(ui, &mut self.state);
        });
    }
}
