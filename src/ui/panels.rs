use std::sync::Arc;

use eframe::egui::{self, Color32, RichText, ScrollArea, Ui};

use crate::config::ChartKind;
use crate::data::model::Sex;
use crate::data::source::DataSource;
use crate::state::AppState;

// ---------------------------------------------------------------------------
// Left side panel – filter widgets
// ---------------------------------------------------------------------------

/// Render the left filter panel.
pub fn side_panel(ui: &mut Ui, state: &mut AppState) {
    ui.heading("Filters");
    ui.separator();

    let Some(table) = state.table.clone() else {
        ui.label("No dataset loaded.");
        return;
    };
    if table.is_empty() {
        ui.label(RichText::new("The loaded table has no complete rows.").color(Color32::RED));
        return;
    }

    // ---- Year ----
    ui.strong("Year");
    match table.year_range {
        Some((lo, hi)) => {
            ui.add(egui::Slider::new(&mut state.selection.year, lo..=hi));
        }
        None => {
            ui.label("No years available.");
        }
    }
    ui.separator();

    // ---- Sex ----
    ui.strong("Sex");
    ui.horizontal(|ui: &mut Ui| {
        for sex in Sex::ALL {
            ui.radio_value(&mut state.selection.sex, sex, sex.code());
        }
    });
    ui.separator();

    // ---- Cancer ----
    ui.strong("Cancer");
    let current = state.selection.cancer.clone().unwrap_or_default();
    egui::ComboBox::from_id_salt("cancer")
        .selected_text(&current)
        .width(ui.available_width())
        .show_ui(ui, |ui: &mut Ui| {
            for cancer in &state.view.cancer_options {
                if ui.selectable_label(current == *cancer, cancer).clicked() {
                    state.selection.cancer = Some(cancer.clone());
                }
            }
        });
    ui.separator();

    // ---- Chart variant ----
    ui.strong("Chart");
    ui.horizontal(|ui: &mut Ui| {
        ui.radio_value(&mut state.chart_kind, ChartKind::Heatmap, "Heatmap");
        ui.radio_value(&mut state.chart_kind, ChartKind::Bars, "Bars");
    });
    ui.checkbox(&mut state.show_table, "Show data table");
    if state.age_brush.is_some() && ui.small_button("Clear age selection").clicked() {
        state.age_brush = None;
    }
    ui.separator();

    // ---- Countries (multi-select) ----
    let options = state.country_options();
    let header_text = format!(
        "Countries  ({}/{})",
        state.selection.countries.len(),
        options.len()
    );
    egui::CollapsingHeader::new(RichText::new(header_text).strong())
        .id_salt("countries")
        .default_open(true)
        .show(ui, |ui: &mut Ui| {
            ui.horizontal(|ui: &mut Ui| {
                if ui.small_button("All").clicked() {
                    state.select_all_countries();
                }
                if ui.small_button("None").clicked() {
                    state.select_no_countries();
                }
                if ui.small_button("Default").clicked() {
                    state.reset_countries();
                }
            });
            ui.add(egui::TextEdit::singleline(&mut state.country_query).hint_text("Search…"));

            let query = state.country_query.to_lowercase();
            ScrollArea::vertical()
                .auto_shrink([false, true])
                .max_height(ui.available_height())
                .show(ui, |ui: &mut Ui| {
                    for country in options
                        .iter()
                        .filter(|c| query.is_empty() || c.to_lowercase().contains(&query))
                    {
                        let mut checked = state.is_country_selected(country);
                        let has_data = table.countries.binary_search(country).is_ok();
                        let mut text = RichText::new(country);
                        if !has_data {
                            text = text.color(Color32::GRAY);
                        }
                        if ui.checkbox(&mut checked, text).changed() {
                            state.set_country(country, checked);
                        }
                    }
                });
        });

    // Recompute the filtered view after any widget change.
    state.refilter();
}

// ---------------------------------------------------------------------------
// Top bar
// ---------------------------------------------------------------------------

/// Render the top menu / toolbar.
pub fn top_bar(ui: &mut Ui, state: &mut AppState) {
    egui::menu::bar(ui, |ui: &mut Ui| {
        ui.menu_button("File", |ui: &mut Ui| {
            if ui.button("Open local CSVs…").clicked() {
                open_local_sources(state);
                ui.close_menu();
            }
            let can_export = !state.view.indices.is_empty();
            if ui
                .add_enabled(can_export, egui::Button::new("Export view…"))
                .clicked()
            {
                export_view_dialog(state);
                ui.close_menu();
            }
        });

        ui.separator();

        if let Some(table) = &state.table {
            ui.label(format!(
                "{} rows loaded, {} visible",
                table.len(),
                state.view.indices.len()
            ));
        }

        if let Some(msg) = &state.status_message {
            ui.separator();
            ui.label(RichText::new(msg).color(Color32::RED));
        }
    });
}

// ---------------------------------------------------------------------------
// File dialogs
// ---------------------------------------------------------------------------

/// Pick the cancer and population CSVs and replace the displayed table.
pub fn open_local_sources(state: &mut AppState) {
    let Some(cancer) = pick_csv("Open cancer deaths CSV") else {
        return;
    };
    let Some(population) = pick_csv("Open population CSV") else {
        return;
    };

    let cancer = DataSource::File(cancer);
    let population = DataSource::File(population);
    match crate::data::loader::load_sources(&cancer, &population) {
        Ok(table) => {
            log::info!("Loaded {} rows from {cancer} and {population}", table.len());
            state.set_table(Arc::new(table));
        }
        Err(e) => {
            log::error!("Failed to load local sources: {e:#}");
            state.status_message = Some(format!("Error: {e:#}"));
        }
    }
}

fn pick_csv(title: &str) -> Option<std::path::PathBuf> {
    rfd::FileDialog::new()
        .set_title(title)
        .add_filter("CSV", &["csv"])
        .pick_file()
}

pub fn export_view_dialog(state: &mut AppState) {
    let file = rfd::FileDialog::new()
        .set_title("Export filtered view")
        .set_file_name("mortality_view.csv")
        .add_filter("CSV", &["csv"])
        .add_filter("Parquet", &["parquet", "pq"])
        .save_file();

    if let Some(path) = file {
        match crate::data::export::export_rows(&path, state.visible_rows()) {
            Ok(_) => state.status_message = None,
            Err(e) => {
                log::error!("Failed to export view: {e:#}");
                state.status_message = Some(format!("Error: {e:#}"));
            }
        }
    }
}
