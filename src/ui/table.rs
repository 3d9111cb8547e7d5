use eframe::egui::Ui;
use egui_extras::{Column, TableBuilder};

use crate::state::AppState;

const HEADERS: [&str; 8] = ["Country", "Year", "Cancer", "Age", "Sex", "Deaths", "Pop", "Rate"];

/// Filtered rows as a scrollable table.
pub fn data_table(ui: &mut Ui, state: &AppState) {
    let rows: Vec<_> = state.visible_rows().collect();
    if rows.is_empty() {
        ui.label("No rows match the current filters.");
        return;
    }

    TableBuilder::new(ui)
        .striped(true)
        .resizable(true)
        .column(Column::auto().at_least(90.0))
        .column(Column::auto())
        .column(Column::initial(220.0).clip(true))
        .columns(Column::auto(), 5)
        .header(20.0, |mut header| {
            for title in HEADERS {
                header.col(|ui| {
                    ui.strong(title);
                });
            }
        })
        .body(|body| {
            body.rows(18.0, rows.len(), |mut row| {
                let r = rows[row.index()];
                row.col(|ui| {
                    ui.label(&r.country);
                });
                row.col(|ui| {
                    ui.label(r.year.to_string());
                });
                row.col(|ui| {
                    ui.label(&r.cancer);
                });
                row.col(|ui| {
                    ui.label(r.age.as_str());
                });
                row.col(|ui| {
                    ui.label(r.sex.code());
                });
                row.col(|ui| {
                    ui.label(format!("{:.0}", r.deaths));
                });
                row.col(|ui| {
                    ui.label(format!("{:.0}", r.pop));
                });
                row.col(|ui| {
                    ui.label(format!("{:.3}", r.rate));
                });
            });
        });
}
