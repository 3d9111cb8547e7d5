use std::ops::RangeInclusive;

use eframe::egui::{self, Align2, Color32, FontId, PointerButton, RichText, Sense, Stroke, Ui};
use egui_plot::{
    Bar, BarChart, GridInput, GridMark, Plot, PlotPoints, PlotResponse, PlotUi, Polygon,
};

use crate::color::{format_rate, ramp_color, RATE_DOMAIN};
use crate::config::ChartKind;
use crate::data::filter::Diagnostic;
use crate::data::model::MortalityTable;
use crate::state::{AgeBrush, AppState};

// ---------------------------------------------------------------------------
// Central panel: main rate chart, legend, diagnostic, population chart
// ---------------------------------------------------------------------------

pub fn dashboard(ui: &mut Ui, state: &mut AppState) {
    let Some(table) = state.table.clone() else {
        ui.centered_and_justified(|ui: &mut Ui| {
            ui.heading("No data loaded  (File → Open local CSVs…)");
        });
        return;
    };

    ui.heading("Age-specific cancer mortality rates");
    ui.label(RichText::new(state.chart_title()).strong());

    let main_height = (ui.available_height() * 0.55).max(160.0);
    match state.chart_kind {
        ChartKind::Heatmap => rate_heatmap(ui, state, &table, main_height),
        ChartKind::Bars => rate_bars(ui, state, &table, main_height),
    }
    rate_legend(ui);

    if state.view.diagnostic != Diagnostic::None {
        ui.label(RichText::new(state.view.diagnostic.to_string()).italics());
    }

    ui.separator();
    ui.label(RichText::new(state.population_title()).strong());
    population_chart(ui, state);
}

// ---------------------------------------------------------------------------
// Categorical axes
// ---------------------------------------------------------------------------

/// Tick label for category `i` at `x = i`, empty between categories.
fn category_formatter(labels: Vec<String>) -> impl Fn(GridMark, &RangeInclusive<f64>) -> String {
    move |mark, _range| {
        let i = mark.value.round();
        if (mark.value - i).abs() > 1e-6 || i < 0.0 {
            return String::new();
        }
        labels.get(i as usize).cloned().unwrap_or_default()
    }
}

/// One grid mark per category.
fn category_spacer(n: usize) -> impl Fn(GridInput) -> Vec<GridMark> {
    move |_input| {
        (0..n)
            .map(|i| GridMark {
                value: i as f64,
                step_size: 1.0,
            })
            .collect()
    }
}

/// Countries listed top to bottom: the first one gets the highest y.
fn country_axis(countries: &[String]) -> Vec<String> {
    countries.iter().rev().cloned().collect()
}

fn age_labels(table: &MortalityTable) -> Vec<String> {
    table.ages.iter().map(|a| a.to_string()).collect()
}

const BRUSH_FILL: Color32 = Color32::from_rgba_premultiplied(40, 40, 40, 40);
const BRUSH_STROKE: Color32 = Color32::from_gray(200);

fn rect(x0: f64, x1: f64, y0: f64, y1: f64) -> Vec<[f64; 2]> {
    vec![[x0, y0], [x1, y0], [x1, y1], [x0, y1]]
}

fn draw_brush(plot_ui: &mut PlotUi, brush: AgeBrush, y0: f64, y1: f64) {
    let overlay = Polygon::new(PlotPoints::from(rect(brush.lo(), brush.hi(), y0, y1)))
        .fill_color(BRUSH_FILL)
        .stroke(Stroke::new(1.0, BRUSH_STROKE));
    plot_ui.polygon(overlay);
}

/// Update the brush from drag gestures on the main chart. A click clears it.
fn handle_brush<R>(state: &mut AppState, plot: &PlotResponse<R>) {
    let response = &plot.response;
    let pointer_x = || {
        response
            .interact_pointer_pos()
            .map(|pos| plot.transform.value_from_position(pos).x)
    };

    if response.drag_started_by(PointerButton::Primary) {
        state.brush_drag = pointer_x().map(|x| AgeBrush { start: x, end: x });
    } else if response.dragged_by(PointerButton::Primary) {
        if let (Some(brush), Some(x)) = (state.brush_drag.as_mut(), pointer_x()) {
            brush.end = x;
        }
    }

    if response.drag_stopped() {
        if let Some(brush) = state.brush_drag.take() {
            state.age_brush = (brush.hi() - brush.lo() > 1e-3).then_some(brush);
        }
    } else if response.clicked() {
        state.age_brush = None;
    }
}

fn active_brush(state: &AppState) -> Option<AgeBrush> {
    state.brush_drag.or(state.age_brush)
}

// ---------------------------------------------------------------------------
// Heatmap variant
// ---------------------------------------------------------------------------

fn rate_heatmap(ui: &mut Ui, state: &mut AppState, table: &MortalityTable, height: f32) {
    let countries = state.visible_countries();
    let y_labels = country_axis(&countries);
    let n_age = table.ages.len();
    let n_country = countries.len();

    // (x, y, rate) with y counted from the bottom.
    let cells: Vec<(usize, usize, f64)> = state
        .visible_rows()
        .filter_map(|r| {
            let x = table.age_index(&r.age)?;
            let y = countries.binary_search(&r.country).ok()?;
            Some((x, n_country - 1 - y, r.rate))
        })
        .collect();
    let brush = active_brush(state);

    let plot = Plot::new("rate_heatmap")
        .height(height)
        .allow_drag(false)
        .allow_zoom(false)
        .allow_scroll(false)
        .allow_boxed_zoom(false)
        .allow_double_click_reset(false)
        .show_grid(false)
        .show_x(false)
        .show_y(false)
        .include_x(-0.5)
        .include_x(n_age as f64 - 0.5)
        .include_y(-0.5)
        .include_y(n_country as f64 - 0.5)
        .x_axis_label("Age")
        .y_axis_label("Country")
        .x_axis_formatter(category_formatter(age_labels(table)))
        .y_axis_formatter(category_formatter(y_labels.clone()))
        .x_grid_spacer(category_spacer(n_age))
        .y_grid_spacer(category_spacer(n_country))
        .show(ui, |plot_ui| {
            for &(x, y, rate) in &cells {
                let (x, y) = (x as f64, y as f64);
                let cell = rect(x - 0.5, x + 0.5, y - 0.5, y + 0.5);
                let polygon = Polygon::new(PlotPoints::from(cell))
                    .fill_color(RATE_DOMAIN.color(rate))
                    .stroke(Stroke::new(1.0, Color32::from_gray(30)));
                plot_ui.polygon(polygon);
            }
            if let Some(brush) = brush {
                draw_brush(plot_ui, brush, -0.5, n_country as f64 - 0.5);
            }
            plot_ui.pointer_coordinate()
        });

    if let Some(point) = plot.inner {
        let x = point.x.round();
        let y = point.y.round();
        let hit = cells
            .iter()
            .find(|&&(cx, cy, _)| cx as f64 == x && cy as f64 == y);
        if let Some(&(cx, cy, rate)) = hit {
            plot.response.clone().on_hover_text_at_pointer(format!(
                "{} · {}\nRate: {rate:.3} per 100k",
                y_labels[cy], table.ages[cx]
            ));
        }
    }

    handle_brush(state, &plot);
}

// ---------------------------------------------------------------------------
// Bar variant
// ---------------------------------------------------------------------------

fn rate_bars(ui: &mut Ui, state: &mut AppState, table: &MortalityTable, height: f32) {
    let countries = state.visible_countries();
    let n_age = table.ages.len();
    let group_width = 0.8;
    let bar_width = group_width / countries.len().max(1) as f64;
    let base = RATE_DOMAIN.min.log10();

    let charts: Vec<BarChart> = countries
        .iter()
        .enumerate()
        .map(|(k, country)| {
            let offset = -group_width / 2.0 + bar_width * (k as f64 + 0.5);
            let bars: Vec<Bar> = state
                .visible_rows()
                .filter(|r| r.country == *country)
                .filter_map(|r| {
                    let x = table.age_index(&r.age)? as f64 + offset;
                    let y = RATE_DOMAIN.log_value(r.rate);
                    Some(
                        Bar::new(x, y - base)
                            .base_offset(base)
                            .width(bar_width)
                            .name(format!("{country} · {}: {:.3} per 100k", r.age, r.rate)),
                    )
                })
                .collect();
            BarChart::new(bars)
                .name(country)
                .color(state.color_map.color_for(country))
                .element_formatter(Box::new(|bar: &Bar, _chart: &BarChart| bar.name.clone()))
        })
        .collect();
    let brush = active_brush(state);

    let decade_exponents: Vec<f64> = RATE_DOMAIN.decades().iter().map(|d| d.log10()).collect();
    let top = RATE_DOMAIN.max.log10();

    let plot = Plot::new("rate_bars")
        .height(height)
        .legend(egui_plot::Legend::default())
        .allow_drag(false)
        .allow_zoom(false)
        .allow_scroll(false)
        .allow_boxed_zoom(false)
        .allow_double_click_reset(false)
        .show_x(false)
        .show_y(false)
        .include_x(-0.5)
        .include_x(n_age as f64 - 0.5)
        .include_y(base)
        .include_y(top)
        .x_axis_label("Age")
        .y_axis_label("Mortality rate per 100k")
        .x_axis_formatter(category_formatter(age_labels(table)))
        .x_grid_spacer(category_spacer(n_age))
        .y_axis_formatter(|mark: GridMark, _range: &RangeInclusive<f64>| {
            format_rate(10f64.powf(mark.value))
        })
        .y_grid_spacer(move |_input: GridInput| {
            decade_exponents
                .iter()
                .map(|&value| GridMark {
                    value,
                    step_size: 1.0,
                })
                .collect()
        })
        .show(ui, |plot_ui| {
            for chart in charts {
                plot_ui.bar_chart(chart);
            }
            if let Some(brush) = brush {
                draw_brush(plot_ui, brush, base, top);
            }
        });

    handle_brush(state, &plot);
}

// ---------------------------------------------------------------------------
// Colour legend
// ---------------------------------------------------------------------------

fn rate_legend(ui: &mut Ui) {
    const STEPS: usize = 64;
    let width = ui.available_width().min(420.0);
    let (area, _) = ui.allocate_exact_size(egui::vec2(width, 30.0), Sense::hover());
    let strip = egui::Rect::from_min_size(area.min, egui::vec2(width, 12.0));
    let painter = ui.painter();

    let step_w = width / STEPS as f32;
    for k in 0..STEPS {
        let t = (k as f32 + 0.5) / STEPS as f32;
        let cell = egui::Rect::from_min_size(
            strip.min + egui::vec2(k as f32 * step_w, 0.0),
            egui::vec2(step_w + 0.5, strip.height()),
        );
        painter.rect_filled(cell, 0.0, ramp_color(t));
    }

    let text_color = ui.visuals().text_color();
    for decade in RATE_DOMAIN.decades() {
        let t = RATE_DOMAIN.normalize(decade) as f32;
        let pos = egui::pos2(strip.min.x + t * width, strip.max.y + 2.0);
        let align = if t <= 0.0 {
            Align2::LEFT_TOP
        } else if t >= 1.0 {
            Align2::RIGHT_TOP
        } else {
            Align2::CENTER_TOP
        };
        painter.text(pos, align, format_rate(decade), FontId::proportional(11.0), text_color);
    }
    ui.label(RichText::new("Mortality rate per 100k (log scale)").small());
}

// ---------------------------------------------------------------------------
// Population chart linked to the age brush
// ---------------------------------------------------------------------------

fn population_chart(ui: &mut Ui, state: &AppState) {
    let totals = state.population_by_country();
    // Top to bottom in alphabetical order.
    let labels: Vec<String> = totals.iter().rev().map(|(c, _)| c.clone()).collect();
    let n = totals.len();

    let bars: Vec<Bar> = totals
        .iter()
        .enumerate()
        .map(|(i, (country, pop))| {
            Bar::new((n - 1 - i) as f64, *pop)
                .width(0.7)
                .name(format!("{country}: {pop:.0}"))
        })
        .collect();

    Plot::new("population")
        .height(ui.available_height().max(120.0))
        .allow_drag(false)
        .allow_zoom(false)
        .allow_scroll(false)
        .allow_boxed_zoom(false)
        .show_x(false)
        .show_y(false)
        .include_x(0.0)
        .include_y(-0.5)
        .include_y(n as f64 - 0.5)
        .x_axis_label("Population size")
        .y_axis_label("Country")
        .y_axis_formatter(category_formatter(labels))
        .y_grid_spacer(category_spacer(n))
        .show(ui, |plot_ui| {
            let chart = BarChart::new(bars)
                .horizontal()
                .color(Color32::LIGHT_BLUE)
                .element_formatter(Box::new(|bar: &Bar, _chart: &BarChart| {
                    bar.name.clone()
                }));
            plot_ui.bar_chart(chart);
        });
}
