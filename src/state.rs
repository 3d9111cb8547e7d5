use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use crate::color::ColorMap;
use crate::config::{ChartKind, DashboardConfig};
use crate::data::filter::{self, FilterSelection, FilteredView};
use crate::data::model::{MortalityRow, MortalityTable};

// ---------------------------------------------------------------------------
// Brush: interval selection along the age axis
// ---------------------------------------------------------------------------

/// Interval in age-axis plot coordinates (band `i` is centred on `x = i`).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AgeBrush {
    pub start: f64,
    pub end: f64,
}

impl AgeBrush {
    pub fn lo(&self) -> f64 {
        self.start.min(self.end)
    }

    pub fn hi(&self) -> f64 {
        self.start.max(self.end)
    }

    /// Age-band indices whose centre lies inside the interval.
    pub fn selected_bands(&self, n_bands: usize) -> BTreeSet<usize> {
        (0..n_bands)
            .filter(|&i| {
                let x = i as f64;
                x >= self.lo() && x <= self.hi()
            })
            .collect()
    }
}

// ---------------------------------------------------------------------------
// Application state
// ---------------------------------------------------------------------------

/// The full UI state, independent of rendering.
pub struct AppState {
    /// Base table (shared, never mutated).
    pub table: Option<Arc<MortalityTable>>,

    /// Current widget values.
    pub selection: FilterSelection,

    /// Result of the last filter run (cached).
    pub view: FilteredView,

    pub chart_kind: ChartKind,

    /// Committed brush on the age axis.
    pub age_brush: Option<AgeBrush>,

    /// Brush being dragged this frame.
    pub brush_drag: Option<AgeBrush>,

    /// Country colours for the bar variant.
    pub color_map: ColorMap,

    /// Search text for the country list.
    pub country_query: String,

    pub show_table: bool,

    /// Status / error message shown in the UI.
    pub status_message: Option<String>,

    config: DashboardConfig,
}

impl AppState {
    pub fn new(config: DashboardConfig) -> Self {
        Self {
            table: None,
            selection: FilterSelection {
                year: config.default_year,
                sex: config.default_sex,
                countries: config.default_countries.clone(),
                cancer: None,
            },
            view: FilteredView::default(),
            chart_kind: config.chart_kind,
            age_brush: None,
            brush_drag: None,
            color_map: ColorMap::new(&config.default_countries),
            country_query: String::new(),
            show_table: false,
            status_message: None,
            config,
        }
    }

    /// Ingest a table: clamp the year into range, reset the brush, refilter.
    pub fn set_table(&mut self, table: Arc<MortalityTable>) {
        if let Some((lo, hi)) = table.year_range {
            self.selection.year = self.config.default_year.clamp(lo, hi);
        }
        let options = self.country_options_for(&table);
        self.color_map = ColorMap::new(&options);
        self.table = Some(table);
        self.age_brush = None;
        self.brush_drag = None;
        self.status_message = None;
        self.refilter();
    }

    /// Recompute `view` after a widget change.
    pub fn refilter(&mut self) {
        if let Some(table) = &self.table {
            self.view = filter::apply(table, &self.selection);
            // Keep the widget in sync with the cancer actually applied.
            self.selection.cancer = self.view.cancer.clone();
        }
    }

    /// Countries offered by the multi-select: table countries plus defaults.
    pub fn country_options(&self) -> Vec<String> {
        match &self.table {
            Some(table) => self.country_options_for(table),
            None => self.config.default_countries.clone(),
        }
    }

    fn country_options_for(&self, table: &MortalityTable) -> Vec<String> {
        let all: BTreeSet<&String> = table
            .countries
            .iter()
            .chain(self.config.default_countries.iter())
            .collect();
        all.into_iter().cloned().collect()
    }

    pub fn is_country_selected(&self, country: &str) -> bool {
        self.selection.countries.iter().any(|c| c == country)
    }

    /// Add or remove a country; additions go to the end of the request order.
    pub fn set_country(&mut self, country: &str, selected: bool) {
        if selected {
            if !self.is_country_selected(country) {
                self.selection.countries.push(country.to_string());
            }
        } else {
            self.selection.countries.retain(|c| c != country);
        }
    }

    pub fn select_all_countries(&mut self) {
        self.selection.countries = self.country_options();
    }

    pub fn select_no_countries(&mut self) {
        self.selection.countries.clear();
    }

    pub fn reset_countries(&mut self) {
        self.selection.countries = self.config.default_countries.clone();
    }

    /// Rows of the filtered view.
    pub fn visible_rows(&self) -> impl Iterator<Item = &MortalityRow> {
        let rows = self.table.as_deref().map(|t| t.rows.as_slice()).unwrap_or(&[]);
        self.view.indices.iter().map(move |&i| &rows[i])
    }

    /// Age bands selected by the brush; `None` when no brush is active.
    pub fn brushed_bands(&self) -> Option<BTreeSet<usize>> {
        let table = self.table.as_ref()?;
        self.age_brush.map(|b| b.selected_bands(table.ages.len()))
    }

    /// Sum of population per country over the filtered rows, restricted to
    /// the brushed age bands. Sorted by country.
    pub fn population_by_country(&self) -> Vec<(String, f64)> {
        let Some(table) = &self.table else {
            return Vec::new();
        };
        let bands = self.brushed_bands();
        let mut totals: BTreeMap<&str, f64> = BTreeMap::new();
        for row in self.visible_rows() {
            if let Some(bands) = &bands {
                match table.age_index(&row.age) {
                    Some(i) if bands.contains(&i) => {}
                    _ => continue,
                }
            }
            *totals.entry(row.country.as_str()).or_insert(0.0) += row.pop;
        }
        totals
            .into_iter()
            .map(|(c, p)| (c.to_string(), p))
            .collect()
    }

    /// Countries present in the filtered view, sorted.
    pub fn visible_countries(&self) -> Vec<String> {
        let set: BTreeSet<&str> = self.visible_rows().map(|r| r.country.as_str()).collect();
        set.into_iter().map(str::to_string).collect()
    }

    pub fn chart_title(&self) -> String {
        format!(
            "{} mortality rates for {} in {}",
            self.view.cancer.as_deref().unwrap_or("Cancer"),
            self.selection.sex.plural(),
            self.selection.year
        )
    }

    pub fn population_title(&self) -> String {
        format!(
            "Population size by country for {} in {}",
            self.selection.sex.plural(),
            self.selection.year
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::filter::Diagnostic;
    use crate::data::model::{AgeBand, Sex};

    const STOMACH: &str = "Malignant neoplasm of stomach";

    fn table() -> Arc<MortalityTable> {
        let mut rows = Vec::new();
        for (country, pop) in [("Austria", 1000.0), ("Spain", 3000.0), ("Brazil", 7.0)] {
            for age in ["Age <5", "Age 5-14", "Age >64"] {
                rows.push(
                    MortalityRow::new(
                        country.into(),
                        2012,
                        STOMACH.into(),
                        AgeBand::new(age),
                        Sex::Male,
                        1.0,
                        pop,
                    )
                    .unwrap(),
                );
            }
        }
        Arc::new(MortalityTable::from_rows(rows))
    }

    fn state() -> AppState {
        let mut state = AppState::new(DashboardConfig::default());
        state.set_table(table());
        state
    }

    #[test]
    fn default_year_is_clamped_into_range() {
        let config = DashboardConfig {
            default_year: 1990,
            ..DashboardConfig::default()
        };
        let mut state = AppState::new(config);
        state.set_table(table());
        assert_eq!(state.selection.year, 2012);
    }

    #[test]
    fn cancer_resolves_and_missing_defaults_are_reported() {
        let state = state();
        assert_eq!(state.selection.cancer.as_deref(), Some(STOMACH));
        match &state.view.diagnostic {
            Diagnostic::Missing(missing) => {
                assert!(missing.contains(&"Germany".to_string()));
                assert!(!missing.contains(&"Spain".to_string()));
            }
            other => panic!("unexpected diagnostic {other:?}"),
        }
        // Brazil is not a default country.
        assert_eq!(state.visible_countries(), ["Austria", "Spain"]);
    }

    #[test]
    fn country_options_merge_table_and_defaults() {
        let options = state().country_options();
        assert!(options.contains(&"Brazil".to_string()));
        assert!(options.contains(&"Thailand".to_string()));
        let mut sorted = options.clone();
        sorted.sort();
        assert_eq!(options, sorted);
    }

    #[test]
    fn toggling_countries_refilters() {
        let mut state = state();
        state.set_country("Brazil", true);
        state.set_country("Spain", false);
        state.refilter();
        assert_eq!(state.visible_countries(), ["Austria", "Brazil"]);

        state.select_no_countries();
        state.refilter();
        assert_eq!(state.view.diagnostic, Diagnostic::NoData);
    }

    #[test]
    fn brush_selects_band_centres() {
        let brush = AgeBrush { start: 1.6, end: -0.2 };
        assert_eq!(brush.selected_bands(3), BTreeSet::from([0, 1]));
        let narrow = AgeBrush { start: 0.2, end: 0.8 };
        assert!(narrow.selected_bands(3).is_empty());
    }

    #[test]
    fn population_follows_brush() {
        let mut state = state();
        assert_eq!(
            state.population_by_country(),
            [("Austria".to_string(), 3000.0), ("Spain".to_string(), 9000.0)]
        );

        // Only the "Age >64" band (index 2).
        state.age_brush = Some(AgeBrush { start: 1.7, end: 2.4 });
        assert_eq!(
            state.population_by_country(),
            [("Austria".to_string(), 1000.0), ("Spain".to_string(), 3000.0)]
        );

        state.age_brush = Some(AgeBrush { start: 0.2, end: 0.3 });
        assert!(state.population_by_country().is_empty());
    }

    #[test]
    fn titles_name_the_selection() {
        let state = state();
        assert_eq!(
            state.chart_title(),
            "Malignant neoplasm of stomach mortality rates for males in 2012"
        );
        assert_eq!(
            state.population_title(),
            "Population size by country for males in 2012"
        );
    }
}
