use std::collections::BTreeSet;
use std::fmt;

use super::model::{MortalityTable, Sex};

// ---------------------------------------------------------------------------
// Filter selection: what the user picked in the side panel
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub struct FilterSelection {
    pub year: i32,
    pub sex: Sex,
    /// Requested countries, in the order they are reported as missing.
    pub countries: Vec<String>,
    /// Requested cancer; `None` means "first available".
    pub cancer: Option<String>,
}

/// Result of running a [`FilterSelection`] over the base table.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FilteredView {
    /// Indices into `MortalityTable::rows`, in table order.
    pub indices: Vec<usize>,
    /// Cancers available after the year/sex/country filters, first-seen order.
    pub cancer_options: Vec<String>,
    /// Cancer actually applied.
    pub cancer: Option<String>,
    pub diagnostic: Diagnostic,
}

/// Message shown under the chart about countries that dropped out.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum Diagnostic {
    #[default]
    None,
    /// Nothing passed the filters.
    NoData,
    /// Some requested countries have no rows.
    Missing(Vec<String>),
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Diagnostic::None => Ok(()),
            Diagnostic::NoData => f.write_str("No data available for given subset."),
            Diagnostic::Missing(countries) => {
                write!(f, "No data available for {}.", countries.join(", "))
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Individual filters
// ---------------------------------------------------------------------------

pub fn by_year(table: &MortalityTable, indices: &[usize], year: i32) -> Vec<usize> {
    keep(indices, |i| table.rows[i].year == year)
}

pub fn by_sex(table: &MortalityTable, indices: &[usize], sex: Sex) -> Vec<usize> {
    keep(indices, |i| table.rows[i].sex == sex)
}

pub fn by_countries(table: &MortalityTable, indices: &[usize], countries: &[String]) -> Vec<usize> {
    let wanted: BTreeSet<&str> = countries.iter().map(String::as_str).collect();
    keep(indices, |i| wanted.contains(table.rows[i].country.as_str()))
}

pub fn by_cancer(table: &MortalityTable, indices: &[usize], cancer: &str) -> Vec<usize> {
    keep(indices, |i| table.rows[i].cancer == cancer)
}

fn keep(indices: &[usize], pred: impl Fn(usize) -> bool) -> Vec<usize> {
    indices.iter().copied().filter(|&i| pred(i)).collect()
}

/// Distinct cancers among `indices`, in first-appearance order.
pub fn cancer_options(table: &MortalityTable, indices: &[usize]) -> Vec<String> {
    let mut seen = BTreeSet::new();
    indices
        .iter()
        .map(|&i| &table.rows[i].cancer)
        .filter(|c| seen.insert(c.as_str()))
        .cloned()
        .collect()
}

/// Requested countries with no rows among `indices`, in request order.
pub fn missing_countries(
    table: &MortalityTable,
    indices: &[usize],
    requested: &[String],
) -> Vec<String> {
    let present: BTreeSet<&str> = indices
        .iter()
        .map(|&i| table.rows[i].country.as_str())
        .collect();
    let mut reported = BTreeSet::new();
    requested
        .iter()
        .filter(|c| !present.contains(c.as_str()) && reported.insert(c.as_str()))
        .cloned()
        .collect()
}

// ---------------------------------------------------------------------------
// Full pipeline
// ---------------------------------------------------------------------------

/// Apply year → sex → countries → cancer, resolving the cancer against the
/// options left after the first three filters.
pub fn apply(table: &MortalityTable, selection: &FilterSelection) -> FilteredView {
    let all: Vec<usize> = (0..table.len()).collect();
    let subset = by_year(table, &all, selection.year);
    let subset = by_sex(table, &subset, selection.sex);
    let subset = by_countries(table, &subset, &selection.countries);

    let cancer_options = cancer_options(table, &subset);
    let cancer = selection
        .cancer
        .as_ref()
        .filter(|c| cancer_options.contains(c))
        .or_else(|| cancer_options.first())
        .cloned();

    let indices = match &cancer {
        Some(c) => by_cancer(table, &subset, c),
        None => Vec::new(),
    };

    let diagnostic = if indices.is_empty() {
        Diagnostic::NoData
    } else {
        let missing = missing_countries(table, &indices, &selection.countries);
        if missing.is_empty() {
            Diagnostic::None
        } else {
            Diagnostic::Missing(missing)
        }
    };

    log::debug!(
        "filter {} {} {:?}: {} rows",
        selection.year,
        selection.sex,
        cancer,
        indices.len()
    );

    FilteredView {
        indices,
        cancer_options,
        cancer,
        diagnostic,
    }
}
