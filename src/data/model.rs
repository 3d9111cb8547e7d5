use std::cmp::Ordering;
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Sex
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Sex {
    #[serde(rename = "M")]
    Male,
    #[serde(rename = "F")]
    Female,
}

impl Sex {
    pub const ALL: [Sex; 2] = [Sex::Male, Sex::Female];

    /// Single-letter code used by the source tables.
    pub fn code(self) -> &'static str {
        match self {
            Sex::Male => "M",
            Sex::Female => "F",
        }
    }

    /// Plural noun used in chart titles.
    pub fn plural(self) -> &'static str {
        match self {
            Sex::Male => "males",
            Sex::Female => "females",
        }
    }
}

impl FromStr for Sex {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "M" => Ok(Sex::Male),
            "F" => Ok(Sex::Female),
            other => Err(format!("unknown sex code '{other}'")),
        }
    }
}

impl fmt::Display for Sex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

// ---------------------------------------------------------------------------
// AgeBand – ordered category
// ---------------------------------------------------------------------------

/// Display order of the age bands found in the source tables.
pub const AGE_ORDER: [&str; 8] = [
    "Age <5",
    "Age 5-14",
    "Age 15-24",
    "Age 25-34",
    "Age 35-44",
    "Age 45-54",
    "Age 55-64",
    "Age >64",
];

/// An age-band label. Ordered by [`AGE_ORDER`], unknown labels last
/// (alphabetically among themselves).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AgeBand(String);

impl AgeBand {
    pub fn new(label: impl Into<String>) -> Self {
        AgeBand(label.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Position in [`AGE_ORDER`], or `AGE_ORDER.len()` for unknown bands.
    pub fn rank(&self) -> usize {
        AGE_ORDER
            .iter()
            .position(|known| *known == self.0)
            .unwrap_or(AGE_ORDER.len())
    }
}

impl Ord for AgeBand {
    fn cmp(&self, other: &Self) -> Ordering {
        self.rank()
            .cmp(&other.rank())
            .then_with(|| self.0.cmp(&other.0))
    }
}

impl PartialOrd for AgeBand {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for AgeBand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// ---------------------------------------------------------------------------
// MortalityRow – one row of the base table
// ---------------------------------------------------------------------------

/// Deaths per `RATE_SCALE` population.
pub const RATE_SCALE: f64 = 100_000.0;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MortalityRow {
    #[serde(rename = "Country")]
    pub country: String,
    #[serde(rename = "Year")]
    pub year: i32,
    #[serde(rename = "Cancer")]
    pub cancer: String,
    #[serde(rename = "Age")]
    pub age: AgeBand,
    #[serde(rename = "Sex")]
    pub sex: Sex,
    #[serde(rename = "Deaths")]
    pub deaths: f64,
    #[serde(rename = "Pop")]
    pub pop: f64,
    #[serde(rename = "Rate")]
    pub rate: f64,
}

impl MortalityRow {
    /// Build an aggregated row. Returns `None` when the rate is undefined
    /// (zero or non-finite population).
    pub fn new(
        country: String,
        year: i32,
        cancer: String,
        age: AgeBand,
        sex: Sex,
        deaths: f64,
        pop: f64,
    ) -> Option<Self> {
        if pop == 0.0 || !pop.is_finite() || !deaths.is_finite() {
            return None;
        }
        Some(MortalityRow {
            country,
            year,
            cancer,
            age,
            sex,
            deaths,
            pop,
            rate: deaths / pop * RATE_SCALE,
        })
    }

    /// Sort / uniqueness key.
    pub fn key(&self) -> (&str, i32, &str, &AgeBand, Sex) {
        (&self.country, self.year, &self.cancer, &self.age, self.sex)
    }
}

// ---------------------------------------------------------------------------
// MortalityTable – the immutable base table
// ---------------------------------------------------------------------------

/// The full aggregated table with pre-computed category indices.
#[derive(Debug, Clone, Default)]
pub struct MortalityTable {
    /// Rows sorted by [`MortalityRow::key`].
    pub rows: Vec<MortalityRow>,
    /// Sorted distinct countries.
    pub countries: Vec<String>,
    /// Distinct cancers, sorted.
    pub cancers: Vec<String>,
    /// Distinct age bands in display order.
    pub ages: Vec<AgeBand>,
    /// `(min, max)` year, `None` for an empty table.
    pub year_range: Option<(i32, i32)>,
}

impl MortalityTable {
    /// Sort the rows and build the category indices.
    pub fn from_rows(mut rows: Vec<MortalityRow>) -> Self {
        rows.sort_by(|a, b| a.key().cmp(&b.key()));

        let mut countries = BTreeSet::new();
        let mut cancers = BTreeSet::new();
        let mut ages = BTreeSet::new();
        let mut year_range: Option<(i32, i32)> = None;

        for row in &rows {
            countries.insert(row.country.clone());
            cancers.insert(row.cancer.clone());
            ages.insert(row.age.clone());
            year_range = Some(match year_range {
                Some((lo, hi)) => (lo.min(row.year), hi.max(row.year)),
                None => (row.year, row.year),
            });
        }

        MortalityTable {
            rows,
            countries: countries.into_iter().collect(),
            cancers: cancers.into_iter().collect(),
            ages: ages.into_iter().collect(),
            year_range,
        }
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Position of `age` on the age axis.
    pub fn age_index(&self, age: &AgeBand) -> Option<usize> {
        self.ages.binary_search(age).ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(country: &str, year: i32, age: &str, deaths: f64, pop: f64) -> MortalityRow {
        MortalityRow::new(
            country.to_string(),
            year,
            "Leukaemia".to_string(),
            AgeBand::new(age),
            Sex::Female,
            deaths,
            pop,
        )
        .unwrap()
    }

    #[test]
    fn age_bands_follow_custom_order() {
        let mut bands: Vec<AgeBand> = ["Age >64", "Age 5-14", "Age <5", "Age 15-24", "Unknown"]
            .into_iter()
            .map(AgeBand::new)
            .collect();
        bands.sort();
        let labels: Vec<&str> = bands.iter().map(AgeBand::as_str).collect();
        assert_eq!(labels, ["Age <5", "Age 5-14", "Age 15-24", "Age >64", "Unknown"]);
    }

    #[test]
    fn zero_population_has_no_rate() {
        let r = MortalityRow::new(
            "Spain".into(),
            2012,
            "Leukaemia".into(),
            AgeBand::new("Age <5"),
            Sex::Male,
            3.0,
            0.0,
        );
        assert!(r.is_none());
    }

    #[test]
    fn rate_is_per_hundred_thousand() {
        let r = row("Spain", 2012, "Age <5", 5.0, 250_000.0);
        assert!((r.rate - 2.0).abs() < 1e-12);
    }

    #[test]
    fn table_indices() {
        let table = MortalityTable::from_rows(vec![
            row("Turkey", 2014, "Age >64", 1.0, 10.0),
            row("Austria", 2001, "Age <5", 1.0, 10.0),
            row("Austria", 2001, "Age 35-44", 1.0, 10.0),
        ]);
        assert_eq!(table.countries, ["Austria", "Turkey"]);
        assert_eq!(table.year_range, Some((2001, 2014)));
        assert_eq!(table.rows[0].age.as_str(), "Age <5");
        assert_eq!(table.age_index(&AgeBand::new("Age >64")), Some(2));
        assert_eq!(table.age_index(&AgeBand::new("Age 5-14")), None);
    }

    #[test]
    fn sex_codes_parse() {
        assert_eq!("M".parse::<Sex>(), Ok(Sex::Male));
        assert_eq!(" F ".parse::<Sex>(), Ok(Sex::Female));
        assert!("X".parse::<Sex>().is_err());
    }
}
