use std::collections::{BTreeMap, HashMap};
use std::io::Read;
use std::sync::Arc;

use anyhow::{Context, Result};
use once_cell::sync::OnceCell;
use thiserror::Error;

use super::model::{AgeBand, MortalityRow, MortalityTable, Sex};
use super::source::DataSource;
use crate::config::DashboardConfig;

// ---------------------------------------------------------------------------
// Public entry-points
// ---------------------------------------------------------------------------

const CANCER_ID_COLUMNS: [&str; 4] = ["Country", "Year", "Cancer", "Sex"];
const POPULATION_ID_COLUMNS: [&str; 3] = ["Country", "Year", "Sex"];

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("{table} table is missing the '{column}' column")]
    MissingColumn {
        table: &'static str,
        column: &'static str,
    },
    #[error("{table} table has no age-band columns")]
    NoAgeColumns { table: &'static str },
}

static BASE_TABLE: OnceCell<Arc<MortalityTable>> = OnceCell::new();

/// Build the base table from the configured sources on first call and hand
/// out the same table afterwards.
pub fn load_cached(config: &DashboardConfig) -> Result<Arc<MortalityTable>> {
    BASE_TABLE
        .get_or_try_init(|| {
            let cancer = DataSource::parse(&config.cancer_source);
            let population = DataSource::parse(&config.population_source);
            load_sources(&cancer, &population).map(Arc::new)
        })
        .cloned()
}

/// Fetch both sources and run the full pipeline.
pub fn load_sources(cancer: &DataSource, population: &DataSource) -> Result<MortalityTable> {
    let cancer_csv = cancer
        .fetch()
        .with_context(|| format!("loading cancer data from {cancer}"))?;
    let population_csv = population
        .fetch()
        .with_context(|| format!("loading population data from {population}"))?;
    build_table(cancer_csv.as_slice(), population_csv.as_slice())
}

/// Melt, join, backward-fill, drop incomplete rows, aggregate and compute
/// the rate column.
pub fn build_table<C: Read, P: Read>(cancer_csv: C, population_csv: P) -> Result<MortalityTable> {
    let mut report = LoadReport::default();

    let cancer = melt_cancer(cancer_csv, &mut report)?;
    let population = melt_population(population_csv, &mut report)?;

    let mut joined = left_join(cancer, &population, &mut report);
    backward_fill(&mut joined, &mut report);
    let complete = drop_incomplete(joined, &mut report);
    let rows = aggregate(complete, &mut report);

    log::debug!(
        "melted {} cancer / {} population rows; dropped {} malformed, {} incomplete, \
         {} zero-population; {} unmatched, {} back-filled",
        report.cancer_rows,
        report.population_rows,
        report.malformed,
        report.incomplete,
        report.zero_population,
        report.unmatched,
        report.filled
    );
    let table = MortalityTable::from_rows(rows);
    log::info!(
        "built mortality table: {} rows, {} countries, {} cancers",
        table.len(),
        table.countries.len(),
        table.cancers.len()
    );
    Ok(table)
}

/// Row counts at each pipeline stage.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct LoadReport {
    pub cancer_rows: usize,
    pub population_rows: usize,
    pub malformed: usize,
    pub unmatched: usize,
    pub filled: usize,
    pub incomplete: usize,
    pub zero_population: usize,
}

// ---------------------------------------------------------------------------
// Melt: wide age columns → long (Age, value) rows
// ---------------------------------------------------------------------------

/// One melted cell: the raw id values plus one age band.
#[derive(Debug, Clone)]
struct MeltedRow {
    ids: Vec<String>,
    age: AgeBand,
    value: Option<f64>,
}

fn melt<R: Read>(
    table: &'static str,
    reader: R,
    id_columns: &[&'static str],
) -> Result<Vec<MeltedRow>> {
    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .flexible(true)
        .from_reader(reader);
    let headers: Vec<String> = reader
        .headers()
        .with_context(|| format!("reading {table} CSV headers"))?
        .iter()
        .map(|h| h.to_string())
        .collect();

    let mut id_idx = Vec::with_capacity(id_columns.len());
    for &column in id_columns {
        let idx = headers
            .iter()
            .position(|h| h == column)
            .ok_or(LoadError::MissingColumn { table, column })?;
        id_idx.push(idx);
    }

    let age_cols: Vec<(usize, AgeBand)> = headers
        .iter()
        .enumerate()
        .filter(|(i, _)| !id_idx.contains(i))
        .map(|(i, h)| (i, AgeBand::new(h.as_str())))
        .collect();
    if age_cols.is_empty() {
        return Err(LoadError::NoAgeColumns { table }.into());
    }

    let mut melted = Vec::new();
    for (row_no, result) in reader.records().enumerate() {
        let record = result.with_context(|| format!("{table} CSV row {row_no}"))?;
        let ids: Vec<String> = id_idx
            .iter()
            .map(|&i| record.get(i).unwrap_or("").to_string())
            .collect();

        for (col_idx, age) in &age_cols {
            melted.push(MeltedRow {
                ids: ids.clone(),
                age: age.clone(),
                value: parse_number(record.get(*col_idx).unwrap_or("")),
            });
        }
    }
    Ok(melted)
}

fn parse_number(s: &str) -> Option<f64> {
    s.parse::<f64>().ok().filter(|v| v.is_finite())
}

fn parse_year(s: &str) -> Option<i32> {
    if let Ok(y) = s.parse::<i32>() {
        return Some(y);
    }
    // Float-typed exports write years as "2012.0".
    let f = s.parse::<f64>().ok()?;
    (f.fract() == 0.0 && f.abs() < i32::MAX as f64).then_some(f as i32)
}

#[derive(Debug, Clone)]
struct CancerRow {
    country: String,
    year: i32,
    cancer: String,
    sex: Sex,
    age: AgeBand,
    deaths: Option<f64>,
}

#[derive(Debug, Clone)]
struct PopulationRow {
    country: String,
    year: i32,
    sex: Sex,
    age: AgeBand,
    pop: Option<f64>,
}

fn melt_cancer<R: Read>(reader: R, report: &mut LoadReport) -> Result<Vec<CancerRow>> {
    let melted = melt("cancer", reader, &CANCER_ID_COLUMNS)?;
    let mut rows = Vec::with_capacity(melted.len());
    for m in melted {
        let [country, year, cancer, sex] = <[String; 4]>::try_from(m.ids)
            .map_err(|_| anyhow::anyhow!("melted cancer row has the wrong id arity"))?;
        let (Some(year), Ok(sex)) = (parse_year(&year), sex.parse::<Sex>()) else {
            report.malformed += 1;
            continue;
        };
        if country.is_empty() || cancer.is_empty() {
            report.malformed += 1;
            continue;
        }
        rows.push(CancerRow {
            country,
            year,
            cancer,
            sex,
            age: m.age,
            deaths: m.value,
        });
    }
    report.cancer_rows = rows.len();
    Ok(rows)
}

fn melt_population<R: Read>(reader: R, report: &mut LoadReport) -> Result<Vec<PopulationRow>> {
    let melted = melt("population", reader, &POPULATION_ID_COLUMNS)?;
    let mut rows = Vec::with_capacity(melted.len());
    for m in melted {
        let [country, year, sex] = <[String; 3]>::try_from(m.ids)
            .map_err(|_| anyhow::anyhow!("melted population row has the wrong id arity"))?;
        let (Some(year), Ok(sex)) = (parse_year(&year), sex.parse::<Sex>()) else {
            report.malformed += 1;
            continue;
        };
        if country.is_empty() {
            report.malformed += 1;
            continue;
        }
        rows.push(PopulationRow {
            country,
            year,
            sex,
            age: m.age,
            pop: m.value,
        });
    }
    report.population_rows = rows.len();
    Ok(rows)
}

// ---------------------------------------------------------------------------
// Join / fill / drop / aggregate
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
struct JoinedRow {
    country: String,
    year: i32,
    cancer: String,
    sex: Sex,
    age: AgeBand,
    deaths: Option<f64>,
    pop: Option<f64>,
}

type JoinKey = (String, i32, Sex, AgeBand);

/// Left join on (Country, Year, Sex, Age). Each cancer row is emitted once
/// per matching population row, or once with a missing `pop`.
fn left_join(
    cancer: Vec<CancerRow>,
    population: &[PopulationRow],
    report: &mut LoadReport,
) -> Vec<JoinedRow> {
    let mut lookup: HashMap<JoinKey, Vec<Option<f64>>> = HashMap::new();
    for p in population {
        lookup
            .entry((p.country.clone(), p.year, p.sex, p.age.clone()))
            .or_default()
            .push(p.pop);
    }

    let mut joined = Vec::with_capacity(cancer.len());
    for c in cancer {
        let key = (c.country.clone(), c.year, c.sex, c.age.clone());
        let matches: &[Option<f64>] = match lookup.get(&key) {
            Some(pops) => pops.as_slice(),
            None => {
                report.unmatched += 1;
                &[None]
            }
        };
        for &pop in matches {
            joined.push(JoinedRow {
                country: c.country.clone(),
                year: c.year,
                cancer: c.cancer.clone(),
                sex: c.sex,
                age: c.age.clone(),
                deaths: c.deaths,
                pop,
            });
        }
    }
    joined
}

/// Within each (Country, Sex, Age) group, ordered by year, replace every
/// missing `pop` with the next later valid value.
fn backward_fill(rows: &mut [JoinedRow], report: &mut LoadReport) {
    let mut groups: HashMap<(&str, Sex, &AgeBand), Vec<usize>> = HashMap::new();
    for (i, r) in rows.iter().enumerate() {
        groups
            .entry((r.country.as_str(), r.sex, &r.age))
            .or_default()
            .push(i);
    }

    // Stable sort keeps the original order within a year.
    let mut orders: Vec<Vec<usize>> = groups.into_values().collect();
    for order in &mut orders {
        order.sort_by_key(|&i| rows[i].year);
    }

    for order in orders {
        let mut next_valid: Option<f64> = None;
        for &i in order.iter().rev() {
            match rows[i].pop {
                Some(p) => next_valid = Some(p),
                None => {
                    if next_valid.is_some() {
                        rows[i].pop = next_valid;
                        report.filled += 1;
                    }
                }
            }
        }
    }
}

#[derive(Debug, Clone)]
struct CompleteRow {
    country: String,
    year: i32,
    cancer: String,
    sex: Sex,
    age: AgeBand,
    deaths: f64,
    pop: f64,
}

fn drop_incomplete(rows: Vec<JoinedRow>, report: &mut LoadReport) -> Vec<CompleteRow> {
    let before = rows.len();
    let complete: Vec<CompleteRow> = rows
        .into_iter()
        .filter_map(|r| {
            Some(CompleteRow {
                deaths: r.deaths?,
                pop: r.pop?,
                country: r.country,
                year: r.year,
                cancer: r.cancer,
                sex: r.sex,
                age: r.age,
            })
        })
        .collect();
    report.incomplete = before - complete.len();
    complete
}

/// Sum deaths and population per (Country, Year, Cancer, Age, Sex) and
/// derive the rate. Groups with zero population are dropped.
fn aggregate(rows: Vec<CompleteRow>, report: &mut LoadReport) -> Vec<MortalityRow> {
    let mut sums: BTreeMap<(String, i32, String, AgeBand, Sex), (f64, f64)> = BTreeMap::new();
    for r in rows {
        let entry = sums
            .entry((r.country, r.year, r.cancer, r.age, r.sex))
            .or_insert((0.0, 0.0));
        entry.0 += r.deaths;
        entry.1 += r.pop;
    }

    let mut out = Vec::with_capacity(sums.len());
    for ((country, year, cancer, age, sex), (deaths, pop)) in sums {
        match MortalityRow::new(country, year, cancer, age, sex, deaths, pop) {
            Some(row) => out.push(row),
            None => report.zero_population += 1,
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    const CANCER: &str = "\
Country,Year,Cancer,Sex,Age <5,Age 5-14
Spain,2010,Leukaemia,M,2,4
Spain,2011,Leukaemia,M,3,
Spain,2012,Leukaemia,M,5,6
Spain,2012,Leukaemia,M,1,1
Spain,2012,Leukaemia,X,9,9
Iceland,2012,Leukaemia,F,0,1
";

    const POPULATION: &str = "\
Country,Year,Sex,Age <5,Age 5-14
Spain,2010,M,,
Spain,2011,M,,20000
Spain,2012,M,100000,50000
Iceland,2012,F,0,
";

    fn row<'a>(table: &'a MortalityTable, country: &str, year: i32, age: &str) -> &'a MortalityRow {
        table
            .rows
            .iter()
            .find(|r| r.country == country && r.year == year && r.age.as_str() == age)
            .unwrap()
    }

    #[test]
    fn backward_fill_takes_next_year() {
        let table = build_table(CANCER.as_bytes(), POPULATION.as_bytes()).unwrap();
        // 2010 "Age <5" has no population; 2011 neither; 2012 has 100000.
        let r = row(&table, "Spain", 2010, "Age <5");
        assert_eq!(r.pop, 100_000.0);
        // 2010 "Age 5-14" picks 2011's value, not 2012's.
        let r = row(&table, "Spain", 2010, "Age 5-14");
        assert_eq!(r.pop, 20_000.0);
    }

    #[test]
    fn duplicate_keys_are_summed() {
        let table = build_table(CANCER.as_bytes(), POPULATION.as_bytes()).unwrap();
        let r = row(&table, "Spain", 2012, "Age <5");
        assert_eq!(r.deaths, 6.0);
        assert_eq!(r.pop, 200_000.0);
        assert!((r.rate - 3.0).abs() < 1e-9);
    }

    #[test]
    fn incomplete_and_zero_rows_are_dropped() {
        let table = build_table(CANCER.as_bytes(), POPULATION.as_bytes()).unwrap();
        // Missing deaths.
        assert!(!table
            .rows
            .iter()
            .any(|r| r.year == 2011 && r.age.as_str() == "Age 5-14"));
        // Iceland: zero population for <5, no population at all for 5-14.
        assert!(!table.rows.iter().any(|r| r.country == "Iceland"));
        // Malformed sex code.
        assert!(table.rows.iter().all(|r| r.deaths != 9.0));
    }

    #[test]
    fn rates_and_keys_hold_for_every_row() {
        let table = build_table(CANCER.as_bytes(), POPULATION.as_bytes()).unwrap();
        assert!(!table.is_empty());
        let mut keys = HashSet::new();
        for r in &table.rows {
            let expected = r.deaths / r.pop * 100_000.0;
            assert!((r.rate - expected).abs() <= 1e-9 * r.rate.abs().max(1.0));
            let key = (r.country.clone(), r.year, r.cancer.clone(), r.age.clone(), r.sex);
            assert!(keys.insert(key));
        }
    }

    #[test]
    fn fill_never_crosses_groups() {
        let cancer = "\
Country,Year,Cancer,Sex,Age <5
Austria,2000,Leukaemia,M,1
Sweden,2000,Leukaemia,M,1
Sweden,2001,Leukaemia,M,1
";
        let population = "\
Country,Year,Sex,Age <5
Austria,2000,M,
Sweden,2000,M,
Sweden,2001,M,5000
";
        let table = build_table(cancer.as_bytes(), population.as_bytes()).unwrap();
        let countries: Vec<&str> = table.rows.iter().map(|r| r.country.as_str()).collect();
        assert_eq!(countries, ["Sweden", "Sweden"]);
    }

    #[test]
    fn missing_id_column_is_a_load_error() {
        let err = build_table("Country,Year,Sex,Age <5\n".as_bytes(), POPULATION.as_bytes())
            .unwrap_err();
        match err.downcast_ref::<LoadError>() {
            Some(LoadError::MissingColumn { table, column }) => {
                assert_eq!(*table, "cancer");
                assert_eq!(*column, "Cancer");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn float_years_are_accepted() {
        assert_eq!(parse_year("2012"), Some(2012));
        assert_eq!(parse_year("2012.0"), Some(2012));
        assert_eq!(parse_year("2012.5"), None);
        assert_eq!(parse_year(""), None);
    }

    #[test]
    fn cached_table_is_built_once() {
        let dir = tempfile::tempdir().unwrap();
        let cancer = dir.path().join("cancer_ICD10.csv");
        let population = dir.path().join("population.csv");
        std::fs::write(&cancer, "Country,Year,Cancer,Sex,Age <5\nSpain,2012,Leukaemia,M,3\n")
            .unwrap();
        std::fs::write(&population, "Country,Year,Sex,Age <5\nSpain,2012,M,100000\n").unwrap();

        let config = DashboardConfig {
            cancer_source: cancer.display().to_string(),
            population_source: population.display().to_string(),
            ..DashboardConfig::default()
        };
        let first = load_cached(&config).unwrap();
        assert_eq!(first.len(), 1);

        // Later calls ignore their sources.
        let other = DashboardConfig {
            cancer_source: "/definitely/not/here.csv".into(),
            ..DashboardConfig::default()
        };
        let second = load_cached(&other).unwrap();
        assert!(Arc::ptr_eq(&first, &second));
    }

    #[test]
    fn report_counts_stages() {
        let mut report = LoadReport::default();
        let cancer = melt_cancer(CANCER.as_bytes(), &mut report).unwrap();
        let population = melt_population(POPULATION.as_bytes(), &mut report).unwrap();
        let mut joined = left_join(cancer, &population, &mut report);
        backward_fill(&mut joined, &mut report);

        assert_eq!(report.malformed, 2);
        assert_eq!(report.cancer_rows, 10);
        assert_eq!(report.population_rows, 8);
        assert_eq!(report.unmatched, 0);
        // Spain <5 in 2010 and 2011, Spain 5-14 in 2010.
        assert_eq!(report.filled, 3);
    }
}
