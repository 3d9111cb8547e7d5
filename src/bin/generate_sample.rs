//! Writes a deterministic `cancer_ICD10.csv` / `population.csv` pair in the
//! same wide layout as the published tables, for working offline.

use anyhow::{Context, Result};

const AGES: [&str; 8] = [
    "Age <5",
    "Age 5-14",
    "Age 15-24",
    "Age 25-34",
    "Age 35-44",
    "Age 45-54",
    "Age 55-64",
    "Age >64",
];

/// (country, population scale in millions)
const COUNTRIES: [(&str, f64); 9] = [
    ("Austria", 8.5),
    ("Brazil", 200.0),
    ("Germany", 81.0),
    ("Iceland", 0.33),
    ("Japan", 127.0),
    ("Spain", 46.0),
    ("Sweden", 9.6),
    ("Thailand", 67.0),
    ("Turkey", 77.0),
];

/// (cancer, base rate per 100k at the oldest band)
const CANCERS: [(&str, f64); 3] = [
    ("Malignant neoplasm of stomach", 60.0),
    ("Malignant neoplasm of trachea, bronchus and lung", 250.0),
    ("Leukaemia", 25.0),
];

const FIRST_YEAR: i32 = 2000;
const LAST_YEAR: i32 = 2016;

/// Share of the population in each age band.
const AGE_SHARE: [f64; 8] = [0.05, 0.10, 0.12, 0.13, 0.14, 0.15, 0.13, 0.18];

/// Minimal deterministic PRNG (xoshiro256**)
struct SimpleRng {
    state: [u64; 4],
}

impl SimpleRng {
    fn new(seed: u64) -> Self {
        let mut s = [0u64; 4];
        let mut x = seed;
        for slot in &mut s {
            x = x.wrapping_mul(6364136223846793005).wrapping_add(1);
            *slot = x;
        }
        SimpleRng { state: s }
    }

    fn next_u64(&mut self) -> u64 {
        let result = (self.state[1].wrapping_mul(5))
            .rotate_left(7)
            .wrapping_mul(9);
        let t = self.state[1] << 17;
        self.state[2] ^= self.state[0];
        self.state[3] ^= self.state[1];
        self.state[1] ^= self.state[2];
        self.state[0] ^= self.state[3];
        self.state[2] ^= t;
        self.state[3] = self.state[3].rotate_left(45);
        result
    }

    fn next_f64(&mut self) -> f64 {
        (self.next_u64() >> 11) as f64 / (1u64 << 53) as f64
    }

    /// Multiplicative noise in `[1 - spread, 1 + spread)`.
    fn jitter(&mut self, spread: f64) -> f64 {
        1.0 + spread * (2.0 * self.next_f64() - 1.0)
    }
}

/// Population cell left empty: exercises backward-fill (Iceland 2012 has a
/// later year to fill from) and row dropping (Turkey 2016 has none).
fn population_gap(country: &str, year: i32) -> bool {
    matches!((country, year), ("Iceland", 2012) | ("Turkey", 2016))
}

/// Thailand reports no stomach cancer.
fn cancer_reported(country: &str, cancer: &str) -> bool {
    !(country == "Thailand" && cancer.contains("stomach"))
}

fn band_population(scale: f64, year: i32, band: usize, female: bool) -> f64 {
    let growth = 1.0 + 0.004 * (year - FIRST_YEAR) as f64;
    let sex_share = if female { 0.51 } else { 0.49 };
    (scale * 1e6 * AGE_SHARE[band] * sex_share * growth).round()
}

/// Age-specific rate rising steeply with age.
fn band_rate(base: f64, band: usize, female: bool) -> f64 {
    let age_factor = 10f64.powf(band as f64 - (AGES.len() - 1) as f64).max(1e-4);
    let sex_factor = if female { 0.7 } else { 1.0 };
    base * age_factor.powf(0.45) * sex_factor
}

fn main() -> Result<()> {
    let mut rng = SimpleRng::new(42);

    let mut pop_writer =
        csv::Writer::from_path("population.csv").context("creating population.csv")?;
    let mut cancer_writer =
        csv::Writer::from_path("cancer_ICD10.csv").context("creating cancer_ICD10.csv")?;

    let mut header: Vec<&str> = vec!["Country", "Year", "Sex"];
    header.extend(AGES);
    pop_writer.write_record(&header)?;

    let mut header: Vec<&str> = vec!["Country", "Year", "Cancer", "Sex"];
    header.extend(AGES);
    cancer_writer.write_record(&header)?;

    let mut n_pop = 0;
    let mut n_cancer = 0;

    for &(country, scale) in &COUNTRIES {
        for year in FIRST_YEAR..=LAST_YEAR {
            for (sex, female) in [("M", false), ("F", true)] {
                let pops: Vec<f64> = (0..AGES.len())
                    .map(|band| band_population(scale, year, band, female) * rng.jitter(0.01))
                    .map(f64::round)
                    .collect();

                let mut record = vec![country.to_string(), year.to_string(), sex.to_string()];
                if population_gap(country, year) {
                    record.extend(AGES.iter().map(|_| String::new()));
                } else {
                    record.extend(pops.iter().map(|p| format!("{p:.0}")));
                }
                pop_writer.write_record(&record)?;
                n_pop += 1;

                for &(cancer, base) in &CANCERS {
                    if !cancer_reported(country, cancer) {
                        continue;
                    }
                    let mut record = vec![
                        country.to_string(),
                        year.to_string(),
                        cancer.to_string(),
                        sex.to_string(),
                    ];
                    record.extend(pops.iter().enumerate().map(|(band, &pop)| {
                        let rate = band_rate(base, band, female) * rng.jitter(0.2);
                        format!("{:.0}", (pop * rate / 100_000.0).round())
                    }));
                    cancer_writer.write_record(&record)?;
                    n_cancer += 1;
                }
            }
        }
    }

    pop_writer.flush()?;
    cancer_writer.flush()?;

    println!("Wrote {n_cancer} cancer rows to cancer_ICD10.csv");
    println!("Wrote {n_pop} population rows to population.csv");
    Ok(())
}
