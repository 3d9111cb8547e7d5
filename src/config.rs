use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::data::model::Sex;

// ---------------------------------------------------------------------------
// Dashboard configuration
// ---------------------------------------------------------------------------

/// Environment variable naming a JSON config file.
pub const CONFIG_ENV: &str = "MORTALITY_EXPLORER_CONFIG";

/// Config file picked up from the working directory when present.
pub const DEFAULT_CONFIG_FILE: &str = "mortality-explorer.json";

pub const DEFAULT_CANCER_SOURCE: &str =
    "https://raw.githubusercontent.com/hms-dbmi/bmi706-2022/main/cancer_data/cancer_ICD10.csv";
pub const DEFAULT_POPULATION_SOURCE: &str =
    "https://raw.githubusercontent.com/hms-dbmi/bmi706-2022/main/cancer_data/population.csv";

pub const DEFAULT_COUNTRIES: [&str; 7] = [
    "Austria", "Germany", "Iceland", "Spain", "Sweden", "Thailand", "Turkey",
];

/// Main chart variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChartKind {
    Heatmap,
    Bars,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DashboardConfig {
    /// URL or path of the wide cancer-deaths table.
    pub cancer_source: String,
    /// URL or path of the wide population table.
    pub population_source: String,
    pub default_year: i32,
    pub default_sex: Sex,
    pub default_countries: Vec<String>,
    pub chart_kind: ChartKind,
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            cancer_source: DEFAULT_CANCER_SOURCE.to_string(),
            population_source: DEFAULT_POPULATION_SOURCE.to_string(),
            default_year: 2012,
            default_sex: Sex::Male,
            default_countries: DEFAULT_COUNTRIES.iter().map(|c| c.to_string()).collect(),
            chart_kind: ChartKind::Heatmap,
        }
    }
}

impl DashboardConfig {
    /// Resolve the config: `$MORTALITY_EXPLORER_CONFIG`, then
    /// `./mortality-explorer.json`, then built-in defaults.
    pub fn load() -> Result<Self> {
        let path = match std::env::var_os(CONFIG_ENV) {
            Some(p) => Some(PathBuf::from(p)),
            None => {
                let local = PathBuf::from(DEFAULT_CONFIG_FILE);
                local.exists().then_some(local)
            }
        };

        match path {
            Some(path) => Self::from_file(&path),
            None => {
                log::debug!("no config file, using defaults");
                Ok(Self::default())
            }
        }
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("reading config {}", path.display()))?;
        let config: DashboardConfig = serde_json::from_str(&text)
            .with_context(|| format!("parsing config {}", path.display()))?;
        log::info!("loaded config from {}", path.display());
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn partial_file_keeps_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{ "cancer_source": "data/cancer.csv", "default_sex": "F", "chart_kind": "bars" }}"#
        )
        .unwrap();

        let config = DashboardConfig::from_file(file.path()).unwrap();
        assert_eq!(config.cancer_source, "data/cancer.csv");
        assert_eq!(config.default_sex, Sex::Female);
        assert_eq!(config.chart_kind, ChartKind::Bars);
        assert_eq!(config.population_source, DEFAULT_POPULATION_SOURCE);
        assert_eq!(config.default_year, 2012);
        assert_eq!(config.default_countries.len(), 7);
    }

    #[test]
    fn invalid_file_is_an_error() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "{{ not json").unwrap();
        assert!(DashboardConfig::from_file(file.path()).is_err());
    }
}
