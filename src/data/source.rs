use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use thiserror::Error;

// ---------------------------------------------------------------------------
// Data sources: remote URL or local file
// ---------------------------------------------------------------------------

const FETCH_TIMEOUT: Duration = Duration::from_secs(60);

#[derive(Debug, Error)]
pub enum SourceError {
    #[error("GET {url} returned HTTP {status}")]
    Http { url: String, status: u16 },
}

/// Where a CSV table comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DataSource {
    Url(String),
    File(PathBuf),
}

impl DataSource {
    /// `http://` / `https://` strings are URLs, everything else a path.
    pub fn parse(s: &str) -> Self {
        let s = s.trim();
        if s.starts_with("http://") || s.starts_with("https://") {
            DataSource::Url(s.to_string())
        } else {
            DataSource::File(PathBuf::from(s))
        }
    }

    /// Read the whole source into memory.
    pub fn fetch(&self) -> Result<Vec<u8>> {
        match self {
            DataSource::Url(url) => fetch_url(url),
            DataSource::File(path) => read_file(path),
        }
    }
}

impl std::fmt::Display for DataSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DataSource::Url(url) => f.write_str(url),
            DataSource::File(path) => write!(f, "{}", path.display()),
        }
    }
}

fn fetch_url(url: &str) -> Result<Vec<u8>> {
    log::info!("fetching {url}");
    let client = reqwest::blocking::Client::builder()
        .timeout(FETCH_TIMEOUT)
        .build()
        .context("building HTTP client")?;

    let response = client
        .get(url)
        .send()
        .with_context(|| format!("requesting {url}"))?;

    let status = response.status();
    if !status.is_success() {
        return Err(SourceError::Http {
            url: url.to_string(),
            status: status.as_u16(),
        }
        .into());
    }

    let bytes = response
        .bytes()
        .with_context(|| format!("reading body of {url}"))?;
    log::info!("fetched {} bytes from {url}", bytes.len());
    Ok(bytes.to_vec())
}

fn read_file(path: &Path) -> Result<Vec<u8>> {
    log::info!("reading {}", path.display());
    std::fs::read(path).with_context(|| format!("reading {}", path.display()))
}
