/// Data layer: core types, loading, filtering and export.
///
/// Architecture:
/// ```text
///  cancer_ICD10.csv      population.csv       (URL or local file)
///        │                     │
///        ▼                     ▼
///   ┌──────────┐          ┌──────────┐
///   │  source  │          │  source  │  fetch bytes
///   └──────────┘          └──────────┘
///        │                     │
///        ▼                     ▼
///   ┌──────────────────────────────────┐
///   │  loader  melt → join → bfill →   │
///   │          dropna → sum → rate     │
///   └──────────────────────────────────┘
///        │
///        ▼
///   ┌────────────────┐
///   │ MortalityTable │  sorted rows, category indices (memoized)
///   └────────────────┘
///        │
///        ▼
///   ┌──────────┐
///   │  filter   │  year → sex → countries → cancer → row indices
///   └──────────┘
/// ```

pub mod export;
pub mod filter;
pub mod loader;
pub mod model;
pub mod source;
