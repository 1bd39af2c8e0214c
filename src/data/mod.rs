/// Data layer: loading, cleaning, enrichment and filtering.
///
/// Architecture:
/// ```text
///  .csv / .json / .parquet
///        │
///        ▼
///   ┌──────────┐
///   │  loader  │  parse file → RawTable, check required columns
///   └──────────┘
///        │
///        ▼
///   ┌──────────┐
///   │  clean   │  repair prices, drop invalid + top-1% rows
///   └──────────┘
///        │
///        ▼
///   ┌──────────┐
///   │  enrich  │  distance to landmark
///   └──────────┘
///        │
///        ▼
///   ┌──────────────────┐
///   │ CanonicalDataset │  immutable, memoized per file by `cache`
///   └──────────────────┘
///        │
///        ▼
///   ┌──────────┐
///   │  filter  │  apply Criteria → borrowed subset
///   └──────────┘
/// ```

pub mod cache;
pub mod clean;
pub mod enrich;
pub mod filter;
pub mod loader;
pub mod model;

#[cfg(test)]
pub(crate) mod testutil;
