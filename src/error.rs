use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Failure to locate, read or interpret a listings source file.
///
/// This is the only terminal failure of a dataset load; malformed individual
/// cells are coerced to missing values during cleaning instead.
#[derive(Debug, Error)]
pub enum DataSourceError {
    #[error("listings file not found: {}", path.display())]
    NotFound { path: PathBuf },
    #[error("failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("malformed CSV: {0}")]
    Csv(#[from] csv::Error),
    #[error("malformed JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("malformed parquet: {0}")]
    Parquet(#[from] parquet::errors::ParquetError),
    #[error("arrow error: {0}")]
    Arrow(#[from] arrow::error::ArrowError),
    #[error("malformed table: {0}")]
    Malformed(String),
    #[error("required column '{0}' is missing")]
    MissingColumn(&'static str),
    #[error("unsupported file extension: .{0}")]
    UnsupportedFormat(String),
}
