use std::path::Path;

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};

use crate::geo::{GeoPoint, LANDMARK};

/// Share of cleaned prices kept below the outlier cut.
pub const DEFAULT_OUTLIER_QUANTILE: f64 = 0.99;
pub const DEFAULT_NIGHTS: u32 = 3;
pub const DEFAULT_TOP_N: usize = 10;
/// Neighbourhoods pre-selected when a dataset is first opened.
pub const DEFAULT_LOCATION_COUNT: usize = 2;
/// Nightly price range pre-selected when a dataset is first opened, clamped
/// to the dataset's whole-peso bounds.
pub const DEFAULT_PRICE_RANGE: (f64, f64) = (500.0, 5000.0);

/// Tunables for loading and summarising a listings file.
///
/// ```json
/// { "landmark": { "latitude": 19.427, "longitude": -99.1677 },
///   "outlier_quantile": 0.99, "default_nights": 3, "top_n": 10 }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub landmark: GeoPoint,
    pub outlier_quantile: f64,
    pub default_nights: u32,
    pub top_n: usize,
    pub default_location_count: usize,
    pub default_price_range: (f64, f64),
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            landmark: LANDMARK,
            outlier_quantile: DEFAULT_OUTLIER_QUANTILE,
            default_nights: DEFAULT_NIGHTS,
            top_n: DEFAULT_TOP_N,
            default_location_count: DEFAULT_LOCATION_COUNT,
            default_price_range: DEFAULT_PRICE_RANGE,
        }
    }
}

impl PipelineConfig {
    /// Read and validate a JSON config file. Missing keys take defaults.
    pub fn from_json_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("reading config {}", path.display()))?;
        let config: PipelineConfig = serde_json::from_str(&text)
            .with_context(|| format!("parsing config {}", path.display()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if !(self.outlier_quantile > 0.0 && self.outlier_quantile <= 1.0) {
            bail!(
                "outlier_quantile must be in (0, 1], got {}",
                self.outlier_quantile
            );
        }
        if !self.landmark.is_valid() {
            bail!(
                "landmark ({}, {}) is not a valid coordinate",
                self.landmark.latitude,
                self.landmark.longitude
            );
        }
        if self.default_nights == 0 {
            bail!("default_nights must be at least 1");
        }
        let (lo, hi) = self.default_price_range;
        if !(lo <= hi) {
            bail!("default_price_range ({lo}, {hi}) is empty");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_json_uses_defaults() {
        let config: PipelineConfig = serde_json::from_str(r#"{ "top_n": 5 }"#).unwrap();
        assert_eq!(config.top_n, 5);
        assert_eq!(config.landmark, LANDMARK);
        assert_eq!(config.outlier_quantile, DEFAULT_OUTLIER_QUANTILE);
        assert_eq!(config.default_price_range, DEFAULT_PRICE_RANGE);
        assert!(config.validate().is_ok());

        let config: PipelineConfig =
            serde_json::from_str(r#"{ "default_price_range": [300, 1200] }"#).unwrap();
        assert_eq!(config.default_price_range, (300.0, 1200.0));
    }

    #[test]
    fn rejects_bad_values() {
        let mut config = PipelineConfig {
            outlier_quantile: 1.5,
            ..Default::default()
        };
        assert!(config.validate().is_err());

        config.outlier_quantile = 0.95;
        config.landmark = GeoPoint::new(120.0, 0.0);
        assert!(config.validate().is_err());

        config.landmark = LANDMARK;
        config.default_nights = 0;
        assert!(config.validate().is_err());

        config.default_nights = 2;
        config.default_price_range = (900.0, 100.0);
        assert!(config.validate().is_err());
    }

    #[test]
    fn reads_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, r#"{ "outlier_quantile": 0.95 }"#).unwrap();
        let config = PipelineConfig::from_json_file(&path).unwrap();
        assert_eq!(config.outlier_quantile, 0.95);

        std::fs::write(&path, "{ not json").unwrap();
        assert!(PipelineConfig::from_json_file(&path).is_err());
    }
}
