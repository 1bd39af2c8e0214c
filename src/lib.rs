//! Short-term rental listings explorer.
//!
//! Loads a city's listings file, repairs and de-outliers prices, adds the
//! distance to a central landmark, then filters and summarises subsets.

pub mod config;
pub mod data;
pub mod error;
pub mod geo;
pub mod state;
pub mod stats;

pub use config::PipelineConfig;
pub use data::cache::DatasetLoader;
pub use data::filter::{filter_listings, Criteria};
pub use data::model::{CanonicalDataset, Listing};
pub use error::DataSourceError;
pub use geo::{haversine_km, GeoPoint, LANDMARK};
