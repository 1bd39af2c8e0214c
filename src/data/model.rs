use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use serde::Serialize;

use super::clean::CleaningReport;
use crate::geo::GeoPoint;

// ---------------------------------------------------------------------------
// RawValue – a single cell as read from the source file
// ---------------------------------------------------------------------------

/// A dynamically-typed cell mirroring what a CSV/JSON/Parquet reader yields.
#[derive(Debug, Clone, PartialEq)]
pub enum RawValue {
    String(String),
    Integer(i64),
    Float(f64),
    Bool(bool),
    Null,
}

impl fmt::Display for RawValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RawValue::String(s) => write!(f, "{s}"),
            RawValue::Integer(i) => write!(f, "{i}"),
            RawValue::Float(v) => write!(f, "{v}"),
            RawValue::Bool(b) => write!(f, "{b}"),
            RawValue::Null => write!(f, "<null>"),
        }
    }
}

impl RawValue {
    pub fn is_null(&self) -> bool {
        matches!(self, RawValue::Null)
    }

    /// Numeric cells only; strings are never coerced here.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            RawValue::Float(v) => Some(*v),
            RawValue::Integer(i) => Some(*i as f64),
            _ => None,
        }
    }

    /// Text view of a categorical cell. Numbers are rendered, nulls are `None`.
    pub fn as_text(&self) -> Option<String> {
        match self {
            RawValue::Null => None,
            RawValue::String(s) => Some(s.clone()),
            other => Some(other.to_string()),
        }
    }
}

// ---------------------------------------------------------------------------
// RawTable – transient, column-heterogeneous rows
// ---------------------------------------------------------------------------

static NULL: RawValue = RawValue::Null;

/// One source row: column_name → value.
pub type RawRecord = BTreeMap<String, RawValue>;

/// Rows as read from disk, before any cleaning.
#[derive(Debug, Clone, Default)]
pub struct RawTable {
    /// Column names in file order.
    pub columns: Vec<String>,
    pub rows: Vec<RawRecord>,
}

impl RawTable {
    pub fn has_column(&self, name: &str) -> bool {
        self.columns.iter().any(|c| c == name)
    }

    /// Cell lookup that treats an absent key as null.
    pub fn cell<'a>(row: &'a RawRecord, column: &str) -> &'a RawValue {
        row.get(column).unwrap_or(&NULL)
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

// ---------------------------------------------------------------------------
// Listing – one canonical row
// ---------------------------------------------------------------------------

/// A cleaned and enriched listing.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Listing {
    /// Zero-based row index in the source file.
    pub id: usize,
    pub name: String,
    pub neighbourhood: String,
    pub room_type: String,
    pub latitude: f64,
    pub longitude: f64,
    /// Strictly positive and below the dataset's outlier threshold.
    pub price: f64,
    /// Zero when the source had no value (or no column at all).
    pub number_of_reviews: u64,
    pub security_index: Option<f64>,
    pub distance_to_landmark_km: f64,
}

impl Listing {
    pub fn location(&self) -> GeoPoint {
        GeoPoint::new(self.latitude, self.longitude)
    }
}

// ---------------------------------------------------------------------------
// CanonicalDataset – the immutable cleaned dataset
// ---------------------------------------------------------------------------

/// The full cleaned dataset with pre-computed categorical indices.
///
/// Fields are private so a built dataset can only be read; filtering selects
/// borrowed subsets of [`CanonicalDataset::listings`].
#[derive(Debug, Clone)]
pub struct CanonicalDataset {
    listings: Vec<Listing>,
    neighbourhoods: Vec<String>,
    room_types: Vec<String>,
    has_review_counts: bool,
    has_security_index: bool,
    landmark: GeoPoint,
    report: CleaningReport,
}

impl CanonicalDataset {
    /// Build categorical indices from enriched listings.
    ///
    /// Neighbourhoods are sorted; room types keep first-appearance order.
    pub fn from_listings(
        listings: Vec<Listing>,
        has_review_counts: bool,
        has_security_index: bool,
        landmark: GeoPoint,
        report: CleaningReport,
    ) -> Self {
        let neighbourhoods: BTreeSet<&str> =
            listings.iter().map(|l| l.neighbourhood.as_str()).collect();
        let neighbourhoods = neighbourhoods.into_iter().map(str::to_string).collect();

        let mut room_types: Vec<String> = Vec::new();
        for listing in &listings {
            if !room_types.contains(&listing.room_type) {
                room_types.push(listing.room_type.clone());
            }
        }

        CanonicalDataset {
            listings,
            neighbourhoods,
            room_types,
            has_review_counts,
            has_security_index,
            landmark,
            report,
        }
    }

    /// All listings, in source row order.
    pub fn listings(&self) -> &[Listing] {
        &self.listings
    }

    /// Sorted unique neighbourhood names.
    pub fn neighbourhoods(&self) -> &[String] {
        &self.neighbourhoods
    }

    /// Unique room types in order of first appearance.
    pub fn room_types(&self) -> &[String] {
        &self.room_types
    }

    /// `false` when the source had no `number_of_reviews` column; every
    /// listing then reports zero reviews.
    pub fn has_review_counts(&self) -> bool {
        self.has_review_counts
    }

    /// `false` when the source had no `security_index` column.
    pub fn has_security_index(&self) -> bool {
        self.has_security_index
    }

    /// Outlier threshold applied during cleaning; `None` when no row had a
    /// positive price.
    pub fn price_threshold(&self) -> Option<f64> {
        self.report.price_threshold
    }

    pub fn landmark(&self) -> GeoPoint {
        self.landmark
    }

    pub fn report(&self) -> &CleaningReport {
        &self.report
    }

    pub fn len(&self) -> usize {
        self.listings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.listings.is_empty()
    }
}
