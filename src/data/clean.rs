//! Record cleaning: price repair, outlier removal and row validation.
//!
//! Each step is a standalone function so the pipeline in [`clean`] reads as
//! the ordered list of transformations it applies:
//!
//! 1. [`normalize_prices`] – detect the price column format, parse or null
//! 2. [`drop_non_positive`] – remove null and `<= 0` prices
//! 3. [`outlier_threshold`] + [`drop_outliers`] – cut the top-quantile prices
//! 4. [`review_count`] – missing review counts become zero
//! 5. [`validate_row`] – reject rows without usable coordinates/categories

use log::{debug, info};
use serde::Serialize;

use super::model::{RawRecord, RawTable, RawValue};
use crate::geo::GeoPoint;
use crate::stats::quantile;

pub const COL_NAME: &str = "name";
pub const COL_NEIGHBOURHOOD: &str = "neighbourhood";
pub const COL_ROOM_TYPE: &str = "room_type";
pub const COL_LATITUDE: &str = "latitude";
pub const COL_LONGITUDE: &str = "longitude";
pub const COL_PRICE: &str = "price";
pub const COL_REVIEWS: &str = "number_of_reviews";
pub const COL_SECURITY: &str = "security_index";

/// Columns a listings file must provide.
pub const REQUIRED_COLUMNS: [&str; 6] = [
    COL_NAME,
    COL_NEIGHBOURHOOD,
    COL_ROOM_TYPE,
    COL_LATITUDE,
    COL_LONGITUDE,
    COL_PRICE,
];

// ---------------------------------------------------------------------------
// Step 1: price normalisation
// ---------------------------------------------------------------------------

/// How the price column is encoded in the source.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PriceFormat {
    /// Every non-null cell is a number.
    #[default]
    Numeric,
    /// At least one cell is text, e.g. `"$1,200"`.
    Textual,
}

impl PriceFormat {
    pub fn detect<'a>(values: impl IntoIterator<Item = &'a RawValue>) -> Self {
        if values
            .into_iter()
            .any(|v| matches!(v, RawValue::String(_) | RawValue::Bool(_)))
        {
            PriceFormat::Textual
        } else {
            PriceFormat::Numeric
        }
    }
}

/// Parse one price cell; anything unparsable or non-finite becomes `None`.
pub fn parse_price(value: &RawValue, format: PriceFormat) -> Option<f64> {
    let parsed = match format {
        PriceFormat::Numeric => value.as_f64(),
        PriceFormat::Textual => {
            let text = value.as_text()?;
            let stripped: String = text.chars().filter(|c| *c != '$' && *c != ',').collect();
            stripped.trim().parse::<f64>().ok()
        }
    };
    parsed.filter(|p| p.is_finite())
}

/// Parse the whole price column. Returns the detected format and one entry
/// per source row.
pub fn normalize_prices(table: &RawTable) -> (PriceFormat, Vec<Option<f64>>) {
    let format = PriceFormat::detect(table.rows.iter().map(|r| RawTable::cell(r, COL_PRICE)));
    let prices = table
        .rows
        .iter()
        .map(|r| parse_price(RawTable::cell(r, COL_PRICE), format))
        .collect();
    (format, prices)
}

// ---------------------------------------------------------------------------
// Steps 2–3: price filters
// ---------------------------------------------------------------------------

/// A source row paired with its parsed, strictly positive price.
#[derive(Debug, Clone, Copy)]
pub struct PricedRow<'a> {
    pub index: usize,
    pub record: &'a RawRecord,
    pub price: f64,
}

/// Keep rows whose price parsed and is `> 0`, in source order.
pub fn drop_non_positive<'a>(
    table: &'a RawTable,
    prices: &[Option<f64>],
) -> Vec<PricedRow<'a>> {
    table
        .rows
        .iter()
        .zip(prices)
        .enumerate()
        .filter_map(|(index, (record, price))| match price {
            Some(p) if *p > 0.0 => Some(PricedRow {
                index,
                record,
                price: *p,
            }),
            _ => None,
        })
        .collect()
}

/// The `q` quantile (linear interpolation) of `prices`; `None` when empty.
pub fn outlier_threshold(prices: &[f64], q: f64) -> Option<f64> {
    let mut sorted = prices.to_vec();
    sorted.sort_by(f64::total_cmp);
    quantile(&sorted, q)
}

/// Keep rows strictly below `threshold`.
pub fn drop_outliers(rows: Vec<PricedRow<'_>>, threshold: f64) -> Vec<PricedRow<'_>> {
    rows.into_iter().filter(|r| r.price < threshold).collect()
}

// ---------------------------------------------------------------------------
// Steps 4–5: per-row fields
// ---------------------------------------------------------------------------

/// Review count for one cell; missing, negative or unparsable values are 0.
pub fn review_count(value: &RawValue) -> u64 {
    let n = match value {
        RawValue::Integer(i) => *i as f64,
        RawValue::Float(f) => *f,
        RawValue::String(s) => s.trim().parse::<f64>().unwrap_or(0.0),
        RawValue::Bool(_) | RawValue::Null => 0.0,
    };
    if n.is_finite() && n > 0.0 {
        n.round() as u64
    } else {
        0
    }
}

fn numeric(value: &RawValue) -> Option<f64> {
    let n = match value {
        RawValue::String(s) => s.trim().parse::<f64>().ok(),
        other => other.as_f64(),
    };
    n.filter(|v| v.is_finite())
}

fn category(value: &RawValue) -> Option<String> {
    value
        .as_text()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

/// A fully typed row, ready for enrichment.
#[derive(Debug, Clone, PartialEq)]
pub struct CleanRow {
    pub id: usize,
    pub name: String,
    pub neighbourhood: String,
    pub room_type: String,
    pub location: GeoPoint,
    pub price: f64,
    pub number_of_reviews: u64,
    pub security_index: Option<f64>,
}

/// Type the remaining fields of a priced row. `None` means the row has no
/// valid coordinate or lacks a neighbourhood/room type.
pub fn validate_row(
    row: &PricedRow<'_>,
    has_reviews: bool,
    has_security: bool,
) -> Option<CleanRow> {
    let latitude = numeric(RawTable::cell(row.record, COL_LATITUDE))?;
    let longitude = numeric(RawTable::cell(row.record, COL_LONGITUDE))?;
    let location = GeoPoint::new(latitude, longitude);
    if !location.is_valid() {
        return None;
    }

    let neighbourhood = category(RawTable::cell(row.record, COL_NEIGHBOURHOOD))?;
    let room_type = category(RawTable::cell(row.record, COL_ROOM_TYPE))?;
    let name = RawTable::cell(row.record, COL_NAME)
        .as_text()
        .unwrap_or_default();

    let number_of_reviews = if has_reviews {
        review_count(RawTable::cell(row.record, COL_REVIEWS))
    } else {
        0
    };
    let security_index = if has_security {
        numeric(RawTable::cell(row.record, COL_SECURITY))
    } else {
        None
    };

    Some(CleanRow {
        id: row.index,
        name,
        neighbourhood,
        room_type,
        location,
        price: row.price,
        number_of_reviews,
        security_index,
    })
}

// ---------------------------------------------------------------------------
// Pipeline
// ---------------------------------------------------------------------------

/// Row accounting for one cleaning run.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CleaningReport {
    pub rows_in: usize,
    pub price_format: PriceFormat,
    /// Null price cells.
    pub missing_prices: usize,
    /// Non-null price cells that did not parse.
    pub unparsable_prices: usize,
    pub non_positive_prices: usize,
    pub price_threshold: Option<f64>,
    pub outliers: usize,
    /// Rows rejected for coordinates or categories.
    pub invalid_rows: usize,
    pub rows_retained: usize,
}

impl CleaningReport {
    /// Share of input rows that survived, `None` for an empty input.
    pub fn retained_ratio(&self) -> Option<f64> {
        (self.rows_in > 0).then(|| self.rows_retained as f64 / self.rows_in as f64)
    }
}

/// Output of [`clean`].
#[derive(Debug, Clone)]
pub struct Cleaned {
    pub rows: Vec<CleanRow>,
    pub has_review_counts: bool,
    pub has_security_index: bool,
    pub report: CleaningReport,
}

/// Run every cleaning step over `table`. The source table is not modified.
pub fn clean(table: &RawTable, outlier_quantile: f64) -> Cleaned {
    let has_review_counts = table.has_column(COL_REVIEWS);
    let has_security_index = table.has_column(COL_SECURITY);

    let (price_format, prices) = normalize_prices(table);
    let missing_prices = table
        .rows
        .iter()
        .filter(|r| RawTable::cell(r, COL_PRICE).is_null())
        .count();
    let unparsable_prices = prices.iter().filter(|p| p.is_none()).count() - missing_prices;

    let positive = drop_non_positive(table, &prices);
    let non_positive_prices = table.len() - missing_prices - unparsable_prices - positive.len();

    let positive_prices: Vec<f64> = positive.iter().map(|r| r.price).collect();
    let price_threshold = outlier_threshold(&positive_prices, outlier_quantile);
    let before = positive.len();
    let kept = match price_threshold {
        Some(t) => drop_outliers(positive, t),
        None => positive,
    };
    let outliers = before - kept.len();

    let rows: Vec<CleanRow> = kept
        .iter()
        .filter_map(|r| validate_row(r, has_review_counts, has_security_index))
        .collect();
    let invalid_rows = kept.len() - rows.len();

    let report = CleaningReport {
        rows_in: table.len(),
        price_format,
        missing_prices,
        unparsable_prices,
        non_positive_prices,
        price_threshold,
        outliers,
        invalid_rows,
        rows_retained: rows.len(),
    };

    debug!(
        "cleaning: format={:?} missing={} unparsable={} non_positive={} threshold={:?} outliers={} invalid={}",
        report.price_format,
        report.missing_prices,
        report.unparsable_prices,
        report.non_positive_prices,
        report.price_threshold,
        report.outliers,
        report.invalid_rows,
    );
    if !has_review_counts {
        debug!("no '{COL_REVIEWS}' column, review counts default to 0");
    }
    info!(
        "cleaned {} rows -> {} retained",
        report.rows_in, report.rows_retained
    );

    Cleaned {
        rows,
        has_review_counts,
        has_security_index,
        report,
    }
}
