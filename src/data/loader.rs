use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;

use arrow::array::{
    new_null_array, Array, ArrayRef, BooleanArray, Float32Array, Float64Array, Int32Array,
    Int64Array, LargeStringArray, StringArray,
};
use arrow::compute::cast;
use arrow::datatypes::DataType;
use log::{debug, info, warn};
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use serde_json::Value as JsonValue;

use super::clean::{clean, COL_REVIEWS, COL_SECURITY, REQUIRED_COLUMNS};
use super::enrich::enrich;
use super::model::{CanonicalDataset, RawRecord, RawTable, RawValue};
use crate::config::PipelineConfig;
use crate::error::DataSourceError;

// ---------------------------------------------------------------------------
// Public entry-points
// ---------------------------------------------------------------------------

/// Read a listings file into raw rows. Dispatch by extension.
///
/// Supported formats:
/// * `.csv`     – header row, one listing per line
/// * `.json`    – `[{ "name": ..., "price": "$1,200", ... }, ...]`
/// * `.parquet` – flat columns of strings / numbers
pub fn read_table(path: &Path) -> Result<RawTable, DataSourceError> {
    if !path.exists() {
        return Err(DataSourceError::NotFound {
            path: path.to_path_buf(),
        });
    }

    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_ascii_lowercase();

    let table = match ext.as_str() {
        "csv" => load_csv(path)?,
        "json" => load_json(path)?,
        "parquet" | "pq" => load_parquet(path)?,
        other => return Err(DataSourceError::UnsupportedFormat(other.to_string())),
    };

    info!(
        "read {} rows x {} columns from {}",
        table.len(),
        table.columns.len(),
        path.display()
    );
    Ok(table)
}

/// Fail with [`DataSourceError::MissingColumn`] unless every required
/// column is present.
pub fn require_columns(table: &RawTable) -> Result<(), DataSourceError> {
    match REQUIRED_COLUMNS.iter().find(|c| !table.has_column(c)) {
        Some(missing) => Err(DataSourceError::MissingColumn(*missing)),
        None => Ok(()),
    }
}

/// Clean and enrich a raw table into the canonical dataset.
pub fn build_dataset(
    table: &RawTable,
    config: &PipelineConfig,
) -> Result<CanonicalDataset, DataSourceError> {
    require_columns(table)?;
    let cleaned = clean(table, config.outlier_quantile);
    let listings = enrich(cleaned.rows, &config.landmark);
    Ok(CanonicalDataset::from_listings(
        listings,
        cleaned.has_review_counts,
        cleaned.has_security_index,
        config.landmark,
        cleaned.report,
    ))
}

/// Read, clean and enrich in one call, without caching.
pub fn load_dataset(
    path: &Path,
    config: &PipelineConfig,
) -> Result<CanonicalDataset, DataSourceError> {
    let table = read_table(path)?;
    build_dataset(&table, config)
}

// ---------------------------------------------------------------------------
// CSV loader
// ---------------------------------------------------------------------------

/// Every column is kept; cell types are guessed per value so a currency
/// string such as `"$1,200"` stays text and is repaired during cleaning.
fn load_csv(path: &Path) -> Result<RawTable, DataSourceError> {
    let mut reader = csv::Reader::from_path(path)?;
    let columns: Vec<String> = reader
        .headers()?
        .iter()
        .map(|h| h.trim().to_string())
        .collect();

    let mut rows = Vec::new();
    for result in reader.records() {
        let record = result?;
        let row: RawRecord = columns
            .iter()
            .zip(record.iter())
            .map(|(col, value)| (col.clone(), guess_value_type(value)))
            .collect();
        rows.push(row);
    }

    Ok(RawTable { columns, rows })
}

/// Cell texts read as missing, the same set `pandas.read_csv` uses.
const NA_TOKENS: [&str; 18] = [
    "#N/A", "#N/A N/A", "#NA", "-1.#IND", "-1.#QNAN", "-NaN", "-nan", "1.#IND", "1.#QNAN",
    "<NA>", "N/A", "NA", "NULL", "NaN", "None", "n/a", "nan", "null",
];

fn guess_value_type(s: &str) -> RawValue {
    let s = s.trim();
    if s.is_empty() || NA_TOKENS.contains(&s) {
        return RawValue::Null;
    }
    if let Ok(i) = s.parse::<i64>() {
        return RawValue::Integer(i);
    }
    if let Ok(f) = s.parse::<f64>() {
        return RawValue::Float(f);
    }
    if s == "true" || s == "false" {
        return RawValue::Bool(s == "true");
    }
    RawValue::String(s.to_string())
}

// ---------------------------------------------------------------------------
// JSON loader
// ---------------------------------------------------------------------------

/// Records-oriented JSON (`df.to_json(orient='records')`). Columns are the
/// union of keys over all records.
fn load_json(path: &Path) -> Result<RawTable, DataSourceError> {
    let text = std::fs::read_to_string(path).map_err(|source| DataSourceError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let root: JsonValue = serde_json::from_str(&text)?;

    let records = root
        .as_array()
        .ok_or_else(|| DataSourceError::Malformed("expected top-level JSON array".into()))?;

    let mut columns: Vec<String> = Vec::new();
    let mut rows = Vec::with_capacity(records.len());

    for (i, rec) in records.iter().enumerate() {
        let obj = rec
            .as_object()
            .ok_or_else(|| DataSourceError::Malformed(format!("row {i} is not a JSON object")))?;

        let mut row = BTreeMap::new();
        for (key, val) in obj {
            if !columns.contains(key) {
                columns.push(key.clone());
            }
            row.insert(key.clone(), json_to_value(val));
        }
        rows.push(row);
    }

    Ok(RawTable { columns, rows })
}

fn json_to_value(val: &JsonValue) -> RawValue {
    match val {
        JsonValue::String(s) => RawValue::String(s.clone()),
        JsonValue::Number(n) => {
            if let Some(i) = n.as_i64() {
                RawValue::Integer(i)
            } else if let Some(f) = n.as_f64() {
                RawValue::Float(f)
            } else {
                RawValue::String(n.to_string())
            }
        }
        JsonValue::Bool(b) => RawValue::Bool(*b),
        JsonValue::Null => RawValue::Null,
        other => RawValue::String(other.to_string()),
    }
}

// ---------------------------------------------------------------------------
// Parquet loader
// ---------------------------------------------------------------------------

/// Columns the cleaner reads; a type that cannot be converted is an error.
const LISTING_COLUMNS: [&str; 8] = [
    REQUIRED_COLUMNS[0],
    REQUIRED_COLUMNS[1],
    REQUIRED_COLUMNS[2],
    REQUIRED_COLUMNS[3],
    REQUIRED_COLUMNS[4],
    REQUIRED_COLUMNS[5],
    COL_REVIEWS,
    COL_SECURITY,
];

/// Load a flat Parquet file, as written by `df.to_parquet()` in Pandas or
/// `df.write_parquet()` in Polars.
fn load_parquet(path: &Path) -> Result<RawTable, DataSourceError> {
    let file = std::fs::File::open(path).map_err(|source| DataSourceError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let builder = ParquetRecordBatchReaderBuilder::try_new(file)?;
    let columns: Vec<String> = builder
        .schema()
        .fields()
        .iter()
        .map(|f| f.name().clone())
        .collect();
    let reader = builder.build()?;

    let mut rows = Vec::new();

    for batch_result in reader {
        let batch = batch_result?;
        let schema = batch.schema();
        let batch_columns = schema
            .fields()
            .iter()
            .zip(batch.columns())
            .map(|(field, col)| normalize_column(field.name(), col))
            .collect::<Result<Vec<_>, _>>()?;

        for row in 0..batch.num_rows() {
            let record: RawRecord = schema
                .fields()
                .iter()
                .zip(&batch_columns)
                .map(|(field, col)| (field.name().clone(), extract_value(col, row)))
                .collect();
            rows.push(record);
        }
    }

    Ok(RawTable { columns, rows })
}

/// Cast a column to one of the types [`extract_value`] reads.
///
/// Dictionary-encoded strings (Pandas categoricals), narrow or unsigned
/// integers, decimals and string views are converted. A listing column that
/// cannot be cast is a [`DataSourceError::Malformed`]; any other column is
/// read as nulls.
fn normalize_column(name: &str, col: &ArrayRef) -> Result<ArrayRef, DataSourceError> {
    let target = match col.data_type() {
        DataType::Utf8
        | DataType::LargeUtf8
        | DataType::Int32
        | DataType::Int64
        | DataType::Float32
        | DataType::Float64
        | DataType::Boolean
        | DataType::Null => return Ok(Arc::clone(col)),
        DataType::Dictionary(_, values) => values.as_ref().clone(),
        DataType::Int8
        | DataType::Int16
        | DataType::UInt8
        | DataType::UInt16
        | DataType::UInt32
        | DataType::UInt64 => DataType::Int64,
        DataType::Float16 | DataType::Decimal128(..) | DataType::Decimal256(..) => {
            DataType::Float64
        }
        _ => DataType::Utf8,
    };

    debug!(
        "casting parquet column '{name}' from {} to {target}",
        col.data_type()
    );
    match cast(col, &target) {
        // Dictionary values may themselves need a second cast.
        Ok(converted) => normalize_column(name, &converted),
        Err(e) if LISTING_COLUMNS.contains(&name) => Err(DataSourceError::Malformed(format!(
            "column '{name}' of type {} cannot be read: {e}",
            col.data_type()
        ))),
        Err(e) => {
            warn!("ignoring parquet column '{name}': {e}");
            Ok(new_null_array(&DataType::Null, col.len()))
        }
    }
}

/// Extract a single cell from an Arrow column at a given row.
fn extract_value(col: &ArrayRef, row: usize) -> RawValue {
    if col.is_null(row) {
        return RawValue::Null;
    }
    let any = col.as_any();
    match col.data_type() {
        DataType::Utf8 => any
            .downcast_ref::<StringArray>()
            .map(|a| RawValue::String(a.value(row).to_string())),
        DataType::LargeUtf8 => any
            .downcast_ref::<LargeStringArray>()
            .map(|a| RawValue::String(a.value(row).to_string())),
        DataType::Int32 => any
            .downcast_ref::<Int32Array>()
            .map(|a| RawValue::Integer(i64::from(a.value(row)))),
        DataType::Int64 => any
            .downcast_ref::<Int64Array>()
            .map(|a| RawValue::Integer(a.value(row))),
        DataType::Float32 => any
            .downcast_ref::<Float32Array>()
            .map(|a| RawValue::Float(f64::from(a.value(row)))),
        DataType::Float64 => any
            .downcast_ref::<Float64Array>()
            .map(|a| RawValue::Float(a.value(row))),
        DataType::Boolean => any
            .downcast_ref::<BooleanArray>()
            .map(|a| RawValue::Bool(a.value(row))),
        _ => None,
    }
    .unwrap_or(RawValue::Null)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::clean::{PriceFormat, COL_PRICE};

    #[test]
    fn guesses_cell_types() {
        assert_eq!(guess_value_type(""), RawValue::Null);
        for na in ["NA", "N/A", "null", "NaN", " nan "] {
            assert_eq!(guess_value_type(na), RawValue::Null, "{na}");
        }
        assert_eq!(guess_value_type("42"), RawValue::Integer(42));
        assert_eq!(guess_value_type("19.43"), RawValue::Float(19.43));
        assert_eq!(guess_value_type("true"), RawValue::Bool(true));
        assert_eq!(
            guess_value_type("$1,200"),
            RawValue::String("$1,200".into())
        );
    }

    #[test]
    fn missing_required_column_is_reported() {
        let table = RawTable {
            columns: vec!["name".into(), "neighbourhood".into(), "room_type".into()],
            rows: Vec::new(),
        };
        match require_columns(&table) {
            Err(DataSourceError::MissingColumn(col)) => assert_eq!(col, "latitude"),
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn csv_with_quoted_currency() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("listings.csv");
        std::fs::write(
            &path,
            "name,neighbourhood,room_type,latitude,longitude,price,number_of_reviews\n\
             Loft,Cuauhtémoc,Entire home/apt,19.43,-99.15,\"$1,200\",3\n\
             Room,Coyoacán,Private room,19.35,-99.16,450,\n",
        )
        .unwrap();

        let table = read_table(&path).unwrap();
        assert_eq!(table.len(), 2);
        assert_eq!(
            RawTable::cell(&table.rows[0], COL_PRICE),
            &RawValue::String("$1,200".into())
        );
        assert!(RawTable::cell(&table.rows[1], "number_of_reviews").is_null());
    }

    #[test]
    fn na_tokens_count_as_missing_prices() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("listings.csv");
        let mut text =
            String::from("name,neighbourhood,room_type,latitude,longitude,price,number_of_reviews\n");
        for i in 0..10 {
            text.push_str(&format!("flat {i},Roma,Private room,19.41,-99.16,{},NA\n", 400 + i));
        }
        text.push_str("gap,Roma,Private room,19.41,-99.16,N/A,2\n");
        text.push_str("blank,Roma,Private room,19.41,-99.16,null,2\n");
        std::fs::write(&path, text).unwrap();

        let table = read_table(&path).unwrap();
        let ds = build_dataset(&table, &PipelineConfig::default()).unwrap();
        let report = ds.report();
        assert_eq!(report.price_format, PriceFormat::Numeric);
        assert_eq!(report.missing_prices, 2);
        assert_eq!(report.unparsable_prices, 0);
        assert_eq!(ds.listings()[0].number_of_reviews, 0);
    }

    #[test]
    fn json_requires_array_of_objects() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("listings.json");
        std::fs::write(&path, r#"{"name": "not an array"}"#).unwrap();
        assert!(matches!(
            read_table(&path),
            Err(DataSourceError::Malformed(_))
        ));

        std::fs::write(&path, r#"[{"name": "a", "price": 10}, 5]"#).unwrap();
        assert!(matches!(
            read_table(&path),
            Err(DataSourceError::Malformed(_))
        ));
    }

    #[test]
    fn unknown_extension_and_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("listings.xlsx");
        std::fs::write(&path, "whatever").unwrap();
        assert!(matches!(
            read_table(&path),
            Err(DataSourceError::UnsupportedFormat(ext)) if ext == "xlsx"
        ));
        assert!(matches!(
            read_table(&dir.path().join("nope.csv")),
            Err(DataSourceError::NotFound { .. })
        ));
    }
}
