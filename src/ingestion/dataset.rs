//! Raw dataset construction and table persistence

use super::store::Document;
use crate::config::SchemaConfig;
use crate::error::{Result, VisibilityError};
use polars::prelude::*;
use serde_json::Value;
use std::fs::File;
use std::path::Path;
use tracing::debug;

/// Ordered rows sharing one column schema
pub type Dataset = DataFrame;

/// Store-internal identifier, never a feature
const ID_FIELD: &str = "_id";

/// Parse a document value as a number; `None` marks a missing value
fn numeric_value(value: &Value) -> std::result::Result<Option<f64>, ()> {
    match value {
        Value::Null => Ok(None),
        Value::Number(n) => Ok(n.as_f64()),
        Value::String(s) => {
            let trimmed = s.trim();
            if is_missing_marker(trimmed) {
                Ok(None)
            } else {
                trimmed.parse::<f64>().map(Some).map_err(|_| ())
            }
        }
        _ => Err(()),
    }
}

fn is_missing_marker(s: &str) -> bool {
    s.is_empty() || s.eq_ignore_ascii_case("na") || s.eq_ignore_ascii_case("nan")
}

fn string_value(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) if is_missing_marker(s.trim()) => None,
        Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}

/// Build a dataset from raw documents.
///
/// Columns appear in first-seen order, `_id` is skipped, and `"na"`/null
/// become missing values. A column is numeric when every present value parses
/// as a number, otherwise it is kept as text.
pub fn documents_to_dataset(documents: &[Document]) -> Result<Dataset> {
    if documents.is_empty() {
        return Err(VisibilityError::DataAccess(
            "query returned no documents".to_string(),
        ));
    }

    let mut names: Vec<&str> = Vec::new();
    for doc in documents {
        for key in doc.keys() {
            if key != ID_FIELD && !names.contains(&key.as_str()) {
                names.push(key.as_str());
            }
        }
    }

    let columns: Vec<Column> = names
        .iter()
        .map(|&name| {
            let cells: Vec<&Value> = documents
                .iter()
                .map(|doc| doc.get(name).unwrap_or(&Value::Null))
                .collect();

            let numeric: std::result::Result<Vec<Option<f64>>, ()> =
                cells.iter().map(|v| numeric_value(v)).collect();

            match numeric {
                Ok(values) => Series::new(name.into(), values).into(),
                Err(()) => {
                    let values: Vec<Option<String>> = cells.iter().map(|v| string_value(v)).collect();
                    Series::new(name.into(), values).into()
                }
            }
        })
        .collect();

    Ok(DataFrame::new(columns)?)
}

/// Remove the configured schema columns.
///
/// Every configured column must be present; absent ones are reported together
/// as a schema error rather than silently ignored.
pub fn drop_schema_columns(dataset: &Dataset, schema: &SchemaConfig) -> Result<Dataset> {
    let present: Vec<String> = dataset
        .get_column_names()
        .iter()
        .map(|name| name.to_string())
        .collect();

    let missing: Vec<&str> = schema
        .drop_columns
        .iter()
        .filter(|col| !present.contains(col))
        .map(|col| col.as_str())
        .collect();

    if !missing.is_empty() {
        return Err(VisibilityError::Schema(format!(
            "columns configured for drop are absent: {}",
            missing.join(", ")
        )));
    }

    let mut result = dataset.clone();
    for col in &schema.drop_columns {
        result = result.drop(col)?;
    }
    Ok(result)
}

/// Remove every row holding a missing value in any column
pub fn drop_incomplete_rows(dataset: &Dataset) -> Result<Dataset> {
    let mut mask = BooleanChunked::full("complete".into(), true, dataset.height());
    for column in dataset.get_columns() {
        let present = column.as_materialized_series().is_not_null();
        mask = &mask & &present;
    }
    Ok(dataset.filter(&mask)?)
}

/// Write a table as CSV with header, creating parent directories
pub fn save_table(dataset: &Dataset, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(|e| VisibilityError::artifact(path, e))?;
    }
    let mut file = File::create(path).map_err(|e| VisibilityError::artifact(path, e))?;
    CsvWriter::new(&mut file)
        .include_header(true)
        .finish(&mut dataset.clone())
        .map_err(|e| VisibilityError::artifact(path, e))?;
    debug!(path = %path.display(), rows = dataset.height(), "Table written");
    Ok(())
}

/// Read a CSV table with header
pub fn load_table(path: &Path) -> Result<Dataset> {
    let file = File::open(path).map_err(|e| VisibilityError::artifact(path, e))?;
    CsvReadOptions::default()
        .with_has_header(true)
        .with_infer_schema_length(Some(1000))
        .into_reader_with_file_handle(file)
        .finish()
        .map_err(|e| VisibilityError::artifact(path, e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn docs(values: Vec<Value>) -> Vec<Document> {
        values
            .into_iter()
            .map(|v| v.as_object().unwrap().clone())
            .collect()
    }

    #[test]
    fn test_documents_to_dataset() {
        let documents = docs(vec![
            json!({"_id": "a1", "DATE": "2010-01-01", "WindSpeed": 5, "VISIBILITY": "na"}),
            json!({"_id": "a2", "DATE": "2010-01-02", "WindSpeed": "7.5", "VISIBILITY": 10.0}),
        ]);
        let df = documents_to_dataset(&documents).unwrap();

        let names: Vec<String> = df.get_column_names().iter().map(|s| s.to_string()).collect();
        assert_eq!(names, vec!["DATE", "WindSpeed", "VISIBILITY"]);
        assert_eq!(df.column("DATE").unwrap().dtype(), &DataType::String);

        let wind = df.column("WindSpeed").unwrap().f64().unwrap();
        assert_eq!(wind.get(1), Some(7.5));
        let vis = df.column("VISIBILITY").unwrap().f64().unwrap();
        assert_eq!(vis.get(0), None);
    }

    #[test]
    fn test_empty_documents_rejected() {
        assert!(matches!(
            documents_to_dataset(&[]),
            Err(VisibilityError::DataAccess(_))
        ));
    }

    #[test]
    fn test_drop_schema_columns() {
        let df = df!(
            "DATE" => &["a", "b"],
            "x" => &[1.0, 2.0]
        )
        .unwrap();
        let out = drop_schema_columns(&df, &SchemaConfig::new(["DATE"])).unwrap();
        assert_eq!(out.width(), 1);
        assert!(out.column("x").is_ok());
    }

    #[test]
    fn test_drop_absent_schema_column_fails() {
        let df = df!("x" => &[1.0, 2.0]).unwrap();
        let err = drop_schema_columns(&df, &SchemaConfig::new(["DATE", "STATION"])).unwrap_err();
        match err {
            VisibilityError::Schema(msg) => {
                assert!(msg.contains("DATE"));
                assert!(msg.contains("STATION"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_drop_incomplete_rows() {
        let df = df!(
            "x" => &[Some(1.0), None, Some(3.0)],
            "y" => &[Some(1.0), Some(2.0), Some(3.0)]
        )
        .unwrap();
        let out = drop_incomplete_rows(&df).unwrap();
        assert_eq!(out.height(), 2);
    }

    #[test]
    fn test_table_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("raw").join("train.csv");
        let df = df!("x" => &[1.5, 2.5], "y" => &[3.0, 4.0]).unwrap();

        save_table(&df, &path).unwrap();
        let loaded = load_table(&path).unwrap();
        assert!(loaded.equals(&df));
    }
}
