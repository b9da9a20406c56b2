//! Processed (scaled features + target) matrix and its persisted form

use crate::error::{Result, VisibilityError};
use crate::ingestion::Dataset;
use crate::utils::{load_json, save_json};
use ndarray::{concatenate, s, Array1, Array2, Axis};
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use std::path::Path;

pub const MATRIX_FORMAT_VERSION: u32 = 1;

/// Scaled feature rows aligned with their targets.
///
/// On disk the target is always the last column of `values`; the feature
/// columns precede it in `feature_names` order.
#[derive(Debug, Clone, PartialEq)]
pub struct ProcessedMatrix {
    pub feature_names: Vec<String>,
    pub target_column: String,
    pub features: Array2<f64>,
    pub target: Array1<f64>,
}

#[derive(Serialize, Deserialize)]
struct StoredMatrix {
    format_version: u32,
    feature_names: Vec<String>,
    target_column: String,
    values: Array2<f64>,
}

impl ProcessedMatrix {
    pub fn new(
        feature_names: Vec<String>,
        target_column: impl Into<String>,
        features: Array2<f64>,
        target: Array1<f64>,
    ) -> Result<Self> {
        if features.ncols() != feature_names.len() {
            return Err(VisibilityError::ShapeError {
                expected: format!("{} feature columns", feature_names.len()),
                actual: format!("{} columns", features.ncols()),
            });
        }
        if features.nrows() != target.len() {
            return Err(VisibilityError::ShapeError {
                expected: format!("{} targets", features.nrows()),
                actual: format!("{} targets", target.len()),
            });
        }
        Ok(Self {
            feature_names,
            target_column: target_column.into(),
            features,
            target,
        })
    }

    pub fn n_samples(&self) -> usize {
        self.features.nrows()
    }

    /// Features with the target appended as the last column
    pub fn to_combined(&self) -> Result<Array2<f64>> {
        let target = self.target.view().insert_axis(Axis(1));
        Ok(concatenate(Axis(1), &[self.features.view(), target])?)
    }

    /// Split a combined matrix whose last column is the target
    pub fn from_combined(
        values: &Array2<f64>,
        feature_names: Vec<String>,
        target_column: impl Into<String>,
    ) -> Result<Self> {
        if values.ncols() != feature_names.len() + 1 {
            return Err(VisibilityError::ShapeError {
                expected: format!("{} columns (features + target)", feature_names.len() + 1),
                actual: format!("{} columns", values.ncols()),
            });
        }
        let last = values.ncols() - 1;
        let features = values.slice(s![.., ..last]).to_owned();
        let target = values.column(last).to_owned();
        Self::new(feature_names, target_column, features, target)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let stored = StoredMatrix {
            format_version: MATRIX_FORMAT_VERSION,
            feature_names: self.feature_names.clone(),
            target_column: self.target_column.clone(),
            values: self.to_combined()?,
        };
        save_json(&stored, path)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let stored: StoredMatrix = load_json(path)?;
        if stored.format_version != MATRIX_FORMAT_VERSION {
            return Err(VisibilityError::artifact(
                path,
                format!("unsupported matrix format version {}", stored.format_version),
            ));
        }
        Self::from_combined(&stored.values, stored.feature_names, stored.target_column)
            .map_err(|e| VisibilityError::artifact(path, e))
    }
}

fn column_values(dataset: &Dataset, name: &str) -> Result<Vec<f64>> {
    let column = dataset
        .column(name)
        .map_err(|_| VisibilityError::Schema(format!("column '{}' not found", name)))?;
    let as_f64 = column.cast(&DataType::Float64).map_err(|e| {
        VisibilityError::Validation(format!("column '{}' is not numeric: {}", name, e))
    })?;

    as_f64
        .f64()?
        .into_iter()
        .enumerate()
        .map(|(row, v)| {
            v.ok_or_else(|| {
                VisibilityError::Validation(format!(
                    "column '{}' has a missing value at row {}",
                    name, row
                ))
            })
        })
        .collect()
}

/// Extract named columns into a row-major matrix. Missing values are an error.
pub fn columns_to_array2(dataset: &Dataset, names: &[String]) -> Result<Array2<f64>> {
    let columns = names
        .iter()
        .map(|name| column_values(dataset, name))
        .collect::<Result<Vec<_>>>()?;
    Ok(Array2::from_shape_fn(
        (dataset.height(), names.len()),
        |(r, c)| columns[c][r],
    ))
}

pub fn column_to_array1(dataset: &Dataset, name: &str) -> Result<Array1<f64>> {
    Ok(Array1::from(column_values(dataset, name)?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    fn names() -> Vec<String> {
        vec!["a".to_string(), "b".to_string()]
    }

    #[test]
    fn test_combined_puts_target_last() {
        let m = ProcessedMatrix::new(
            names(),
            "VISIBILITY",
            array![[1.0, 2.0], [3.0, 4.0]],
            array![10.0, 9.0],
        )
        .unwrap();
        let combined = m.to_combined().unwrap();
        assert_eq!(combined, array![[1.0, 2.0, 10.0], [3.0, 4.0, 9.0]]);

        let back = ProcessedMatrix::from_combined(&combined, names(), "VISIBILITY").unwrap();
        assert_eq!(back, m);
    }

    #[test]
    fn test_misaligned_rows_rejected() {
        let result = ProcessedMatrix::new(names(), "y", array![[1.0, 2.0]], array![1.0, 2.0]);
        assert!(matches!(result, Err(VisibilityError::ShapeError { .. })));
    }

    #[test]
    fn test_save_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("interim").join("train_processed.json");
        let m = ProcessedMatrix::new(names(), "y", array![[0.5, -0.5]], array![7.0]).unwrap();

        m.save(&path).unwrap();
        let loaded = ProcessedMatrix::load(&path).unwrap();
        assert_eq!(loaded.target, array![7.0]);
        assert_eq!(loaded.feature_names, names());
        assert_eq!(loaded.target_column, "y");
    }

    #[test]
    fn test_columns_to_array2() {
        let df = df!(
            "a" => &[1.0, 2.0, 3.0],
            "b" => &[4i64, 5, 6],
            "c" => &[7.0, 8.0, 9.0]
        )
        .unwrap();
        let x = columns_to_array2(&df, &["c".to_string(), "b".to_string()]).unwrap();
        assert_eq!(x, array![[7.0, 4.0], [8.0, 5.0], [9.0, 6.0]]);
    }

    #[test]
    fn test_missing_value_rejected() {
        let df = df!("a" => &[Some(1.0), None]).unwrap();
        assert!(matches!(
            column_to_array1(&df, "a"),
            Err(VisibilityError::Validation(_))
        ));
        assert!(matches!(
            column_to_array1(&df, "zzz"),
            Err(VisibilityError::Schema(_))
        ));
    }
}
