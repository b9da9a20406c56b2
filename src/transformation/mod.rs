//! Data transformation
//!
//! Fits a [`StandardScaler`] on training features only and applies it to both
//! train and test tables. The target column never reaches the scaler.

mod matrix;
mod scaler;

pub use matrix::{column_to_array1, columns_to_array2, ProcessedMatrix, MATRIX_FORMAT_VERSION};
pub use scaler::{StandardScaler, SCALER_FORMAT_VERSION};

use crate::config::ArtifactPaths;
use crate::contract::{feature_names, TARGET_COLUMN};
use crate::error::{Result, VisibilityError};
use crate::ingestion::{load_table, Dataset};
use serde::{Deserialize, Serialize};
use tracing::info;

/// Which columns feed the scaler and which one is the target
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransformationConfig {
    pub target_column: String,
    /// Explicit feature order; `None` uses every non-target column as found
    pub feature_columns: Option<Vec<String>>,
}

impl Default for TransformationConfig {
    fn default() -> Self {
        Self {
            target_column: TARGET_COLUMN.to_string(),
            feature_columns: Some(feature_names()),
        }
    }
}

impl TransformationConfig {
    pub fn with_target(mut self, target: impl Into<String>) -> Self {
        self.target_column = target.into();
        self
    }

    pub fn with_feature_columns(mut self, columns: Option<Vec<String>>) -> Self {
        self.feature_columns = columns;
        self
    }
}

/// Transformation stage
#[derive(Debug, Clone, Default)]
pub struct DataTransformation {
    config: TransformationConfig,
}

impl DataTransformation {
    pub fn new(config: TransformationConfig) -> Self {
        Self { config }
    }

    fn resolve_features(&self, dataset: &Dataset) -> Result<Vec<String>> {
        let target = &self.config.target_column;
        let names = match &self.config.feature_columns {
            Some(columns) => columns.clone(),
            None => dataset
                .get_column_names()
                .iter()
                .map(|name| name.to_string())
                .filter(|name| name != target)
                .collect(),
        };

        if names.iter().any(|name| name == target) {
            return Err(VisibilityError::Schema(format!(
                "target column '{}' listed as a feature",
                target
            )));
        }
        if names.is_empty() {
            return Err(VisibilityError::Schema("no feature columns".to_string()));
        }
        Ok(names)
    }

    fn scaled(&self, dataset: &Dataset, scaler: &StandardScaler) -> Result<ProcessedMatrix> {
        let names = scaler.feature_names().to_vec();
        let raw = columns_to_array2(dataset, &names)?;
        let target = column_to_array1(dataset, &self.config.target_column)?;
        let features = scaler.transform(raw.view())?;
        ProcessedMatrix::new(names, self.config.target_column.clone(), features, target)
    }

    /// Fit the scaler on `train` and return the scaled training matrix
    pub fn fit_transform(&self, train: &Dataset) -> Result<(ProcessedMatrix, StandardScaler)> {
        let names = self.resolve_features(train)?;
        let raw = columns_to_array2(train, &names)?;
        let scaler = StandardScaler::fit(raw.view(), &names)?;
        let matrix = self.scaled(train, &scaler)?;
        info!(
            rows = matrix.n_samples(),
            features = names.len(),
            "Scaler fitted on training features"
        );
        Ok((matrix, scaler))
    }

    /// Scale `dataset` with an already fitted scaler
    pub fn transform(&self, dataset: &Dataset, scaler: &StandardScaler) -> Result<ProcessedMatrix> {
        self.scaled(dataset, scaler)
    }

    /// Read the raw tables, transform them, and persist matrices and scaler
    pub fn run_and_save(&self, paths: &ArtifactPaths) -> Result<(ProcessedMatrix, ProcessedMatrix)> {
        let train = load_table(&paths.raw_train)?;
        let test = load_table(&paths.raw_test)?;

        let (train_matrix, scaler) = self.fit_transform(&train)?;
        let test_matrix = self.transform(&test, &scaler)?;

        train_matrix.save(&paths.processed_train)?;
        test_matrix.save(&paths.processed_test)?;
        scaler.save(&paths.scaler)?;
        info!(
            scaler = %paths.scaler.display(),
            train = %paths.processed_train.display(),
            test = %paths.processed_test.display(),
            "Transformation artifacts saved"
        );
        Ok((train_matrix, test_matrix))
    }
}
