//! Error types for the visibility pipeline and inference adapter

use thiserror::Error;

/// Result type alias for visibility operations
pub type Result<T> = std::result::Result<T, VisibilityError>;

/// Main error type for the crate
///
/// Batch stages propagate these to abort a run. The inference adapter
/// catches all of them at its boundary and degrades to the fallback value.
#[derive(Error, Debug)]
pub enum VisibilityError {
    /// Document store unreachable or query failure
    #[error("Data access error: {0}")]
    DataAccess(String),

    /// A configured schema column is missing from the dataset
    #[error("Schema error: {0}")]
    Schema(String),

    /// Model name outside the fixed catalog
    #[error("Unsupported model: {0}")]
    UnsupportedModel(String),

    /// Estimator fit failure
    #[error("Training error: {0}")]
    Training(String),

    /// Read/write failure for scaler, model, tables or report
    #[error("Artifact IO error at {path}: {reason}")]
    ArtifactIo { path: String, reason: String },

    /// Artifact unavailable or feature derivation failed at serve time
    #[error("Inference degraded: {0}")]
    InferenceDegraded(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Invalid shape: expected {expected}, got {actual}")]
    ShapeError { expected: String, actual: String },

    #[error("Invalid parameter: {name} = {value}, {reason}")]
    InvalidParameter {
        name: String,
        value: String,
        reason: String,
    },

    #[error("Model not fitted")]
    ModelNotFitted,

    #[error("Computation error: {0}")]
    ComputationError(String),
}

impl VisibilityError {
    /// Build an artifact error for `path`
    pub fn artifact(path: impl AsRef<std::path::Path>, reason: impl ToString) -> Self {
        VisibilityError::ArtifactIo {
            path: path.as_ref().display().to_string(),
            reason: reason.to_string(),
        }
    }
}

impl From<polars::error::PolarsError> for VisibilityError {
    fn from(err: polars::error::PolarsError) -> Self {
        VisibilityError::DataAccess(err.to_string())
    }
}

impl From<serde_json::Error> for VisibilityError {
    fn from(err: serde_json::Error) -> Self {
        VisibilityError::Serialization(err.to_string())
    }
}

impl From<serde_yaml::Error> for VisibilityError {
    fn from(err: serde_yaml::Error) -> Self {
        VisibilityError::Config(err.to_string())
    }
}

impl From<ndarray::ShapeError> for VisibilityError {
    fn from(err: ndarray::ShapeError) -> Self {
        VisibilityError::ShapeError {
            expected: "valid shape".to_string(),
            actual: err.to_string(),
        }
    }
}

impl From<reqwest::Error> for VisibilityError {
    fn from(err: reqwest::Error) -> Self {
        VisibilityError::DataAccess(err.to_string())
    }
}
