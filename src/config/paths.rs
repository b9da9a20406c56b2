//! Conventional on-disk artifact layout

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Locations of every durable artifact, relative to a base directory.
///
/// Each stage owns exactly one group of outputs: ingestion the raw tables,
/// transformation the processed matrices and the scaler, training the model,
/// evaluation the report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArtifactPaths {
    pub raw_train: PathBuf,
    pub raw_test: PathBuf,
    pub processed_train: PathBuf,
    pub processed_test: PathBuf,
    pub scaler: PathBuf,
    pub model: PathBuf,
    pub metrics: PathBuf,
}

impl Default for ArtifactPaths {
    fn default() -> Self {
        Self::rooted_at(".")
    }
}

impl ArtifactPaths {
    /// Standard layout under `base`
    pub fn rooted_at(base: impl AsRef<Path>) -> Self {
        let base = base.as_ref();
        Self {
            raw_train: base.join("data").join("raw").join("train.csv"),
            raw_test: base.join("data").join("raw").join("test.csv"),
            processed_train: base.join("data").join("interim").join("train_processed.json"),
            processed_test: base.join("data").join("interim").join("test_processed.json"),
            scaler: base.join("models").join("scaler.json"),
            model: base.join("models").join("trained_model.json"),
            metrics: base.join("reports").join("metrics.json"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rooted_layout() {
        let paths = ArtifactPaths::rooted_at("/tmp/run");
        assert_eq!(paths.raw_train, PathBuf::from("/tmp/run/data/raw/train.csv"));
        assert_eq!(paths.scaler, PathBuf::from("/tmp/run/models/scaler.json"));
        assert_eq!(paths.metrics, PathBuf::from("/tmp/run/reports/metrics.json"));
    }
}
