//! Persisted model artifact

use super::TrainedModel;
use crate::error::{Result, VisibilityError};
use crate::utils::{load_json, save_json};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::Path;

pub const MODEL_FORMAT_VERSION: u32 = 1;

/// Trained model plus the metadata needed to serve it safely.
///
/// `feature_names` is the column order the model was trained on; loaders
/// compare it against the order they will feed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelArtifact {
    pub format_version: u32,
    pub model_name: String,
    pub feature_names: Vec<String>,
    pub target_column: String,
    pub created_at: DateTime<Utc>,
    pub model: TrainedModel,
}

impl ModelArtifact {
    pub fn new(model: TrainedModel, feature_names: Vec<String>, target_column: impl Into<String>) -> Self {
        Self {
            format_version: MODEL_FORMAT_VERSION,
            model_name: model.kind().name().to_string(),
            feature_names,
            target_column: target_column.into(),
            created_at: Utc::now(),
            model,
        }
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        save_json(self, path)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let artifact: Self = load_json(path)?;
        if artifact.format_version != MODEL_FORMAT_VERSION {
            return Err(VisibilityError::artifact(
                path,
                format!(
                    "unsupported model format version {} (expected {})",
                    artifact.format_version, MODEL_FORMAT_VERSION
                ),
            ));
        }
        if artifact.model_name != artifact.model.kind().name() {
            return Err(VisibilityError::artifact(
                path,
                format!(
                    "model name '{}' does not match stored estimator '{}'",
                    artifact.model_name,
                    artifact.model.kind()
                ),
            ));
        }
        Ok(artifact)
    }
}
