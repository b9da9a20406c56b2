//! Inference configuration

use crate::config::ArtifactPaths;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Where the serving artifacts live and what to return when prediction fails
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InferenceConfig {
    pub scaler_path: PathBuf,
    pub model_path: PathBuf,
    /// Value returned instead of a prediction when the adapter degrades
    pub fallback: f64,
}

impl Default for InferenceConfig {
    fn default() -> Self {
        Self::from_paths(&ArtifactPaths::default())
    }
}

impl InferenceConfig {
    pub fn from_paths(paths: &ArtifactPaths) -> Self {
        Self {
            scaler_path: paths.scaler.clone(),
            model_path: paths.model.clone(),
            fallback: 0.0,
        }
    }

    pub fn with_fallback(mut self, fallback: f64) -> Self {
        self.fallback = fallback;
        self
    }
}
