//! Pipeline configuration
//!
//! - [`params`] - `params.yaml`: split fraction, chosen model, hyperparameter grids
//! - [`schema`] - `schema.yaml`: columns dropped before modeling
//! - [`paths`] - conventional artifact layout shared by all stages

mod params;
mod paths;
mod schema;

pub use params::{
    IngestionParams, ModelConfig, ModelEntry, ModelSelection, ParamGrid, ParamValue,
    PipelineParams, TrainerParams,
};
pub use paths::ArtifactPaths;
pub use schema::SchemaConfig;

use crate::error::{Result, VisibilityError};
use serde::de::DeserializeOwned;
use std::path::Path;

/// Read and parse a YAML file into `T`
pub(crate) fn read_yaml<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let content = std::fs::read_to_string(path).map_err(|e| {
        VisibilityError::Config(format!("cannot read {}: {}", path.display(), e))
    })?;
    serde_yaml::from_str(&content).map_err(|e| {
        VisibilityError::Config(format!("cannot parse {}: {}", path.display(), e))
    })
}
