//! JSON artifact persistence

use crate::error::{Result, VisibilityError};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::path::Path;

/// Serialize `value` as pretty JSON to `path`, creating parent directories
pub fn save_json<T: Serialize>(value: &T, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(|e| VisibilityError::artifact(path, e))?;
    }
    let json = serde_json::to_string_pretty(value).map_err(|e| VisibilityError::artifact(path, e))?;
    std::fs::write(path, json).map_err(|e| VisibilityError::artifact(path, e))?;
    Ok(())
}

/// Read and deserialize a JSON artifact
pub fn load_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let json = std::fs::read_to_string(path).map_err(|e| VisibilityError::artifact(path, e))?;
    serde_json::from_str(&json).map_err(|e| VisibilityError::artifact(path, e))
}
