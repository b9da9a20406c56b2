//! Schema configuration

use crate::error::Result;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Ordered set of column names to drop before modeling
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SchemaConfig {
    #[serde(default)]
    pub drop_columns: Vec<String>,
}

impl SchemaConfig {
    pub fn new<S: Into<String>>(columns: impl IntoIterator<Item = S>) -> Self {
        Self {
            drop_columns: columns.into_iter().map(Into::into).collect(),
        }
    }

    /// Load from a `schema.yaml` file
    pub fn from_yaml_file(path: impl AsRef<Path>) -> Result<Self> {
        super::read_yaml(path.as_ref())
    }

    pub fn is_empty(&self) -> bool {
        self.drop_columns.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_schema_yaml() {
        let yaml = "drop_columns:\n  - DATE\n  - STATION\n";
        let schema: SchemaConfig = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(schema.drop_columns, vec!["DATE", "STATION"]);
    }

    #[test]
    fn test_missing_key_is_empty() {
        let schema: SchemaConfig = serde_yaml::from_str("{}").unwrap();
        assert!(schema.is_empty());
    }
}
