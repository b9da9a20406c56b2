//! Document store collaborator
//!
//! The pipeline only needs `find(collection) -> documents`. The production
//! store driver lives outside this crate; a JSON-file store and an in-memory
//! store are provided for local runs and tests.

use crate::error::{Result, VisibilityError};
use parking_lot::RwLock;
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// One raw record as returned by the store
pub type Document = Map<String, Value>;

/// Opaque source of documents grouped by collection
pub trait DocumentStore: Send + Sync {
    /// Return every document in `collection`
    fn find(&self, collection: &str) -> Result<Vec<Document>>;
}

/// Store backed by `<root>/<collection>.json` (array) or `<root>/<collection>.jsonl` files
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    root: PathBuf,
}

impl JsonFileStore {
    pub fn new(root: impl AsRef<Path>) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
        }
    }

    fn parse_document(value: Value, source: &Path) -> Result<Document> {
        match value {
            Value::Object(map) => Ok(map),
            other => Err(VisibilityError::DataAccess(format!(
                "{}: expected an object, found {}",
                source.display(),
                other
            ))),
        }
    }
}

impl DocumentStore for JsonFileStore {
    fn find(&self, collection: &str) -> Result<Vec<Document>> {
        let array_path = self.root.join(format!("{}.json", collection));
        let lines_path = self.root.join(format!("{}.jsonl", collection));

        if array_path.exists() {
            let content = std::fs::read_to_string(&array_path)
                .map_err(|e| VisibilityError::DataAccess(format!("{}: {}", array_path.display(), e)))?;
            let values: Vec<Value> = serde_json::from_str(&content)
                .map_err(|e| VisibilityError::DataAccess(format!("{}: {}", array_path.display(), e)))?;
            values
                .into_iter()
                .map(|v| Self::parse_document(v, &array_path))
                .collect()
        } else if lines_path.exists() {
            let content = std::fs::read_to_string(&lines_path)
                .map_err(|e| VisibilityError::DataAccess(format!("{}: {}", lines_path.display(), e)))?;
            content
                .lines()
                .filter(|line| !line.trim().is_empty())
                .map(|line| {
                    let value: Value = serde_json::from_str(line).map_err(|e| {
                        VisibilityError::DataAccess(format!("{}: {}", lines_path.display(), e))
                    })?;
                    Self::parse_document(value, &lines_path)
                })
                .collect()
        } else {
            Err(VisibilityError::DataAccess(format!(
                "collection '{}' not found under {}",
                collection,
                self.root.display()
            )))
        }
    }
}

/// In-memory store, mostly for tests and demos
#[derive(Debug, Default)]
pub struct InMemoryStore {
    collections: RwLock<HashMap<String, Vec<Document>>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert_many(&self, collection: &str, documents: Vec<Document>) {
        self.collections
            .write()
            .entry(collection.to_string())
            .or_default()
            .extend(documents);
    }
}

impl DocumentStore for InMemoryStore {
    fn find(&self, collection: &str) -> Result<Vec<Document>> {
        self.collections
            .read()
            .get(collection)
            .cloned()
            .ok_or_else(|| {
                VisibilityError::DataAccess(format!("collection '{}' does not exist", collection))
            })
    }
}
