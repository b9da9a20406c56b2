//! Data ingestion
//!
//! Fetches raw records from the document store, drops the configured schema
//! columns and incomplete rows, and produces a seeded train/test split that is
//! persisted as CSV tables.

mod dataset;
mod split;
pub mod store;

pub use dataset::{
    documents_to_dataset, drop_incomplete_rows, drop_schema_columns, load_table, save_table,
    Dataset,
};
pub use split::{split, split_indices, test_size, SplitIndices};
pub use store::{Document, DocumentStore, InMemoryStore, JsonFileStore};

use crate::config::{ArtifactPaths, IngestionParams, SchemaConfig};
use crate::error::Result;
use tracing::{info, warn};

/// Ingestion stage over a document store
pub struct DataIngestion<S: DocumentStore> {
    store: S,
    schema: SchemaConfig,
}

impl<S: DocumentStore> DataIngestion<S> {
    pub fn new(store: S, schema: SchemaConfig) -> Self {
        Self { store, schema }
    }

    /// Query `collection` and build the raw dataset
    pub fn fetch(&self, collection: &str) -> Result<Dataset> {
        let documents = self.store.find(collection)?;
        let dataset = documents_to_dataset(&documents)?;
        info!(
            collection = %collection,
            rows = dataset.height(),
            columns = dataset.width(),
            "Fetched raw records"
        );
        Ok(dataset)
    }

    /// Full stage: fetch, drop schema columns, drop incomplete rows, split
    pub fn run(&self, params: &IngestionParams) -> Result<(Dataset, Dataset)> {
        let raw = self.fetch(&params.collection_name)?;
        let dataset = drop_schema_columns(&raw, &self.schema)?;
        info!(dropped = ?self.schema.drop_columns, "Schema columns dropped");

        let complete = drop_incomplete_rows(&dataset)?;
        let removed = dataset.height() - complete.height();
        if removed > 0 {
            warn!(removed, remaining = complete.height(), "Dropped rows with missing values");
        }

        let (train, test) = split(&complete, params.test_size, params.random_state)?;
        info!(
            train_rows = train.height(),
            test_rows = test.height(),
            seed = params.random_state,
            "Train/test split complete"
        );
        Ok((train, test))
    }

    /// Run the stage and persist both tables
    pub fn run_and_save(&self, params: &IngestionParams, paths: &ArtifactPaths) -> Result<(Dataset, Dataset)> {
        let (train, test) = self.run(params)?;
        save_split(&train, &test, paths)?;
        Ok((train, test))
    }
}

/// Write both split parts to the raw-table locations
pub fn save_split(train: &Dataset, test: &Dataset, paths: &ArtifactPaths) -> Result<()> {
    save_table(train, &paths.raw_train)?;
    save_table(test, &paths.raw_test)?;
    info!(
        train = %paths.raw_train.display(),
        test = %paths.raw_test.display(),
        "Raw tables saved"
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn store_with_rows(n: usize) -> InMemoryStore {
        let store = InMemoryStore::new();
        let docs = (0..n)
            .map(|i| {
                let visibility = if i == 3 { json!("na") } else { json!(10.0 - (i % 10) as f64) };
                json!({
                    "_id": format!("id{}", i),
                    "DATE": format!("2010-01-{:02}", i % 28 + 1),
                    "DRYBULBTEMPF": 40.0 + i as f64,
                    "VISIBILITY": visibility
                })
                .as_object()
                .unwrap()
                .clone()
            })
            .collect();
        store.insert_many("visibility_data", docs);
        store
    }

    #[test]
    fn test_run_drops_schema_and_incomplete_rows() {
        let ingestion = DataIngestion::new(store_with_rows(21), SchemaConfig::new(["DATE"]));
        let (train, test) = ingestion.run(&IngestionParams::default()).unwrap();

        assert_eq!(train.height() + test.height(), 20);
        assert_eq!(test.height(), 4);
        assert!(train.column("DATE").is_err());
        assert!(train.column("_id").is_err());
    }

    #[test]
    fn test_run_and_save_writes_tables() {
        let dir = tempfile::tempdir().unwrap();
        let paths = ArtifactPaths::rooted_at(dir.path());
        let ingestion = DataIngestion::new(store_with_rows(10), SchemaConfig::new(["DATE"]));

        ingestion.run_and_save(&IngestionParams::default(), &paths).unwrap();
        assert!(paths.raw_train.exists());
        assert!(paths.raw_test.exists());
        assert_eq!(load_table(&paths.raw_test).unwrap().height(), 2);
    }
}
