//! Batch pipeline orchestration
//!
//! Runs ingestion, transformation, training and evaluation in order. Stages
//! communicate only through the artifacts under [`ArtifactPaths`], so each one
//! can also be run on its own.

use crate::config::{ArtifactPaths, PipelineParams, SchemaConfig};
use crate::error::Result;
use crate::evaluation::{EvaluationMetrics, ModelEvaluation};
use crate::ingestion::{DataIngestion, Dataset, DocumentStore};
use crate::training::{ModelArtifact, ModelTrainer};
use crate::transformation::{DataTransformation, ProcessedMatrix};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Instant;
use tracing::info;

/// Summary of a full pipeline run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineReport {
    pub model_name: String,
    pub train_rows: usize,
    pub test_rows: usize,
    pub n_features: usize,
    pub cv_score: Option<f64>,
    pub metrics: EvaluationMetrics,
    pub elapsed_secs: f64,
}

/// Configured batch pipeline
#[derive(Debug, Clone)]
pub struct Pipeline {
    params: PipelineParams,
    schema: SchemaConfig,
    paths: ArtifactPaths,
}

impl Pipeline {
    pub fn new(params: PipelineParams, schema: SchemaConfig, paths: ArtifactPaths) -> Result<Self> {
        params.validate()?;
        Ok(Self { params, schema, paths })
    }

    /// Load `params.yaml` and `schema.yaml`, with artifacts rooted at `base`
    pub fn from_files(
        params_path: impl AsRef<Path>,
        schema_path: impl AsRef<Path>,
        base: impl AsRef<Path>,
    ) -> Result<Self> {
        let params = PipelineParams::from_yaml_file(params_path)?;
        let schema = SchemaConfig::from_yaml_file(schema_path)?;
        Self::new(params, schema, ArtifactPaths::rooted_at(base))
    }

    pub fn params(&self) -> &PipelineParams {
        &self.params
    }

    pub fn paths(&self) -> &ArtifactPaths {
        &self.paths
    }

    pub fn run_ingestion<S: DocumentStore>(&self, store: S) -> Result<(Dataset, Dataset)> {
        info!(stage = "ingestion", collection = %self.params.data_ingestion.collection_name, "Stage started");
        DataIngestion::new(store, self.schema.clone())
            .run_and_save(&self.params.data_ingestion, &self.paths)
    }

    pub fn run_transformation(&self) -> Result<(ProcessedMatrix, ProcessedMatrix)> {
        info!(stage = "transformation", "Stage started");
        DataTransformation::default().run_and_save(&self.paths)
    }

    pub fn run_training(&self) -> Result<ModelArtifact> {
        info!(stage = "training", model = %self.params.model_trainer.chosen_model, "Stage started");
        ModelTrainer::new(self.params.model_config()).run_and_save(&self.paths)
    }

    pub fn run_evaluation(&self) -> Result<EvaluationMetrics> {
        info!(stage = "evaluation", "Stage started");
        ModelEvaluation::new().run_and_save(&self.paths)
    }

    /// Run all four stages; the first failure aborts the run
    pub fn run_all<S: DocumentStore>(&self, store: S) -> Result<PipelineReport> {
        let start = Instant::now();
        self.run_ingestion(store)?;
        let (train, test) = self.run_transformation()?;
        let artifact = self.run_training()?;
        let metrics = self.run_evaluation()?;

        let report = PipelineReport {
            model_name: artifact.model_name.clone(),
            train_rows: train.n_samples(),
            test_rows: test.n_samples(),
            n_features: train.feature_names.len(),
            cv_score: artifact.model.cv_score(),
            metrics,
            elapsed_secs: start.elapsed().as_secs_f64(),
        };
        info!(
            model = %report.model_name,
            r2 = report.metrics.r2,
            elapsed_secs = report.elapsed_secs,
            "Pipeline complete"
        );
        Ok(report)
    }
}
