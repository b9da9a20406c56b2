//! Visibility ML - visibility prediction from meteorological observations
//!
//! This crate provides:
//! - A batch pipeline (ingest, transform, train, evaluate) producing a scaler
//!   and model artifact
//! - A live inference adapter turning a current weather observation into a
//!   visibility prediction with the same feature contract
//!
//! # Modules
//!
//! ## Pipeline stages
//! - [`ingestion`] - Document fetch, schema drop, seeded train/test split
//! - [`transformation`] - Standard scaling fitted on training features only
//! - [`training`] - Fixed model catalog with optional grid search
//! - [`evaluation`] - MSE, MAE and R² report
//! - [`pipeline`] - Stage orchestration
//!
//! ## Serving
//! - [`inference`] - Feature derivation, weather source, shared predictor
//!
//! ## Support
//! - [`config`] - `params.yaml`, `schema.yaml`, artifact layout
//! - [`contract`] - Feature order and target column shared by both sides
//! - [`cli`] - Command-line interface

// Core error handling
pub mod error;

// Shared contracts and configuration
pub mod config;
pub mod contract;

// Pipeline stages
pub mod ingestion;
pub mod transformation;
pub mod training;
pub mod evaluation;
pub mod pipeline;

// Serving
pub mod inference;

// Utilities
pub mod utils;

// Services
pub mod cli;

pub use error::{Result, VisibilityError};

/// Re-export commonly used types
pub mod prelude {
    // Error handling
    pub use crate::error::{Result, VisibilityError};

    // Configuration
    pub use crate::config::{ArtifactPaths, ModelConfig, ParamGrid, ParamValue, PipelineParams, SchemaConfig};
    pub use crate::contract::{feature_names, FEATURE_ORDER, TARGET_COLUMN};

    // Stages
    pub use crate::ingestion::{DataIngestion, Dataset, DocumentStore, InMemoryStore, JsonFileStore};
    pub use crate::transformation::{DataTransformation, ProcessedMatrix, StandardScaler};
    pub use crate::training::{train, ModelArtifact, ModelKind, ModelTrainer, TrainedModel};
    pub use crate::evaluation::{EvaluationMetrics, ModelEvaluation};
    pub use crate::pipeline::{Pipeline, PipelineReport};

    // Inference
    pub use crate::inference::{
        FeatureVector, InferenceConfig, PredictionResult, VisibilityPredictor, WeatherObservation,
        WeatherSource,
    };
}
