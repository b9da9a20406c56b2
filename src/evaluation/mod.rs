//! Model evaluation
//!
//! Scores a trained model on held-out data and writes the metrics report.

use crate::config::ArtifactPaths;
use crate::error::{Result, VisibilityError};
use crate::training::{ModelArtifact, TrainedModel};
use crate::transformation::ProcessedMatrix;
use crate::utils::save_json;
use ndarray::{Array1, Array2};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::info;

/// Coefficient of determination.
///
/// With constant targets the denominator vanishes; the score is then 1.0 for
/// exact predictions and 0.0 otherwise.
pub fn r2_score(y_true: &Array1<f64>, y_pred: &Array1<f64>) -> f64 {
    let mean = y_true.mean().unwrap_or(0.0);
    let ss_res: f64 = y_true.iter().zip(y_pred.iter()).map(|(t, p)| (t - p).powi(2)).sum();
    let ss_tot: f64 = y_true.iter().map(|t| (t - mean).powi(2)).sum();

    if ss_tot > 0.0 {
        1.0 - ss_res / ss_tot
    } else if ss_res == 0.0 {
        1.0
    } else {
        0.0
    }
}

pub fn mean_squared_error(y_true: &Array1<f64>, y_pred: &Array1<f64>) -> f64 {
    (y_true - y_pred).mapv(|e| e * e).mean().unwrap_or(0.0)
}

pub fn mean_absolute_error(y_true: &Array1<f64>, y_pred: &Array1<f64>) -> f64 {
    (y_true - y_pred).mapv(f64::abs).mean().unwrap_or(0.0)
}

/// Regression metrics report
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvaluationMetrics {
    pub mse: f64,
    pub mae: f64,
    pub r2: f64,
    pub n_samples: usize,
}

impl EvaluationMetrics {
    pub fn compute(y_true: &Array1<f64>, y_pred: &Array1<f64>) -> Result<Self> {
        if y_true.len() != y_pred.len() {
            return Err(VisibilityError::ShapeError {
                expected: format!("{} predictions", y_true.len()),
                actual: format!("{} predictions", y_pred.len()),
            });
        }
        if y_true.is_empty() {
            return Err(VisibilityError::Validation(
                "cannot evaluate on an empty set".to_string(),
            ));
        }
        Ok(Self {
            mse: mean_squared_error(y_true, y_pred),
            mae: mean_absolute_error(y_true, y_pred),
            r2: r2_score(y_true, y_pred),
            n_samples: y_true.len(),
        })
    }

    pub fn rmse(&self) -> f64 {
        self.mse.sqrt()
    }
}

/// Score `model` on `(x, y)`; inputs are not modified
pub fn evaluate(model: &TrainedModel, x: &Array2<f64>, y: &Array1<f64>) -> Result<EvaluationMetrics> {
    let predictions = model.predict(x)?;
    EvaluationMetrics::compute(y, &predictions)
}

/// Write the report as JSON, creating parent directories
pub fn save_metrics(metrics: &EvaluationMetrics, path: &Path) -> Result<()> {
    save_json(metrics, path)
}

/// Evaluation stage over persisted artifacts
#[derive(Debug, Clone, Default)]
pub struct ModelEvaluation;

impl ModelEvaluation {
    pub fn new() -> Self {
        Self
    }

    /// Load the model and the processed test matrix, score, and save the report
    pub fn run_and_save(&self, paths: &ArtifactPaths) -> Result<EvaluationMetrics> {
        let artifact = ModelArtifact::load(&paths.model)?;
        let test = ProcessedMatrix::load(&paths.processed_test)?;
        if artifact.feature_names != test.feature_names {
            return Err(VisibilityError::Schema(format!(
                "model features {:?} do not match test matrix features {:?}",
                artifact.feature_names, test.feature_names
            )));
        }

        let metrics = evaluate(&artifact.model, &test.features, &test.target)?;
        save_metrics(&metrics, &paths.metrics)?;
        info!(
            model = %artifact.model.kind(),
            mse = metrics.mse,
            mae = metrics.mae,
            r2 = metrics.r2,
            n_samples = metrics.n_samples,
            report = %paths.metrics.display(),
            "Evaluation complete"
        );
        Ok(metrics)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_perfect_predictions() {
        let y = array![1.0, 2.0, 3.0, 10.0];
        let m = EvaluationMetrics::compute(&y, &y).unwrap();
        assert_eq!(m.mse, 0.0);
        assert_eq!(m.mae, 0.0);
        assert_eq!(m.r2, 1.0);
        assert_eq!(m.n_samples, 4);
    }

    #[test]
    fn test_known_values() {
        let y = array![1.0, 2.0, 3.0];
        let p = array![2.0, 2.0, 2.0];
        let m = EvaluationMetrics::compute(&y, &p).unwrap();
        assert!((m.mse - 2.0 / 3.0).abs() < 1e-12);
        assert!((m.mae - 2.0 / 3.0).abs() < 1e-12);
        assert!(m.r2.abs() < 1e-12);
    }

    #[test]
    fn test_constant_targets() {
        let y = array![5.0, 5.0];
        assert_eq!(r2_score(&y, &array![5.0, 5.0]), 1.0);
        assert_eq!(r2_score(&y, &array![5.0, 6.0]), 0.0);
    }

    #[test]
    fn test_length_mismatch() {
        assert!(EvaluationMetrics::compute(&array![1.0, 2.0], &array![1.0]).is_err());
        assert!(EvaluationMetrics::compute(&Array1::zeros(0), &Array1::zeros(0)).is_err());
    }

    #[test]
    fn test_save_metrics_creates_dirs() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("reports").join("metrics.json");
        let m = EvaluationMetrics {
            mse: 0.25,
            mae: 0.5,
            r2: 0.9,
            n_samples: 12,
        };
        save_metrics(&m, &path).unwrap();

        let json: serde_json::Value = serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(json["mse"], 0.25);
        assert_eq!(json["n_samples"], 12);
    }
}
