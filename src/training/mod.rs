//! Model training
//!
//! - [`catalog`] - the fixed set of supported estimators
//! - [`grid_search`] - cross-validated hyperparameter search
//! - [`artifact`] - versioned model artifact binding the feature order

pub mod artifact;
pub mod catalog;
pub mod cross_validation;
pub mod decision_tree;
pub mod grid_search;
pub mod gradient_boosting;
pub mod linear_models;
pub mod random_forest;

pub use artifact::{ModelArtifact, MODEL_FORMAT_VERSION};
pub use catalog::{Estimator, ModelKind, ParamSet};
pub use cross_validation::{cross_val_score, CvSplit, KFold};
pub use decision_tree::DecisionTreeRegressor;
pub use grid_search::{expand_grid, CandidateScore, GridSearch, GridSearchResult};
pub use gradient_boosting::{GradientBoostingConfig, GradientBoostingRegressor};
pub use linear_models::{LassoRegression, LinearFit, LinearRegression, RidgeRegression};
pub use random_forest::{MaxFeatures, RandomForestRegressor};

use crate::config::{ArtifactPaths, ModelConfig};
use crate::error::{Result, VisibilityError};
use crate::transformation::ProcessedMatrix;
use crate::utils::ParallelConfig;
use ndarray::{Array1, Array2};
use serde::{Deserialize, Serialize};
use tracing::info;

/// A fitted catalog estimator. Exposes prediction only.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainedModel {
    estimator: Estimator,
    params: ParamSet,
    cv_score: Option<f64>,
}

impl TrainedModel {
    pub fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        self.estimator.predict(x)
    }

    pub fn kind(&self) -> ModelKind {
        self.estimator.kind()
    }

    /// Hyperparameters chosen by grid search (empty when defaults were used)
    pub fn params(&self) -> &ParamSet {
        &self.params
    }

    /// Mean cross-validated R² of the selected parameters, when searched
    pub fn cv_score(&self) -> Option<f64> {
        self.cv_score
    }
}

fn fit_failure(kind: ModelKind, err: VisibilityError) -> VisibilityError {
    match err {
        VisibilityError::InvalidParameter { .. }
        | VisibilityError::UnsupportedModel(_)
        | VisibilityError::Training(_) => err,
        other => VisibilityError::Training(format!("{} failed to fit: {}", kind, other)),
    }
}

/// Select the configured estimator and fit it.
///
/// With a non-empty grid this runs a k-fold grid search and refits the best
/// candidate on all of `x`; otherwise the estimator is fitted with defaults.
pub fn train(x: &Array2<f64>, y: &Array1<f64>, config: &ModelConfig) -> Result<TrainedModel> {
    let kind: ModelKind = config.chosen_model.parse()?;
    if x.nrows() != y.len() {
        return Err(VisibilityError::ShapeError {
            expected: format!("{} targets", x.nrows()),
            actual: format!("{} targets", y.len()),
        });
    }

    if config.has_search_grid() {
        let mut parallel = ParallelConfig::new();
        if let Some(n) = config.n_jobs {
            parallel = parallel.with_threads(n);
        }
        let result = GridSearch::new(kind, config.param_grid.clone())
            .with_cv(KFold::new(config.cv_folds))
            .with_parallel(parallel)
            .fit(x, y)
            .map_err(|e| fit_failure(kind, e))?;

        return Ok(TrainedModel {
            estimator: result.best_estimator,
            params: result.best_params,
            cv_score: Some(result.best_score),
        });
    }

    let mut estimator = kind.build(&ParamSet::new())?;
    estimator.fit(x, y).map_err(|e| fit_failure(kind, e))?;
    info!(model = %kind, rows = x.nrows(), "Fitted with default hyperparameters");

    Ok(TrainedModel {
        estimator,
        params: ParamSet::new(),
        cv_score: None,
    })
}

/// Training stage
#[derive(Debug, Clone)]
pub struct ModelTrainer {
    config: ModelConfig,
}

impl ModelTrainer {
    pub fn new(config: ModelConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ModelConfig {
        &self.config
    }

    pub fn train(&self, x: &Array2<f64>, y: &Array1<f64>) -> Result<TrainedModel> {
        train(x, y, &self.config)
    }

    /// Train on the processed training matrix and persist the model artifact
    pub fn run_and_save(&self, paths: &ArtifactPaths) -> Result<ModelArtifact> {
        let matrix = ProcessedMatrix::load(&paths.processed_train)?;
        info!(
            model = %self.config.chosen_model,
            rows = matrix.n_samples(),
            features = matrix.feature_names.len(),
            grid_search = self.config.has_search_grid(),
            "Training started"
        );

        let model = self.train(&matrix.features, &matrix.target)?;
        let artifact = ModelArtifact::new(model, matrix.feature_names, matrix.target_column);
        artifact.save(&paths.model)?;
        info!(
            model = %artifact.model_name,
            params = ?artifact.model.params(),
            path = %paths.model.display(),
            "Model artifact saved"
        );
        Ok(artifact)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ParamGrid, ParamValue};

    fn data(n: usize) -> (Array2<f64>, Array1<f64>) {
        let x = Array2::from_shape_fn((n, 3), |(i, j)| ((i * (j + 2)) % 11) as f64);
        let y = x.column(0).mapv(|v| 1.5 * v) - &x.column(2) + 4.0;
        (x, y)
    }

    #[test]
    fn test_linear_regression_without_grid() {
        let (x, y) = data(24);
        let model = train(&x, &y, &ModelConfig::new("Linear Regression")).unwrap();
        assert_eq!(model.kind(), ModelKind::LinearRegression);
        assert_eq!(model.predict(&x).unwrap().len(), 24);
        assert!(model.params().is_empty());
        assert!(model.cv_score().is_none());
    }

    #[test]
    fn test_unsupported_model() {
        let (x, y) = data(10);
        assert!(matches!(
            train(&x, &y, &ModelConfig::new("XGBoost")),
            Err(VisibilityError::UnsupportedModel(_))
        ));
    }

    #[test]
    fn test_grid_search_selects_from_grid() {
        let (x, y) = data(30);
        let mut grid = ParamGrid::new();
        let depths = vec![ParamValue::Int(1), ParamValue::Int(4)];
        grid.insert("max_depth".to_string(), depths.clone());
        grid.insert("min_samples_leaf".to_string(), vec![ParamValue::Int(1), ParamValue::Int(2)]);

        let config = ModelConfig::new("DecisionTreeRegressor").with_grid(grid).with_n_jobs(2);
        let model = train(&x, &y, &config).unwrap();

        assert!(depths.contains(&model.params()["max_depth"]));
        assert!(model.params().contains_key("min_samples_leaf"));
        assert!(model.cv_score().is_some());
        assert_eq!(model.predict(&x).unwrap().len(), 30);
    }

    #[test]
    fn test_empty_grid_uses_defaults() {
        let (x, y) = data(12);
        let mut grid = ParamGrid::new();
        grid.insert("alpha".to_string(), vec![]);
        let model = train(&x, &y, &ModelConfig::new("Ridge Regression").with_grid(grid)).unwrap();
        assert!(model.params().is_empty());
    }

    #[test]
    fn test_fit_failure_is_training_error() {
        let x = Array2::zeros((0, 2));
        let y = Array1::zeros(0);
        assert!(matches!(
            train(&x, &y, &ModelConfig::new("Random Forest Regression")),
            Err(VisibilityError::Training(_))
        ));
    }
}
