//! `params.yaml` configuration

use crate::error::{Result, VisibilityError};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;

/// A single hyperparameter value as written in `params.yaml`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ParamValue {
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    Null,
}

impl ParamValue {
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            ParamValue::Int(v) => Some(*v as f64),
            ParamValue::Float(v) => Some(*v),
            _ => None,
        }
    }

    /// Non-negative integer value (floats with no fractional part are accepted)
    pub fn as_usize(&self) -> Option<usize> {
        match self {
            ParamValue::Int(v) if *v >= 0 => Some(*v as usize),
            ParamValue::Float(v) if *v >= 0.0 && v.fract() == 0.0 => Some(*v as usize),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            ParamValue::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, ParamValue::Null)
    }
}

impl fmt::Display for ParamValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParamValue::Bool(b) => write!(f, "{}", b),
            ParamValue::Int(v) => write!(f, "{}", v),
            ParamValue::Float(v) => write!(f, "{}", v),
            ParamValue::Str(s) => write!(f, "{}", s),
            ParamValue::Null => write!(f, "null"),
        }
    }
}

/// Hyperparameter grid: parameter name -> candidate values.
/// Keys iterate in lexicographic order, which fixes the candidate order.
pub type ParamGrid = BTreeMap<String, Vec<ParamValue>>;

/// `data_ingestion` section
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IngestionParams {
    #[serde(default = "default_collection_name")]
    pub collection_name: String,
    #[serde(default = "default_test_size")]
    pub test_size: f64,
    #[serde(default = "default_random_state")]
    pub random_state: u64,
}

fn default_collection_name() -> String {
    "visibility_data".to_string()
}

fn default_test_size() -> f64 {
    0.2
}

fn default_random_state() -> u64 {
    42
}

impl Default for IngestionParams {
    fn default() -> Self {
        Self {
            collection_name: default_collection_name(),
            test_size: default_test_size(),
            random_state: default_random_state(),
        }
    }
}

/// `model_trainer` section
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainerParams {
    pub chosen_model: String,
    #[serde(default = "default_cv_folds")]
    pub cv_folds: usize,
    /// Upper bound on grid-search workers (None = rayon default)
    #[serde(default)]
    pub n_jobs: Option<usize>,
}

fn default_cv_folds() -> usize {
    3
}

/// Per-model entry under `model_selection.model`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ModelEntry {
    #[serde(default)]
    pub search_param_grid: ParamGrid,
}

/// `model_selection` section
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ModelSelection {
    #[serde(default)]
    pub model: BTreeMap<String, Option<ModelEntry>>,
}

/// Root of `params.yaml`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineParams {
    #[serde(default)]
    pub data_ingestion: IngestionParams,
    pub model_trainer: TrainerParams,
    #[serde(default)]
    pub model_selection: ModelSelection,
}

impl PipelineParams {
    /// Params for `chosen_model` with all other settings at their defaults
    pub fn new(chosen_model: impl Into<String>) -> Self {
        Self {
            data_ingestion: IngestionParams::default(),
            model_trainer: TrainerParams {
                chosen_model: chosen_model.into(),
                cv_folds: default_cv_folds(),
                n_jobs: None,
            },
            model_selection: ModelSelection::default(),
        }
    }

    /// Load and validate a `params.yaml` file
    pub fn from_yaml_file(path: impl AsRef<Path>) -> Result<Self> {
        let params: Self = super::read_yaml(path.as_ref())?;
        params.validate()?;
        Ok(params)
    }

    pub fn with_test_size(mut self, test_size: f64) -> Self {
        self.data_ingestion.test_size = test_size;
        self
    }

    pub fn with_random_state(mut self, seed: u64) -> Self {
        self.data_ingestion.random_state = seed;
        self
    }

    /// Attach a search grid for `model`
    pub fn with_grid(mut self, model: impl Into<String>, grid: ParamGrid) -> Self {
        self.model_selection.model.insert(
            model.into(),
            Some(ModelEntry {
                search_param_grid: grid,
            }),
        );
        self
    }

    pub fn validate(&self) -> Result<()> {
        let test_size = self.data_ingestion.test_size;
        if !(test_size > 0.0 && test_size < 1.0) {
            return Err(VisibilityError::Config(format!(
                "data_ingestion.test_size must be in (0, 1), got {}",
                test_size
            )));
        }
        if self.model_trainer.cv_folds < 2 {
            return Err(VisibilityError::Config(format!(
                "model_trainer.cv_folds must be at least 2, got {}",
                self.model_trainer.cv_folds
            )));
        }
        if self.model_trainer.n_jobs == Some(0) {
            return Err(VisibilityError::Config(
                "model_trainer.n_jobs must be positive".to_string(),
            ));
        }
        Ok(())
    }

    /// Resolve the chosen model and its (possibly empty) grid
    pub fn model_config(&self) -> ModelConfig {
        let chosen = &self.model_trainer.chosen_model;
        let param_grid = self
            .model_selection
            .model
            .get(chosen)
            .and_then(|entry| entry.as_ref())
            .map(|entry| entry.search_param_grid.clone())
            .unwrap_or_default();

        ModelConfig {
            chosen_model: chosen.clone(),
            param_grid,
            cv_folds: self.model_trainer.cv_folds,
            n_jobs: self.model_trainer.n_jobs,
        }
    }
}

/// Chosen model name plus its optional hyperparameter grid
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelConfig {
    pub chosen_model: String,
    pub param_grid: ParamGrid,
    pub cv_folds: usize,
    pub n_jobs: Option<usize>,
}

impl ModelConfig {
    pub fn new(chosen_model: impl Into<String>) -> Self {
        Self {
            chosen_model: chosen_model.into(),
            param_grid: ParamGrid::new(),
            cv_folds: default_cv_folds(),
            n_jobs: None,
        }
    }

    pub fn with_grid(mut self, grid: ParamGrid) -> Self {
        self.param_grid = grid;
        self
    }

    pub fn with_n_jobs(mut self, n_jobs: usize) -> Self {
        self.n_jobs = Some(n_jobs);
        self
    }

    /// Grid search runs only when at least one parameter has candidates
    pub fn has_search_grid(&self) -> bool {
        self.param_grid.values().any(|values| !values.is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PARAMS: &str = r#"
data_ingestion:
  test_size: 0.25
model_trainer:
  chosen_model: Ridge Regression
model_selection:
  model:
    Linear Regression:
    Ridge Regression:
      search_param_grid:
        alpha: [0.1, 1, 10.0]
        fit_intercept: [true, false]
    Random Forest Regression:
      search_param_grid:
        max_depth: [null, 5]
"#;

    #[test]
    fn test_parse_params_yaml() {
        let params: PipelineParams = serde_yaml::from_str(PARAMS).unwrap();
        assert_eq!(params.data_ingestion.test_size, 0.25);
        assert_eq!(params.data_ingestion.random_state, 42);
        assert_eq!(params.model_trainer.cv_folds, 3);

        let config = params.model_config();
        assert_eq!(config.chosen_model, "Ridge Regression");
        assert_eq!(
            config.param_grid["alpha"],
            vec![ParamValue::Float(0.1), ParamValue::Int(1), ParamValue::Float(10.0)]
        );
        assert!(config.has_search_grid());
    }

    #[test]
    fn test_null_entry_has_no_grid() {
        let mut params: PipelineParams = serde_yaml::from_str(PARAMS).unwrap();
        params.model_trainer.chosen_model = "Linear Regression".to_string();
        assert!(!params.model_config().has_search_grid());
    }

    #[test]
    fn test_null_param_value() {
        let params: PipelineParams = serde_yaml::from_str(PARAMS).unwrap();
        let entry = params.model_selection.model["Random Forest Regression"]
            .as_ref()
            .unwrap();
        assert!(entry.search_param_grid["max_depth"][0].is_null());
        assert_eq!(entry.search_param_grid["max_depth"][1].as_usize(), Some(5));
    }

    #[test]
    fn test_validate_rejects_bad_fraction() {
        let params = PipelineParams::new("Linear Regression").with_test_size(1.5);
        assert!(matches!(params.validate(), Err(VisibilityError::Config(_))));
    }

    #[test]
    fn test_empty_value_lists_do_not_trigger_search() {
        let mut grid = ParamGrid::new();
        grid.insert("alpha".to_string(), vec![]);
        let config = ModelConfig::new("Ridge Regression").with_grid(grid);
        assert!(!config.has_search_grid());
    }
}
