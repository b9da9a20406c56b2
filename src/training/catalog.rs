//! Fixed model catalog
//!
//! Every supported estimator is one [`ModelKind`] case. Names are the ones
//! used in `params.yaml`.

use super::decision_tree::DecisionTreeRegressor;
use super::gradient_boosting::{GradientBoostingConfig, GradientBoostingRegressor};
use super::linear_models::{LassoRegression, LinearRegression, RidgeRegression};
use super::random_forest::{MaxFeatures, RandomForestRegressor};
use crate::config::ParamValue;
use crate::error::{Result, VisibilityError};
use ndarray::{Array1, Array2};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// One concrete assignment of hyperparameters
pub type ParamSet = BTreeMap<String, ParamValue>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ModelKind {
    LinearRegression,
    RidgeRegression,
    LassoRegression,
    RandomForestRegression,
    GradientBoostingRegression,
    DecisionTreeRegressor,
}

impl ModelKind {
    pub const ALL: [ModelKind; 6] = [
        ModelKind::LinearRegression,
        ModelKind::RidgeRegression,
        ModelKind::LassoRegression,
        ModelKind::RandomForestRegression,
        ModelKind::GradientBoostingRegression,
        ModelKind::DecisionTreeRegressor,
    ];

    /// Catalog name as configured
    pub fn name(&self) -> &'static str {
        match self {
            ModelKind::LinearRegression => "Linear Regression",
            ModelKind::RidgeRegression => "Ridge Regression",
            ModelKind::LassoRegression => "Lasso Regression",
            ModelKind::RandomForestRegression => "Random Forest Regression",
            ModelKind::GradientBoostingRegression => "Gradient Boosting Regression",
            ModelKind::DecisionTreeRegressor => "DecisionTreeRegressor",
        }
    }

    /// Hyperparameters accepted as grid keys
    pub fn tunable_params(&self) -> &'static [&'static str] {
        match self {
            ModelKind::LinearRegression => &["fit_intercept"],
            ModelKind::RidgeRegression => &["alpha", "fit_intercept"],
            ModelKind::LassoRegression => &["alpha", "fit_intercept", "max_iter", "tol"],
            ModelKind::DecisionTreeRegressor => {
                &["max_depth", "max_features", "min_samples_leaf", "min_samples_split", "random_state"]
            }
            ModelKind::RandomForestRegression => &[
                "bootstrap",
                "max_depth",
                "max_features",
                "min_samples_leaf",
                "min_samples_split",
                "n_estimators",
                "random_state",
            ],
            ModelKind::GradientBoostingRegression => &[
                "learning_rate",
                "max_depth",
                "min_samples_leaf",
                "n_estimators",
                "random_state",
                "subsample",
            ],
        }
    }

    /// Unfitted estimator with defaults overridden by `params`
    pub fn build(&self, params: &ParamSet) -> Result<Estimator> {
        if let Some(unknown) = params
            .keys()
            .find(|key| !self.tunable_params().contains(&key.as_str()))
        {
            return Err(VisibilityError::InvalidParameter {
                name: unknown.clone(),
                value: params[unknown].to_string(),
                reason: format!("not a tunable parameter of {}", self.name()),
            });
        }
        let p = Params(params);

        Ok(match self {
            ModelKind::LinearRegression => Estimator::Linear(
                LinearRegression::new().with_fit_intercept(p.bool_or("fit_intercept", true)?),
            ),
            ModelKind::RidgeRegression => Estimator::Ridge(
                RidgeRegression::new(p.f64_or("alpha", 1.0)?)
                    .with_fit_intercept(p.bool_or("fit_intercept", true)?),
            ),
            ModelKind::LassoRegression => Estimator::Lasso(
                LassoRegression::new(p.f64_or("alpha", 1.0)?)
                    .with_max_iter(p.usize_or("max_iter", 1000)?)
                    .with_tol(p.f64_or("tol", 1e-4)?)
                    .with_fit_intercept(p.bool_or("fit_intercept", true)?),
            ),
            ModelKind::DecisionTreeRegressor => {
                let max_features = match p.max_features()? {
                    None | Some(MaxFeatures::All) => None,
                    Some(MaxFeatures::Fixed(n)) => Some(n),
                    Some(other) => {
                        return Err(VisibilityError::InvalidParameter {
                            name: "max_features".to_string(),
                            value: format!("{:?}", other),
                            reason: "a single tree accepts an integer or null".to_string(),
                        })
                    }
                };
                Estimator::DecisionTree(
                    DecisionTreeRegressor::new()
                        .with_max_depth(p.optional_usize("max_depth")?)
                        .with_min_samples_split(p.usize_or("min_samples_split", 2)?)
                        .with_min_samples_leaf(p.usize_or("min_samples_leaf", 1)?)
                        .with_max_features(max_features)
                        .with_random_state(p.optional_seed("random_state")?),
                )
            }
            ModelKind::RandomForestRegression => {
                let mut forest = RandomForestRegressor::new(p.usize_or("n_estimators", 100)?)
                    .with_max_depth(p.optional_usize("max_depth")?)
                    .with_min_samples_split(p.usize_or("min_samples_split", 2)?)
                    .with_min_samples_leaf(p.usize_or("min_samples_leaf", 1)?)
                    .with_max_features(p.max_features()?.unwrap_or(MaxFeatures::All))
                    .with_bootstrap(p.bool_or("bootstrap", true)?);
                if params.contains_key("random_state") {
                    forest = forest.with_random_state(p.optional_seed("random_state")?);
                }
                Estimator::RandomForest(forest)
            }
            ModelKind::GradientBoostingRegression => {
                let defaults = GradientBoostingConfig::default();
                let random_state = if params.contains_key("random_state") {
                    p.optional_seed("random_state")?
                } else {
                    defaults.random_state
                };
                Estimator::GradientBoosting(GradientBoostingRegressor::new(GradientBoostingConfig {
                    n_estimators: p.usize_or("n_estimators", defaults.n_estimators)?,
                    learning_rate: p.f64_or("learning_rate", defaults.learning_rate)?,
                    max_depth: p.usize_or("max_depth", defaults.max_depth)?,
                    min_samples_leaf: p.usize_or("min_samples_leaf", defaults.min_samples_leaf)?,
                    subsample: p.f64_or("subsample", defaults.subsample)?,
                    random_state,
                }))
            }
        })
    }
}

impl fmt::Display for ModelKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for ModelKind {
    type Err = VisibilityError;

    fn from_str(s: &str) -> Result<Self> {
        ModelKind::ALL
            .into_iter()
            .find(|kind| kind.name() == s)
            .ok_or_else(|| {
                let known: Vec<&str> = ModelKind::ALL.iter().map(|k| k.name()).collect();
                VisibilityError::UnsupportedModel(format!(
                    "'{}' (known models: {})",
                    s,
                    known.join(", ")
                ))
            })
    }
}

/// Typed accessors over a parameter set
struct Params<'a>(&'a ParamSet);

impl Params<'_> {
    fn invalid(name: &str, value: &ParamValue, reason: &str) -> VisibilityError {
        VisibilityError::InvalidParameter {
            name: name.to_string(),
            value: value.to_string(),
            reason: reason.to_string(),
        }
    }

    fn bool_or(&self, name: &str, default: bool) -> Result<bool> {
        match self.0.get(name) {
            None => Ok(default),
            Some(v) => v.as_bool().ok_or_else(|| Self::invalid(name, v, "expected a boolean")),
        }
    }

    fn f64_or(&self, name: &str, default: f64) -> Result<f64> {
        match self.0.get(name) {
            None => Ok(default),
            Some(v) => v.as_f64().ok_or_else(|| Self::invalid(name, v, "expected a number")),
        }
    }

    fn usize_or(&self, name: &str, default: usize) -> Result<usize> {
        match self.0.get(name) {
            None => Ok(default),
            Some(v) => v
                .as_usize()
                .ok_or_else(|| Self::invalid(name, v, "expected a non-negative integer")),
        }
    }

    /// Integer or null (null meaning unlimited)
    fn optional_usize(&self, name: &str) -> Result<Option<usize>> {
        match self.0.get(name) {
            None | Some(ParamValue::Null) => Ok(None),
            Some(v) => v
                .as_usize()
                .map(Some)
                .ok_or_else(|| Self::invalid(name, v, "expected a non-negative integer or null")),
        }
    }

    fn optional_seed(&self, name: &str) -> Result<Option<u64>> {
        Ok(self.optional_usize(name)?.map(|seed| seed as u64))
    }

    fn max_features(&self) -> Result<Option<MaxFeatures>> {
        let Some(value) = self.0.get("max_features") else {
            return Ok(None);
        };
        let parsed = match value {
            ParamValue::Null => MaxFeatures::All,
            ParamValue::Str(s) => match s.to_ascii_lowercase().as_str() {
                "sqrt" => MaxFeatures::Sqrt,
                "log2" => MaxFeatures::Log2,
                "all" | "auto" => MaxFeatures::All,
                _ => return Err(Self::invalid("max_features", value, "expected sqrt, log2 or all")),
            },
            ParamValue::Int(n) if *n > 0 => MaxFeatures::Fixed(*n as usize),
            ParamValue::Float(f) if *f > 0.0 && *f <= 1.0 => MaxFeatures::Fraction(*f),
            _ => {
                return Err(Self::invalid(
                    "max_features",
                    value,
                    "expected a positive integer, a fraction in (0, 1], or a strategy name",
                ))
            }
        };
        Ok(Some(parsed))
    }
}

/// An estimator from the catalog, fitted or not
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", content = "state")]
pub enum Estimator {
    Linear(LinearRegression),
    Ridge(RidgeRegression),
    Lasso(LassoRegression),
    DecisionTree(DecisionTreeRegressor),
    RandomForest(RandomForestRegressor),
    GradientBoosting(GradientBoostingRegressor),
}

impl Estimator {
    pub fn kind(&self) -> ModelKind {
        match self {
            Estimator::Linear(_) => ModelKind::LinearRegression,
            Estimator::Ridge(_) => ModelKind::RidgeRegression,
            Estimator::Lasso(_) => ModelKind::LassoRegression,
            Estimator::DecisionTree(_) => ModelKind::DecisionTreeRegressor,
            Estimator::RandomForest(_) => ModelKind::RandomForestRegression,
            Estimator::GradientBoosting(_) => ModelKind::GradientBoostingRegression,
        }
    }

    pub fn fit(&mut self, x: &Array2<f64>, y: &Array1<f64>) -> Result<()> {
        match self {
            Estimator::Linear(m) => m.fit(x, y).map(|_| ()),
            Estimator::Ridge(m) => m.fit(x, y).map(|_| ()),
            Estimator::Lasso(m) => m.fit(x, y).map(|_| ()),
            Estimator::DecisionTree(m) => m.fit(x, y).map(|_| ()),
            Estimator::RandomForest(m) => m.fit(x, y).map(|_| ()),
            Estimator::GradientBoosting(m) => m.fit(x, y).map(|_| ()),
        }
    }

    pub fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        match self {
            Estimator::Linear(m) => m.predict(x),
            Estimator::Ridge(m) => m.predict(x),
            Estimator::Lasso(m) => m.predict(x),
            Estimator::DecisionTree(m) => m.predict(x),
            Estimator::RandomForest(m) => m.predict(x),
            Estimator::GradientBoosting(m) => m.predict(x),
        }
    }
}
