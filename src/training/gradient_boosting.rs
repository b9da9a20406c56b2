//! Gradient boosted regression trees (squared-error loss)

use super::decision_tree::DecisionTreeRegressor;
use crate::error::{Result, VisibilityError};
use ndarray::{Array1, Array2, Axis};
use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_xoshiro::Xoshiro256PlusPlus;
use serde::{Deserialize, Serialize};

/// Gradient boosting hyperparameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GradientBoostingConfig {
    /// Number of boosting stages
    pub n_estimators: usize,
    /// Shrinkage applied to each stage
    pub learning_rate: f64,
    pub max_depth: usize,
    pub min_samples_leaf: usize,
    /// Fraction of rows drawn (without replacement) per stage
    pub subsample: f64,
    pub random_state: Option<u64>,
}

impl Default for GradientBoostingConfig {
    fn default() -> Self {
        Self {
            n_estimators: 100,
            learning_rate: 0.1,
            max_depth: 3,
            min_samples_leaf: 1,
            subsample: 1.0,
            random_state: Some(42),
        }
    }
}

impl GradientBoostingConfig {
    fn validate(&self) -> Result<()> {
        let invalid = |name: &str, value: String, reason: &str| VisibilityError::InvalidParameter {
            name: name.to_string(),
            value,
            reason: reason.to_string(),
        };
        if self.n_estimators == 0 {
            return Err(invalid("n_estimators", "0".into(), "must be at least 1"));
        }
        if !(self.learning_rate > 0.0) {
            return Err(invalid("learning_rate", self.learning_rate.to_string(), "must be positive"));
        }
        if !(self.subsample > 0.0 && self.subsample <= 1.0) {
            return Err(invalid("subsample", self.subsample.to_string(), "must be in (0, 1]"));
        }
        Ok(())
    }
}

/// Additive model: mean of the targets plus shrunken residual trees
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GradientBoostingRegressor {
    config: GradientBoostingConfig,
    trees: Vec<DecisionTreeRegressor>,
    initial_prediction: f64,
    train_loss: Vec<f64>,
}

impl Default for GradientBoostingRegressor {
    fn default() -> Self {
        Self::new(GradientBoostingConfig::default())
    }
}

impl GradientBoostingRegressor {
    pub fn new(config: GradientBoostingConfig) -> Self {
        Self {
            config,
            trees: Vec::new(),
            initial_prediction: 0.0,
            train_loss: Vec::new(),
        }
    }

    pub fn config(&self) -> &GradientBoostingConfig {
        &self.config
    }

    pub fn fit(&mut self, x: &Array2<f64>, y: &Array1<f64>) -> Result<&mut Self> {
        self.config.validate()?;
        let n_samples = x.nrows();
        if n_samples != y.len() {
            return Err(VisibilityError::ShapeError {
                expected: format!("y length = {}", n_samples),
                actual: format!("y length = {}", y.len()),
            });
        }
        let initial = y.mean().ok_or_else(|| {
            VisibilityError::Training("cannot fit boosting on zero samples".to_string())
        })?;

        let mut rng = match self.config.random_state {
            Some(seed) => Xoshiro256PlusPlus::seed_from_u64(seed),
            None => Xoshiro256PlusPlus::from_entropy(),
        };

        let mut predictions = Array1::from_elem(n_samples, initial);
        let mut trees = Vec::with_capacity(self.config.n_estimators);
        let mut train_loss = Vec::with_capacity(self.config.n_estimators);

        for _ in 0..self.config.n_estimators {
            let residuals = y - &predictions;
            let rows = self.subsample_rows(n_samples, &mut rng);

            let x_stage = x.select(Axis(0), &rows);
            let r_stage: Array1<f64> = rows.iter().map(|&i| residuals[i]).collect();

            let mut tree = DecisionTreeRegressor::new()
                .with_max_depth(Some(self.config.max_depth))
                .with_min_samples_leaf(self.config.min_samples_leaf);
            tree.fit(&x_stage, &r_stage)?;

            predictions.scaled_add(self.config.learning_rate, &tree.predict(x)?);
            train_loss.push((y - &predictions).mapv(|d| d * d).mean().unwrap_or(0.0));
            trees.push(tree);
        }

        self.initial_prediction = initial;
        self.trees = trees;
        self.train_loss = train_loss;
        Ok(self)
    }

    fn subsample_rows(&self, n: usize, rng: &mut Xoshiro256PlusPlus) -> Vec<usize> {
        let mut rows: Vec<usize> = (0..n).collect();
        if self.config.subsample < 1.0 {
            let size = ((n as f64) * self.config.subsample).ceil().max(1.0) as usize;
            rows.shuffle(rng);
            rows.truncate(size);
            rows.sort_unstable();
        }
        rows
    }

    pub fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        if self.trees.is_empty() {
            return Err(VisibilityError::ModelNotFitted);
        }
        let mut predictions = Array1::from_elem(x.nrows(), self.initial_prediction);
        for tree in &self.trees {
            predictions.scaled_add(self.config.learning_rate, &tree.predict(x)?);
        }
        Ok(predictions)
    }

    /// Training MSE after each stage
    pub fn train_loss(&self) -> &[f64] {
        &self.train_loss
    }

    pub fn n_stages(&self) -> usize {
        self.trees.len()
    }
}
