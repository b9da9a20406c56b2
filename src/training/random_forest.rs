//! Random forest regressor

use super::decision_tree::DecisionTreeRegressor;
use crate::error::{Result, VisibilityError};
use ndarray::{Array1, Array2, Axis};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

/// Strategy for the number of features examined per split
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum MaxFeatures {
    Sqrt,
    Log2,
    Fraction(f64),
    Fixed(usize),
    All,
}

impl MaxFeatures {
    pub fn resolve(&self, n_features: usize) -> usize {
        match *self {
            MaxFeatures::Sqrt => (n_features as f64).sqrt().floor() as usize,
            MaxFeatures::Log2 => (n_features as f64).log2().floor() as usize,
            MaxFeatures::Fraction(f) => (n_features as f64 * f).floor() as usize,
            MaxFeatures::Fixed(n) => n.min(n_features),
            MaxFeatures::All => n_features,
        }
        .max(1)
    }
}

/// Bagged ensemble of regression trees averaging their predictions
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RandomForestRegressor {
    trees: Vec<DecisionTreeRegressor>,
    pub n_estimators: usize,
    pub max_depth: Option<usize>,
    pub min_samples_split: usize,
    pub min_samples_leaf: usize,
    pub max_features: MaxFeatures,
    pub bootstrap: bool,
    pub random_state: Option<u64>,
    n_features: usize,
    feature_importances: Option<Array1<f64>>,
}

impl Default for RandomForestRegressor {
    fn default() -> Self {
        Self::new(100)
    }
}

impl RandomForestRegressor {
    pub fn new(n_estimators: usize) -> Self {
        Self {
            trees: Vec::new(),
            n_estimators,
            max_depth: None,
            min_samples_split: 2,
            min_samples_leaf: 1,
            max_features: MaxFeatures::All,
            bootstrap: true,
            random_state: Some(42),
            n_features: 0,
            feature_importances: None,
        }
    }

    pub fn with_n_estimators(mut self, n: usize) -> Self {
        self.n_estimators = n;
        self
    }

    pub fn with_max_depth(mut self, depth: Option<usize>) -> Self {
        self.max_depth = depth;
        self
    }

    pub fn with_min_samples_split(mut self, min_samples: usize) -> Self {
        self.min_samples_split = min_samples;
        self
    }

    pub fn with_min_samples_leaf(mut self, min_samples: usize) -> Self {
        self.min_samples_leaf = min_samples;
        self
    }

    pub fn with_max_features(mut self, max_features: MaxFeatures) -> Self {
        self.max_features = max_features;
        self
    }

    pub fn with_bootstrap(mut self, bootstrap: bool) -> Self {
        self.bootstrap = bootstrap;
        self
    }

    pub fn with_random_state(mut self, seed: Option<u64>) -> Self {
        self.random_state = seed;
        self
    }

    /// Fit the forest; trees are grown in parallel, each from its own seed
    pub fn fit(&mut self, x: &Array2<f64>, y: &Array1<f64>) -> Result<&mut Self> {
        let n_samples = x.nrows();
        let n_features = x.ncols();

        if n_samples != y.len() {
            return Err(VisibilityError::ShapeError {
                expected: format!("y length = {}", n_samples),
                actual: format!("y length = {}", y.len()),
            });
        }
        if self.n_estimators == 0 {
            return Err(VisibilityError::InvalidParameter {
                name: "n_estimators".to_string(),
                value: "0".to_string(),
                reason: "must be at least 1".to_string(),
            });
        }
        if n_samples == 0 {
            return Err(VisibilityError::Training("cannot fit a forest on zero samples".to_string()));
        }

        self.n_features = n_features;
        let max_features = self.max_features.resolve(n_features);
        let base_seed = self.random_state.unwrap_or(42);

        let trees: Vec<DecisionTreeRegressor> = (0..self.n_estimators)
            .into_par_iter()
            .map(|tree_idx| {
                let seed = base_seed.wrapping_add(tree_idx as u64);
                let mut rng = ChaCha8Rng::seed_from_u64(seed);

                let (x_tree, y_tree) = if self.bootstrap {
                    let rows: Vec<usize> = (0..n_samples).map(|_| rng.gen_range(0..n_samples)).collect();
                    let y_rows: Array1<f64> = rows.iter().map(|&i| y[i]).collect();
                    (x.select(Axis(0), &rows), y_rows)
                } else {
                    (x.clone(), y.clone())
                };

                let mut tree = DecisionTreeRegressor::new()
                    .with_max_depth(self.max_depth)
                    .with_min_samples_split(self.min_samples_split)
                    .with_min_samples_leaf(self.min_samples_leaf)
                    .with_max_features(Some(max_features))
                    .with_random_state(Some(seed));
                tree.fit(&x_tree, &y_tree)?;
                Ok(tree)
            })
            .collect::<Result<Vec<_>>>()?;

        let mut importances = Array1::<f64>::zeros(n_features);
        for tree in &trees {
            if let Some(imp) = tree.feature_importances() {
                importances += imp;
            }
        }
        let total = importances.sum();
        if total > 0.0 {
            importances /= total;
        }

        self.trees = trees;
        self.feature_importances = Some(importances);
        Ok(self)
    }

    /// Mean of the per-tree predictions
    pub fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        if self.trees.is_empty() {
            return Err(VisibilityError::ModelNotFitted);
        }

        let per_tree = self
            .trees
            .par_iter()
            .map(|tree| tree.predict(x))
            .collect::<Result<Vec<_>>>()?;

        let mut sum = Array1::<f64>::zeros(x.nrows());
        for preds in &per_tree {
            sum += preds;
        }
        Ok(sum / self.trees.len() as f64)
    }

    pub fn n_trees(&self) -> usize {
        self.trees.len()
    }

    pub fn feature_importances(&self) -> Option<&Array1<f64>> {
        self.feature_importances.as_ref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    fn linear_data() -> (Array2<f64>, Array1<f64>) {
        let x = Array2::from_shape_fn((40, 2), |(i, j)| (i as f64) * (j as f64 + 1.0));
        let y = x.column(0).mapv(|v| 2.0 * v + 1.0);
        (x, y)
    }

    #[test]
    fn test_forest_fits_reasonably() {
        let (x, y) = linear_data();
        let mut forest = RandomForestRegressor::new(20);
        forest.fit(&x, &y).unwrap();

        let preds = forest.predict(&x).unwrap();
        let mse = (&preds - &y).mapv(|d| d * d).mean().unwrap();
        assert!(mse < 10.0, "MSE too high: {}", mse);
        assert_eq!(forest.n_trees(), 20);
    }

    #[test]
    fn test_same_seed_same_forest() {
        let (x, y) = linear_data();
        let mut a = RandomForestRegressor::new(5).with_random_state(Some(7));
        let mut b = RandomForestRegressor::new(5).with_random_state(Some(7));
        a.fit(&x, &y).unwrap();
        b.fit(&x, &y).unwrap();
        assert_eq!(a.predict(&x).unwrap(), b.predict(&x).unwrap());
    }

    #[test]
    fn test_no_bootstrap_full_depth_is_exact() {
        let x = array![[1.0], [2.0], [3.0], [4.0]];
        let y = array![3.0, 1.0, 4.0, 1.5];
        let mut forest = RandomForestRegressor::new(3).with_bootstrap(false);
        forest.fit(&x, &y).unwrap();
        assert_eq!(forest.predict(&x).unwrap(), y);
    }

    #[test]
    fn test_max_features_resolve() {
        assert_eq!(MaxFeatures::Sqrt.resolve(5), 2);
        assert_eq!(MaxFeatures::Log2.resolve(5), 2);
        assert_eq!(MaxFeatures::Fraction(0.5).resolve(5), 2);
        assert_eq!(MaxFeatures::Fixed(9).resolve(5), 5);
        assert_eq!(MaxFeatures::All.resolve(5), 5);
        assert_eq!(MaxFeatures::Fraction(0.01).resolve(5), 1);
    }

    #[test]
    fn test_unfitted() {
        let forest = RandomForestRegressor::default();
        assert!(matches!(
            forest.predict(&array![[1.0]]),
            Err(VisibilityError::ModelNotFitted)
        ));
    }
}
