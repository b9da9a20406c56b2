//! CART regression tree (squared-error criterion)

use crate::error::{Result, VisibilityError};
use ndarray::{Array1, Array2, ArrayView1};
use rand::seq::index::sample;
use rand::SeedableRng;
use rand_xoshiro::Xoshiro256PlusPlus;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

/// Tree node, stored in a flat array; children are indices into it
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum TreeNode {
    Leaf {
        value: f64,
        n_samples: usize,
    },
    Split {
        feature_idx: usize,
        threshold: f64,
        left: usize,
        right: usize,
        n_samples: usize,
    },
}

/// Best split found for one feature: (feature, threshold, sse reduction)
type Candidate = (usize, f64, f64);

/// Regression tree minimising the within-node sum of squared errors
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DecisionTreeRegressor {
    /// Nodes in build order; the root is at index 0
    nodes: Vec<TreeNode>,
    pub max_depth: Option<usize>,
    pub min_samples_split: usize,
    pub min_samples_leaf: usize,
    /// Features examined per split; `None` examines all of them
    pub max_features: Option<usize>,
    /// Seed for the per-split feature subset
    pub random_state: Option<u64>,
    n_features: usize,
    feature_importances: Option<Array1<f64>>,
}

impl Default for DecisionTreeRegressor {
    fn default() -> Self {
        Self::new()
    }
}

impl DecisionTreeRegressor {
    pub fn new() -> Self {
        Self {
            nodes: Vec::new(),
            max_depth: None,
            min_samples_split: 2,
            min_samples_leaf: 1,
            max_features: None,
            random_state: None,
            n_features: 0,
            feature_importances: None,
        }
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

    pub fn with_max_features(mut self, max_features: Option<usize>) -> Self {
        self.max_features = max_features;
        self
    }

    pub fn with_random_state(mut self, seed: Option<u64>) -> Self {
        self.random_state = seed;
        self
    }

    fn validate(&self) -> Result<()> {
        if self.min_samples_split < 2 {
            return Err(VisibilityError::InvalidParameter {
                name: "min_samples_split".to_string(),
                value: self.min_samples_split.to_string(),
                reason: "must be at least 2".to_string(),
            });
        }
        if self.min_samples_leaf < 1 {
            return Err(VisibilityError::InvalidParameter {
                name: "min_samples_leaf".to_string(),
                value: self.min_samples_leaf.to_string(),
                reason: "must be at least 1".to_string(),
            });
        }
        if self.max_depth == Some(0) {
            return Err(VisibilityError::InvalidParameter {
                name: "max_depth".to_string(),
                value: "0".to_string(),
                reason: "must be at least 1".to_string(),
            });
        }
        if self.max_features == Some(0) {
            return Err(VisibilityError::InvalidParameter {
                name: "max_features".to_string(),
                value: "0".to_string(),
                reason: "must be at least 1".to_string(),
            });
        }
        Ok(())
    }

    /// Fit the tree to training data
    pub fn fit(&mut self, x: &Array2<f64>, y: &Array1<f64>) -> Result<&mut Self> {
        self.validate()?;
        let n_samples = x.nrows();
        let n_features = x.ncols();

        if n_samples != y.len() {
            return Err(VisibilityError::ShapeError {
                expected: format!("y length = {}", n_samples),
                actual: format!("y length = {}", y.len()),
            });
        }
        if n_samples == 0 {
            return Err(VisibilityError::Training("cannot fit a tree on zero samples".to_string()));
        }

        self.n_features = n_features;
        let mut importances = vec![0.0; n_features];
        let mut rng = Xoshiro256PlusPlus::seed_from_u64(self.random_state.unwrap_or(0));

        self.nodes = self.build_tree(x, y, &mut importances, &mut rng);

        let total: f64 = importances.iter().sum();
        if total > 0.0 {
            importances.iter_mut().for_each(|imp| *imp /= total);
        }
        self.feature_importances = Some(Array1::from_vec(importances));

        Ok(self)
    }

    /// Grow the tree depth-first with an explicit work stack, left subtree first
    fn build_tree(
        &self,
        x: &Array2<f64>,
        y: &Array1<f64>,
        importances: &mut [f64],
        rng: &mut Xoshiro256PlusPlus,
    ) -> Vec<TreeNode> {
        let placeholder = TreeNode::Leaf {
            value: 0.0,
            n_samples: 0,
        };
        let mut nodes = vec![placeholder];
        let mut pending: Vec<(usize, Vec<usize>, usize)> = vec![(0, (0..x.nrows()).collect(), 0)];

        while let Some((slot, indices, depth)) = pending.pop() {
            let n_samples = indices.len();
            let mean = indices.iter().map(|&i| y[i]).sum::<f64>() / n_samples as f64;

            let should_stop = n_samples < self.min_samples_split
                || n_samples < 2 * self.min_samples_leaf
                || self.max_depth.map_or(false, |d| depth >= d)
                || indices.iter().all(|&i| (y[i] - y[indices[0]]).abs() < 1e-12);
            let split = if should_stop {
                None
            } else {
                let features = self.candidate_features(x.ncols(), rng);
                self.find_best_split(x, y, &indices, &features)
            };

            let node = match split {
                None => TreeNode::Leaf {
                    value: mean,
                    n_samples,
                },
                Some((feature_idx, threshold, gain)) => {
                    let (left_indices, right_indices): (Vec<usize>, Vec<usize>) = indices
                        .iter()
                        .partition(|&&i| x[[i, feature_idx]] <= threshold);
                    importances[feature_idx] += gain;

                    let left = nodes.len();
                    let right = left + 1;
                    nodes.push(placeholder);
                    nodes.push(placeholder);
                    pending.push((right, right_indices, depth + 1));
                    pending.push((left, left_indices, depth + 1));

                    TreeNode::Split {
                        feature_idx,
                        threshold,
                        left,
                        right,
                        n_samples,
                    }
                }
            };
            nodes[slot] = node;
        }
        nodes
    }

    fn candidate_features(&self, n_features: usize, rng: &mut Xoshiro256PlusPlus) -> Vec<usize> {
        match self.max_features {
            Some(k) if k < n_features => {
                let mut chosen = sample(rng, n_features, k).into_vec();
                chosen.sort_unstable();
                chosen
            }
            _ => (0..n_features).collect(),
        }
    }

    /// Scan each candidate feature in sorted order with running sums.
    /// Ties keep the lowest feature index.
    fn find_best_split(
        &self,
        x: &Array2<f64>,
        y: &Array1<f64>,
        indices: &[usize],
        features: &[usize],
    ) -> Option<Candidate> {
        let n = indices.len();
        let total_sum: f64 = indices.iter().map(|&i| y[i]).sum();
        let total_sq: f64 = indices.iter().map(|&i| y[i] * y[i]).sum();
        let parent_sse = total_sq - total_sum * total_sum / n as f64;
        let min_leaf = self.min_samples_leaf;

        let per_feature: Vec<Option<Candidate>> = features
            .par_iter()
            .map(|&feature_idx| {
                let mut order: Vec<usize> = indices.to_vec();
                order.sort_by(|&a, &b| {
                    x[[a, feature_idx]]
                        .partial_cmp(&x[[b, feature_idx]])
                        .unwrap_or(std::cmp::Ordering::Equal)
                });

                let mut best: Option<Candidate> = None;
                let (mut left_sum, mut left_sq) = (0.0f64, 0.0f64);

                for pos in 0..n - 1 {
                    let yi = y[order[pos]];
                    left_sum += yi;
                    left_sq += yi * yi;

                    let left_count = pos + 1;
                    let right_count = n - left_count;
                    if left_count < min_leaf || right_count < min_leaf {
                        continue;
                    }

                    let here = x[[order[pos], feature_idx]];
                    let next = x[[order[pos + 1], feature_idx]];
                    if next <= here {
                        continue;
                    }

                    let right_sum = total_sum - left_sum;
                    let right_sq = total_sq - left_sq;
                    let left_sse = left_sq - left_sum * left_sum / left_count as f64;
                    let right_sse = right_sq - right_sum * right_sum / right_count as f64;
                    let gain = parent_sse - left_sse - right_sse;

                    if gain > 1e-12 && best.map_or(true, |(_, _, g)| gain > g) {
                        best = Some((feature_idx, (here + next) / 2.0, gain));
                    }
                }
                best
            })
            .collect();

        per_feature
            .into_iter()
            .flatten()
            .fold(None, |acc: Option<Candidate>, cand| match acc {
                Some(a) if a.2 >= cand.2 => Some(a),
                _ => Some(cand),
            })
    }

    fn predict_row(&self, row: ArrayView1<'_, f64>) -> Result<f64> {
        let mut idx = 0;
        // a well-formed tree reaches a leaf in fewer steps than it has nodes
        for _ in 0..self.nodes.len() {
            match self.nodes.get(idx) {
                Some(TreeNode::Leaf { value, .. }) => return Ok(*value),
                Some(TreeNode::Split {
                    feature_idx,
                    threshold,
                    left,
                    right,
                    ..
                }) => {
                    let value = row.get(*feature_idx).ok_or_else(|| corrupt_tree(idx))?;
                    idx = if *value <= *threshold { *left } else { *right };
                }
                None => return Err(corrupt_tree(idx)),
            }
        }
        Err(corrupt_tree(idx))
    }

    /// Predict one value per row
    pub fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        if !self.is_fitted() {
            return Err(VisibilityError::ModelNotFitted);
        }
        if x.ncols() != self.n_features {
            return Err(VisibilityError::ShapeError {
                expected: format!("{} features", self.n_features),
                actual: format!("{} features", x.ncols()),
            });
        }
        x.rows().into_iter().map(|row| self.predict_row(row)).collect()
    }

    pub fn is_fitted(&self) -> bool {
        !self.nodes.is_empty()
    }

    pub fn feature_importances(&self) -> Option<&Array1<f64>> {
        self.feature_importances.as_ref()
    }

    /// Flat node array, root first
    pub fn nodes(&self) -> &[TreeNode] {
        &self.nodes
    }

    pub fn get_depth(&self) -> usize {
        if self.nodes.is_empty() {
            return 0;
        }
        let mut max_depth = 0;
        let mut stack = vec![(0usize, 0usize)];
        while let Some((idx, depth)) = stack.pop() {
            match self.nodes.get(idx) {
                Some(TreeNode::Split { left, right, .. }) => {
                    stack.push((*left, depth + 1));
                    stack.push((*right, depth + 1));
                }
                _ => max_depth = max_depth.max(depth),
            }
        }
        max_depth
    }

    pub fn get_n_leaves(&self) -> usize {
        self.nodes
            .iter()
            .filter(|node| matches!(node, TreeNode::Leaf { .. }))
            .count()
    }
}

fn corrupt_tree(node: usize) -> VisibilityError {
    VisibilityError::InferenceDegraded(format!("decision tree node {} is malformed", node))
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_unlimited_tree_memorises_training_data() {
        let x = array![[1.0], [2.0], [3.0], [4.0], [5.0]];
        let y = array![1.0, 4.0, 9.0, 16.0, 25.0];

        let mut tree = DecisionTreeRegressor::new();
        tree.fit(&x, &y).unwrap();

        assert_eq!(tree.predict(&x).unwrap(), y);
        assert_eq!(tree.get_n_leaves(), 5);
    }

    #[test]
    fn test_max_depth() {
        let x = array![[1.0, 1.0], [2.0, 2.0], [3.0, 3.0], [4.0, 4.0], [5.0, 0.0], [6.0, 1.0]];
        let y = array![0.0, 1.0, 5.0, 6.0, 9.0, 12.0];

        let mut tree = DecisionTreeRegressor::new().with_max_depth(Some(1));
        tree.fit(&x, &y).unwrap();

        assert_eq!(tree.get_depth(), 1);
        assert_eq!(tree.get_n_leaves(), 2);
    }

    #[test]
    fn test_min_samples_leaf_respected() {
        let x = array![[1.0], [2.0], [3.0], [4.0]];
        let y = array![0.0, 0.0, 0.0, 100.0];

        let mut tree = DecisionTreeRegressor::new().with_min_samples_leaf(2);
        tree.fit(&x, &y).unwrap();

        let preds = tree.predict(&x).unwrap();
        assert_eq!(preds[0], 0.0);
        assert_eq!(preds[3], 50.0);
    }

    #[test]
    fn test_feature_importances() {
        let x = array![[1.0, 7.0], [2.0, 7.0], [3.0, 7.0], [4.0, 7.0]];
        let y = array![0.0, 0.0, 1.0, 1.0];

        let mut tree = DecisionTreeRegressor::new();
        tree.fit(&x, &y).unwrap();

        let importances = tree.feature_importances().unwrap();
        assert_eq!(importances[0], 1.0);
        assert_eq!(importances[1], 0.0);
    }

    #[test]
    fn test_deep_tree_survives_json_round_trip() {
        // geometric target: every split peels off one row, so depth grows with n
        let x = Array2::from_shape_fn((200, 1), |(i, _)| i as f64);
        let y = Array1::from_shape_fn(200, |i| 1.5f64.powi(i as i32));

        let mut tree = DecisionTreeRegressor::new();
        tree.fit(&x, &y).unwrap();
        assert!(tree.get_depth() > 64, "depth = {}", tree.get_depth());

        let json = serde_json::to_string(&tree).unwrap();
        let restored: DecisionTreeRegressor = serde_json::from_str(&json).unwrap();

        assert_eq!(restored.nodes(), tree.nodes());
        assert_eq!(restored.get_depth(), tree.get_depth());
        assert_eq!(restored.predict(&x).unwrap(), tree.predict(&x).unwrap());
    }

    #[test]
    fn test_malformed_child_index_is_an_error() {
        let x = array![[1.0], [2.0], [3.0]];
        let mut tree = DecisionTreeRegressor::new();
        tree.fit(&x, &array![1.0, 2.0, 3.0]).unwrap();

        if let TreeNode::Split { left, .. } = &mut tree.nodes[0] {
            *left = 99;
        }
        assert!(tree.predict(&x).is_err());
    }

    #[test]
    fn test_errors() {
        let tree = DecisionTreeRegressor::new();
        assert!(matches!(
            tree.predict(&array![[1.0]]),
            Err(VisibilityError::ModelNotFitted)
        ));

        let mut bad = DecisionTreeRegressor::new().with_min_samples_split(1);
        assert!(matches!(
            bad.fit(&array![[1.0], [2.0]], &array![1.0, 2.0]),
            Err(VisibilityError::InvalidParameter { .. })
        ));
    }
}
