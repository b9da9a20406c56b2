//! K-fold cross-validation

use super::catalog::Estimator;
use crate::error::{Result, VisibilityError};
use crate::evaluation::r2_score;
use ndarray::{Array1, Array2, Axis};
use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};

/// A single train/validation split
#[derive(Debug, Clone, PartialEq)]
pub struct CvSplit {
    pub train_indices: Vec<usize>,
    pub test_indices: Vec<usize>,
    pub fold_idx: usize,
}

/// K-fold splitter.
///
/// Without shuffling the folds are contiguous blocks in row order; the first
/// `n % k` folds hold one extra row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KFold {
    pub n_splits: usize,
    pub shuffle: bool,
    pub random_state: Option<u64>,
}

impl KFold {
    pub fn new(n_splits: usize) -> Self {
        Self {
            n_splits,
            shuffle: false,
            random_state: None,
        }
    }

    pub fn with_shuffle(mut self, seed: u64) -> Self {
        self.shuffle = true;
        self.random_state = Some(seed);
        self
    }

    pub fn split(&self, n_samples: usize) -> Result<Vec<CvSplit>> {
        let k = self.n_splits;
        if k < 2 {
            return Err(VisibilityError::Validation(
                "n_splits must be at least 2".to_string(),
            ));
        }
        if n_samples < k {
            return Err(VisibilityError::Validation(format!(
                "n_samples ({}) must be >= n_splits ({})",
                n_samples, k
            )));
        }

        let mut indices: Vec<usize> = (0..n_samples).collect();
        if self.shuffle {
            let mut rng = match self.random_state {
                Some(seed) => ChaCha8Rng::seed_from_u64(seed),
                None => ChaCha8Rng::from_entropy(),
            };
            indices.shuffle(&mut rng);
        }

        let (base, remainder) = (n_samples / k, n_samples % k);
        let mut splits = Vec::with_capacity(k);
        let mut start = 0;
        for fold_idx in 0..k {
            let size = if fold_idx < remainder { base + 1 } else { base };
            let end = start + size;
            splits.push(CvSplit {
                test_indices: indices[start..end].to_vec(),
                train_indices: indices[..start]
                    .iter()
                    .chain(indices[end..].iter())
                    .copied()
                    .collect(),
                fold_idx,
            });
            start = end;
        }
        Ok(splits)
    }
}

/// Fit a fresh copy of `estimator` on each training fold and return the R² of
/// each validation fold
pub fn cross_val_score(
    estimator: &Estimator,
    x: &Array2<f64>,
    y: &Array1<f64>,
    cv: &KFold,
) -> Result<Vec<f64>> {
    cv.split(x.nrows())?
        .iter()
        .map(|fold| {
            let x_train = x.select(Axis(0), &fold.train_indices);
            let y_train = y.select(Axis(0), &fold.train_indices);
            let x_val = x.select(Axis(0), &fold.test_indices);
            let y_val = y.select(Axis(0), &fold.test_indices);

            let mut model = estimator.clone();
            model.fit(&x_train, &y_train)?;
            Ok(r2_score(&y_val, &model.predict(&x_val)?))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::training::catalog::ModelKind;
    use std::collections::BTreeMap;

    #[test]
    fn test_contiguous_folds() {
        let splits = KFold::new(3).split(10).unwrap();
        assert_eq!(splits.len(), 3);
        assert_eq!(splits[0].test_indices, vec![0, 1, 2, 3]);
        assert_eq!(splits[1].test_indices, vec![4, 5, 6]);
        assert_eq!(splits[2].test_indices, vec![7, 8, 9]);
        assert_eq!(splits[1].train_indices, vec![0, 1, 2, 3, 7, 8, 9]);
    }

    #[test]
    fn test_shuffled_folds_cover_every_row_once() {
        let splits = KFold::new(4).with_shuffle(42).split(17).unwrap();
        let mut seen: Vec<usize> = splits.iter().flat_map(|s| s.test_indices.clone()).collect();
        seen.sort_unstable();
        assert_eq!(seen, (0..17).collect::<Vec<_>>());
        for s in &splits {
            assert_eq!(s.train_indices.len() + s.test_indices.len(), 17);
        }
    }

    #[test]
    fn test_invalid_fold_count() {
        assert!(KFold::new(1).split(10).is_err());
        assert!(KFold::new(5).split(3).is_err());
    }

    #[test]
    fn test_cross_val_score_on_linear_data() {
        let x = Array2::from_shape_fn((30, 1), |(i, _)| i as f64);
        let y = x.column(0).mapv(|v| 0.5 * v - 2.0);
        let estimator = ModelKind::LinearRegression.build(&BTreeMap::new()).unwrap();

        let scores = cross_val_score(&estimator, &x, &y, &KFold::new(3)).unwrap();
        assert_eq!(scores.len(), 3);
        assert!(scores.iter().all(|&s| (s - 1.0).abs() < 1e-9));
    }
}
