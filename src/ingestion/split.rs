//! Deterministic train/test split

use super::dataset::Dataset;
use crate::error::{Result, VisibilityError};
use polars::prelude::*;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

/// Row indices of a train/test partition
#[derive(Debug, Clone, PartialEq)]
pub struct SplitIndices {
    pub train: Vec<usize>,
    pub test: Vec<usize>,
}

/// Number of test rows for `n` rows: `round(test_fraction * n)`
pub fn test_size(n: usize, test_fraction: f64) -> usize {
    (test_fraction * n as f64).round() as usize
}

/// Seeded permutation split of `0..n`.
///
/// The first `round(f * n)` positions of the permutation form the test set.
/// Both sides must be non-empty.
pub fn split_indices(n: usize, test_fraction: f64, seed: u64) -> Result<SplitIndices> {
    if !(test_fraction > 0.0 && test_fraction < 1.0) {
        return Err(VisibilityError::Validation(format!(
            "test fraction must be in (0, 1), got {}",
            test_fraction
        )));
    }

    let n_test = test_size(n, test_fraction);
    if n_test == 0 || n_test >= n {
        return Err(VisibilityError::Validation(format!(
            "cannot split {} rows with test fraction {}: both sides must be non-empty",
            n, test_fraction
        )));
    }

    let mut indices: Vec<usize> = (0..n).collect();
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    indices.shuffle(&mut rng);

    let train = indices.split_off(n_test);
    Ok(SplitIndices {
        train,
        test: indices,
    })
}

fn take_rows(dataset: &Dataset, rows: &[usize]) -> Result<Dataset> {
    let idx = IdxCa::from_vec(
        "idx".into(),
        rows.iter().map(|&i| i as IdxSize).collect(),
    );
    Ok(dataset.take(&idx)?)
}

/// Split a dataset into (train, test), deterministic for a given seed
pub fn split(dataset: &Dataset, test_fraction: f64, seed: u64) -> Result<(Dataset, Dataset)> {
    let indices = split_indices(dataset.height(), test_fraction, seed)?;
    let train = take_rows(dataset, &indices.train)?;
    let test = take_rows(dataset, &indices.test)?;
    Ok((train, test))
}
