//! Standard (z-score) feature scaler

use crate::error::{Result, VisibilityError};
use crate::utils::{load_json, save_json};
use ndarray::{Array1, Array2, ArrayView2, Axis};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Bumped whenever the persisted layout changes
pub const SCALER_FORMAT_VERSION: u32 = 1;

/// Per-feature mean and population standard deviation.
///
/// Only obtainable through [`StandardScaler::fit`] or [`StandardScaler::load`],
/// and never mutated afterwards. A feature with zero standard deviation scales
/// to 0 for every input.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StandardScaler {
    format_version: u32,
    feature_names: Vec<String>,
    mean: Array1<f64>,
    std: Array1<f64>,
    n_samples_seen: usize,
}

impl StandardScaler {
    /// Fit on training features (rows = samples, columns = `feature_names`)
    pub fn fit(x: ArrayView2<'_, f64>, feature_names: &[String]) -> Result<Self> {
        if x.ncols() != feature_names.len() {
            return Err(VisibilityError::ShapeError {
                expected: format!("{} feature columns", feature_names.len()),
                actual: format!("{} columns", x.ncols()),
            });
        }
        if x.nrows() == 0 {
            return Err(VisibilityError::Validation(
                "cannot fit scaler on zero rows".to_string(),
            ));
        }

        let mean = x
            .mean_axis(Axis(0))
            .ok_or_else(|| VisibilityError::ComputationError("empty axis".to_string()))?;
        let std = x.std_axis(Axis(0), 0.0);

        Ok(Self {
            format_version: SCALER_FORMAT_VERSION,
            feature_names: feature_names.to_vec(),
            mean,
            std,
            n_samples_seen: x.nrows(),
        })
    }

    pub fn feature_names(&self) -> &[String] {
        &self.feature_names
    }

    pub fn mean(&self) -> &Array1<f64> {
        &self.mean
    }

    pub fn std(&self) -> &Array1<f64> {
        &self.std
    }

    pub fn n_samples_seen(&self) -> usize {
        self.n_samples_seen
    }

    pub fn n_features(&self) -> usize {
        self.feature_names.len()
    }

    fn check_width(&self, ncols: usize) -> Result<()> {
        if ncols != self.n_features() {
            return Err(VisibilityError::ShapeError {
                expected: format!("{} features", self.n_features()),
                actual: format!("{} features", ncols),
            });
        }
        Ok(())
    }

    /// Apply `(x - mean) / std` column-wise
    pub fn transform(&self, x: ArrayView2<'_, f64>) -> Result<Array2<f64>> {
        self.check_width(x.ncols())?;

        let mut scaled = x.to_owned();
        for (j, mut column) in scaled.axis_iter_mut(Axis(1)).enumerate() {
            let (mean, std) = (self.mean[j], self.std[j]);
            if std == 0.0 {
                column.fill(0.0);
            } else {
                column.mapv_inplace(|v| (v - mean) / std);
            }
        }
        Ok(scaled)
    }

    /// Scale a single sample
    pub fn transform_row(&self, row: &[f64]) -> Result<Array1<f64>> {
        self.check_width(row.len())?;
        let x = ArrayView2::from_shape((1, row.len()), row)?;
        Ok(self.transform(x)?.row(0).to_owned())
    }

    /// Undo the scaling: `scaled * std + mean`
    pub fn inverse_transform(&self, scaled: ArrayView2<'_, f64>) -> Result<Array2<f64>> {
        self.check_width(scaled.ncols())?;

        let mut x = scaled.to_owned();
        for (j, mut column) in x.axis_iter_mut(Axis(1)).enumerate() {
            let (mean, std) = (self.mean[j], self.std[j]);
            column.mapv_inplace(|v| v * std + mean);
        }
        Ok(x)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        save_json(self, path)
    }

    /// Load a persisted scaler, rejecting unknown format versions
    pub fn load(path: &Path) -> Result<Self> {
        let scaler: Self = load_json(path)?;
        if scaler.format_version != SCALER_FORMAT_VERSION {
            return Err(VisibilityError::artifact(
                path,
                format!(
                    "unsupported scaler format version {} (expected {})",
                    scaler.format_version, SCALER_FORMAT_VERSION
                ),
            ));
        }
        if scaler.mean.len() != scaler.n_features() || scaler.std.len() != scaler.n_features() {
            return Err(VisibilityError::artifact(
                path,
                "mean/std length does not match feature names",
            ));
        }
        Ok(scaler)
    }
}
