//! Linear regressors: ordinary least squares, ridge, and lasso

use crate::error::{Result, VisibilityError};
use ndarray::{Array1, Array2, Axis};
use serde::{Deserialize, Serialize};

/// Cholesky factorisation `A = L Lᵀ`; `None` when `A` is not positive definite
fn cholesky(a: &Array2<f64>) -> Option<Array2<f64>> {
    let n = a.nrows();
    let mut l = Array2::zeros((n, n));
    for i in 0..n {
        for j in 0..=i {
            let sum: f64 = (0..j).map(|k| l[[i, k]] * l[[j, k]]).sum();
            if i == j {
                let diag = a[[i, i]] - sum;
                if diag <= 0.0 {
                    return None;
                }
                l[[i, j]] = diag.sqrt();
            } else {
                l[[i, j]] = (a[[i, j]] - sum) / l[[j, j]];
            }
        }
    }
    Some(l)
}

fn cholesky_solve(l: &Array2<f64>, b: &Array1<f64>) -> Array1<f64> {
    let n = l.nrows();
    let mut y = Array1::zeros(n);
    for i in 0..n {
        let sum: f64 = (0..i).map(|j| l[[i, j]] * y[j]).sum();
        y[i] = (b[i] - sum) / l[[i, i]];
    }
    let mut x = Array1::zeros(n);
    for i in (0..n).rev() {
        let sum: f64 = ((i + 1)..n).map(|j| l[[j, i]] * x[j]).sum();
        x[i] = (y[i] - sum) / l[[i, i]];
    }
    x
}

/// Gaussian elimination with partial pivoting
fn gauss_solve(a: &Array2<f64>, b: &Array1<f64>) -> Option<Array1<f64>> {
    let n = a.nrows();
    let mut aug = Array2::zeros((n, n + 1));
    aug.slice_mut(ndarray::s![.., ..n]).assign(a);
    aug.column_mut(n).assign(b);

    for col in 0..n {
        let pivot_row = (col..n).max_by(|&r1, &r2| {
            aug[[r1, col]]
                .abs()
                .partial_cmp(&aug[[r2, col]].abs())
                .unwrap_or(std::cmp::Ordering::Equal)
        })?;
        if aug[[pivot_row, col]].abs() < 1e-12 {
            return None;
        }
        if pivot_row != col {
            for j in 0..=n {
                aug.swap([col, j], [pivot_row, j]);
            }
        }
        for row in (col + 1)..n {
            let factor = aug[[row, col]] / aug[[col, col]];
            for j in col..=n {
                aug[[row, j]] -= factor * aug[[col, j]];
            }
        }
    }

    let mut x = Array1::zeros(n);
    for i in (0..n).rev() {
        let sum: f64 = ((i + 1)..n).map(|j| aug[[i, j]] * x[j]).sum();
        x[i] = (aug[[i, n]] - sum) / aug[[i, i]];
    }
    Some(x)
}

/// Solve the symmetric system `A w = b`.
///
/// Tries Cholesky, then Cholesky with a tiny diagonal jitter (rank-deficient
/// designs such as an all-zero scaled column), then pivoted elimination.
fn solve_normal_equations(a: &Array2<f64>, b: &Array1<f64>) -> Result<Array1<f64>> {
    if let Some(l) = cholesky(a) {
        return Ok(cholesky_solve(&l, b));
    }

    let n = a.nrows();
    let mean_diag = a.diag().iter().map(|v| v.abs()).sum::<f64>() / n.max(1) as f64;
    let jitter = (1e-8 * mean_diag).max(1e-12);
    let mut jittered = a.clone();
    jittered.diag_mut().mapv_inplace(|v| v + jitter);
    if let Some(l) = cholesky(&jittered) {
        return Ok(cholesky_solve(&l, b));
    }

    gauss_solve(a, b).ok_or_else(|| {
        VisibilityError::ComputationError("normal equations are singular".to_string())
    })
}

fn check_shapes(x: &Array2<f64>, y: &Array1<f64>) -> Result<()> {
    if x.nrows() != y.len() {
        return Err(VisibilityError::ShapeError {
            expected: format!("y length = {}", x.nrows()),
            actual: format!("y length = {}", y.len()),
        });
    }
    if x.nrows() == 0 {
        return Err(VisibilityError::Training("cannot fit on zero samples".to_string()));
    }
    Ok(())
}

/// Column means of `x` and the mean of `y`, or zeros without an intercept
struct Centering {
    x_mean: Array1<f64>,
    y_mean: f64,
}

impl Centering {
    fn new(x: &Array2<f64>, y: &Array1<f64>, fit_intercept: bool) -> Self {
        match (fit_intercept, x.mean_axis(Axis(0)), y.mean()) {
            (true, Some(x_mean), Some(y_mean)) => Self { x_mean, y_mean },
            _ => Self {
                x_mean: Array1::zeros(x.ncols()),
                y_mean: 0.0,
            },
        }
    }

    fn apply(&self, x: &Array2<f64>, y: &Array1<f64>) -> (Array2<f64>, Array1<f64>) {
        (x - &self.x_mean.view().insert_axis(Axis(0)), y - self.y_mean)
    }

    fn intercept(&self, coefficients: &Array1<f64>) -> f64 {
        self.y_mean - coefficients.dot(&self.x_mean)
    }
}

/// Fitted weights shared by the linear regressors
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LinearFit {
    pub coefficients: Array1<f64>,
    pub intercept: f64,
}

impl LinearFit {
    fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        if x.ncols() != self.coefficients.len() {
            return Err(VisibilityError::ShapeError {
                expected: format!("{} features", self.coefficients.len()),
                actual: format!("{} features", x.ncols()),
            });
        }
        Ok(x.dot(&self.coefficients) + self.intercept)
    }
}

/// Penalised least squares: `(XᵀX + alpha I) w = Xᵀy` on centred data
fn fit_l2(x: &Array2<f64>, y: &Array1<f64>, alpha: f64, fit_intercept: bool) -> Result<LinearFit> {
    check_shapes(x, y)?;
    let centering = Centering::new(x, y, fit_intercept);
    let (xc, yc) = centering.apply(x, y);

    let mut xtx = xc.t().dot(&xc);
    if alpha > 0.0 {
        xtx.diag_mut().mapv_inplace(|v| v + alpha);
    }
    let xty = xc.t().dot(&yc);
    let coefficients = solve_normal_equations(&xtx, &xty)?;

    Ok(LinearFit {
        intercept: centering.intercept(&coefficients),
        coefficients,
    })
}

/// Ordinary least squares
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LinearRegression {
    pub fit_intercept: bool,
    fitted: Option<LinearFit>,
}

impl Default for LinearRegression {
    fn default() -> Self {
        Self::new()
    }
}

impl LinearRegression {
    pub fn new() -> Self {
        Self {
            fit_intercept: true,
            fitted: None,
        }
    }

    pub fn with_fit_intercept(mut self, fit_intercept: bool) -> Self {
        self.fit_intercept = fit_intercept;
        self
    }

    pub fn fit(&mut self, x: &Array2<f64>, y: &Array1<f64>) -> Result<&mut Self> {
        self.fitted = Some(fit_l2(x, y, 0.0, self.fit_intercept)?);
        Ok(self)
    }

    pub fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        self.fitted.as_ref().ok_or(VisibilityError::ModelNotFitted)?.predict(x)
    }

    pub fn weights(&self) -> Option<&LinearFit> {
        self.fitted.as_ref()
    }
}

/// Ridge regression (L2 penalty)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RidgeRegression {
    pub alpha: f64,
    pub fit_intercept: bool,
    fitted: Option<LinearFit>,
}

impl Default for RidgeRegression {
    fn default() -> Self {
        Self::new(1.0)
    }
}

impl RidgeRegression {
    pub fn new(alpha: f64) -> Self {
        Self {
            alpha,
            fit_intercept: true,
            fitted: None,
        }
    }

    pub fn with_alpha(mut self, alpha: f64) -> Self {
        self.alpha = alpha;
        self
    }

    pub fn with_fit_intercept(mut self, fit_intercept: bool) -> Self {
        self.fit_intercept = fit_intercept;
        self
    }

    pub fn fit(&mut self, x: &Array2<f64>, y: &Array1<f64>) -> Result<&mut Self> {
        if !(self.alpha >= 0.0) {
            return Err(VisibilityError::InvalidParameter {
                name: "alpha".to_string(),
                value: self.alpha.to_string(),
                reason: "must be non-negative".to_string(),
            });
        }
        self.fitted = Some(fit_l2(x, y, self.alpha, self.fit_intercept)?);
        Ok(self)
    }

    pub fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        self.fitted.as_ref().ok_or(VisibilityError::ModelNotFitted)?.predict(x)
    }

    pub fn weights(&self) -> Option<&LinearFit> {
        self.fitted.as_ref()
    }
}

/// Lasso regression (L1 penalty) by cyclic coordinate descent.
///
/// Minimises `‖y − Xw‖² / (2n) + alpha ‖w‖₁`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LassoRegression {
    pub alpha: f64,
    pub max_iter: usize,
    pub tol: f64,
    pub fit_intercept: bool,
    fitted: Option<LinearFit>,
    n_iter: usize,
}

impl Default for LassoRegression {
    fn default() -> Self {
        Self::new(1.0)
    }
}

impl LassoRegression {
    pub fn new(alpha: f64) -> Self {
        Self {
            alpha,
            max_iter: 1000,
            tol: 1e-4,
            fit_intercept: true,
            fitted: None,
            n_iter: 0,
        }
    }

    pub fn with_alpha(mut self, alpha: f64) -> Self {
        self.alpha = alpha;
        self
    }

    pub fn with_max_iter(mut self, max_iter: usize) -> Self {
        self.max_iter = max_iter;
        self
    }

    pub fn with_tol(mut self, tol: f64) -> Self {
        self.tol = tol;
        self
    }

    pub fn with_fit_intercept(mut self, fit_intercept: bool) -> Self {
        self.fit_intercept = fit_intercept;
        self
    }

    fn soft_threshold(val: f64, threshold: f64) -> f64 {
        if val > threshold {
            val - threshold
        } else if val < -threshold {
            val + threshold
        } else {
            0.0
        }
    }

    pub fn fit(&mut self, x: &Array2<f64>, y: &Array1<f64>) -> Result<&mut Self> {
        if !(self.alpha >= 0.0) {
            return Err(VisibilityError::InvalidParameter {
                name: "alpha".to_string(),
                value: self.alpha.to_string(),
                reason: "must be non-negative".to_string(),
            });
        }
        if self.max_iter == 0 {
            return Err(VisibilityError::InvalidParameter {
                name: "max_iter".to_string(),
                value: "0".to_string(),
                reason: "must be at least 1".to_string(),
            });
        }
        check_shapes(x, y)?;

        let centering = Centering::new(x, y, self.fit_intercept);
        let (xc, yc) = centering.apply(x, y);
        let n_features = xc.ncols();
        let col_norms: Vec<f64> = xc.columns().into_iter().map(|c| c.dot(&c)).collect();
        let lambda = self.alpha * xc.nrows() as f64;

        let mut w = Array1::<f64>::zeros(n_features);
        let mut residual = yc.clone();
        let mut n_iter = 0;

        for iter in 0..self.max_iter {
            n_iter = iter + 1;
            let mut max_change = 0.0f64;

            for j in 0..n_features {
                if col_norms[j] < 1e-15 {
                    continue;
                }
                let column = xc.column(j);
                let rho = column.dot(&residual) + col_norms[j] * w[j];
                let updated = Self::soft_threshold(rho, lambda) / col_norms[j];
                let delta = w[j] - updated;
                if delta != 0.0 {
                    residual.scaled_add(delta, &column);
                    w[j] = updated;
                    max_change = max_change.max(delta.abs());
                }
            }

            if max_change < self.tol {
                break;
            }
        }

        self.n_iter = n_iter;
        self.fitted = Some(LinearFit {
            intercept: centering.intercept(&w),
            coefficients: w,
        });
        Ok(self)
    }

    pub fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        self.fitted.as_ref().ok_or(VisibilityError::ModelNotFitted)?.predict(x)
    }

    pub fn weights(&self) -> Option<&LinearFit> {
        self.fitted.as_ref()
    }

    /// Coordinate-descent sweeps run by the last fit
    pub fn n_iter(&self) -> usize {
        self.n_iter
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    fn plane() -> (Array2<f64>, Array1<f64>) {
        let x = array![
            [1.0, 2.0],
            [2.0, 1.0],
            [3.0, 4.0],
            [4.0, 3.0],
            [5.0, 5.0],
            [6.0, 8.0],
        ];
        let y = x.column(0).mapv(|v| 3.0 * v) + &x.column(1).mapv(|v| -2.0 * v) + 5.0;
        (x, y)
    }

    #[test]
    fn test_linear_regression_recovers_plane() {
        let (x, y) = plane();
        let mut model = LinearRegression::new();
        model.fit(&x, &y).unwrap();

        let w = model.weights().unwrap();
        assert!((w.coefficients[0] - 3.0).abs() < 1e-8);
        assert!((w.coefficients[1] + 2.0).abs() < 1e-8);
        assert!((w.intercept - 5.0).abs() < 1e-8);
        assert_eq!(model.predict(&x).unwrap().len(), 6);
    }

    #[test]
    fn test_linear_regression_with_zero_column() {
        let x = array![[1.0, 0.0], [2.0, 0.0], [3.0, 0.0], [4.0, 0.0]];
        let y = array![2.0, 4.0, 6.0, 8.0];
        let mut model = LinearRegression::new();
        model.fit(&x, &y).unwrap();

        let preds = model.predict(&x).unwrap();
        for (p, t) in preds.iter().zip(y.iter()) {
            assert!((p - t).abs() < 1e-6);
        }
    }

    #[test]
    fn test_ridge_shrinks_coefficients() {
        let (x, y) = plane();
        let mut ols = LinearRegression::new();
        let mut ridge = RidgeRegression::new(10.0);
        ols.fit(&x, &y).unwrap();
        ridge.fit(&x, &y).unwrap();

        let norm = |w: &LinearFit| w.coefficients.dot(&w.coefficients);
        assert!(norm(ridge.weights().unwrap()) < norm(ols.weights().unwrap()));
    }

    #[test]
    fn test_lasso_zeroes_weak_feature() {
        let x = Array2::from_shape_fn((50, 2), |(i, j)| {
            if j == 0 { i as f64 / 10.0 } else { ((i * 7) % 5) as f64 / 100.0 }
        });
        let y = x.column(0).mapv(|v| 4.0 * v);

        let mut model = LassoRegression::new(0.1);
        model.fit(&x, &y).unwrap();

        let w = model.weights().unwrap();
        assert!(w.coefficients[0] > 3.0);
        assert_eq!(w.coefficients[1], 0.0);
        assert!(model.n_iter() < 1000);
    }

    #[test]
    fn test_lasso_without_penalty_matches_ols() {
        let (x, y) = plane();
        let mut lasso = LassoRegression::new(0.0).with_max_iter(10_000).with_tol(1e-10);
        lasso.fit(&x, &y).unwrap();
        let preds = lasso.predict(&x).unwrap();
        for (p, t) in preds.iter().zip(y.iter()) {
            assert!((p - t).abs() < 1e-4);
        }
    }

    #[test]
    fn test_not_fitted() {
        assert!(matches!(
            LinearRegression::new().predict(&array![[1.0]]),
            Err(VisibilityError::ModelNotFitted)
        ));
        assert!(matches!(
            RidgeRegression::new(-1.0).fit(&array![[1.0]], &array![1.0]),
            Err(VisibilityError::InvalidParameter { .. })
        ));
    }

    #[test]
    fn test_gauss_solve() {
        let a = array![[0.0, 2.0], [3.0, 1.0]];
        let b = array![4.0, 5.0];
        let x = gauss_solve(&a, &b).unwrap();
        assert!((x[0] - 1.0).abs() < 1e-12);
        assert!((x[1] - 2.0).abs() < 1e-12);
    }
}
