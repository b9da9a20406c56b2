//! Exhaustive hyperparameter search with k-fold cross-validation

use super::catalog::{Estimator, ModelKind, ParamSet};
use super::cross_validation::{cross_val_score, KFold};
use crate::config::ParamGrid;
use crate::error::{Result, VisibilityError};
use crate::utils::{parallel_map_bounded, ParallelConfig};
use ndarray::{Array1, Array2};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

/// Mean and per-fold R² of one candidate
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CandidateScore {
    pub params: ParamSet,
    pub fold_scores: Vec<f64>,
    pub mean_score: f64,
}

/// Outcome of a search: the refitted best estimator plus every candidate score
#[derive(Debug, Clone)]
pub struct GridSearchResult {
    pub best_params: ParamSet,
    pub best_score: f64,
    pub best_estimator: Estimator,
    pub candidates: Vec<CandidateScore>,
}

/// Cartesian product of the grid.
///
/// Keys are visited in lexicographic order and values in configured order, so
/// the candidate order is stable. Keys with no values are skipped.
pub fn expand_grid(grid: &ParamGrid) -> Vec<ParamSet> {
    grid.iter()
        .filter(|(_, values)| !values.is_empty())
        .fold(vec![ParamSet::new()], |acc, (key, values)| {
            acc.iter()
                .flat_map(|partial| {
                    values.iter().map(move |value| {
                        let mut next = partial.clone();
                        next.insert(key.clone(), value.clone());
                        next
                    })
                })
                .collect()
        })
}

/// Grid search over one catalog model
#[derive(Debug, Clone)]
pub struct GridSearch {
    kind: ModelKind,
    grid: ParamGrid,
    cv: KFold,
    parallel: ParallelConfig,
}

impl GridSearch {
    pub fn new(kind: ModelKind, grid: ParamGrid) -> Self {
        Self {
            kind,
            grid,
            cv: KFold::new(3),
            parallel: ParallelConfig::default(),
        }
    }

    pub fn with_cv(mut self, cv: KFold) -> Self {
        self.cv = cv;
        self
    }

    pub fn with_parallel(mut self, parallel: ParallelConfig) -> Self {
        self.parallel = parallel;
        self
    }

    /// Score every candidate, then refit the best one on all of `x`.
    ///
    /// Candidates are evaluated on a bounded worker pool that is joined before
    /// this returns. The first candidate with the highest mean R² wins.
    pub fn fit(&self, x: &Array2<f64>, y: &Array1<f64>) -> Result<GridSearchResult> {
        let candidates = expand_grid(&self.grid);
        if candidates.is_empty() || candidates.iter().all(|c| c.is_empty()) {
            return Err(VisibilityError::Validation(format!(
                "empty parameter grid for {}",
                self.kind
            )));
        }

        // Reject bad keys/values before spending any fold fits
        for params in &candidates {
            self.kind.build(params)?;
        }

        info!(
            model = %self.kind,
            candidates = candidates.len(),
            folds = self.cv.n_splits,
            "Starting grid search"
        );

        let scored = parallel_map_bounded(candidates, &self.parallel, |params| -> Result<CandidateScore> {
            let estimator = self.kind.build(&params)?;
            let fold_scores = cross_val_score(&estimator, x, y, &self.cv)?;
            let mean_score = fold_scores.iter().sum::<f64>() / fold_scores.len() as f64;
            debug!(params = ?params, mean_r2 = mean_score, "Candidate scored");
            Ok(CandidateScore {
                params,
                fold_scores,
                mean_score,
            })
        })?
        .into_iter()
        .collect::<Result<Vec<_>>>()?;

        let mut best: Option<&CandidateScore> = None;
        for cand in scored.iter().filter(|c| !c.mean_score.is_nan()) {
            if best.map_or(true, |b| cand.mean_score > b.mean_score) {
                best = Some(cand);
            }
        }
        let best = best.ok_or_else(|| {
            VisibilityError::Training("no candidate produced a finite score".to_string())
        })?;

        let mut best_estimator = self.kind.build(&best.params)?;
        best_estimator.fit(x, y)?;

        info!(
            model = %self.kind,
            best_params = ?best.params,
            best_r2 = best.mean_score,
            "Grid search complete"
        );

        Ok(GridSearchResult {
            best_params: best.params.clone(),
            best_score: best.mean_score,
            best_estimator,
            candidates: scored,
        })
    }
}
