//! Parallel processing utilities

use crate::error::{Result, VisibilityError};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

/// Configuration for parallel processing
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ParallelConfig {
    /// Number of threads (None = use all available)
    pub n_threads: Option<usize>,
}

impl ParallelConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set number of threads
    pub fn with_threads(mut self, n: usize) -> Self {
        self.n_threads = Some(n);
        self
    }

    /// Get the number of threads to use
    pub fn num_threads(&self) -> usize {
        self.n_threads.unwrap_or_else(rayon::current_num_threads)
    }
}

/// Map `f` over `items` on a dedicated pool of at most `config.num_threads()` workers.
///
/// The pool is joined before returning; output order matches input order.
pub fn parallel_map_bounded<T, U, F>(items: Vec<T>, config: &ParallelConfig, f: F) -> Result<Vec<U>>
where
    T: Send,
    U: Send,
    F: Fn(T) -> U + Send + Sync,
{
    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(config.num_threads().max(1))
        .build()
        .map_err(|e| VisibilityError::ComputationError(format!("thread pool: {}", e)))?;

    Ok(pool.install(|| items.into_par_iter().map(f).collect()))
}
