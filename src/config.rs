use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Parallelism granularity for vectorized evaluation
///
/// Granularity is configuration rather than a hard-coded thread count; the
/// rayon pool decides actual scheduling. Every mode produces identical
/// results.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum Parallelism {
    /// Plain sequential iteration on the calling thread
    Sequential,
    /// Parallel iteration, rayon picks the split points
    PerElement,
    /// Parallel iteration with a minimum chunk length per task
    Chunked(usize),
}

impl Default for Parallelism {
    fn default() -> Self {
        Parallelism::PerElement
    }
}

/// Root-solver tuning
///
/// The default tolerances run the solve to machine precision. The scale
/// derivative reaches the order of `b * T` near the top of scale, so error
/// left in the scale coordinate comes back amplified by up to five orders
/// of magnitude when a round trip returns to channel units.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SolverConfig {
    /// Absolute error tolerance on the scale coordinate
    pub abs_tolerance: f64,

    /// Relative error tolerance, scaled by the current iterate (the looser
    /// of the two tolerances wins)
    pub rel_tolerance: f64,

    /// Iteration budget per element before giving up
    pub max_iterations: usize,

    /// Bracket expansion limit in scale units
    pub bracket_limit: f64,
}

impl Default for SolverConfig {
    fn default() -> Self {
        Self {
            abs_tolerance: 3.0 * f64::EPSILON,
            rel_tolerance: 3.0 * f64::EPSILON,
            max_iterations: 40,
            bracket_limit: 1e6,
        }
    }
}

/// Main transform configuration
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TransformConfig {
    /// Root-solver tuning shared by the logicle and hyperlog families
    pub solver: SolverConfig,

    /// Parallelism granularity for vectorized paths
    pub parallelism: Parallelism,

    /// Grid intervals for the hyperlog sampling strategy
    pub hyperlog_intervals: usize,
}

impl Default for TransformConfig {
    fn default() -> Self {
        Self {
            solver: SolverConfig::default(),
            parallelism: Parallelism::default(),
            hyperlog_intervals: 1000,
        }
    }
}

impl TransformConfig {
    /// Configuration with the hyperlog grid density replaced
    pub fn with_intervals(mut self, intervals: usize) -> Self {
        self.hyperlog_intervals = intervals;
        self
    }
}

/// Applies `f` over `values` with the requested granularity, stopping at
/// the first element that fails.
pub(crate) fn par_try_map<F>(values: &[f64], parallelism: Parallelism, f: F) -> Result<Vec<f64>>
where
    F: Fn(f64) -> Result<f64> + Send + Sync,
{
    match parallelism {
        Parallelism::Sequential => values.iter().map(|&v| f(v)).collect(),
        Parallelism::PerElement => values.par_iter().map(|&v| f(v)).collect(),
        Parallelism::Chunked(len) => values
            .par_iter()
            .with_min_len(len.max(1))
            .map(|&v| f(v))
            .collect(),
    }
}

/// Infallible variant of [`par_try_map`].
pub(crate) fn par_map<F>(values: &[f64], parallelism: Parallelism, f: F) -> Vec<f64>
where
    F: Fn(f64) -> f64 + Send + Sync,
{
    match parallelism {
        Parallelism::Sequential => values.iter().map(|&v| f(v)).collect(),
        Parallelism::PerElement => values.par_iter().map(|&v| f(v)).collect(),
        Parallelism::Chunked(len) => values
            .par_iter()
            .with_min_len(len.max(1))
            .map(|&v| f(v))
            .collect(),
    }
}
