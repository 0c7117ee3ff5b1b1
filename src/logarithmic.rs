//! Plain logarithmic scale transformation.
//!
//! Maps a channel value `v` to `log10(v / T) / M + 1`, so `T` lands at 1
//! and `T / 10^M` at 0. The log has no linear region: zero maps to negative
//! infinity and negative values to NaN, both of which pass through rather
//! than raising an error, matching how display pipelines treat them.

use crate::ScaleTransform;
use crate::config::{TransformConfig, par_map};
use crate::error::Result;
use crate::params::LogParams;

/// Bidirectional log10 transform for one parameter set.
#[derive(Debug, Clone)]
pub struct Logarithmic {
    params: LogParams,
    config: TransformConfig,
}

impl Logarithmic {
    /// Creates a transform with default settings.
    pub fn new(params: LogParams) -> Result<Self> {
        Self::with_config(params, TransformConfig::default())
    }

    /// Creates a transform with explicit configuration.
    pub fn with_config(params: LogParams, config: TransformConfig) -> Result<Self> {
        params.validate()?;
        Ok(Self { params, config })
    }

    /// The parameters this transform was built from.
    pub fn params(&self) -> &LogParams {
        &self.params
    }

    /// Maps a single channel value onto the log scale.
    pub fn scale(&self, value: f64) -> f64 {
        (value / self.params.t).log10() / self.params.m + 1.0
    }

    /// Maps a scale value back to the corresponding channel value.
    pub fn inverse(&self, value: f64) -> f64 {
        self.params.t * 10f64.powf((value - 1.0) * self.params.m)
    }

    /// Scales a slice of channel values.
    pub fn scale_all(&self, values: &[f64]) -> Vec<f64> {
        par_map(values, self.config.parallelism, |v| self.scale(v))
    }

    /// Inverts a slice of scale values.
    pub fn inverse_all(&self, values: &[f64]) -> Vec<f64> {
        par_map(values, self.config.parallelism, |v| self.inverse(v))
    }
}

impl ScaleTransform for Logarithmic {
    fn scale(&self, value: f64) -> Result<f64> {
        Ok(Logarithmic::scale(self, value))
    }

    fn inverse(&self, value: f64) -> f64 {
        Logarithmic::inverse(self, value)
    }

    fn scale_all(&self, values: &[f64]) -> Result<Vec<f64>> {
        Ok(Logarithmic::scale_all(self, values))
    }

    fn inverse_all(&self, values: &[f64]) -> Vec<f64> {
        Logarithmic::inverse_all(self, values)
    }
}
