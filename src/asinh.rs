//! Inverse hyperbolic sine scale transformation.
//!
//! The asinh scale shares the logicle's decade parameterization minus the
//! linearization width: `T` sets the top of scale, `M` the decades spanned
//! and `A` the additional negative range. It is the `W = 0` limit of the
//! logicle family and needs no root solving in either direction.

use crate::ScaleTransform;
use crate::config::{TransformConfig, par_map};
use crate::error::Result;
use crate::params::AsinhParams;

/// Bidirectional asinh transform for one parameter set.
#[derive(Debug, Clone)]
pub struct Asinh {
    params: AsinhParams,
    b: f64,
    offset: f64,
    sinh_scale: f64,
    config: TransformConfig,
}

impl Asinh {
    /// Creates a transform with default settings.
    pub fn new(params: AsinhParams) -> Result<Self> {
        Self::with_config(params, TransformConfig::default())
    }

    /// Creates a transform with explicit configuration.
    pub fn with_config(params: AsinhParams, config: TransformConfig) -> Result<Self> {
        params.validate()?;
        let ln10 = std::f64::consts::LN_10;
        Ok(Self {
            b: (params.m + params.a) * ln10,
            offset: params.a * ln10,
            sinh_scale: (params.m * ln10).sinh() / params.t,
            params,
            config,
        })
    }

    /// The decade parameters this transform was built from.
    pub fn params(&self) -> &AsinhParams {
        &self.params
    }

    /// Maps a single channel value onto the asinh scale.
    ///
    /// Non-finite values pass through the closed form untouched, so NaN
    /// stays NaN and infinities map to infinite scale values.
    pub fn scale(&self, value: f64) -> f64 {
        ((value * self.sinh_scale).asinh() + self.offset) / self.b
    }

    /// Maps a scale value back to the corresponding channel value.
    pub fn inverse(&self, value: f64) -> f64 {
        (value * self.b - self.offset).sinh() / self.sinh_scale
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

impl ScaleTransform for Asinh {
    fn scale(&self, value: f64) -> Result<f64> {
        Ok(Asinh::scale(self, value))
    }

    fn inverse(&self, value: f64) -> f64 {
        Asinh::inverse(self, value)
    }

    fn scale_all(&self, values: &[f64]) -> Result<Vec<f64>> {
        Ok(Asinh::scale_all(self, values))
    }

    fn inverse_all(&self, values: &[f64]) -> Vec<f64> {
        Asinh::inverse_all(self, values)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn reference_transform() -> Asinh {
        Asinh::new(AsinhParams { t: 1000.0, m: 4.0, a: 1.0 }).unwrap()
    }

    #[test]
    fn test_fixed_points() {
        let asinh = reference_transform();
        // asinh(0) = 0 pins the zero point at A / (M + A)
        assert_relative_eq!(asinh.scale(0.0), 0.2);
        assert_relative_eq!(asinh.scale(1000.0), 1.0, epsilon = 1e-12);
        assert_relative_eq!(asinh.inverse(1.0), 1000.0, epsilon = 1e-9);
    }

    #[test]
    fn test_odd_symmetry_about_zero_point() {
        let asinh = reference_transform();
        let zero_point = asinh.scale(0.0);
        for &value in &[0.5, 12.0, 999.0] {
            let sum = asinh.scale(value) + asinh.scale(-value);
            assert_relative_eq!(sum, 2.0 * zero_point, epsilon = 1e-12);
        }
    }

    #[test]
    fn test_round_trip() {
        let asinh = reference_transform();
        for &value in &[-2000.0, -1.0, 0.0, 1e-3, 5.0, 262144.0] {
            assert_relative_eq!(
                asinh.inverse(asinh.scale(value)),
                value,
                epsilon = 1e-9,
                max_relative = 1e-12
            );
        }
    }

    #[test]
    fn test_non_finite_values_pass_through() {
        let asinh = reference_transform();
        assert!(asinh.scale(f64::NAN).is_nan());
        assert_eq!(asinh.scale(f64::INFINITY), f64::INFINITY);
        assert_eq!(asinh.scale(f64::NEG_INFINITY), f64::NEG_INFINITY);
    }

    #[test]
    fn test_rejects_invalid_parameters() {
        assert!(Asinh::new(AsinhParams { t: 0.0, m: 4.0, a: 0.0 }).is_err());
        assert!(Asinh::new(AsinhParams { t: 1000.0, m: -4.0, a: 0.0 }).is_err());
        assert!(Asinh::new(AsinhParams { t: 1000.0, m: 4.0, a: -4.0 }).is_err());
        assert!(Asinh::new(AsinhParams { t: 1000.0, m: f64::NAN, a: 0.0 }).is_err());
    }
}
