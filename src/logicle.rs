//! Logicle (biexponential) scale transformation.
//!
//! The logicle function maps raw fluorescence intensities, which can be
//! negative after compensation, onto a display scale that is logarithmic
//! for large values and smoothly linear around zero. Following the
//! GatingML 2.0 definition, the scale value `y` of a channel value `v`
//! satisfies `B(y) = v` where
//!
//! ```text
//! B(y) = a * exp(b * y) - c * exp(-d * y) + f
//! ```
//!
//! and the coefficients derive from the decade parameters `T` (top of
//! scale), `M` (total decades), `W` (linearization width in decades) and
//! `A` (additional negative decades). `B` is strictly increasing, with
//! `B(x1) = 0` and `B(1) = T`; scale values of negative channel data are
//! obtained by odd reflection around `x1`.

use tracing::debug;

use crate::ScaleTransform;
use crate::config::{TransformConfig, par_map, par_try_map};
use crate::error::{Result, TransformError};
use crate::lambert::product_log;
use crate::params::{BiexpParams, validate_biexp};
use crate::solver::solve_increasing;

pub(crate) const TAYLOR_LENGTH: usize = 16;

/// Coefficients of the biexponential in scale coordinates, plus the Taylor
/// expansion of `B` around its root `x1` used where the closed form loses
/// precision to cancellation.
#[derive(Debug, Clone)]
struct Coefficients {
    a: f64,
    b: f64,
    c: f64,
    d: f64,
    f: f64,
    x1: f64,
    taylor_cutoff: f64,
    taylor: [f64; TAYLOR_LENGTH],
}

/// Bidirectional logicle transform for one parameter set.
///
/// Construction derives and caches all coefficients, so a single instance
/// should be reused across every event of a channel.
#[derive(Debug, Clone)]
pub struct Logicle {
    params: BiexpParams,
    width: f64,
    coef: Coefficients,
    config: TransformConfig,
}

impl Logicle {
    /// Creates a transform with default solver and parallelism settings.
    ///
    /// # Arguments
    ///
    /// * `params` - Decade parameters; the width must not require channel
    ///   data to resolve
    pub fn new(params: BiexpParams) -> Result<Self> {
        Self::with_config(params, TransformConfig::default())
    }

    /// Creates a transform with explicit configuration.
    pub fn with_config(params: BiexpParams, config: TransformConfig) -> Result<Self> {
        Self::build(params, None, config)
    }

    /// Creates a transform whose width may be estimated from `data`, as
    /// with [`WidthSpec::FromQuantile`](crate::params::WidthSpec).
    pub fn for_data(params: BiexpParams, data: &[f64], config: TransformConfig) -> Result<Self> {
        Self::build(params, Some(data), config)
    }

    fn build(params: BiexpParams, data: Option<&[f64]>, config: TransformConfig) -> Result<Self> {
        let width = params.width.resolve(params.t, params.m, data)?;
        let coef = derive_coefficients(params.t, params.m, width, params.a)?;
        debug!(
            t = params.t,
            m = params.m,
            width,
            a = params.a,
            x1 = coef.x1,
            "derived logicle coefficients"
        );
        Ok(Self { params, width, coef, config })
    }

    /// The decade parameters this transform was built from.
    pub fn params(&self) -> &BiexpParams {
        &self.params
    }

    /// The resolved linearization width in decades.
    pub fn width(&self) -> f64 {
        self.width
    }

    /// Maps a single channel value onto the logicle scale.
    pub fn scale(&self, value: f64) -> Result<f64> {
        if value == 0.0 {
            return Ok(self.coef.x1);
        }
        if !value.is_finite() {
            return Err(TransformError::BracketExceeded {
                value,
                limit: self.config.solver.bracket_limit,
            });
        }
        if value < 0.0 {
            let positive = self.solve_scale(-value)?;
            return Ok(2.0 * self.coef.x1 - positive);
        }
        self.solve_scale(value)
    }

    /// Maps a scale value back to the corresponding channel value.
    pub fn inverse(&self, value: f64) -> f64 {
        let negative = value < self.coef.x1;
        let x = if negative { 2.0 * self.coef.x1 - value } else { value };
        let result = if x < self.coef.taylor_cutoff {
            self.series_biexponential(x)
        } else {
            let c = &self.coef;
            c.a * (c.b * x).exp() - c.c * (-c.d * x).exp() + c.f
        };
        if negative { -result } else { result }
    }

    /// Scales a slice of channel values, parallelized per the configured
    /// [`Parallelism`](crate::config::Parallelism).
    pub fn scale_all(&self, values: &[f64]) -> Result<Vec<f64>> {
        par_try_map(values, self.config.parallelism, |v| self.scale(v))
    }

    /// Inverts a slice of scale values.
    pub fn inverse_all(&self, values: &[f64]) -> Vec<f64> {
        par_map(values, self.config.parallelism, |v| self.inverse(v))
    }

    fn solve_scale(&self, value: f64) -> Result<f64> {
        let coef = &self.coef;
        // Initial guess: linear near the root of B, logarithmic above
        let guess = if value < coef.f {
            coef.x1 + value / coef.taylor[0]
        } else {
            (value / coef.a).ln() / coef.b
        };
        solve_increasing(
            |x| self.biexponential_with_derivatives(x),
            value,
            guess,
            coef.x1,
            &self.config.solver,
        )
    }

    /// `B` and its first two derivatives at `x`. The value switches to the
    /// Taylor series below the cutoff; the derivatives have no cancellation
    /// problem and always use the exponential forms.
    fn biexponential_with_derivatives(&self, x: f64) -> (f64, f64, f64) {
        let c = &self.coef;
        let positive = c.a * (c.b * x).exp();
        let negative = c.c * (-c.d * x).exp();
        let value = if x < c.taylor_cutoff {
            self.series_biexponential(x)
        } else {
            (positive + c.f) - negative
        };
        let d1 = c.b * positive + c.d * negative;
        let d2 = c.b * c.b * positive - c.d * c.d * negative;
        (value, d1, d2)
    }

    fn series_biexponential(&self, x: f64) -> f64 {
        let t = x - self.coef.x1;
        let taylor = &self.coef.taylor;
        let mut sum = taylor[TAYLOR_LENGTH - 1] * t;
        for i in (2..TAYLOR_LENGTH - 1).rev() {
            sum = (sum + taylor[i]) * t;
        }
        // taylor[1] is identically zero, so the quadratic term is skipped
        (sum * t + taylor[0]) * t
    }
}

impl ScaleTransform for Logicle {
    fn scale(&self, value: f64) -> Result<f64> {
        Logicle::scale(self, value)
    }

    fn inverse(&self, value: f64) -> f64 {
        Logicle::inverse(self, value)
    }

    fn scale_all(&self, values: &[f64]) -> Result<Vec<f64>> {
        Logicle::scale_all(self, values)
    }

    fn inverse_all(&self, values: &[f64]) -> Vec<f64> {
        Logicle::inverse_all(self, values)
    }
}

/// Derives the biexponential coefficients from decade parameters.
///
/// `w == 0` degenerates the negative decay constant to `d = b`, which turns
/// the logicle into a pure inverse hyperbolic sine scale.
fn derive_coefficients(t: f64, m: f64, w: f64, a: f64) -> Result<Coefficients> {
    validate_biexp(t, m, w, a, false)?;

    let decades = m + a;
    let w_internal = w / decades;
    let x2 = a / decades;
    let x1 = x2 + w_internal;
    let x0 = x2 + 2.0 * w_internal;
    let b = decades * std::f64::consts::LN_10;
    let d = if w_internal == 0.0 {
        b
    } else {
        // d solves 2 (ln d - ln b) + w (d + b) = 0
        let half_wb = 0.5 * w_internal * b;
        2.0 * product_log(half_wb * (-half_wb).exp()) / w_internal
    };

    let c_a = (x0 * (b + d)).exp();
    let mf_a = (b * x1).exp() - c_a / (d * x1).exp();
    let amplitude = t / (b.exp() - mf_a - c_a / d.exp());
    let c = c_a * amplitude;
    let f = -mf_a * amplitude;

    // Taylor expansion of B around x1; coefficient i multiplies (x - x1)^(i+1)
    let mut taylor = [0.0; TAYLOR_LENGTH];
    let mut pos_coef = amplitude * (b * x1).exp();
    let mut neg_coef = -c * (-d * x1).exp();
    for (i, slot) in taylor.iter_mut().enumerate() {
        pos_coef *= b / (i + 1) as f64;
        neg_coef *= -d / (i + 1) as f64;
        *slot = pos_coef + neg_coef;
    }
    // The width relation solved for d makes B''(x1) vanish exactly
    taylor[1] = 0.0;

    Ok(Coefficients {
        a: amplitude,
        b,
        c,
        d,
        f,
        x1,
        taylor_cutoff: x1 + w_internal / 4.0,
        taylor,
    })
}
