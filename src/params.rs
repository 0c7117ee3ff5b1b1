//! Scale parameter sets shared by the transform families.
//!
//! Logicle and hyperlog share one parameter shape: `T` (top of scale), `M`
//! (total decades), `W` (quasi-linear width in decades) and `A` (additional
//! negative decades). The width can be given directly or derived from a
//! robustness estimate of the channel's negative population, which is how
//! instrument pipelines usually pick it.

use serde::{Deserialize, Serialize};

use crate::error::{Result, TransformError};

/// How the quasi-linear width `W` is obtained.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum WidthSpec {
    /// Use `w` as given
    Explicit(f64),
    /// Derive from a robustness estimate `R` of the most negative channel
    /// values: `W = (M - log10(T / |R|)) / 2`
    FromRobustness(f64),
    /// Derive `R` as the lower quantile at this level of the channel's
    /// negative values, then proceed as [`WidthSpec::FromRobustness`]
    FromQuantile(f64),
}

impl WidthSpec {
    /// Resolve to a concrete width.
    ///
    /// `data` is the channel being transformed; only
    /// [`WidthSpec::FromQuantile`] needs it.
    pub fn resolve(&self, t: f64, m: f64, data: Option<&[f64]>) -> Result<f64> {
        match *self {
            WidthSpec::Explicit(w) => Ok(w),
            WidthSpec::FromRobustness(r) => Ok(width_from_robustness(t, m, r)),
            WidthSpec::FromQuantile(level) => {
                let Some(values) = data else {
                    return Err(TransformError::InvalidParameters(
                        "Quantile-derived width needs channel data; inverse transforms must use \
                         an explicit or robustness width"
                            .to_string(),
                    ));
                };
                let negatives: Vec<f64> =
                    values.iter().copied().filter(|&v| v < 0.0).collect();
                let r = quantile(&negatives, level);
                Ok(width_from_robustness(t, m, r))
            }
        }
    }
}

/// Width from a robustness estimate `R`.
///
/// `R == 0` resolves to a fixed unit width, matching long-standing pipeline
/// behavior for channels with no negative population.
pub fn width_from_robustness(t: f64, m: f64, r: f64) -> f64 {
    if r == 0.0 {
        1.0
    } else {
        (m - (t / r.abs()).log10()) / 2.0
    }
}

/// Lower `level`-quantile: sort ascending and index at `level * len`.
///
/// No interpolation; an out-of-range index (including empty input) yields 0.
pub fn quantile(values: &[f64], level: f64) -> f64 {
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
    let index = (level * sorted.len() as f64) as usize;
    match sorted.get(index) {
        Some(&v) => v,
        None => 0.0,
    }
}

/// Parameters for the logicle and hyperlog (biexponential) families
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BiexpParams {
    /// Top of scale (maximum expected value)
    pub t: f64,

    /// Total decades the scale spans
    pub m: f64,

    /// Quasi-linear width around zero, in decades
    pub width: WidthSpec,

    /// Additional negative decades below the quasi-linear region
    pub a: f64,
}

impl BiexpParams {
    /// Parameters with an explicit width.
    pub fn new(t: f64, m: f64, w: f64, a: f64) -> Self {
        Self {
            t,
            m,
            width: WidthSpec::Explicit(w),
            a,
        }
    }
}

impl Default for BiexpParams {
    fn default() -> Self {
        // 18-bit instrument scale, 4.5 decades
        Self::new(262144.0, 4.5, 0.5, 0.0)
    }
}

/// Parameters for the asinh family
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AsinhParams {
    /// Top of scale
    pub t: f64,

    /// Total decades
    pub m: f64,

    /// Additional negative decades
    pub a: f64,
}

impl AsinhParams {
    pub fn new(t: f64, m: f64, a: f64) -> Self {
        Self { t, m, a }
    }

    pub(crate) fn validate(&self) -> Result<()> {
        if !(self.t.is_finite() && self.m.is_finite() && self.a.is_finite()) {
            return Err(TransformError::InvalidParameters(
                "Asinh parameters must be finite".to_string(),
            ));
        }
        if self.t <= 0.0 {
            return Err(TransformError::InvalidParameters(format!(
                "T must be positive, got {}",
                self.t
            )));
        }
        if self.m <= 0.0 {
            return Err(TransformError::InvalidParameters(format!(
                "M must be positive, got {}",
                self.m
            )));
        }
        if self.m + self.a <= 0.0 {
            return Err(TransformError::InvalidParameters(format!(
                "M + A must be positive, got M = {}, A = {}",
                self.m, self.a
            )));
        }
        Ok(())
    }
}

impl Default for AsinhParams {
    fn default() -> Self {
        Self::new(262144.0, 4.5, 0.0)
    }
}

/// Parameters for the log10 family
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LogParams {
    /// Top of scale
    pub t: f64,

    /// Total decades
    pub m: f64,
}

impl LogParams {
    pub fn new(t: f64, m: f64) -> Self {
        Self { t, m }
    }

    pub(crate) fn validate(&self) -> Result<()> {
        if !(self.t.is_finite() && self.m.is_finite()) {
            return Err(TransformError::InvalidParameters(
                "Log parameters must be finite".to_string(),
            ));
        }
        if self.t <= 0.0 {
            return Err(TransformError::InvalidParameters(format!(
                "T must be positive, got {}",
                self.t
            )));
        }
        if self.m <= 0.0 {
            return Err(TransformError::InvalidParameters(format!(
                "M must be positive, got {}",
                self.m
            )));
        }
        Ok(())
    }
}

impl Default for LogParams {
    fn default() -> Self {
        Self::new(262144.0, 4.5)
    }
}

/// Domain checks shared by the biexponential families.
///
/// `positive_width` tightens `W >= 0` to `W > 0` (the hyperlog derivation
/// divides by `W`).
pub(crate) fn validate_biexp(
    t: f64,
    m: f64,
    w: f64,
    a: f64,
    positive_width: bool,
) -> Result<()> {
    if !(t.is_finite() && m.is_finite() && w.is_finite() && a.is_finite()) {
        return Err(TransformError::InvalidParameters(
            "Scale parameters must be finite".to_string(),
        ));
    }
    if t <= 0.0 {
        return Err(TransformError::InvalidParameters(format!(
            "T must be positive, got {t}"
        )));
    }
    if m <= 0.0 {
        return Err(TransformError::InvalidParameters(format!(
            "M must be positive, got {m}"
        )));
    }
    if w < 0.0 || (positive_width && w == 0.0) {
        return Err(TransformError::InvalidParameters(format!(
            "W must be {}, got {w}",
            if positive_width { "positive" } else { "non-negative" }
        )));
    }
    if w >= m / 2.0 {
        return Err(TransformError::InvalidParameters(format!(
            "W must be below M/2, got W = {w} with M = {m}"
        )));
    }
    if -a > w {
        return Err(TransformError::InvalidParameters(format!(
            "A must be at least -W, got A = {a} with W = {w}"
        )));
    }
    if a + w > m - w {
        return Err(TransformError::InvalidParameters(format!(
            "A + W must not exceed M - W, got A = {a}, W = {w}, M = {m}"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::{assert_abs_diff_eq, assert_relative_eq};

    #[test]
    fn test_quantile_lower() {
        let data = vec![5.0, 1.0, 3.0, 2.0, 4.0];
        assert_relative_eq!(quantile(&data, 0.0), 1.0);
        assert_relative_eq!(quantile(&data, 0.05), 1.0);
        assert_relative_eq!(quantile(&data, 0.5), 3.0);
        assert_relative_eq!(quantile(&data, 0.9), 5.0);
    }

    #[test]
    fn test_quantile_out_of_range_is_zero() {
        assert_eq!(quantile(&[], 0.05), 0.0);
        assert_eq!(quantile(&[1.0, 2.0], 1.0), 0.0);
        assert_eq!(quantile(&[1.0, 2.0], 1.5), 0.0);
    }

    #[test]
    fn test_width_from_robustness_zero_is_unit() {
        assert_eq!(width_from_robustness(262144.0, 4.5, 0.0), 1.0);
    }

    #[test]
    fn test_width_from_robustness_sign_invariant() {
        let pos = width_from_robustness(262144.0, 4.5, 150.0);
        let neg = width_from_robustness(262144.0, 4.5, -150.0);
        assert_relative_eq!(pos, neg);
        assert!(pos > 0.0 && pos < 4.5 / 2.0);
    }

    #[test]
    fn test_width_vanishes_at_full_scale_ratio() {
        // |R| = T / 10^M puts the whole scale above the robustness estimate
        assert_abs_diff_eq!(
            width_from_robustness(1000.0, 4.0, -0.1),
            0.0,
            epsilon = 1e-12
        );
    }

    #[test]
    fn test_quantile_width_matches_robustness_width() {
        let params = BiexpParams {
            width: WidthSpec::FromQuantile(0.05),
            ..BiexpParams::default()
        };
        let data = vec![8.0, -10.0, -4.0, 5.0, -2.0, -1.0];
        let from_data = params
            .width
            .resolve(params.t, params.m, Some(&data))
            .unwrap();
        let direct = WidthSpec::FromRobustness(-10.0)
            .resolve(params.t, params.m, None)
            .unwrap();
        assert_relative_eq!(from_data, direct);
    }

    #[test]
    fn test_quantile_width_without_data_is_rejected() {
        let spec = WidthSpec::FromQuantile(0.05);
        assert!(spec.resolve(262144.0, 4.5, None).is_err());
    }

    #[test]
    fn test_no_negatives_resolves_to_unit_width() {
        let spec = WidthSpec::FromQuantile(0.05);
        let w = spec.resolve(262144.0, 4.5, Some(&[1.0, 2.0, 3.0])).unwrap();
        assert_eq!(w, 1.0);
    }

    #[test]
    fn test_validate_biexp_rejections() {
        assert!(validate_biexp(0.0, 4.5, 0.5, 0.0, false).is_err()); // T
        assert!(validate_biexp(1000.0, -1.0, 0.5, 0.0, false).is_err()); // M
        assert!(validate_biexp(1000.0, 4.0, -0.1, 0.0, false).is_err()); // W < 0
        assert!(validate_biexp(1000.0, 4.0, 2.0, 0.0, false).is_err()); // W = M/2
        assert!(validate_biexp(1000.0, 4.0, 0.0, 0.0, true).is_err()); // W = 0, hyperlog
        assert!(validate_biexp(1000.0, 4.0, 1.0, -1.5, false).is_err()); // -A > W
        assert!(validate_biexp(1000.0, 4.0, 1.0, 2.1, false).is_err()); // A + W > M - W
        assert!(validate_biexp(1000.0, 4.0, f64::NAN, 0.0, false).is_err());
        assert!(validate_biexp(1000.0, 4.0, 1.0, 0.0, false).is_ok());
        assert!(validate_biexp(1000.0, 4.0, 0.0, 0.0, false).is_ok()); // logicle W = 0
    }
}
