//! Product logarithm (Lambert W function), principal branch.
//!
//! The logicle parameter derivation needs `W(z)` to turn the crossover-width
//! condition `2*(ln d - ln b) + w*(b + d) = 0` into a closed form for `d`.
//! The classic closed-form estimate (two branches, switching at 500) is only
//! percent-level accurate, which is fine for display scales but visibly
//! shifts the derived biexponential coefficients. A short Halley iteration
//! polishes the estimate to machine precision.

use tracing::warn;

/// Principal solution for w in `w * exp(w) = x`.
///
/// Defined here for non-negative arguments; every internal caller satisfies
/// this. The iteration count is bounded, so the function always returns.
pub fn product_log(x: f64) -> f64 {
    if x == 0.0 {
        return 0.0;
    }

    // Closed-form estimate
    let mut w = if x <= 500.0 {
        let lxl = (x + 1.0).ln();
        0.665 * (1.0 + 0.0195 * lxl) * lxl + 0.04
    } else {
        // Asymptotic branch; reduced precision before polishing
        warn!(argument = x, "product_log argument beyond small-argument branch");
        (x - 4.0).ln() - (1.0 - 1.0 / x.ln()) * x.ln().ln()
    };

    if x <= 500.0 {
        // Halley iteration on w*exp(w) - x = 0
        for _ in 0..16 {
            let ew = w.exp();
            let f = w * ew - x;
            let delta = f / (ew * (w + 1.0) - (w + 2.0) * f / (2.0 * w + 2.0));
            w -= delta;
            if delta.abs() <= f64::EPSILON * w.abs() {
                break;
            }
        }
    } else {
        // Log-form Newton so exp(w) cannot overflow for huge arguments
        let ln_x = x.ln();
        for _ in 0..16 {
            let delta = w * (w + w.ln() - ln_x) / (w + 1.0);
            w -= delta;
            if delta.abs() <= f64::EPSILON * w.abs() {
                break;
            }
        }
    }

    w
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_known_values() {
        assert_eq!(product_log(0.0), 0.0);
        assert_relative_eq!(product_log(1.0), 0.567_143_290_409_783_8, epsilon = 1e-14);
        assert_relative_eq!(product_log(std::f64::consts::E), 1.0, epsilon = 1e-14);
        assert_relative_eq!(product_log(10.0), 1.745_528_002_740_699, epsilon = 1e-14);
    }

    #[test]
    fn test_identity_small_branch() {
        for &x in &[1e-12, 1e-6, 0.01, 0.364, 2.5, 55.0, 499.0] {
            let w = product_log(x);
            assert_relative_eq!(w * w.exp(), x, max_relative = 1e-12);
        }
    }

    #[test]
    fn test_identity_asymptotic_branch() {
        for &x in &[501.0, 1e4, 1e8, 1e16, 1e300] {
            let w = product_log(x);
            // Identity checked in log form to stay finite at 1e300
            assert_relative_eq!(w + w.ln(), x.ln(), max_relative = 1e-12);
        }
    }

    #[test]
    fn test_monotone_across_branch_switch() {
        let below = product_log(499.999);
        let above = product_log(500.001);
        assert!(above > below);
    }
}
