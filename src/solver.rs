//! Bracketed scalar root solving for the monotone scale functions.
//!
//! Forward logicle and hyperlog evaluation invert a strictly increasing
//! function per element. A pure Newton (or Halley) iteration is fast but not
//! guaranteed; this solver keeps a sign-change bracket at all times and
//! falls back to bisection whenever the polynomial step would leave it, so
//! every solve either converges or fails loudly within its iteration budget.

use crate::config::SolverConfig;
use crate::error::{Result, TransformError};

/// Solve `f(y) = target` for strictly increasing `f`.
///
/// `f` returns the function value and its first two derivatives. The root
/// must lie at or above `lower`, with `f(lower) <= target` (callers pass the
/// scale's zero point). The bracket grows geometrically above `lower` and a
/// target that never brackets (including NaN) is a `BracketExceeded` error.
///
/// The solve concludes on an in-bracket Halley step below the configured
/// tolerance, or on a bracket narrowed below it; either way the tolerance
/// bounds the error of the returned root, not just the last step taken.
///
/// # Arguments
/// * `f` - Scale function evaluation `y -> (f(y), f'(y), f''(y))`
/// * `target` - Right-hand side to invert
/// * `guess` - Starting iterate, used when it falls inside the bracket
/// * `lower` - Known lower bound for the root
pub(crate) fn solve_increasing<F>(
    f: F,
    target: f64,
    guess: f64,
    lower: f64,
    config: &SolverConfig,
) -> Result<f64>
where
    F: Fn(f64) -> (f64, f64, f64),
{
    let mut lo = lower;
    let mut hi = guess.max(lower);
    let mut step = 0.5;
    loop {
        // NaN comparisons are false, so a NaN target expands to the limit
        if f(hi).0 >= target {
            break;
        }
        if hi > config.bracket_limit {
            return Err(TransformError::BracketExceeded {
                value: target,
                limit: config.bracket_limit,
            });
        }
        lo = hi;
        hi += step;
        step *= 2.0;
    }

    let mut x = if guess >= lo && guess <= hi {
        guess
    } else {
        0.5 * (lo + hi)
    };

    for _ in 0..config.max_iterations {
        let (fx, d1, d2) = f(x);
        let residual = fx - target;
        if residual == 0.0 {
            return Ok(x);
        }
        if residual > 0.0 {
            hi = x;
        } else if residual < 0.0 {
            lo = x;
        }

        // Halley correction to the Newton step
        let newton = residual / d1;
        let correction = 1.0 - residual * d2 / (2.0 * d1 * d1);
        let delta = if correction.is_finite() && correction > 0.0 {
            newton / correction
        } else {
            newton
        };

        let next = x - delta;
        if !delta.is_finite() || !(next > lo && next < hi) {
            // Polynomial step left the bracket; bisect instead. A bisection
            // step's size says nothing about the distance to the root, so
            // only the bracket width can conclude the solve here.
            x = 0.5 * (lo + hi);
            let tolerance = config.abs_tolerance.max(config.rel_tolerance * x.abs());
            if hi - lo <= tolerance {
                return Ok(x);
            }
            continue;
        }
        x = next;

        // An applied Halley step contracts the error at cubic order, so
        // once the step is below tolerance the remaining error is too
        let tolerance = config.abs_tolerance.max(config.rel_tolerance * x.abs());
        if delta.abs() <= tolerance {
            return Ok(x);
        }
    }

    Err(TransformError::Convergence {
        value: target,
        iterations: config.max_iterations,
    })
}
