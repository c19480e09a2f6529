//! Numerically stable arithmetic on log-probabilities.
//!
//! Values are natural logs. Probability zero is represented by
//! [`LOG_ZERO`] rather than `-inf`, so subtracting two zeros never produces
//! `NaN`. Every primitive here maps "zero in" to "zero out" explicitly.

use crate::consts::LOG_ZERO;
use std::f64::consts::LN_2;

#[inline(always)]
pub fn is_zero(x: f64) -> bool {
    x <= LOG_ZERO
}

#[inline(always)]
pub fn from_prob(p: f64) -> f64 {
    if p <= 0.0 {
        LOG_ZERO
    } else {
        p.ln()
    }
}

#[inline(always)]
pub fn to_prob(x: f64) -> f64 {
    if is_zero(x) {
        0.0
    } else {
        x.exp()
    }
}

/// `ln(e^a + e^b)`
#[inline]
pub fn log_add(a: f64, b: f64) -> f64 {
    let (hi, lo) = if a >= b { (a, b) } else { (b, a) };
    if is_zero(lo) {
        return if is_zero(hi) { LOG_ZERO } else { hi };
    }
    hi + (lo - hi).exp().ln_1p()
}

/// `ln(e^a - e^b)`, requires `a >= b`.
///
/// Equal arguments (and tiny negative differences caused by rounding)
/// collapse to [`LOG_ZERO`].
#[inline]
pub fn log_sub(a: f64, b: f64) -> f64 {
    if is_zero(b) {
        return a;
    }
    debug_assert!(
        b <= a + 1e-9 * a.abs().max(1.0),
        "log_sub would go negative: {} - {}",
        a,
        b
    );
    if b >= a {
        return LOG_ZERO;
    }
    let d = b - a;
    if d > -LN_2 {
        a + (-d.exp_m1()).ln()
    } else {
        a + (-d.exp()).ln_1p()
    }
}

#[inline(always)]
pub fn log_mul(a: f64, b: f64) -> f64 {
    if is_zero(a) || is_zero(b) {
        LOG_ZERO
    } else {
        a + b
    }
}

/// `ln(e^a / e^b)`. Division by a zero normaliser yields [`LOG_ZERO`].
#[inline(always)]
pub fn log_div(a: f64, b: f64) -> f64 {
    if is_zero(a) || is_zero(b) {
        LOG_ZERO
    } else {
        a - b
    }
}

/// Log-sum-exp over a slice, factoring out the maximum.
pub fn log_sum(values: &[f64]) -> f64 {
    let max = values.iter().copied().fold(LOG_ZERO, f64::max);
    if is_zero(max) {
        return LOG_ZERO;
    }
    let total: f64 = values
        .iter()
        .filter(|v| !is_zero(**v))
        .map(|v| (v - max).exp())
        .sum();
    max + total.ln()
}

/// Log of a uniform draw from `(0, 1]`.
#[inline]
pub fn random_log_prob(rng: &mut fastrand::Rng) -> f64 {
    (1.0 - rng.f64()).ln()
}

/// Returns `true` with probability `e^log_p`.
#[inline]
pub fn bernoulli(rng: &mut fastrand::Rng, log_p: f64) -> bool {
    if is_zero(log_p) {
        return false;
    }
    random_log_prob(rng) <= log_p
}
