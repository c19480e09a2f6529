//! Semirings used by the inside/outside charts.
//!
//! Both weights live in the log domain. [`LogWeight`] is the ordinary
//! probability semiring; [`Expectation`] is the first-order expectation
//! semiring `<p, p*v>` used to carry an additive value (such as a count of
//! preserved adjacencies) alongside probability mass.

use crate::consts::LOG_ZERO;
use crate::log_math::{is_zero, log_add, log_mul, to_prob};
use std::fmt;
use std::ops::{Add, Mul};

/// A commutative semiring `(K, +, *, 0, 1)`.
///
/// `+` merges alternative derivations, `*` chains the pieces of one
/// derivation. The identities are compile-time constants.
pub trait Semiring: Copy + fmt::Debug + PartialEq {
    const ZERO: Self;
    const ONE: Self;

    fn plus(&self, other: &Self) -> Self;
    fn times(&self, other: &Self) -> Self;
    fn is_zero(&self) -> bool;

    /// Log of the probability mass carried by this weight.
    fn log_prob(&self) -> f64;
}

/// A probability stored as its natural log.
#[derive(Clone, Copy, PartialEq)]
pub struct LogWeight(pub f64);

impl LogWeight {
    #[inline]
    pub const fn new(log_p: f64) -> Self {
        LogWeight(log_p)
    }

    #[inline]
    pub fn prob(self) -> f64 {
        to_prob(self.0)
    }
}

impl Semiring for LogWeight {
    const ZERO: Self = LogWeight(LOG_ZERO);
    const ONE: Self = LogWeight(0.0);

    #[inline]
    fn plus(&self, other: &Self) -> Self {
        LogWeight(log_add(self.0, other.0))
    }

    #[inline]
    fn times(&self, other: &Self) -> Self {
        LogWeight(log_mul(self.0, other.0))
    }

    #[inline]
    fn is_zero(&self) -> bool {
        is_zero(self.0)
    }

    #[inline]
    fn log_prob(&self) -> f64 {
        self.0
    }
}

impl fmt::Debug for LogWeight {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if Semiring::is_zero(self) {
            write!(f, "LogWeight(zero)")
        } else {
            write!(f, "LogWeight({:.6})", self.0)
        }
    }
}

/// Expectation-semiring element `<p, p*v>`.
///
/// Stored as `(ln p, v)` where `v` is the value *per unit of mass*, i.e. the
/// numerator divided by `p`. This keeps signed numerators representable while
/// `p` stays in the log domain:
///
/// * `(p1, p1 v1) + (p2, p2 v2) = (p1 + p2, p1 v1 + p2 v2)`
/// * `(p1, p1 v1) * (p2, p2 v2) = (p1 p2, p1 p2 (v1 + v2))`
#[derive(Clone, Copy, PartialEq)]
pub struct Expectation {
    log_p: f64,
    value: f64,
}

impl Expectation {
    /// Mass `e^log_p` carrying value `value`.
    #[inline]
    pub const fn new(log_p: f64, value: f64) -> Self {
        Expectation { log_p, value }
    }

    /// Expected value of the carried quantity under this mass.
    #[inline]
    pub fn expected(&self) -> f64 {
        self.value
    }

    /// The unnormalised numerator `p * v` in the linear domain.
    #[inline]
    pub fn numerator(&self) -> f64 {
        to_prob(self.log_p) * self.value
    }
}

impl Semiring for Expectation {
    const ZERO: Self = Expectation::new(LOG_ZERO, 0.0);
    const ONE: Self = Expectation::new(0.0, 0.0);

    fn plus(&self, other: &Self) -> Self {
        if Semiring::is_zero(self) {
            return *other;
        }
        if Semiring::is_zero(other) {
            return *self;
        }
        let log_p = log_add(self.log_p, other.log_p);
        let w1 = (self.log_p - log_p).exp();
        let w2 = (other.log_p - log_p).exp();
        Expectation::new(log_p, w1 * self.value + w2 * other.value)
    }

    #[inline]
    fn times(&self, other: &Self) -> Self {
        if Semiring::is_zero(self) || Semiring::is_zero(other) {
            return Self::ZERO;
        }
        Expectation::new(self.log_p + other.log_p, self.value + other.value)
    }

    #[inline]
    fn is_zero(&self) -> bool {
        is_zero(self.log_p)
    }

    #[inline]
    fn log_prob(&self) -> f64 {
        self.log_p
    }
}

impl fmt::Debug for Expectation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if Semiring::is_zero(self) {
            write!(f, "Expectation(zero)")
        } else {
            write!(f, "Expectation(ln p={:.6}, v={:.6})", self.log_p, self.value)
        }
    }
}

macro_rules! semiring_ops {
    ($t:ty) => {
        impl Add for $t {
            type Output = $t;
            #[inline]
            fn add(self, rhs: $t) -> $t {
                self.plus(&rhs)
            }
        }

        impl Mul for $t {
            type Output = $t;
            #[inline]
            fn mul(self, rhs: $t) -> $t {
                self.times(&rhs)
            }
        }
    };
}

semiring_ops!(LogWeight);
semiring_ops!(Expectation);
