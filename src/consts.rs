/// Log-domain stand-in for probability zero.
///
/// Anything at or below this value is treated as "impossible" by the
/// `log_math` primitives. It is finite so that differences of two zeros
/// stay well defined.
pub const LOG_ZERO: f64 = -1.0e300;

/// Default half-width of the windowed (quadratic) parse controller.
pub const DEFAULT_WINDOW: usize = 3;

/// Default number of derivations requested from the k-best extractor.
pub const DEFAULT_KBEST: usize = 10;

/// A local-search step must beat the current score by more than this.
pub const DEFAULT_MIN_IMPROVEMENT: f64 = 1e-9;

/// Default cap on local-search iterations.
pub const DEFAULT_MAX_ITERATIONS: usize = 100;
