pub mod cell;
pub mod chart;
pub mod config;
pub mod consts;
pub mod error;
pub mod gradient;
pub mod kbest;
pub mod log_math;
pub mod optimizer;
pub mod path;
pub mod permutation;
pub mod scorer;
pub mod semiring;

pub use crate::error::{PermForgeError, PfResult};
