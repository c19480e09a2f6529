use crate::error::{PermForgeError, PfResult};
use serde::{Deserialize, Serialize};

/// Dense pairwise matrix over original indices.
///
/// `get(i, j)` is the score contribution of placing item `i` anywhere
/// before item `j`. The same type doubles as a gradient accumulator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BeforeCost {
    n: usize,
    values: Vec<f64>,
}

impl BeforeCost {
    pub fn new(n: usize) -> Self {
        Self {
            n,
            values: vec![0.0; n * n],
        }
    }

    pub fn from_fn<F: FnMut(usize, usize) -> f64>(n: usize, mut f: F) -> Self {
        let mut values = Vec::with_capacity(n * n);
        for i in 0..n {
            for j in 0..n {
                values.push(if i == j { 0.0 } else { f(i, j) });
            }
        }
        Self { n, values }
    }

    pub fn from_rows(rows: Vec<Vec<f64>>) -> PfResult<Self> {
        let n = rows.len();
        let mut values = Vec::with_capacity(n * n);
        for (i, row) in rows.into_iter().enumerate() {
            if row.len() != n {
                return Err(PermForgeError::Validation(format!(
                    "Row {} has {} entries, expected {}",
                    i,
                    row.len(),
                    n
                )));
            }
            if let Some(bad) = row.iter().find(|v| !v.is_finite()) {
                return Err(PermForgeError::Validation(format!(
                    "Row {} holds non-finite cost {}",
                    i, bad
                )));
            }
            values.extend(row);
        }
        Ok(Self { n, values })
    }

    #[inline(always)]
    pub fn len(&self) -> usize {
        self.n
    }

    #[inline(always)]
    pub fn is_empty(&self) -> bool {
        self.n == 0
    }

    #[inline(always)]
    pub fn get(&self, before: usize, after: usize) -> f64 {
        self.values[before * self.n + after]
    }

    #[inline(always)]
    pub fn set(&mut self, before: usize, after: usize, value: f64) {
        self.values[before * self.n + after] = value;
    }

    #[inline(always)]
    pub fn add(&mut self, before: usize, after: usize, value: f64) {
        self.values[before * self.n + after] += value;
    }

    pub fn rows(&self) -> Vec<Vec<f64>> {
        self.values.chunks(self.n.max(1)).map(|r| r.to_vec()).collect()
    }

    /// Largest absolute difference against another matrix of the same size.
    pub fn max_abs_diff(&self, other: &BeforeCost) -> f64 {
        debug_assert_eq!(self.n, other.n);
        self.values
            .iter()
            .zip(&other.values)
            .map(|(a, b)| (a - b).abs())
            .fold(0.0, f64::max)
    }
}

/// Receiver for per-pair gradients.
///
/// Charts never own the parameter vector; they push `d objective / d cost(before, after)`
/// into whatever accumulator the caller supplies.
pub trait GradientSink {
    fn accumulate(&mut self, before: usize, after: usize, value: f64);
}

impl GradientSink for BeforeCost {
    #[inline]
    fn accumulate(&mut self, before: usize, after: usize, value: f64) {
        self.add(before, after, value);
    }
}

impl<F: FnMut(usize, usize, f64)> GradientSink for F {
    #[inline]
    fn accumulate(&mut self, before: usize, after: usize, value: f64) {
        self(before, after, value)
    }
}
