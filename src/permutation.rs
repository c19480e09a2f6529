use crate::error::{PermForgeError, PfResult};
use crate::path::Path;
use crate::scorer::BeforeCost;

/// The caller-owned ordering a chart searches around.
///
/// `order[p]` is the original index sitting at position `p`; `symbols[i]`
/// is the label of original index `i`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Permutation {
    order: Vec<usize>,
    symbols: Vec<u32>,
    changed: bool,
}

impl Permutation {
    /// Identity ordering over `n` items labelled `0..n`.
    pub fn identity(n: usize) -> Self {
        Self {
            order: (0..n).collect(),
            symbols: (0..n as u32).collect(),
            changed: false,
        }
    }

    /// Identity ordering over the given labels.
    pub fn with_symbols(symbols: Vec<u32>) -> Self {
        Self {
            order: (0..symbols.len()).collect(),
            symbols,
            changed: false,
        }
    }

    pub fn from_order(order: Vec<usize>) -> PfResult<Self> {
        let n = order.len();
        let mut seen = vec![false; n];
        let valid = order
            .iter()
            .all(|&i| i < n && !std::mem::replace(&mut seen[i], true));
        if !valid {
            return Err(PermForgeError::InvalidOrder { order, n });
        }
        Ok(Self {
            order,
            symbols: (0..n as u32).collect(),
            changed: false,
        })
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.order.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    #[inline]
    pub fn order(&self) -> &[usize] {
        &self.order
    }

    /// Original index at position `p`.
    #[inline]
    pub fn at(&self, p: usize) -> usize {
        self.order[p]
    }

    /// Label of the item currently at position `p`.
    #[inline]
    pub fn symbol_at(&self, p: usize) -> u32 {
        self.symbols[self.order[p]]
    }

    pub fn symbols(&self) -> &[u32] {
        &self.symbols
    }

    /// Whether the last [`reorder`](Self::reorder) moved anything.
    #[inline]
    pub fn changed(&self) -> bool {
        self.changed
    }

    /// Overwrites the ordering with the path's leaves, left to right.
    pub fn reorder(&mut self, path: &Path) {
        debug_assert_eq!(path.len(), self.order.len(), "path does not cover permutation");
        self.changed = false;
        for (slot, index) in self.order.iter_mut().zip(path.leaves()) {
            if *slot != index {
                self.changed = true;
                *slot = index;
            }
        }
    }

    /// Replaces the ordering outright, keeping the labels.
    pub fn assign(&mut self, order: &[usize]) -> PfResult<()> {
        let checked = Self::from_order(order.to_vec())?;
        if checked.len() != self.len() {
            return Err(PermForgeError::SizeMismatch {
                what: "order",
                got: checked.len(),
                expected: self.len(),
            });
        }
        self.changed = self.order != checked.order;
        self.order = checked.order;
        Ok(())
    }

    /// Sum of `cost(a, b)` over every pair with `a` placed before `b`.
    pub fn score_under(&self, cost: &BeforeCost) -> f64 {
        let n = self.order.len();
        let mut total = 0.0;
        for p in 0..n {
            for q in (p + 1)..n {
                total += cost.get(self.order[p], self.order[q]);
            }
        }
        total
    }
}

/// Whether `seq` (a permutation of `0..len`) is separable, i.e. reachable
/// from the identity by nested keeps and swaps of adjacent blocks.
///
/// Shift-reduce over value ranges: merge the two topmost blocks whenever
/// they cover a contiguous range.
pub fn is_separable(seq: &[usize]) -> bool {
    let mut stack: Vec<(usize, usize)> = Vec::with_capacity(seq.len());
    for &x in seq {
        let mut block = (x, x);
        while let Some(&(lo, hi)) = stack.last() {
            if hi + 1 == block.0 || block.1 + 1 == lo {
                stack.pop();
                block = (lo.min(block.0), hi.max(block.1));
            } else {
                break;
            }
        }
        stack.push(block);
    }
    stack.len() <= 1
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::path::Path;

    #[test]
    fn test_from_order_validates() {
        assert!(Permutation::from_order(vec![2, 0, 1]).is_ok());
        assert!(matches!(
            Permutation::from_order(vec![0, 0, 1]),
            Err(PermForgeError::InvalidOrder { n: 3, .. })
        ));
        assert!(Permutation::from_order(vec![0, 3, 1]).is_err());
    }

    #[test]
    fn test_assign_rejects_other_lengths() {
        let mut perm = Permutation::identity(3);
        assert!(matches!(
            perm.assign(&[1, 0]),
            Err(PermForgeError::SizeMismatch { got: 2, expected: 3, .. })
        ));
        perm.assign(&[2, 0, 1]).unwrap();
        assert!(perm.changed());
        assert_eq!(perm.order(), &[2, 0, 1]);
    }

    #[test]
    fn test_reorder_sets_changed_and_is_idempotent() {
        let mut perm = Permutation::identity(2);
        let a = Path::leaf(0, 0, 0, 0.0);
        let b = Path::leaf(1, 0, 0, 0.0);
        let swap = Path::connect(&a, &b, 0.0, true).unwrap();

        perm.reorder(&swap);
        assert!(perm.changed());
        assert_eq!(perm.order(), &[1, 0]);

        perm.reorder(&swap);
        assert!(!perm.changed());
        assert_eq!(perm.order(), &[1, 0]);
    }

    #[test]
    fn test_separable_rejects_the_two_forbidden_patterns() {
        assert!(is_separable(&[]));
        assert!(is_separable(&[2, 0, 1, 3]));
        assert!(is_separable(&[3, 2, 1, 0]));
        assert!(!is_separable(&[1, 3, 0, 2]));
        assert!(!is_separable(&[2, 0, 3, 1]));
        assert!(!is_separable(&[0, 2, 4, 1, 3]));
    }

    #[test]
    fn test_symbol_follows_item() {
        let mut perm = Permutation::with_symbols(vec![10, 20]);
        let a = Path::leaf(0, 0, 0, 0.0);
        let b = Path::leaf(1, 0, 0, 0.0);
        perm.reorder(&Path::connect(&a, &b, 0.0, true).unwrap());
        assert_eq!(perm.symbol_at(0), 20);
        assert_eq!(perm.symbol_at(1), 10);
    }
}
