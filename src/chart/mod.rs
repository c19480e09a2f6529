//! CKY-style table over the spans of a permutation.

pub mod controller;

pub use self::controller::{
    build_controller, AnchorLeft, AnchorRight, ControllerKind, Cubic, DistortionLimit,
    ParseController, Quadratic, Recurrence,
};

use crate::cell::{BestCell, Cell};
use crate::path::{Path, PathRef, PathType};
use crate::permutation::Permutation;
use crate::scorer::Scorer;
use tracing::debug;

/// Supplies the leaf paths of each position.
///
/// The trivial map yields one zero-score leaf with both states `0`; an
/// automaton-backed map may yield several leaves with distinct states.
pub trait CellMap {
    /// `index` is the original item sitting at `position`.
    fn leaves(&self, position: usize, index: usize, symbol: u32) -> Vec<PathRef>;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct TrivialCellMap;

impl CellMap for TrivialCellMap {
    fn leaves(&self, _position: usize, index: usize, _symbol: u32) -> Vec<PathRef> {
        vec![Path::leaf(index, 0, 0, 0.0)]
    }
}

/// Scored leaves per position, any state.
impl<F: Fn(usize, usize, u32) -> Vec<PathRef>> CellMap for F {
    fn leaves(&self, position: usize, index: usize, symbol: u32) -> Vec<PathRef> {
        self(position, index, symbol)
    }
}

/// Triangular array of cells, one per span `[begin, end)`.
///
/// Built for one permutation; after [`permute`](Self::permute) the top cell
/// `(0, n)` holds the best reachable reorderings.
pub struct Chart<C> {
    n: usize,
    cells: Vec<C>,
}

#[inline(always)]
fn span(begin: usize, end: usize) -> usize {
    debug_assert!(begin < end);
    end * (end - 1) / 2 + begin
}

impl<C: Cell> Chart<C> {
    pub fn new<M, F>(perm: &Permutation, cell_map: &M, make_cell: F) -> Self
    where
        M: CellMap + ?Sized,
        F: Fn() -> C,
    {
        let n = perm.len();
        let count = if n == 0 { 1 } else { n * (n + 1) / 2 };
        let mut cells: Vec<C> = (0..count).map(|_| make_cell()).collect();
        if n == 0 {
            cells[0].add(Path::epsilon(0, 0, 0.0));
        }
        for p in 0..n {
            let cell = &mut cells[span(p, p + 1)];
            for leaf in cell_map.leaves(p, perm.at(p), perm.symbol_at(p)) {
                debug_assert_eq!(leaf.path_type(), PathType::Leaf);
                cell.add(leaf);
            }
        }
        Self { n, cells }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.n
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.n == 0
    }

    pub fn cell(&self, begin: usize, end: usize) -> &C {
        &self.cells[span(begin, end)]
    }

    pub fn top(&self) -> &C {
        if self.n == 0 {
            &self.cells[0]
        } else {
            self.cell(0, self.n)
        }
    }

    pub fn cells(&self) -> &[C] {
        &self.cells
    }

    /// Fills every span of width 2 and up. Returns the number of composites
    /// offered to cells.
    pub fn permute<P, S>(&mut self, controller: &P, scorer: &S) -> usize
    where
        P: ParseController + ?Sized,
        S: Scorer + ?Sized,
    {
        let n = self.n;
        debug_assert_eq!(scorer.len(), n, "scorer built for another permutation");
        let mut offered = 0;
        let mut built = Vec::new();
        for width in 2..=n {
            for begin in 0..=(n - width) {
                let end = begin + width;
                let midpoints = controller.midpoints(begin, end, n);
                debug_assert!(!midpoints.is_empty(), "span ({begin},{end}) has no midpoint");
                for middle in midpoints {
                    let left = &self.cells[span(begin, middle)];
                    let right = &self.cells[span(middle, end)];
                    combine_keep(left, right, scorer.keep_score(begin, middle, end), &mut built);
                    if controller.allows_swap(begin, middle, end, n) {
                        combine_swap(left, right, scorer.swap_score(begin, middle, end), &mut built);
                    }
                }
                offered += built.len();
                let parent = &mut self.cells[span(begin, end)];
                for path in built.drain(..) {
                    parent.add(path);
                }
            }
        }
        debug!("Chart::permute: n={} offered={} top={}", n, offered, self.top().len());
        offered
    }

    /// Highest-ranked path of the top cell.
    pub fn best_path(&self) -> Option<PathRef> {
        self.top().best().cloned()
    }
}

impl Chart<BestCell> {
    /// Chart with trivial leaves and best-per-type cells.
    pub fn trivial(perm: &Permutation) -> Self {
        Self::new(perm, &TrivialCellMap, BestCell::new)
    }
}

/// Every `left ++ right` composite whose states meet.
fn combine_keep<C: Cell>(left: &C, right: &C, score: f64, out: &mut Vec<PathRef>) {
    for l in left.paths() {
        for kind in [PathType::Leaf, PathType::Swap] {
            for r in right.starting(l.end(), kind) {
                if let Some(p) = Path::connect(l, r, score, false) {
                    out.push(p);
                }
            }
        }
    }
}

/// Every `right ++ left` composite whose states meet.
fn combine_swap<C: Cell>(left: &C, right: &C, score: f64, out: &mut Vec<PathRef>) {
    for r in right.paths() {
        for kind in [PathType::Leaf, PathType::Keep] {
            for l in left.starting(r.end(), kind) {
                if let Some(p) = Path::connect(l, r, score, true) {
                    out.push(p);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cell::FullCell;
    use crate::scorer::{BeforeCost, BeforeScorer};

    #[test]
    fn test_empty_permutation_yields_epsilon() {
        let perm = Permutation::identity(0);
        let mut chart = Chart::trivial(&perm);
        let scorer = BeforeScorer::cubic(&BeforeCost::new(0), &perm);
        chart.permute(&Cubic, &scorer);
        let best = chart.best_path().unwrap();
        assert!(best.is_empty());
    }

    #[test]
    fn test_single_item_is_leaf() {
        let perm = Permutation::identity(1);
        let mut chart = Chart::trivial(&perm);
        chart.permute(&Cubic, &BeforeScorer::cubic(&BeforeCost::new(1), &perm));
        assert_eq!(chart.best_path().unwrap().path_type(), PathType::Leaf);
    }

    #[test]
    fn test_best_prefers_positive_swap() {
        let mut c = BeforeCost::new(2);
        c.set(1, 0, 2.0);
        let perm = Permutation::identity(2);
        let mut chart = Chart::trivial(&perm);
        chart.permute(&Cubic, &BeforeScorer::cubic(&c, &perm));
        let best = chart.best_path().unwrap();
        assert_eq!(best.leaves(), vec![1, 0]);
        assert_eq!(best.score(), 2.0);
    }

    #[test]
    fn test_state_mismatch_blocks_combination() {
        // Position 0 ends in state 1, position 1 starts in state 2: no keep,
        // but the swap (1 then 0) needs 1.end == 0.start.
        let map = |p: usize, i: usize, _s: u32| match p {
            0 => vec![Path::leaf(i, 0, 1, 0.0)],
            _ => vec![Path::leaf(i, 2, 0, 0.0)],
        };
        let perm = Permutation::identity(2);
        let mut chart = Chart::new(&perm, &map, FullCell::new);
        chart.permute(&Cubic, &BeforeScorer::cubic(&BeforeCost::new(2), &perm));
        let top: Vec<_> = chart.top().paths().cloned().collect();
        assert_eq!(top.len(), 1);
        assert_eq!(top[0].leaves(), vec![1, 0]);
        assert_eq!((top[0].start(), top[0].end()), (2, 1));
    }
}
