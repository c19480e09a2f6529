use super::Cell;
use crate::path::{PathRef, PathType, State};

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct CellStats {
    pub offered: usize,
    pub accepted: usize,
}

impl std::ops::AddAssign for CellStats {
    fn add_assign(&mut self, rhs: Self) {
        self.offered += rhs.offered;
        self.accepted += rhs.accepted;
    }
}

/// Counts offers and acceptances of the wrapped cell.
#[derive(Debug, Default, Clone)]
pub struct CountingCell<C> {
    inner: C,
    stats: CellStats,
}

impl<C: Cell> CountingCell<C> {
    pub fn new(inner: C) -> Self {
        Self {
            inner,
            stats: CellStats::default(),
        }
    }

    pub fn stats(&self) -> CellStats {
        self.stats
    }

    pub fn inner(&self) -> &C {
        &self.inner
    }
}

impl<C: Cell> Cell for CountingCell<C> {
    fn add(&mut self, path: PathRef) -> bool {
        self.stats.offered += 1;
        let accepted = self.inner.add(path);
        if accepted {
            self.stats.accepted += 1;
        }
        accepted
    }

    fn paths(&self) -> impl Iterator<Item = &PathRef> + '_ {
        self.inner.paths()
    }

    fn starting(&self, start: State, kind: PathType) -> impl Iterator<Item = &PathRef> + '_ {
        self.inner.starting(start, kind)
    }

    fn find(&self, start: State, end: State, kind: PathType) -> Option<&PathRef> {
        self.inner.find(start, end, kind)
    }

    fn len(&self) -> usize {
        self.inner.len()
    }

    fn best(&self) -> Option<&PathRef> {
        self.inner.best()
    }
}

/// Refuses paths scoring more than `width` below the best one seen so far.
///
/// Pruning is not retroactive: a path admitted early stays even when a
/// later arrival raises the bar.
#[derive(Debug, Clone)]
pub struct BeamCell<C> {
    inner: C,
    width: f64,
    top: f64,
}

impl<C: Cell> BeamCell<C> {
    pub fn new(inner: C, width: f64) -> Self {
        Self {
            inner,
            width,
            top: f64::NEG_INFINITY,
        }
    }
}

impl<C: Cell> Cell for BeamCell<C> {
    fn add(&mut self, path: PathRef) -> bool {
        let score = path.score();
        if score < self.top - self.width {
            return false;
        }
        let accepted = self.inner.add(path);
        if accepted && score > self.top {
            self.top = score;
        }
        accepted
    }

    fn paths(&self) -> impl Iterator<Item = &PathRef> + '_ {
        self.inner.paths()
    }

    fn starting(&self, start: State, kind: PathType) -> impl Iterator<Item = &PathRef> + '_ {
        self.inner.starting(start, kind)
    }

    fn find(&self, start: State, end: State, kind: PathType) -> Option<&PathRef> {
        self.inner.find(start, end, kind)
    }

    fn len(&self) -> usize {
        self.inner.len()
    }

    fn best(&self) -> Option<&PathRef> {
        self.inner.best()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cell::FullCell;
    use crate::path::Path;

    #[test]
    fn test_counting_cell_counts() {
        let mut c = CountingCell::new(FullCell::new());
        c.add(Path::leaf(0, 0, 1, 1.0));
        c.add(Path::leaf(0, 0, 1, 0.0));
        c.add(Path::leaf(0, 0, 2, 0.0));
        assert_eq!(
            c.stats(),
            CellStats {
                offered: 3,
                accepted: 2
            }
        );
        assert_eq!(c.len(), 2);
    }

    #[test]
    fn test_beam_cell_drops_far_paths() {
        let mut c = BeamCell::new(FullCell::new(), 1.0);
        assert!(c.add(Path::leaf(0, 0, 1, 5.0)));
        assert!(c.add(Path::leaf(0, 0, 2, 4.5)));
        assert!(!c.add(Path::leaf(0, 0, 3, 3.0)));
        assert_eq!(c.len(), 2);
        assert_eq!(c.best().unwrap().score(), 5.0);
    }
}
