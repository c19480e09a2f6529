//! Scored derivations over a permutation.
//!
//! A [`Path`] is an immutable node of a derivation DAG. Composite nodes hold
//! their two children through shared [`PathRef`] handles, so one
//! sub-derivation built in a chart cell is referenced (never copied) by every
//! parent that uses it.
//!
//! Children are always stored in *source* order: `left` covers
//! `[begin, middle)` and `right` covers `[middle, end)`. A `Swap` node emits
//! them in reverse.

use std::cmp::Ordering;
use std::fmt;
use std::sync::Arc;

/// Boundary state of a path. `0` when no automaton constrains the search.
pub type State = u32;

pub type PathRef = Arc<Path>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum PathType {
    Leaf,
    Keep,
    Swap,
}

impl PathType {
    pub const ALL: [PathType; 3] = [PathType::Leaf, PathType::Keep, PathType::Swap];
}

#[derive(Debug, Clone)]
enum Node {
    Leaf { index: usize },
    Epsilon,
    Composite { left: PathRef, right: PathRef },
}

#[derive(Debug, Clone)]
pub struct Path {
    start: State,
    end: State,
    score: f64,
    kind: PathType,
    len: usize,
    node: Node,
}

impl Path {
    /// A single permutation slot. `index` is the original (pre-reorder)
    /// index of the item it covers.
    pub fn leaf(index: usize, start: State, end: State, score: f64) -> PathRef {
        Arc::new(Path {
            start,
            end,
            score,
            kind: PathType::Leaf,
            len: 1,
            node: Node::Leaf { index },
        })
    }

    /// A path covering no items. Behaves as a leaf for normal-form purposes.
    pub fn epsilon(start: State, end: State, score: f64) -> PathRef {
        Arc::new(Path {
            start,
            end,
            score,
            kind: PathType::Leaf,
            len: 0,
            node: Node::Epsilon,
        })
    }

    /// Combines two adjacent source spans.
    ///
    /// `score` is the local combination score; the result carries
    /// `left.score + right.score + score`. Returns `None` when the composite
    /// would not be in normal form. Boundary states must already agree.
    pub fn connect(left: &PathRef, right: &PathRef, score: f64, swap: bool) -> Option<PathRef> {
        if !Self::may_connect(left.kind, right.kind, swap) {
            return None;
        }
        let (start, end) = if swap {
            debug_assert_eq!(right.end, left.start, "swap states disagree");
            (right.start, left.end)
        } else {
            debug_assert_eq!(left.end, right.start, "keep states disagree");
            (left.start, right.end)
        };
        Some(Arc::new(Path {
            start,
            end,
            score: left.score + right.score + score,
            kind: if swap { PathType::Swap } else { PathType::Keep },
            len: left.len + right.len,
            node: Node::Composite {
                left: Arc::clone(left),
                right: Arc::clone(right),
            },
        }))
    }

    /// Normal-form rule: a Keep may not have a Keep as its source-right
    /// child, a Swap may not have a Swap as its source-left child.
    #[inline(always)]
    pub fn may_connect(left: PathType, right: PathType, swap: bool) -> bool {
        if swap {
            left != PathType::Swap
        } else {
            right != PathType::Keep
        }
    }

    /// Same derivation with `delta` added to its score.
    pub fn add_score(path: &PathRef, delta: f64) -> PathRef {
        let mut p = Path::clone(path);
        p.score += delta;
        Arc::new(p)
    }

    #[inline]
    pub fn start(&self) -> State {
        self.start
    }

    #[inline]
    pub fn end(&self) -> State {
        self.end
    }

    #[inline]
    pub fn score(&self) -> f64 {
        self.score
    }

    #[inline]
    pub fn path_type(&self) -> PathType {
        self.kind
    }

    /// Number of permutation items covered.
    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn index(&self) -> Option<usize> {
        match self.node {
            Node::Leaf { index } => Some(index),
            _ => None,
        }
    }

    /// Children in source order.
    pub fn children(&self) -> Option<(&PathRef, &PathRef)> {
        match &self.node {
            Node::Composite { left, right } => Some((left, right)),
            _ => None,
        }
    }

    pub fn is_normal(&self) -> bool {
        match self.children() {
            Some((l, r)) => Self::may_connect(l.kind, r.kind, self.kind == PathType::Swap),
            None => true,
        }
    }

    /// Score contributed by this node alone.
    pub fn local_score(&self) -> f64 {
        match self.children() {
            Some((l, r)) => self.score - l.score - r.score,
            None => self.score,
        }
    }

    /// Depth-first walk in output order.
    pub fn walk<V: PathVisitor + ?Sized>(&self, visitor: &mut V) {
        match &self.node {
            Node::Leaf { index } => visitor.leaf(self, *index),
            Node::Epsilon => {}
            Node::Composite { left, right } => {
                visitor.enter(self);
                if self.kind == PathType::Swap {
                    right.walk(visitor);
                    left.walk(visitor);
                } else {
                    left.walk(visitor);
                    right.walk(visitor);
                }
                visitor.exit(self);
            }
        }
    }

    /// Original indices in output order.
    pub fn leaves(&self) -> Vec<usize> {
        let mut c = LeafCollector(Vec::with_capacity(self.len));
        self.walk(&mut c);
        c.0
    }

    /// Lazy form of [`Path::leaves`].
    pub fn leaf_iter(&self) -> Leaves<'_> {
        Leaves { stack: vec![self] }
    }

    /// True when both derivations produce the same ordering, regardless of
    /// their shape.
    pub fn same_order(a: &Path, b: &Path) -> bool {
        a.len == b.len && a.leaf_iter().eq(b.leaf_iter())
    }

    /// Ranking used everywhere a single winner must be chosen: higher score
    /// first, ties broken by the lexicographically smaller leaf sequence.
    pub fn rank(a: &Path, b: &Path) -> Ordering {
        b.score.total_cmp(&a.score).then_with(|| {
            if std::ptr::eq(a, b) {
                Ordering::Equal
            } else {
                a.leaf_iter().cmp(b.leaf_iter())
            }
        })
    }

    #[inline]
    pub fn better_than(&self, other: &Path) -> bool {
        Self::rank(self, other) == Ordering::Less
    }
}

pub trait PathVisitor {
    fn leaf(&mut self, path: &Path, index: usize);
    fn enter(&mut self, _path: &Path) {}
    fn exit(&mut self, _path: &Path) {}
}

/// Leaf indices in output order, stopping wherever the caller stops.
pub struct Leaves<'a> {
    stack: Vec<&'a Path>,
}

impl Iterator for Leaves<'_> {
    type Item = usize;

    fn next(&mut self) -> Option<usize> {
        while let Some(path) = self.stack.pop() {
            match &path.node {
                Node::Leaf { index } => return Some(*index),
                Node::Epsilon => {}
                Node::Composite { left, right } => {
                    if path.kind == PathType::Swap {
                        self.stack.push(left);
                        self.stack.push(right);
                    } else {
                        self.stack.push(right);
                        self.stack.push(left);
                    }
                }
            }
        }
        None
    }
}

struct LeafCollector(Vec<usize>);

impl PathVisitor for LeafCollector {
    fn leaf(&mut self, _path: &Path, index: usize) {
        self.0.push(index);
    }
}

/// Writes `[a b]` for Keep and `<a b>` for Swap, children in output order.
struct BracketPrinter<'a, 'b> {
    out: &'a mut fmt::Formatter<'b>,
    need_space: bool,
    result: fmt::Result,
}

impl BracketPrinter<'_, '_> {
    fn token(&mut self, s: &str) {
        if self.result.is_ok() {
            self.result = self.out.write_str(s);
        }
    }

    fn sep(&mut self) {
        if self.need_space {
            self.token(" ");
        }
    }
}

impl PathVisitor for BracketPrinter<'_, '_> {
    fn leaf(&mut self, _path: &Path, index: usize) {
        self.sep();
        self.token(&index.to_string());
        self.need_space = true;
    }

    fn enter(&mut self, path: &Path) {
        self.sep();
        self.token(if path.kind == PathType::Swap { "<" } else { "[" });
        self.need_space = false;
    }

    fn exit(&mut self, path: &Path) {
        self.token(if path.kind == PathType::Swap { ">" } else { "]" });
        self.need_space = true;
    }
}

impl fmt::Display for Path {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_empty() {
            return write!(f, "()");
        }
        let mut printer = BracketPrinter {
            out: f,
            need_space: false,
            result: Ok(()),
        };
        self.walk(&mut printer);
        printer.result
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn leaves(n: usize) -> Vec<PathRef> {
        (0..n).map(|i| Path::leaf(i, 0, 0, 0.0)).collect()
    }

    #[test]
    fn test_connect_scores_are_additive() {
        let l = Path::leaf(0, 0, 0, 1.5);
        let r = Path::leaf(1, 0, 0, 2.0);
        let p = Path::connect(&l, &r, 0.25, false).unwrap();
        assert_eq!(p.score(), 3.75);
        assert_eq!(p.local_score(), 0.25);
        assert_eq!(p.path_type(), PathType::Keep);
        assert_eq!(p.len(), 2);
    }

    #[test]
    fn test_swap_reverses_output() {
        let ls = leaves(2);
        let p = Path::connect(&ls[0], &ls[1], 0.0, true).unwrap();
        assert_eq!(p.leaves(), vec![1, 0]);
        assert_eq!(p.to_string(), "<1 0>");
    }

    #[test]
    fn test_normal_form_rejects_keep_chain_on_right() {
        let ls = leaves(3);
        let k12 = Path::connect(&ls[1], &ls[2], 0.0, false).unwrap();
        assert!(Path::connect(&ls[0], &k12, 0.0, false).is_none());
        // Left-branching keep chain is the normal one
        let k01 = Path::connect(&ls[0], &ls[1], 0.0, false).unwrap();
        let k = Path::connect(&k01, &ls[2], 0.0, false).unwrap();
        assert!(k.is_normal());
        assert_eq!(k.to_string(), "[[0 1] 2]");
    }

    #[test]
    fn test_normal_form_rejects_swap_chain_on_left() {
        let ls = leaves(3);
        let s01 = Path::connect(&ls[0], &ls[1], 0.0, true).unwrap();
        assert!(Path::connect(&s01, &ls[2], 0.0, true).is_none());
        let s12 = Path::connect(&ls[1], &ls[2], 0.0, true).unwrap();
        let s = Path::connect(&ls[0], &s12, 0.0, true).unwrap();
        assert_eq!(s.leaves(), vec![2, 1, 0]);
    }

    #[test]
    fn test_swap_state_threading() {
        let l = Path::leaf(0, 5, 6, 0.0);
        let r = Path::leaf(1, 4, 5, 0.0);
        let p = Path::connect(&l, &r, 0.0, true).unwrap();
        assert_eq!((p.start(), p.end()), (4, 6));
    }

    #[test]
    fn test_same_order_ignores_shape() {
        let ls = leaves(2);
        let a = Path::connect(&ls[0], &ls[1], 1.0, false).unwrap();
        let b = Path::add_score(&a, 3.0);
        assert!(Path::same_order(&a, &b));
        assert_eq!(b.score(), 4.0);
        let c = Path::connect(&ls[0], &ls[1], 1.0, true).unwrap();
        assert!(!Path::same_order(&a, &c));
    }

    #[test]
    fn test_rank_breaks_ties_by_leaf_order() {
        let ls = leaves(2);
        let keep = Path::connect(&ls[0], &ls[1], 0.0, false).unwrap();
        let swap = Path::connect(&ls[0], &ls[1], 0.0, true).unwrap();
        assert!(keep.better_than(&swap));
        assert!(!swap.better_than(&keep));
    }

    #[test]
    fn test_leaf_iter_matches_leaves() {
        let ls = leaves(4);
        let k01 = Path::connect(&ls[0], &ls[1], 0.0, false).unwrap();
        let s01 = Path::connect(&ls[0], &ls[1], 0.0, true).unwrap();
        let s23 = Path::connect(&ls[2], &ls[3], 0.0, true).unwrap();
        let k = Path::connect(&s01, &s23, 0.0, false).unwrap();
        let s = Path::connect(&k01, &s23, 0.0, true).unwrap();
        for p in [&s01, &k, &s] {
            assert_eq!(p.leaf_iter().collect::<Vec<_>>(), p.leaves());
        }
        assert_eq!(k.leaves(), vec![1, 0, 3, 2]);
        assert_eq!(s.leaves(), vec![3, 2, 0, 1]);
    }

    #[test]
    fn test_rank_stops_at_first_difference() {
        let ls = leaves(3);
        let k01 = Path::connect(&ls[0], &ls[1], 0.0, false).unwrap();
        let s01 = Path::connect(&ls[0], &ls[1], 0.0, true).unwrap();
        let a = Path::connect(&k01, &ls[2], 0.0, false).unwrap();
        let b = Path::connect(&s01, &ls[2], 0.0, false).unwrap();
        assert_eq!(Path::rank(&a, &b), Ordering::Less);
        assert_eq!(Path::rank(&b, &a), Ordering::Greater);
        assert_eq!(Path::rank(&a, &a), Ordering::Equal);
    }

    #[test]
    fn test_epsilon_has_no_leaves() {
        let e = Path::epsilon(0, 0, 0.0);
        assert!(e.is_empty());
        assert!(e.leaves().is_empty());
        assert_eq!(e.to_string(), "()");
    }
}
