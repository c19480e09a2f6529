//! Lazy k-best extraction over a filled chart.
//!
//! The forest is read off the chart: a vertex is a cell entry
//! `(begin, end, type, start, end_state)` and its incoming hyperedges are the
//! normal-form combinations of entries in two sub-cells whose states meet.
//! Each vertex keeps a ranked list of derivations with back-pointers and a
//! heap of candidates; ranks are produced only when a parent asks for them
//! (Huang & Chiang 2005, Algorithm 3).
//!
//! Candidates are built eagerly as shared paths and ordered by [`Path::rank`],
//! so equal scores come out in leaf order exactly as the chart picks its
//! single best. The order is monotone in both child ranks.

use crate::cell::Cell;
use crate::chart::{Chart, ParseController};
use crate::path::{Path, PathRef, PathType, State};
use crate::scorer::Scorer;
use fnv::{FnvHashMap, FnvHashSet};
use std::cmp::Ordering;
use std::collections::BinaryHeap;
use tracing::debug;

type VertexKey = (usize, usize, PathType, State, State);

#[derive(Debug, Clone, Copy)]
struct Edge {
    left: usize,
    right: usize,
    score: f64,
    swap: bool,
}

/// Derivation with back-pointers: edge plus the rank used in each child,
/// and the path it builds.
#[derive(Debug, Clone)]
struct Dbp {
    edge: usize,
    left_rank: usize,
    right_rank: usize,
    path: PathRef,
}

impl PartialEq for Dbp {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Dbp {}

impl PartialOrd for Dbp {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Dbp {
    /// Max-heap order: the path ranked first by [`Path::rank`] is greatest.
    fn cmp(&self, other: &Self) -> Ordering {
        Path::rank(&other.path, &self.path)
    }
}

#[derive(Debug)]
struct Vertex {
    key: VertexKey,
    ready: bool,
    edges: Vec<Edge>,
    derivations: Vec<Dbp>,
    candidates: BinaryHeap<Dbp>,
    seen: FnvHashSet<(usize, usize, usize)>,
}

impl Vertex {
    fn composite(key: VertexKey) -> Self {
        Self {
            key,
            ready: false,
            edges: Vec::new(),
            derivations: Vec::new(),
            candidates: BinaryHeap::new(),
            seen: FnvHashSet::default(),
        }
    }

    fn leaf(key: VertexKey, path: Option<PathRef>) -> Self {
        let derivations = path
            .into_iter()
            .map(|path| Dbp {
                edge: usize::MAX,
                left_rank: 0,
                right_rank: 0,
                path,
            })
            .collect();
        Self {
            ready: true,
            derivations,
            ..Self::composite(key)
        }
    }
}

/// Unary edge from the virtual root into one top-cell vertex.
#[derive(Debug, Clone)]
struct RootCandidate {
    path: PathRef,
    vertex: usize,
    rank: usize,
}

impl PartialEq for RootCandidate {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for RootCandidate {}

impl PartialOrd for RootCandidate {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for RootCandidate {
    fn cmp(&self, other: &Self) -> Ordering {
        Path::rank(&other.path, &self.path)
    }
}

/// Distinct best reorderings of a chart, produced on demand.
///
/// Repeated calls share all work: `best(k)` is always a prefix of
/// `best(k + 1)`.
pub struct KBest<'a, C, P: ?Sized, S: ?Sized> {
    chart: &'a Chart<C>,
    controller: &'a P,
    scorer: &'a S,
    index: FnvHashMap<VertexKey, usize>,
    vertices: Vec<Vertex>,
    root: Option<BinaryHeap<RootCandidate>>,
    orders: FnvHashSet<Vec<usize>>,
    results: Vec<PathRef>,
}

impl<'a, C, P, S> KBest<'a, C, P, S>
where
    C: Cell,
    P: ParseController + ?Sized,
    S: Scorer + ?Sized,
{
    /// `chart` must already be permuted with the same controller and scorer.
    pub fn new(chart: &'a Chart<C>, controller: &'a P, scorer: &'a S) -> Self {
        Self {
            chart,
            controller,
            scorer,
            index: FnvHashMap::default(),
            vertices: Vec::new(),
            root: None,
            orders: FnvHashSet::default(),
            results: Vec::new(),
        }
    }

    /// Vertices materialised so far.
    pub fn vertex_count(&self) -> usize {
        self.vertices.len()
    }

    /// Up to `k` paths with pairwise distinct leaf orders, best first.
    pub fn best(&mut self, k: usize) -> Vec<PathRef> {
        if self.chart.is_empty() {
            return self.chart.top().paths().take(k).cloned().collect();
        }
        let mut root = match self.root.take() {
            Some(heap) => heap,
            None => self.seed_root(),
        };
        while self.results.len() < k {
            let Some(c) = root.pop() else {
                break;
            };
            self.lazy_kth_best(c.vertex, c.rank + 2);
            if let Some(next) = self.vertices[c.vertex].derivations.get(c.rank + 1) {
                root.push(RootCandidate {
                    path: next.path.clone(),
                    vertex: c.vertex,
                    rank: c.rank + 1,
                });
            }
            if self.orders.insert(c.path.leaves()) {
                self.results.push(c.path);
            }
        }
        self.root = Some(root);
        debug!(
            "KBest: requested={} produced={} vertices={}",
            k,
            self.results.len(),
            self.vertices.len()
        );
        self.results.iter().take(k).cloned().collect()
    }

    fn seed_root(&mut self) -> BinaryHeap<RootCandidate> {
        let n = self.chart.len();
        let chart = self.chart;
        let mut heap = BinaryHeap::new();
        for p in chart.top().paths() {
            let v = self.vertex_id((0, n, p.path_type(), p.start(), p.end()));
            self.lazy_kth_best(v, 1);
            if let Some(d) = self.vertices[v].derivations.first() {
                heap.push(RootCandidate {
                    path: d.path.clone(),
                    vertex: v,
                    rank: 0,
                });
            }
        }
        heap
    }

    fn vertex_id(&mut self, key: VertexKey) -> usize {
        if let Some(&id) = self.index.get(&key) {
            return id;
        }
        let (begin, end, kind, start, stop) = key;
        let vertex = if end - begin == 1 {
            Vertex::leaf(key, self.chart.cell(begin, end).find(start, stop, kind).cloned())
        } else {
            Vertex::composite(key)
        };
        let id = self.vertices.len();
        self.vertices.push(vertex);
        self.index.insert(key, id);
        id
    }

    /// Hyperedges into the composite vertex `key`.
    fn build_edges(&mut self, key: VertexKey) -> Vec<Edge> {
        let (begin, end, kind, start, stop) = key;
        let n = self.chart.len();
        let chart = self.chart;
        let mut edges = Vec::new();
        for middle in self.controller.midpoints(begin, end, n) {
            let left = chart.cell(begin, middle);
            let right = chart.cell(middle, end);
            match kind {
                PathType::Keep => {
                    let score = self.scorer.keep_score(begin, middle, end);
                    for l in left.paths().filter(|l| l.start() == start) {
                        for rk in [PathType::Leaf, PathType::Swap] {
                            for r in right.starting(l.end(), rk).filter(|r| r.end() == stop) {
                                edges.push((l.clone(), r.clone(), score, false));
                            }
                        }
                    }
                }
                PathType::Swap => {
                    if !self.controller.allows_swap(begin, middle, end, n) {
                        continue;
                    }
                    let score = self.scorer.swap_score(begin, middle, end);
                    for r in right.paths().filter(|r| r.start() == start) {
                        for lk in [PathType::Leaf, PathType::Keep] {
                            for l in left.starting(r.end(), lk).filter(|l| l.end() == stop) {
                                edges.push((l.clone(), r.clone(), score, true));
                            }
                        }
                    }
                }
                PathType::Leaf => {}
            }
        }
        edges
            .into_iter()
            .map(|(l, r, score, swap)| {
                let (lb, le) = (begin, begin + l.len());
                let (rb, re) = (le, end);
                Edge {
                    left: self.vertex_id((lb, le, l.path_type(), l.start(), l.end())),
                    right: self.vertex_id((rb, re, r.path_type(), r.start(), r.end())),
                    score,
                    swap,
                }
            })
            .collect()
    }

    fn init_vertex(&mut self, v: usize) {
        let key = self.vertices[v].key;
        let edges = self.build_edges(key);
        let mut candidates = BinaryHeap::with_capacity(edges.len());
        let mut seen = FnvHashSet::default();
        for (i, e) in edges.iter().enumerate() {
            if let Some(path) = self.combine(e, 0, 0) {
                candidates.push(Dbp {
                    edge: i,
                    left_rank: 0,
                    right_rank: 0,
                    path,
                });
                seen.insert((i, 0, 0));
            }
        }
        let vertex = &mut self.vertices[v];
        vertex.edges = edges;
        vertex.candidates = candidates;
        vertex.seen = seen;
        vertex.ready = true;
    }

    /// Path of edge `e` over the given child ranks, if both exist.
    fn combine(&mut self, e: &Edge, left_rank: usize, right_rank: usize) -> Option<PathRef> {
        self.lazy_kth_best(e.left, left_rank + 1);
        self.lazy_kth_best(e.right, right_rank + 1);
        let l = &self.vertices[e.left].derivations.get(left_rank)?.path;
        let r = &self.vertices[e.right].derivations.get(right_rank)?.path;
        Path::connect(l, r, e.score, e.swap)
    }

    /// Grows `v`'s ranked list to `count` entries if it can.
    fn lazy_kth_best(&mut self, v: usize, count: usize) {
        if !self.vertices[v].ready {
            self.init_vertex(v);
        }
        while self.vertices[v].derivations.len() < count {
            if let Some(last) = self.vertices[v].derivations.last() {
                let (edge, left_rank, right_rank) = (last.edge, last.left_rank, last.right_rank);
                self.lazy_next(v, edge, left_rank, right_rank);
            }
            match self.vertices[v].candidates.pop() {
                Some(d) => self.vertices[v].derivations.push(d),
                None => break,
            }
        }
    }

    /// Pushes the two neighbours of a derivation in rank space.
    fn lazy_next(&mut self, v: usize, edge: usize, left_rank: usize, right_rank: usize) {
        let Some(&e) = self.vertices[v].edges.get(edge) else {
            return;
        };
        for (lr, rr) in [(left_rank + 1, right_rank), (left_rank, right_rank + 1)] {
            if !self.vertices[v].seen.insert((edge, lr, rr)) {
                continue;
            }
            if let Some(path) = self.combine(&e, lr, rr) {
                self.vertices[v].candidates.push(Dbp {
                    edge,
                    left_rank: lr,
                    right_rank: rr,
                    path,
                });
            }
        }
    }
}
