//! Chart cells: the set of paths kept for one span.

pub mod decorators;
pub mod hash;

pub use self::decorators::{BeamCell, CellStats, CountingCell};
pub use self::hash::CellHash;

use crate::path::{Path, PathRef, PathType, State};
use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumString};

pub trait Cell {
    /// Offers a candidate. Returns `true` if the cell now holds it.
    fn add(&mut self, path: PathRef) -> bool;

    fn paths(&self) -> impl Iterator<Item = &PathRef> + '_;

    fn starting(&self, start: State, kind: PathType) -> impl Iterator<Item = &PathRef> + '_;

    fn find(&self, start: State, end: State, kind: PathType) -> Option<&PathRef>;

    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Highest-ranked path in the cell.
    fn best(&self) -> Option<&PathRef> {
        self.paths().min_by(|a, b| Path::rank(a, b))
    }
}

/// One path per [`PathType`], boundary states ignored.
///
/// Normal form bars some parents from using a Keep or Swap child, so each
/// type holds its own winner.
#[derive(Debug, Default, Clone)]
pub struct BestCell {
    slots: [Option<PathRef>; 3],
}

impl BestCell {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    fn slot(kind: PathType) -> usize {
        match kind {
            PathType::Leaf => 0,
            PathType::Keep => 1,
            PathType::Swap => 2,
        }
    }
}

impl Cell for BestCell {
    fn add(&mut self, path: PathRef) -> bool {
        let slot = &mut self.slots[Self::slot(path.path_type())];
        if let Some(current) = slot.as_ref() {
            if !path.better_than(current) {
                return false;
            }
        }
        *slot = Some(path);
        true
    }

    fn paths(&self) -> impl Iterator<Item = &PathRef> + '_ {
        self.slots.iter().flatten()
    }

    fn starting(&self, start: State, kind: PathType) -> impl Iterator<Item = &PathRef> + '_ {
        self.slots[Self::slot(kind)]
            .iter()
            .filter(move |p| p.start() == start)
    }

    fn find(&self, start: State, end: State, kind: PathType) -> Option<&PathRef> {
        self.slots[Self::slot(kind)]
            .as_ref()
            .filter(|p| p.start() == start && p.end() == end)
    }

    fn len(&self) -> usize {
        self.slots.iter().flatten().count()
    }
}

/// The best path per `(start, end, type)`.
#[derive(Debug, Default, Clone)]
pub struct FullCell {
    hash: CellHash,
}

impl FullCell {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Cell for FullCell {
    fn add(&mut self, path: PathRef) -> bool {
        match self.hash.insert(path) {
            Ok(_) => true,
            Err((slot, path)) => {
                if path.better_than(self.hash.get(slot)) {
                    self.hash.replace(slot, path);
                    true
                } else {
                    false
                }
            }
        }
    }

    fn paths(&self) -> impl Iterator<Item = &PathRef> + '_ {
        self.hash.iter()
    }

    fn starting(&self, start: State, kind: PathType) -> impl Iterator<Item = &PathRef> + '_ {
        self.hash.starting(start, kind)
    }

    fn find(&self, start: State, end: State, kind: PathType) -> Option<&PathRef> {
        self.hash.find(start, end, kind)
    }

    fn len(&self) -> usize {
        self.hash.len()
    }
}

/// Which base cell a chart is built with.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, Display, EnumString,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum CellStorage {
    #[default]
    Best,
    Full,
}
