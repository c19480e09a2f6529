use crate::path::{PathRef, PathType, State};
use fnv::FnvHashMap;

/// Paths of one chart cell, unique per `(start, end, type)`.
///
/// Besides the key lookup, the hash indexes paths by `(start, type)` so the
/// chart can find every partner whose start state matches a neighbour's end
/// state without scanning the whole cell.
#[derive(Debug, Default, Clone)]
pub struct CellHash {
    paths: Vec<PathRef>,
    by_key: FnvHashMap<(State, State, PathType), usize>,
    by_start: FnvHashMap<(State, PathType), Vec<usize>>,
}

impl CellHash {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores `path` unless its key is taken. On a clash the slot of the
    /// resident path is returned together with the rejected one.
    pub fn insert(&mut self, path: PathRef) -> Result<usize, (usize, PathRef)> {
        let key = (path.start(), path.end(), path.path_type());
        if let Some(&slot) = self.by_key.get(&key) {
            return Err((slot, path));
        }
        let slot = self.paths.len();
        self.by_key.insert(key, slot);
        self.by_start
            .entry((path.start(), path.path_type()))
            .or_default()
            .push(slot);
        self.paths.push(path);
        Ok(slot)
    }

    /// Overwrites a slot with a path of the same key.
    pub fn replace(&mut self, slot: usize, path: PathRef) {
        let old = &self.paths[slot];
        debug_assert_eq!(
            (old.start(), old.end(), old.path_type()),
            (path.start(), path.end(), path.path_type()),
            "replace must keep the key"
        );
        self.paths[slot] = path;
    }

    #[inline]
    pub fn get(&self, slot: usize) -> &PathRef {
        &self.paths[slot]
    }

    pub fn find(&self, start: State, end: State, kind: PathType) -> Option<&PathRef> {
        self.by_key.get(&(start, end, kind)).map(|&s| &self.paths[s])
    }

    pub fn starting(&self, start: State, kind: PathType) -> impl Iterator<Item = &PathRef> + '_ {
        self.by_start
            .get(&(start, kind))
            .into_iter()
            .flatten()
            .map(move |&s| &self.paths[s])
    }

    pub fn iter(&self) -> impl Iterator<Item = &PathRef> + '_ {
        self.paths.iter()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.paths.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }
}
