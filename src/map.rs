//! The sparse, ancestry-tagged occupancy map. Storage cost grows with the
//! number of *distinct* cell edits across live particles, not with
//! particles × cells, because every cell entry is tagged by the id of the
//! node that wrote it and lookups walk the ancestry chain to find it.

use std::collections::HashMap;

use crate::tree::{NodeId, Tree};

/// Binary occupancy state. There is no "unknown" variant here: absence of
/// an entry *is* unknown, both at the outer `HashMap` and inner table
/// level.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Bit {
    Free,
    Occupied,
}

impl Bit {
    pub fn is_occupied(self) -> bool {
        matches!(self, Bit::Occupied)
    }
}

/// A short, sorted association list from node id to bit. In practice only
/// 1-2 live lineages ever disagree about a given cell, so a linear scan
/// over a small `Vec` beats a hash map's overhead.
#[derive(Default)]
struct SmallMap(Vec<(NodeId, Bit)>);

impl SmallMap {
    fn get(&self, id: NodeId) -> Option<Bit> {
        self.0.iter().find(|(k, _)| *k == id).map(|(_, v)| *v)
    }

    fn set(&mut self, id: NodeId, value: Bit) {
        match self.0.iter_mut().find(|(k, _)| *k == id) {
            Some(entry) => entry.1 = value,
            None => self.0.push((id, value)),
        }
    }

    fn remove(&mut self, id: NodeId) {
        self.0.retain(|(k, _)| *k != id);
    }

    fn rename(&mut self, old: NodeId, new: NodeId) {
        if let Some(entry) = self.0.iter_mut().find(|(k, _)| *k == old) {
            entry.0 = new;
        }
    }

    fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// `(cx, cy) -> (NodeId -> Bit)`.
#[derive(Default)]
pub struct DistributedMap {
    cells: HashMap<(i32, i32), SmallMap>,
}

impl DistributedMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// The value, if any, that `id` itself has recorded at `(cx, cy)` —
    /// does not walk ancestry.
    pub fn lookup_by_id(&self, cx: i32, cy: i32, id: NodeId) -> Option<Bit> {
        self.cells.get(&(cx, cy)).and_then(|m| m.get(id))
    }

    /// Installs or overwrites `id`'s value at `(cx, cy)` unconditionally.
    pub fn update_by_id(&mut self, cx: i32, cy: i32, id: NodeId, value: Bit) {
        self.cells.entry((cx, cy)).or_default().set(id, value);
    }

    pub fn erase(&mut self, cx: i32, cy: i32, id: NodeId) {
        if let Some(m) = self.cells.get_mut(&(cx, cy)) {
            m.remove(id);
            if m.is_empty() {
                self.cells.remove(&(cx, cy));
            }
        }
    }

    pub fn rename(&mut self, cx: i32, cy: i32, old: NodeId, new: NodeId) {
        if let Some(m) = self.cells.get_mut(&(cx, cy)) {
            m.rename(old, new);
        }
    }

    /// Walks `node -> node.parent -> ...` through `tree` until it finds an
    /// ancestor with a defined value at `(cx, cy)`. Reports free if the
    /// root is reached with no hit, since unknown is treated as free for
    /// ray-termination purposes.
    pub fn lookup(&self, tree: &Tree, node: NodeId, cx: i32, cy: i32) -> Bit {
        let mut current = Some(node);
        while let Some(n) = current {
            if let Some(v) = self.lookup_by_id(cx, cy, tree.map_id(n)) {
                return v;
            }
            current = tree.parent(n);
        }
        Bit::Free
    }

    /// First-writer-wins update along `node`'s ancestry: if any ancestor
    /// (including `node` itself) already has a value at `(cx, cy)`, this
    /// is a no-op and returns `false`; otherwise installs the value keyed
    /// by `node`'s own id and returns `true`.
    pub fn update(&mut self, tree: &Tree, node: NodeId, cx: i32, cy: i32, value: Bit) -> bool {
        let mut current = Some(node);
        while let Some(n) = current {
            if self.lookup_by_id(cx, cy, tree.map_id(n)).is_some() {
                return false;
            }
            current = tree.parent(n);
        }
        self.update_by_id(cx, cy, tree.map_id(node), value);
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn update_by_id_then_lookup_round_trips() {
        let mut map = DistributedMap::new();
        let id = NodeId(7);
        map.update_by_id(2, 3, id, Bit::Occupied);
        assert_eq!(map.lookup_by_id(2, 3, id), Some(Bit::Occupied));
    }

    #[test]
    fn first_writer_wins_along_ancestry() {
        let mut tree = Tree::new();
        let root = tree.root();
        let a = tree.new_child(root, Default::default());
        let b = tree.new_child(a, Default::default());
        let mut map = DistributedMap::new();

        assert!(map.update(&tree, a, 2, 3, Bit::Occupied));
        assert!(!map.update(&tree, b, 2, 3, Bit::Free));
        assert_eq!(map.lookup(&tree, b, 2, 3), Bit::Occupied);
    }

    #[test]
    fn second_write_with_same_key_is_a_no_op() {
        let mut tree = Tree::new();
        let root = tree.root();
        let a = tree.new_child(root, Default::default());
        let mut map = DistributedMap::new();

        assert!(map.update(&tree, a, 0, 0, Bit::Occupied));
        assert!(!map.update(&tree, a, 0, 0, Bit::Free));
        assert_eq!(map.lookup_by_id(0, 0, tree.map_id(a)), Some(Bit::Occupied));
    }

    #[test]
    fn unknown_cells_report_free() {
        let tree = Tree::new();
        let map = DistributedMap::new();
        assert_eq!(map.lookup(&tree, tree.root(), 99, 99), Bit::Free);
    }
}
