//! The ancestry tree: an arena of nodes, one per pose ever sampled, linked
//! by parent index only. Keeping nodes in a flat arena rather than behind
//! owned pointers turns every ancestry walk into a tight integer loop and
//! sidesteps the lifetime cycles a `Rc<RefCell<Node>>` tree would otherwise
//! require.

use crate::map::DistributedMap;
use crate::utility::Pose;

/// A stable handle into the tree's arena. `0` is always the root. Once
/// issued, a `NodeId` keeps referring to the same particle/ancestor for the
/// rest of that node's life, even after trimming folds its map entries onto
/// an ancestor — see `Node::map_id`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub u64);

struct Node {
    pose: Pose,
    parent: Option<NodeId>,
    children: u32,
    leaf: bool,
    /// The id this node's cells are actually stored under in the
    /// distributed map. Starts equal to the node's own id; trim's
    /// single-child-chain collapse may fold it onto a surviving ancestor's
    /// map id when a chain of single-child interior nodes collapses. The
    /// `NodeId` handle above never changes meaning; only which map entries
    /// it resolves to can.
    map_id: NodeId,
    modified_cells: Vec<(i32, i32)>,
}

/// Arena holding every node that has ever been part of the ancestry tree.
/// The root is created at construction with id `0` and pose `(0, 0, 0)`.
pub struct Tree {
    nodes: Vec<Node>,
}

impl Tree {
    pub fn new() -> Self {
        Self {
            nodes: vec![Node {
                pose: Pose::default(),
                parent: None,
                children: 0,
                leaf: false,
                map_id: NodeId(0),
                modified_cells: Vec::new(),
            }],
        }
    }

    pub fn root(&self) -> NodeId {
        NodeId(0)
    }

    fn get(&self, id: NodeId) -> &Node {
        &self.nodes[id.0 as usize]
    }

    fn get_mut(&mut self, id: NodeId) -> &mut Node {
        &mut self.nodes[id.0 as usize]
    }

    pub fn pose(&self, id: NodeId) -> Pose {
        self.get(id).pose
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.get(id).parent
    }

    pub fn children(&self, id: NodeId) -> u32 {
        self.get(id).children
    }

    pub fn is_leaf(&self, id: NodeId) -> bool {
        self.get(id).leaf
    }

    pub fn set_leaf(&mut self, id: NodeId, leaf: bool) {
        self.get_mut(id).leaf = leaf;
    }

    pub fn map_id(&self, id: NodeId) -> NodeId {
        self.get(id).map_id
    }

    pub fn modified_cells(&self, id: NodeId) -> &[(i32, i32)] {
        &self.get(id).modified_cells
    }

    /// Creates a new child of `parent` with the given pose. The new node
    /// becomes a leaf; `parent`'s `leaf` flag is cleared and its child
    /// count incremented, since a node is a leaf exactly when it is one of
    /// the current particles and `parent` no longer is.
    pub fn new_child(&mut self, parent: NodeId, pose: Pose) -> NodeId {
        let id = NodeId(self.nodes.len() as u64);
        self.nodes.push(Node {
            pose,
            parent: Some(parent),
            children: 0,
            leaf: true,
            map_id: id,
            modified_cells: Vec::new(),
        });
        let p = self.get_mut(parent);
        p.children += 1;
        p.leaf = false;
        id
    }

    /// Records that `id`'s map entry at `(cx, cy)` now belongs to it.
    pub fn add_cell(&mut self, id: NodeId, cx: i32, cy: i32) {
        self.get_mut(id).modified_cells.push((cx, cy));
    }

    /// Applies the trim protocol starting at `id`, walking upward
    /// until it reaches a node it cannot simplify further. Safe to call
    /// more than once in a row: a second call on an already-trimmed node is
    /// a no-op because none of the three collapsing cases apply to it
    /// anymore (its parent is by then the root, or a branching ancestor
    /// with more than one surviving child).
    pub fn trim(&mut self, id: NodeId, map: &mut DistributedMap) {
        let mut current = id;
        loop {
            let Some(parent) = self.parent(current) else {
                // current is the root; never pruned.
                return;
            };
            if self.parent(parent).is_none() {
                // parent is the root; stop (case 1).
                return;
            }

            if !self.is_leaf(current) && self.children(current) == 0 {
                // case 2: dead branch. erase its cells and detach it.
                let current_map_id = self.map_id(current);
                let cells = std::mem::take(&mut self.get_mut(current).modified_cells);
                for (cx, cy) in &cells {
                    map.erase(*cx, *cy, current_map_id);
                }
                self.get_mut(parent).children -= 1;
                self.get_mut(current).parent = None;
                current = parent;
                continue;
            }

            if self.children(parent) == 1 && self.parent(parent).is_some() {
                // case 3: `current` is an only child. Fold `parent` into it:
                // current's cells move to be keyed by parent's map id,
                // parent's own cells become current's, and current inherits
                // parent's map id and grandparent link.
                let current_map_id = self.map_id(current);
                let parent_map_id = self.map_id(parent);

                let current_cells =
                    std::mem::take(&mut self.get_mut(current).modified_cells);
                for (cx, cy) in &current_cells {
                    map.rename(*cx, *cy, current_map_id, parent_map_id);
                }

                let mut merged = std::mem::take(&mut self.get_mut(parent).modified_cells);
                merged.extend(current_cells);

                let grandparent = self.parent(parent);
                {
                    let node = self.get_mut(current);
                    node.modified_cells = merged;
                    node.map_id = parent_map_id;
                    node.parent = grandparent;
                }

                // parent is now absorbed and unreachable from any live node.
                self.get_mut(parent).parent = None;
                self.get_mut(parent).children = 0;
                continue;
            }

            // case 4: nothing collapses at `current`, but folding it (if it
            // just happened above) may have freed up the grandparent.
            current = parent;
        }
    }
}

impl Default for Tree {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::map::Bit;

    #[test]
    fn new_child_updates_parent_bookkeeping() {
        let mut tree = Tree::new();
        let root = tree.root();
        let a = tree.new_child(root, Pose::new(1.0, 0.0, 0.0));
        assert_eq!(tree.children(root), 1);
        assert!(!tree.is_leaf(root));
        assert!(tree.is_leaf(a));
    }

    #[test]
    fn dead_branch_is_erased_and_detached() {
        let mut tree = Tree::new();
        let root = tree.root();
        let a = tree.new_child(root, Default::default());
        // give `a` a sibling so a's parent (root) isn't trimmed away too
        let _sibling = tree.new_child(root, Default::default());
        let b = tree.new_child(a, Default::default());
        let mut map = DistributedMap::new();
        map.update(&tree, b, 1, 1, Bit::Occupied);
        tree.add_cell(b, 1, 1);

        // b dies (no longer a leaf, no children): trimming it should erase
        // its cell and detach it, decrementing a's child count.
        tree.set_leaf(b, false);
        tree.trim(b, &mut map);

        assert_eq!(tree.children(a), 0);
        assert_eq!(map.lookup_by_id(1, 1, tree.map_id(b)), None);
    }

    #[test]
    fn trim_collapses_a_single_child_chain() {
        let mut tree = Tree::new();
        let root = tree.root();
        let a = tree.new_child(root, Pose::new(1.0, 0.0, 0.0));
        let b = tree.new_child(a, Pose::new(2.0, 0.0, 0.0));
        let c = tree.new_child(b, Pose::new(3.0, 0.0, 0.0));
        let mut map = DistributedMap::new();

        assert!(map.update(&tree, a, 0, 0, Bit::Occupied));
        tree.add_cell(a, 0, 0);
        assert!(map.update(&tree, b, 1, 1, Bit::Free));
        tree.add_cell(b, 1, 1);
        assert!(map.update(&tree, c, 2, 2, Bit::Occupied));
        tree.add_cell(c, 2, 2);

        tree.trim(c, &mut map);

        assert_eq!(tree.parent(c), Some(root));
        assert_eq!(tree.children(root), 1);
        assert_eq!(map.lookup(&tree, c, 0, 0), Bit::Occupied);
        assert_eq!(map.lookup(&tree, c, 1, 1), Bit::Free);
        assert_eq!(map.lookup(&tree, c, 2, 2), Bit::Occupied);
    }

    #[test]
    fn trim_is_idempotent() {
        let mut tree = Tree::new();
        let root = tree.root();
        let a = tree.new_child(root, Default::default());
        let b = tree.new_child(a, Default::default());
        let mut map = DistributedMap::new();

        tree.trim(b, &mut map);
        let parent_after_first = tree.parent(b);
        let children_after_first = tree.children(root);

        tree.trim(b, &mut map);
        assert_eq!(tree.parent(b), parent_after_first);
        assert_eq!(tree.children(root), children_after_first);
    }
}
