//! Module: range::arena
//! Responsibility: node storage for every tree of one statement, shared
//! handles with use counts, and the node cap.
//! Does not own: tree shape (range::tree) or AND/OR (range::combine).

use crate::{
    config::RangeConfig,
    range::{KeyRange, KeyRangeNode, NodeId, RangeError},
};
use std::ops::{Index, IndexMut};

///
/// KeyTree
///
/// Owned handle to one key part's range tree.
/// `Full` means the key part is unconstrained, `Empty` means no row can
/// match. A `Root` handle holds one count on the root's `use_count` and
/// must be consumed by a combination, stored as a `next_key_part`, or
/// released.
///

#[derive(Debug, Eq, PartialEq)]
#[must_use]
pub enum KeyTree {
    Empty,
    Full,
    Root(NodeId),
}

impl KeyTree {
    #[must_use]
    pub const fn root(&self) -> Option<NodeId> {
        match self {
            Self::Root(root) => Some(*root),
            Self::Empty | Self::Full => None,
        }
    }

    #[must_use]
    pub const fn is_empty(&self) -> bool {
        matches!(self, Self::Empty)
    }

    #[must_use]
    pub const fn is_full(&self) -> bool {
        matches!(self, Self::Full)
    }

    // A missing next_key_part constrains nothing.
    pub(crate) const fn from_suffix(next_key_part: Option<NodeId>) -> Self {
        match next_key_part {
            Some(root) => Self::Root(root),
            None => Self::Full,
        }
    }

    // Transfer the handle into a next_key_part slot.
    pub(crate) fn into_suffix(self) -> Option<NodeId> {
        debug_assert!(!self.is_empty(), "impossible suffix stored under a range");

        self.root()
    }
}

///
/// RangeArena
///
/// Per-statement node store. Nodes are never freed individually; the whole
/// arena is dropped at statement end. The clone counter lives here so two
/// statements never share a node cap.
///

#[derive(Debug)]
pub struct RangeArena {
    nodes: Vec<KeyRangeNode>,
    config: RangeConfig,
    alloced_sel_args: usize,
}

impl RangeArena {
    #[must_use]
    pub const fn new(config: RangeConfig) -> Self {
        Self {
            nodes: Vec::new(),
            config,
            alloced_sel_args: 0,
        }
    }

    #[must_use]
    pub const fn config(&self) -> &RangeConfig {
        &self.config
    }

    /// Nodes charged against `max_sel_args` so far.
    #[must_use]
    pub const fn alloced_sel_args(&self) -> usize {
        self.alloced_sel_args
    }

    #[must_use]
    pub const fn len(&self) -> usize {
        self.nodes.len()
    }

    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    #[must_use]
    pub fn node(&self, id: NodeId) -> &KeyRangeNode {
        &self[id]
    }

    /// Node ids of one tree in ascending order.
    pub fn iter(&self, root: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        std::iter::successors(Some(self.first(root)), move |id| self[*id].next)
    }

    /// Intervals of one tree in ascending order.
    pub fn ranges(&self, root: NodeId) -> impl Iterator<Item = &KeyRange> + '_ {
        self.iter(root).map(move |id| &self[id].range)
    }

    ///
    /// HANDLES
    ///

    /// Add one handle to `tree`.
    pub fn share(&mut self, tree: &KeyTree) -> KeyTree {
        match tree {
            KeyTree::Root(root) => self.share_root(*root),
            KeyTree::Empty => KeyTree::Empty,
            KeyTree::Full => KeyTree::Full,
        }
    }

    /// Drop one handle; the last handle releases every suffix tree below.
    pub fn release(&mut self, tree: KeyTree) {
        if let KeyTree::Root(root) = tree {
            self.release_root(root);
        }
    }

    pub(crate) fn share_root(&mut self, root: NodeId) -> KeyTree {
        self[root].use_count += 1;

        KeyTree::Root(root)
    }

    pub(crate) fn share_suffix(&mut self, next_key_part: Option<NodeId>) -> KeyTree {
        match next_key_part {
            Some(root) => self.share_root(root),
            None => KeyTree::Full,
        }
    }

    pub(crate) fn release_root(&mut self, root: NodeId) {
        let node = &mut self[root];
        node.use_count = node.use_count.saturating_sub(1);
        if node.use_count > 0 {
            return;
        }

        let suffixes: Vec<NodeId> = self
            .iter(root)
            .filter_map(|id| self[id].next_key_part)
            .collect();
        for suffix in suffixes {
            self.release_root(suffix);
        }
    }

    /// Return a root this handle may mutate: shared trees are cloned and the
    /// handle moves to the copy.
    pub(crate) fn make_exclusive(&mut self, root: NodeId) -> Result<NodeId, RangeError> {
        if self[root].use_count <= 1 {
            return Ok(root);
        }

        let copy = self.clone_tree(root)?;
        self[root].use_count -= 1;

        Ok(copy)
    }

    ///
    /// ALLOCATION
    ///

    pub(crate) fn alloc(&mut self, node: KeyRangeNode) -> NodeId {
        let id = NodeId::new(self.nodes.len());
        self.nodes.push(node);

        id
    }

    /// Allocate a single-node tree owning `next_key_part`.
    pub(crate) fn new_tree(&mut self, range: KeyRange, next_key_part: Option<NodeId>) -> NodeId {
        let mut node = KeyRangeNode::detached(range, next_key_part);
        node.use_count = 1;

        self.alloc(node)
    }

    /// Charge one cloned node against the statement node cap.
    pub(crate) const fn charge_clone(&mut self) -> Result<(), RangeError> {
        self.alloced_sel_args += 1;
        if self.alloced_sel_args > self.config.max_sel_args {
            return Err(RangeError::TooManyNodes {
                limit: self.config.max_sel_args,
            });
        }

        Ok(())
    }
}

impl Index<NodeId> for RangeArena {
    type Output = KeyRangeNode;

    fn index(&self, id: NodeId) -> &KeyRangeNode {
        &self.nodes[id.index()]
    }
}

impl IndexMut<NodeId> for RangeArena {
    fn index_mut(&mut self, id: NodeId) -> &mut KeyRangeNode {
        &mut self.nodes[id.index()]
    }
}
