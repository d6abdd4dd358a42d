//! Module: range::tree
//! Responsibility: red-black maintenance and the ascending `next`/`prev`
//! overlay for one key part's interval tree.
//! Does not own: interval algebra (range::node) or AND/OR sweeps (range::combine).
//! Boundary: every structural mutation of a tree goes through `insert`,
//! `tree_delete`, or `clone_tree`.

use crate::{
    obs::sink::{MetricsEvent, record},
    range::{Color, KeyRange, KeyRangeNode, NodeId, RangeArena, RangeError},
};

impl RangeArena {
    /// Smallest interval of the tree rooted at `root`.
    #[must_use]
    pub fn first(&self, root: NodeId) -> NodeId {
        let mut id = root;
        while let Some(left) = self[id].left {
            id = left;
        }

        id
    }

    /// Largest interval of the tree rooted at `root`.
    #[must_use]
    pub fn last(&self, root: NodeId) -> NodeId {
        let mut id = root;
        while let Some(right) = self[id].right {
            id = right;
        }

        id
    }

    /// Node whose min equals `key.min`, else the last node with min below it.
    #[must_use]
    pub fn find_range(&self, root: NodeId, key: &KeyRange) -> Option<NodeId> {
        let mut element = Some(root);
        let mut found = None;

        while let Some(id) = element {
            let cmp = self[id].range.cmp_min_to_min(key);
            if cmp == 0 {
                return Some(id);
            }
            if cmp < 0 {
                found = Some(id);
                element = self[id].right;
            } else {
                element = self[id].left;
            }
        }

        found
    }

    /// Link the detached node `key` into the tree and return the new root.
    pub(crate) fn insert(&mut self, root: NodeId, key: NodeId) -> NodeId {
        let root_node = &self[root];
        let (use_count, elements, maybe_flag) =
            (root_node.use_count, root_node.elements, root_node.maybe_flag);

        let mut element = Some(root);
        let mut parent = root;
        let mut went_left = false;
        while let Some(id) = element {
            parent = id;
            went_left = self[key].range.cmp_min_to_min(&self[id].range) <= 0;
            element = if went_left {
                self[id].left
            } else {
                self[id].right
            };
        }

        // splice into the ordered list next to the parent
        if went_left {
            let prev = self[parent].prev;
            self[parent].left = Some(key);
            self[parent].prev = Some(key);
            if let Some(prev) = prev {
                self[prev].next = Some(key);
            }
            let node = &mut self[key];
            node.next = Some(parent);
            node.prev = prev;
        } else {
            let next = self[parent].next;
            self[parent].right = Some(key);
            self[parent].next = Some(key);
            if let Some(next) = next {
                self[next].prev = Some(key);
            }
            let node = &mut self[key];
            node.prev = Some(parent);
            node.next = next;
        }

        let node = &mut self[key];
        node.parent = Some(parent);
        node.left = None;
        node.right = None;
        let key_maybe = node.range.maybe_flag;

        let new_root = self.rb_insert(root, key);
        let root_node = &mut self[new_root];
        root_node.use_count = use_count;
        root_node.elements = elements + 1;
        root_node.maybe_flag = maybe_flag || key_maybe;

        new_root
    }

    /// Insert `range` as a new node owning `next_key_part`; `None` starts a tree.
    pub(crate) fn insert_range(
        &mut self,
        root: Option<NodeId>,
        range: KeyRange,
        next_key_part: Option<NodeId>,
    ) -> NodeId {
        match root {
            None => self.new_tree(range, next_key_part),
            Some(root) => {
                let key = self.alloc(KeyRangeNode::detached(range, next_key_part));
                self.insert(root, key)
            }
        }
    }

    /// Remove `key` from the tree; `None` when the tree becomes empty.
    /// The node's suffix tree handle is released.
    pub(crate) fn tree_delete(&mut self, root: NodeId, key: NodeId) -> Option<NodeId> {
        let root_node = &self[root];
        let (use_count, elements, maybe_flag) =
            (root_node.use_count, root_node.elements, root_node.maybe_flag);
        self[root].parent = None;
        let mut tree_root = Some(root);

        // unlink from the ordered list
        let (prev, next) = (self[key].prev, self[key].next);
        if let Some(prev) = prev {
            self[prev].next = next;
        }
        if let Some(next) = next {
            self[next].prev = prev;
        }
        if let Some(suffix) = self[key].next_key_part.take() {
            self.release_root(suffix);
        }

        let key_parent = self[key].parent;
        let (nod, fix_parent, removed_color) = match (self[key].left, self[key].right) {
            (None, right) => {
                self.replace_slot(&mut tree_root, key_parent, key, right);
                if let Some(right) = right {
                    self[right].parent = key_parent;
                }
                (right, key_parent, self[key].color)
            }
            (Some(left), None) => {
                self.replace_slot(&mut tree_root, key_parent, key, Some(left));
                self[left].parent = key_parent;
                (Some(left), key_parent, self[key].color)
            }
            (Some(_), Some(_)) => {
                // the in-order successor takes the deleted node's place
                let tmp = next.expect("a node with two children has a successor");
                let tmp_parent = self[tmp]
                    .parent
                    .expect("the successor lies below the deleted node");
                let tmp_right = self[tmp].right;
                self.replace_child(tmp_parent, tmp, tmp_right);
                if let Some(right) = tmp_right {
                    self[right].parent = Some(tmp_parent);
                }
                let removed_color = self[tmp].color;

                let (key_left, key_right, key_color) =
                    (self[key].left, self[key].right, self[key].color);
                let node = &mut self[tmp];
                node.parent = key_parent;
                node.left = key_left;
                node.right = key_right;
                node.color = key_color;
                if let Some(left) = key_left {
                    self[left].parent = Some(tmp);
                }
                if let Some(right) = key_right {
                    self[right].parent = Some(tmp);
                }
                self.replace_slot(&mut tree_root, key_parent, key, Some(tmp));

                let fix_parent = if tmp_parent == key { tmp } else { tmp_parent };
                (tmp_right, Some(fix_parent), removed_color)
            }
        };

        let mut new_root = tree_root?;
        if removed_color == Color::Black {
            new_root = self.rb_delete_fixup(new_root, nod, fix_parent);
        }

        let root_node = &mut self[new_root];
        root_node.use_count = use_count;
        root_node.elements = elements - 1;
        root_node.maybe_flag = maybe_flag;

        Some(new_root)
    }

    /// Deep-copy the tree with a rebuilt ordered list.
    /// Suffix trees are shared, not copied; every copied node is charged
    /// against `max_sel_args`.
    pub fn clone_tree(&mut self, root: NodeId) -> Result<NodeId, RangeError> {
        let mut last = None;
        let mut cloned = 0u64;
        let copy = self.clone_subtree(root, None, &mut last, &mut cloned)?;

        let suffixes: Vec<NodeId> = self
            .iter(copy)
            .filter_map(|id| self[id].next_key_part)
            .collect();
        for suffix in suffixes {
            self[suffix].use_count += 1;
        }

        let source = &self[root];
        let (elements, maybe_flag) = (source.elements, source.maybe_flag);
        let root_node = &mut self[copy];
        root_node.use_count = 1;
        root_node.elements = elements;
        root_node.maybe_flag = maybe_flag;

        record(MetricsEvent::TreeCloned { nodes: cloned });

        Ok(copy)
    }

    fn clone_subtree(
        &mut self,
        id: NodeId,
        parent: Option<NodeId>,
        last: &mut Option<NodeId>,
        cloned: &mut u64,
    ) -> Result<NodeId, RangeError> {
        self.charge_clone()?;

        let source = &self[id];
        let (left, right) = (source.left, source.right);
        let mut node = KeyRangeNode::detached(source.range.clone(), source.next_key_part);
        node.color = source.color;
        node.parent = parent;
        let copy = self.alloc(node);
        *cloned += 1;

        if let Some(left) = left {
            let child = self.clone_subtree(left, Some(copy), last, cloned)?;
            self[copy].left = Some(child);
        }

        self[copy].prev = *last;
        if let Some(prev) = *last {
            self[prev].next = Some(copy);
        }
        *last = Some(copy);

        if let Some(right) = right {
            let child = self.clone_subtree(right, Some(copy), last, cloned)?;
            self[copy].right = Some(child);
        }

        Ok(copy)
    }

    ///
    /// REBALANCING
    ///

    fn color_of(&self, id: Option<NodeId>) -> Color {
        id.map_or(Color::Black, |id| self[id].color)
    }

    fn replace_child(&mut self, parent: NodeId, old: NodeId, new: Option<NodeId>) {
        if self[parent].left == Some(old) {
            self[parent].left = new;
        } else {
            self[parent].right = new;
        }
    }

    // Point whatever referenced `old` (a parent slot or the root) at `new`.
    fn replace_slot(
        &mut self,
        root: &mut Option<NodeId>,
        parent: Option<NodeId>,
        old: NodeId,
        new: Option<NodeId>,
    ) {
        match parent {
            Some(parent) => self.replace_child(parent, old, new),
            None => *root = new,
        }
    }

    fn left_rotate(&mut self, root: &mut NodeId, leaf: NodeId) {
        let y = self[leaf].right.expect("left rotation needs a right child");
        let y_left = self[y].left;
        self[leaf].right = y_left;
        if let Some(child) = y_left {
            self[child].parent = Some(leaf);
        }

        let parent = self[leaf].parent;
        self[y].parent = parent;
        match parent {
            Some(parent) => self.replace_child(parent, leaf, Some(y)),
            None => *root = y,
        }
        self[y].left = Some(leaf);
        self[leaf].parent = Some(y);
    }

    fn right_rotate(&mut self, root: &mut NodeId, leaf: NodeId) {
        let y = self[leaf].left.expect("right rotation needs a left child");
        let y_right = self[y].right;
        self[leaf].left = y_right;
        if let Some(child) = y_right {
            self[child].parent = Some(leaf);
        }

        let parent = self[leaf].parent;
        self[y].parent = parent;
        match parent {
            Some(parent) => self.replace_child(parent, leaf, Some(y)),
            None => *root = y,
        }
        self[y].right = Some(leaf);
        self[leaf].parent = Some(y);
    }

    fn rb_insert(&mut self, mut root: NodeId, mut leaf: NodeId) -> NodeId {
        self[root].parent = None;
        self[leaf].color = Color::Red;

        while leaf != root {
            let Some(mut par) = self[leaf].parent else {
                break;
            };
            if self[par].color != Color::Red {
                break;
            }
            let par2 = self[par].parent.expect("a red node is never the root");

            if self[par2].left == Some(par) {
                let uncle = self[par2].right;
                if let Some(y) = uncle
                    && self[y].color == Color::Red
                {
                    self[par].color = Color::Black;
                    self[y].color = Color::Black;
                    self[par2].color = Color::Red;
                    leaf = par2;
                } else {
                    if self[par].right == Some(leaf) {
                        self.left_rotate(&mut root, par);
                        par = leaf;
                    }
                    self[par].color = Color::Black;
                    self[par2].color = Color::Red;
                    self.right_rotate(&mut root, par2);
                    break;
                }
            } else {
                let uncle = self[par2].left;
                if let Some(y) = uncle
                    && self[y].color == Color::Red
                {
                    self[par].color = Color::Black;
                    self[y].color = Color::Black;
                    self[par2].color = Color::Red;
                    leaf = par2;
                } else {
                    if self[par].left == Some(leaf) {
                        self.right_rotate(&mut root, par);
                        par = leaf;
                    }
                    self[par].color = Color::Black;
                    self[par2].color = Color::Red;
                    self.left_rotate(&mut root, par2);
                    break;
                }
            }
        }

        self[root].color = Color::Black;
        root
    }

    fn rb_delete_fixup(
        &mut self,
        mut root: NodeId,
        mut x: Option<NodeId>,
        mut par: Option<NodeId>,
    ) -> NodeId {
        self[root].parent = None;

        while x != Some(root) && self.color_of(x) == Color::Black {
            let Some(p) = par else {
                break;
            };

            if x == self[p].left {
                let mut w = self[p].right.expect("black height requires a sibling");
                if self[w].color == Color::Red {
                    self[w].color = Color::Black;
                    self[p].color = Color::Red;
                    self.left_rotate(&mut root, p);
                    w = self[p].right.expect("black height requires a sibling");
                }
                if self.color_of(self[w].left) == Color::Black
                    && self.color_of(self[w].right) == Color::Black
                {
                    self[w].color = Color::Red;
                    x = Some(p);
                } else {
                    if self.color_of(self[w].right) == Color::Black {
                        if let Some(wl) = self[w].left {
                            self[wl].color = Color::Black;
                        }
                        self[w].color = Color::Red;
                        self.right_rotate(&mut root, w);
                        w = self[p].right.expect("black height requires a sibling");
                    }
                    self[w].color = self[p].color;
                    self[p].color = Color::Black;
                    if let Some(wr) = self[w].right {
                        self[wr].color = Color::Black;
                    }
                    self.left_rotate(&mut root, p);
                    x = Some(root);
                    break;
                }
            } else {
                let mut w = self[p].left.expect("black height requires a sibling");
                if self[w].color == Color::Red {
                    self[w].color = Color::Black;
                    self[p].color = Color::Red;
                    self.right_rotate(&mut root, p);
                    w = self[p].left.expect("black height requires a sibling");
                }
                if self.color_of(self[w].right) == Color::Black
                    && self.color_of(self[w].left) == Color::Black
                {
                    self[w].color = Color::Red;
                    x = Some(p);
                } else {
                    if self.color_of(self[w].left) == Color::Black {
                        if let Some(wr) = self[w].right {
                            self[wr].color = Color::Black;
                        }
                        self[w].color = Color::Red;
                        self.left_rotate(&mut root, w);
                        w = self[p].left.expect("black height requires a sibling");
                    }
                    self[w].color = self[p].color;
                    self[p].color = Color::Black;
                    if let Some(wl) = self[w].left {
                        self[wl].color = Color::Black;
                    }
                    self.right_rotate(&mut root, p);
                    x = Some(root);
                    break;
                }
            }

            par = x.and_then(|id| self[id].parent);
        }

        if let Some(x) = x {
            self[x].color = Color::Black;
        }

        root
    }
}
