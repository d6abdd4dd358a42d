//! Module: range::combine
//! Responsibility: AND/OR of whole key trees across one or more key parts.
//! Does not own: node linkage (range::tree) or bound arithmetic (range::node).
//! Boundary: both operations consume their input handles and return one
//! owned handle; shared inputs are cloned before any mutation.

use crate::range::{KeyRange, KeyTree, NodeId, RangeArena, RangeError};

// Outcome of merging one interval into an OR target.
enum OrStep {
    Merged(NodeId),
    Universal,
}

impl RangeArena {
    ///
    /// AND
    ///

    /// Intersection of two key trees.
    pub fn key_and(&mut self, key1: KeyTree, key2: KeyTree) -> Result<KeyTree, RangeError> {
        let (mut key1, mut key2) = match (key1, key2) {
            (KeyTree::Empty, other) | (other, KeyTree::Empty) => {
                self.release(other);
                return Ok(KeyTree::Empty);
            }
            (KeyTree::Full, other) | (other, KeyTree::Full) => return Ok(other),
            (KeyTree::Root(a), KeyTree::Root(b)) => (a, b),
        };

        if self[key1].range.part > self[key2].range.part {
            std::mem::swap(&mut key1, &mut key2);
        }
        if self[key1].range.part < self[key2].range.part {
            let key1 = self.make_exclusive(key1)?;
            return self.and_all_keys(key1, key2);
        }

        // same key part: sweep both ordered lists
        let mut e1 = Some(self.first(key1));
        let mut e2 = Some(self.first(key2));
        let mut new_tree = None;

        while let (Some(a), Some(b)) = (e1, e2) {
            let skip = if self[a].range.cmp_min_to_min(&self[b].range) < 0 {
                self.get_range(&mut e1, &mut e2, key1)
            } else {
                self.get_range(&mut e2, &mut e1, key2)
            };
            if skip {
                continue;
            }
            let (Some(a), Some(b)) = (e1, e2) else {
                break;
            };

            let left = self.share_suffix(self[a].next_key_part);
            let right = self.share_suffix(self[b].next_key_part);
            let suffix = self.key_and(left, right)?;
            if !suffix.is_empty() {
                let range = self[a].range.clone_and(&self[b].range);
                new_tree = Some(self.insert_range(new_tree, range, suffix.into_suffix()));
            }

            if self[a].range.cmp_max_to_max(&self[b].range) < 0 {
                e1 = self[a].next;
            } else {
                e2 = self[b].next;
            }
        }

        self.release_root(key1);
        self.release_root(key2);

        Ok(new_tree.map_or(KeyTree::Empty, KeyTree::Root))
    }

    // AND a later-part tree under every interval of an exclusive earlier-part tree.
    fn and_all_keys(&mut self, key1: NodeId, key2: NodeId) -> Result<KeyTree, RangeError> {
        let mut root = Some(key1);
        let mut cursor = Some(self.first(key1));

        while let Some(node) = cursor {
            cursor = self[node].next;

            let suffix = KeyTree::from_suffix(self[node].next_key_part.take());
            let shared = self.share_root(key2);
            match self.key_and(suffix, shared)? {
                KeyTree::Empty => {
                    root = root.and_then(|root| self.tree_delete(root, node));
                }
                tree => self[node].next_key_part = tree.into_suffix(),
            }
        }
        self.release_root(key2);

        Ok(root.map_or(KeyTree::Empty, KeyTree::Root))
    }

    // Move `e1` to the `root1` interval that can overlap `e2`.
    // Returns true when the sweep must re-evaluate without intersecting.
    fn get_range(&self, e1: &mut Option<NodeId>, e2: &mut Option<NodeId>, root1: NodeId) -> bool {
        let Some(other) = *e2 else {
            return true;
        };
        let found = self
            .find_range(root1, &self[other].range)
            .expect("a node with a lower min precedes the other interval");
        *e1 = Some(found);

        if self[found].range.cmp_max_to_min(&self[other].range) < 0 {
            *e1 = self[found].next;
            let Some(next) = *e1 else {
                return true;
            };
            if self[next].range.cmp_min_to_max(&self[other].range) > 0 {
                *e2 = self[other].next;
                return true;
            }
        }

        false
    }

    ///
    /// OR
    ///

    /// Union of two key trees.
    pub fn key_or(&mut self, key1: KeyTree, key2: KeyTree) -> Result<KeyTree, RangeError> {
        let (mut key1, mut key2) = match (key1, key2) {
            (KeyTree::Full, other) | (other, KeyTree::Full) => {
                self.release(other);
                return Ok(KeyTree::Full);
            }
            (KeyTree::Empty, other) | (other, KeyTree::Empty) => return Ok(other),
            (KeyTree::Root(a), KeyTree::Root(b)) => (a, b),
        };

        if self[key1].range.part != self[key2].range.part {
            self.release_root(key1);
            self.release_root(key2);
            return Ok(KeyTree::Full);
        }

        // mutate the unshared side, or the smaller one when both are shared
        if self[key1].use_count > 1
            && (self[key2].use_count <= 1 || self[key1].elements > self[key2].elements)
        {
            std::mem::swap(&mut key1, &mut key2);
        }
        key1 = self.make_exclusive(key1)?;
        self[key1].maybe_flag |= self[key2].maybe_flag;

        let mut cursor = Some(self.first(key2));
        while let Some(source) = cursor {
            cursor = self[source].next;

            let range = self[source].range.clone();
            let next_key_part = self[source].next_key_part;
            match self.or_range(key1, range, next_key_part)? {
                OrStep::Merged(root) => key1 = root,
                OrStep::Universal => {
                    self.release_root(key1);
                    self.release_root(key2);
                    return Ok(KeyTree::Full);
                }
            }
        }
        self.release_root(key2);

        Ok(KeyTree::Root(key1))
    }

    // Merge one interval (with a borrowed suffix) into an exclusive tree.
    #[expect(clippy::too_many_lines)]
    fn or_range(
        &mut self,
        mut root: NodeId,
        mut key: KeyRange,
        key_next: Option<NodeId>,
    ) -> Result<OrStep, RangeError> {
        'restart: loop {
            // tmp: first tree interval that may touch key
            let (mut tmp, cmp) = match self.find_range(root, &key) {
                None => (self.first(root), -1),
                Some(found) => {
                    let cmp = self[found].range.cmp_max_to_min(&key);
                    if cmp < 0 {
                        let next = self[found].next;
                        if cmp == -2 && self.eq_tree(self[found].next_key_part, key_next) {
                            // join adjacent ranges like x < 0 and x >= 0
                            if key.copy_min(&self[found].range) {
                                return Ok(OrStep::Universal);
                            }
                            match self.tree_delete(root, found) {
                                Some(new_root) => root = new_root,
                                None => {
                                    let suffix = self.share_suffix(key_next).into_suffix();
                                    return Ok(OrStep::Merged(self.new_tree(key, suffix)));
                                }
                            }
                        }
                        let Some(next) = next else {
                            let suffix = self.share_suffix(key_next).into_suffix();
                            return Ok(OrStep::Merged(self.insert_range(Some(root), key, suffix)));
                        };
                        (next, cmp)
                    } else {
                        (found, cmp)
                    }
                }
            };

            if cmp < 0 {
                // tmp.min > key.min
                let tmp_cmp = self[tmp].range.cmp_min_to_max(&key);
                if tmp_cmp > 0 {
                    if tmp_cmp == 2 && self.eq_tree(self[tmp].next_key_part, key_next) {
                        let node = &mut self[tmp];
                        node.range.copy_min_to_min(&key);
                        node.range.maybe_flag |= key.maybe_flag;
                        if node.range.is_full() {
                            return Ok(OrStep::Universal);
                        }
                        self[root].maybe_flag |= key.maybe_flag;
                        return Ok(OrStep::Merged(root));
                    }

                    let suffix = self.share_suffix(key_next).into_suffix();
                    return Ok(OrStep::Merged(self.insert_range(Some(root), key, suffix)));
                }
            }

            // tmp overlaps key
            if self.eq_tree(self[tmp].next_key_part, key_next) {
                if self[tmp].range.is_same(&key) {
                    self[tmp].range.maybe_flag |= key.maybe_flag;
                    return Ok(OrStep::Merged(root));
                }

                let first = self[tmp].range.clone();
                let mut last = tmp;
                while let Some(next) = self[last].next {
                    if self[next].range.cmp_min_to_max(&key) > 0
                        || !self.eq_tree(self[next].next_key_part, key_next)
                    {
                        break;
                    }
                    let save = last;
                    last = next;
                    root = self
                        .tree_delete(root, save)
                        .expect("the merge target stays in the tree");
                }

                let node = &mut self[last];
                node.range.copy_min(&first);
                if node.range.copy_min(&key) {
                    return Ok(OrStep::Universal);
                }

                // key reaches into a neighbour with a different suffix:
                // stretch up to it and continue with the remainder
                if let Some(next) = self[last].next
                    && key.cmp_max_to_min(&self[next].range) >= 0
                {
                    let next_range = self[next].range.clone();
                    self[last].range.copy_min_to_max(&next_range);
                    key.copy_max_to_min(&self[last].range);
                    continue 'restart;
                }

                if self[last].range.copy_max(&key) {
                    return Ok(OrStep::Universal);
                }
                return Ok(OrStep::Merged(root));
            }

            // different suffixes: split at every bound
            if cmp >= 0 && self[tmp].range.cmp_min_to_min(&key) < 0 {
                // tmp.min <= x < key.min
                let head = self[tmp].range.clone_first(&key);
                let suffix = self.share_suffix(self[tmp].next_key_part).into_suffix();
                self[tmp].range.copy_min_to_min(&key);
                root = self.insert_range(Some(root), head, suffix);
            }

            loop {
                if self[tmp].range.cmp_min_to_min(&key) > 0 {
                    // key.min <= x < tmp.min
                    let gap = key.clone_first(&self[tmp].range);
                    let suffix = self.share_suffix(key_next).into_suffix();
                    root = self.insert_range(Some(root), gap, suffix);
                }

                let cmp = self[tmp].range.cmp_max_to_max(&key);
                if cmp <= 0 {
                    // tmp lies inside key
                    self[tmp].range.maybe_flag |= key.maybe_flag;
                    let own = KeyTree::from_suffix(self[tmp].next_key_part.take());
                    let other = self.share_suffix(key_next);
                    let merged = self.key_or(own, other)?;
                    self[tmp].next_key_part = merged.into_suffix();
                    if cmp == 0 {
                        return Ok(OrStep::Merged(root));
                    }

                    key.copy_max_to_min(&self[tmp].range);
                    match self[tmp].next {
                        Some(next) if self[next].range.cmp_min_to_max(&key) <= 0 => tmp = next,
                        _ => {
                            let suffix = self.share_suffix(key_next).into_suffix();
                            return Ok(OrStep::Merged(self.insert_range(Some(root), key, suffix)));
                        }
                    }
                } else {
                    // tmp.min <= x <= key.max, then the rest of tmp
                    let tail = self[tmp].range.clone_last(&key);
                    self[tmp].range.copy_max_to_min(&key);
                    let own = self.share_suffix(self[tmp].next_key_part);
                    let other = self.share_suffix(key_next);
                    let suffix = self.key_or(own, other)?.into_suffix();
                    return Ok(OrStep::Merged(self.insert_range(Some(root), tail, suffix)));
                }
            }
        }
    }

    /// Structural equality of two suffix trees.
    #[must_use]
    pub fn eq_tree(&self, a: Option<NodeId>, b: Option<NodeId>) -> bool {
        match (a, b) {
            (None, None) => true,
            (Some(a), Some(b)) if a == b => true,
            (Some(a), Some(b)) => {
                let (x, y) = (&self[a], &self[b]);

                x.range.is_same(&y.range)
                    && self.eq_tree(x.left, y.left)
                    && self.eq_tree(x.right, y.right)
                    && self.eq_tree(x.next_key_part, y.next_key_part)
            }
            _ => false,
        }
    }
}
