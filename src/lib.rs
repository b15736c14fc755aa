//! # avl-index
//!
//! A height-balanced (AVL) binary search tree that indexes records by a
//! numeric key, with structural introspection: per-node level, balance
//! factor, parent / grandparent / uncle relations, and level-order
//! enumeration.
//!
//! Entries are ordered by the composite key `(key, id)`, where `id` comes from
//! the payload's [`Record`] implementation, so records sharing a numeric key
//! are still totally ordered.
//!
//! ## Example
//!
//! ```rust
//! use avl_index::AvlTree;
//!
//! let mut tree: AvlTree<String> = AvlTree::new();
//! for (key, id) in [(30.0, "ARG"), (20.0, "BRA"), (10.0, "CHL")] {
//!     tree.insert(key, id.to_string())?;
//! }
//!
//! let root = tree.root().unwrap();
//! assert_eq!(root.key(), 20.0);
//! assert_eq!(root.balance_factor(), 0);
//! assert_eq!(tree.level_ids(), vec![vec!["BRA"], vec!["CHL", "ARG"]]);
//!
//! let leaf = tree.search(10.0).unwrap();
//! assert_eq!(leaf.level(), 1);
//! assert_eq!(leaf.parent().map(|p| p.key()), Some(20.0));
//! # Ok::<(), avl_index::TreeError>(())
//! ```

#![deny(unsafe_code)]

mod arena;
mod error;
mod key;
mod level;
mod node;

use std::cmp::Ordering;
use std::fmt;

use tracing::{debug, trace};

use crate::arena::{Entry, Link, NodeArena};
use crate::key::cmp_composite;

pub use crate::error::TreeError;
pub use crate::key::{Key, Record};
pub use crate::level::LevelOrder;
pub use crate::node::{NodeId, NodeRef};

// =============================================================================
// Configuration
// =============================================================================

/// Construction-time settings for [`AvlTree`].
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct TreeConfig {
    /// Number of node slots reserved up front.
    pub initial_capacity: usize,
}

impl Default for TreeConfig {
    fn default() -> Self {
        Self {
            initial_capacity: 16,
        }
    }
}

// =============================================================================
// Tree
// =============================================================================

/// Ordered, height-balanced index from numeric keys to records.
///
/// Not designed for concurrent mutation; wrap it in a lock if it must be
/// shared.
#[derive(Clone)]
pub struct AvlTree<V> {
    pub(crate) nodes: NodeArena<V>,
    pub(crate) root: Link,
    count: usize,
}

impl<V> AvlTree<V> {
    pub fn new() -> Self {
        Self::with_config(TreeConfig::default())
    }

    pub fn with_config(config: TreeConfig) -> Self {
        Self {
            nodes: NodeArena::with_capacity(config.initial_capacity),
            root: Link::NULL,
            count: 0,
        }
    }

    pub fn len(&self) -> usize {
        self.count
    }

    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    /// Height of the whole tree; 0 when empty.
    pub fn height(&self) -> u32 {
        self.nodes.height(self.root)
    }

    pub fn root(&self) -> Option<NodeRef<'_, V>> {
        (!self.root.is_null()).then(|| NodeRef::new(self, self.root))
    }

    /// Resolves a handle taken earlier, or `None` if its entry was removed or
    /// overwritten by a later deletion.
    pub fn node(&self, id: NodeId) -> Option<NodeRef<'_, V>> {
        self.nodes
            .resolve(id.index, id.generation)
            .map(|link| NodeRef::new(self, link))
    }

    /// Number of parent hops from the node to the root.
    pub fn level_of(&self, id: NodeId) -> Result<usize, TreeError> {
        self.node(id)
            .map(|node| node.level())
            .ok_or(TreeError::StaleNode(id))
    }

    pub fn level_order(&self) -> LevelOrder<'_, V> {
        LevelOrder::new(self)
    }

    pub fn levels(&self) -> Vec<Vec<NodeRef<'_, V>>> {
        self.level_order().collect()
    }

    /// Removes every entry. Outstanding [`NodeId`]s become stale.
    pub fn clear(&mut self) {
        self.nodes.clear();
        self.root = Link::NULL;
        self.count = 0;
        debug!("cleared tree");
    }

    /// First node whose numeric key equals `key` on the descent path.
    fn find_numeric(&self, key: Key) -> Link {
        let mut cur = self.root;
        while !cur.is_null() {
            match key.cmp(&self.nodes.entry(cur).key) {
                Ordering::Less => cur = self.nodes.left(cur),
                Ordering::Greater => cur = self.nodes.right(cur),
                Ordering::Equal => return cur,
            }
        }
        Link::NULL
    }
}

impl<V: Record> AvlTree<V> {
    /// Inserts `payload` under `(key, payload.id())`.
    ///
    /// If that composite key is already present the payload is replaced in
    /// place and the previous one returned; the shape of the tree is not
    /// touched. NaN keys are rejected.
    pub fn insert(&mut self, key: f64, payload: V) -> Result<Option<V>, TreeError> {
        let key = Key::new(key)?;

        let mut parent = Link::NULL;
        let mut go_left = false;
        let mut cur = self.root;
        while !cur.is_null() {
            let entry = self.nodes.entry(cur);
            match cmp_composite(key, payload.id(), entry.key, entry.payload.id()) {
                Ordering::Less => {
                    parent = cur;
                    go_left = true;
                    cur = self.nodes.left(cur);
                }
                Ordering::Greater => {
                    parent = cur;
                    go_left = false;
                    cur = self.nodes.right(cur);
                }
                Ordering::Equal => {
                    let old = std::mem::replace(&mut self.nodes.entry_mut(cur).payload, payload);
                    debug!(%key, "updated payload in place");
                    return Ok(Some(old));
                }
            }
        }

        let link = self.nodes.alloc(Entry { key, payload }, parent);
        if parent.is_null() {
            self.root = link;
        } else if go_left {
            self.nodes.set_left(parent, link);
        } else {
            self.nodes.set_right(parent, link);
        }
        self.count += 1;

        self.rebalance_upward(parent);
        debug!(%key, size = self.count, "inserted entry");
        Ok(None)
    }

    /// Removes the entry with numeric key `key`.
    ///
    /// Returns `Ok(None)` when no entry has that key, and
    /// [`TreeError::AmbiguousKey`] when more than one does; use
    /// [`remove_entry`](Self::remove_entry) to pick one of them.
    ///
    /// When the removed node has two children its in-order successor's entry
    /// is moved into it, so handles to both entries go stale.
    pub fn remove(&mut self, key: f64) -> Result<Option<(f64, V)>, TreeError> {
        let key = Key::new(key)?;
        let found = self.find_numeric(key);
        if found.is_null() {
            debug!(%key, "remove: key not present");
            return Ok(None);
        }

        // Entries sharing a numeric key are adjacent in order.
        let neighbours = [self.nodes.predecessor(found), self.nodes.successor(found)];
        if neighbours
            .iter()
            .any(|&n| !n.is_null() && self.nodes.entry(n).key == key)
        {
            return Err(TreeError::AmbiguousKey(key.get()));
        }

        let entry = self.remove_node(found);
        debug!(%key, size = self.count, "removed entry");
        Ok(Some((entry.key.get(), entry.payload)))
    }

    /// Removes the entry with composite key `(key, id)`.
    pub fn remove_entry(&mut self, key: f64, id: &V::Id) -> Result<Option<V>, TreeError> {
        let key = Key::new(key)?;
        let found = self.find_composite(key, id);
        if found.is_null() {
            return Ok(None);
        }
        let entry = self.remove_node(found);
        debug!(%key, size = self.count, "removed entry");
        Ok(Some(entry.payload))
    }

    /// Looks a node up by numeric key only.
    ///
    /// With several entries sharing `key`, whichever the descent reaches
    /// first is returned. NaN never matches.
    pub fn search(&self, key: f64) -> Option<NodeRef<'_, V>> {
        let key = Key::new(key).ok()?;
        let link = self.find_numeric(key);
        (!link.is_null()).then(|| NodeRef::new(self, link))
    }

    pub fn search_entry(&self, key: f64, id: &V::Id) -> Option<NodeRef<'_, V>> {
        let key = Key::new(key).ok()?;
        let link = self.find_composite(key, id);
        (!link.is_null()).then(|| NodeRef::new(self, link))
    }

    /// Finds a node by payload identity. This scans the tree in level order.
    pub fn find_by_id(&self, id: &V::Id) -> Option<NodeRef<'_, V>> {
        self.level_order()
            .flatten()
            .find(|node| node.record_id() == id)
    }

    /// Payload identities, grouped by depth.
    pub fn level_ids(&self) -> Vec<Vec<&V::Id>> {
        self.level_order()
            .map(|level| level.into_iter().map(|node| node.record_id()).collect())
            .collect()
    }

    fn find_composite(&self, key: Key, id: &V::Id) -> Link {
        let mut cur = self.root;
        while !cur.is_null() {
            let entry = self.nodes.entry(cur);
            match cmp_composite(key, id, entry.key, entry.payload.id()) {
                Ordering::Less => cur = self.nodes.left(cur),
                Ordering::Greater => cur = self.nodes.right(cur),
                Ordering::Equal => return cur,
            }
        }
        Link::NULL
    }
}

// =============================================================================
// Structural maintenance
// =============================================================================

impl<V> AvlTree<V> {
    /// Points `parent`'s link to `old` at `new` instead (or the root when
    /// `parent` is NULL). Does not touch `new`'s parent field.
    fn replace_child(&mut self, parent: Link, old: Link, new: Link) {
        if parent.is_null() {
            self.root = new;
        } else if self.nodes.left(parent) == old {
            self.nodes.set_left(parent, new);
        } else {
            debug_assert_eq!(self.nodes.right(parent), old);
            self.nodes.set_right(parent, new);
        }
    }

    /// Unlinks `node` from the tree, frees its slot and rebalances every
    /// ancestor of the spliced position.
    fn remove_node(&mut self, node: Link) -> Entry<V> {
        let left = self.nodes.left(node);
        let right = self.nodes.right(node);

        let (freed, rebalance_from) = if !left.is_null() && !right.is_null() {
            // Promote the successor's entry into `node`, then splice the
            // successor out of the right subtree. It has no left child.
            let succ = self.nodes.leftmost(right);
            let succ_parent = self.nodes.parent(succ);
            let succ_right = self.nodes.right(succ);
            self.replace_child(succ_parent, succ, succ_right);
            if !succ_right.is_null() {
                self.nodes.set_parent(succ_right, succ_parent);
            }
            self.nodes.swap_entries(node, succ);
            (succ, succ_parent)
        } else {
            let child = if left.is_null() { right } else { left };
            let parent = self.nodes.parent(node);
            self.replace_child(parent, node, child);
            if !child.is_null() {
                self.nodes.set_parent(child, parent);
            }
            (node, parent)
        };

        let entry = self.nodes.free(freed);
        self.count -= 1;
        self.rebalance_upward(rebalance_from);
        entry
    }

    fn rebalance_upward(&mut self, mut cur: Link) {
        while !cur.is_null() {
            let top = self.rebalance(cur);
            cur = self.nodes.parent(top);
        }
    }

    /// Restores the height invariant at `node`. Returns the root of the
    /// subtree that now occupies `node`'s position.
    fn rebalance(&mut self, node: Link) -> Link {
        self.nodes.update_height(node);
        let bf = self.nodes.balance_factor(node);

        if bf > 1 {
            let left = self.nodes.left(node);
            if self.nodes.balance_factor(left) < 0 {
                trace!(slot = node.index(), "rebalance left-right");
                self.rotate_left(left);
            } else {
                trace!(slot = node.index(), "rebalance left-left");
            }
            return self.rotate_right(node);
        }

        if bf < -1 {
            let right = self.nodes.right(node);
            if self.nodes.balance_factor(right) > 0 {
                trace!(slot = node.index(), "rebalance right-left");
                self.rotate_right(right);
            } else {
                trace!(slot = node.index(), "rebalance right-right");
            }
            return self.rotate_left(node);
        }

        node
    }

    /// Promotes `y`'s left child into `y`'s position.
    fn rotate_right(&mut self, y: Link) -> Link {
        let x = self.nodes.left(y);
        debug_assert!(!x.is_null());
        let moved = self.nodes.right(x);
        let parent = self.nodes.parent(y);

        self.nodes.set_left(y, moved);
        if !moved.is_null() {
            self.nodes.set_parent(moved, y);
        }
        self.nodes.set_right(x, y);
        self.nodes.set_parent(y, x);
        self.nodes.set_parent(x, parent);
        self.replace_child(parent, y, x);

        // y is now below x.
        self.nodes.update_height(y);
        self.nodes.update_height(x);
        x
    }

    /// Promotes `x`'s right child into `x`'s position.
    fn rotate_left(&mut self, x: Link) -> Link {
        let y = self.nodes.right(x);
        debug_assert!(!y.is_null());
        let moved = self.nodes.left(y);
        let parent = self.nodes.parent(x);

        self.nodes.set_right(x, moved);
        if !moved.is_null() {
            self.nodes.set_parent(moved, x);
        }
        self.nodes.set_left(y, x);
        self.nodes.set_parent(x, y);
        self.nodes.set_parent(y, parent);
        self.replace_child(parent, x, y);

        self.nodes.update_height(x);
        self.nodes.update_height(y);
        y
    }
}

impl<V> Default for AvlTree<V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<V: Record> fmt::Debug for AvlTree<V>
where
    V::Id: fmt::Debug,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list()
            .entries(self.level_order().map(|level| {
                level
                    .into_iter()
                    .map(|node| (node.key(), node.record_id()))
                    .collect::<Vec<_>>()
            }))
            .finish()
    }
}


#[cfg(test)]
mod proptests;
