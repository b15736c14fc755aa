//! Node handles.
//!
//! [`NodeRef`] borrows the tree, so it can never observe a mutation. To keep
//! track of an entry across `insert`/`remove` calls, hold its [`NodeId`] and
//! resolve it again with [`AvlTree::node`]; the id stops resolving once its
//! entry is removed or overwritten by successor promotion.

use std::fmt;

use crate::arena::Link;
use crate::key::Record;
use crate::AvlTree;

/// Stable, copyable identifier for a live entry.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct NodeId {
    pub(crate) index: u32,
    pub(crate) generation: u32,
}

/// A read-only view of one node and its surroundings.
pub struct NodeRef<'a, V> {
    pub(crate) tree: &'a AvlTree<V>,
    pub(crate) link: Link,
}

impl<V> Clone for NodeRef<'_, V> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<V> Copy for NodeRef<'_, V> {}

impl<V> PartialEq for NodeRef<'_, V> {
    fn eq(&self, other: &Self) -> bool {
        std::ptr::eq(self.tree, other.tree) && self.link == other.link
    }
}

impl<V> Eq for NodeRef<'_, V> {}

impl<'a, V> NodeRef<'a, V> {
    #[inline]
    pub(crate) fn new(tree: &'a AvlTree<V>, link: Link) -> Self {
        debug_assert!(!link.is_null());
        Self { tree, link }
    }

    #[inline]
    fn wrap(&self, link: Link) -> Option<NodeRef<'a, V>> {
        (!link.is_null()).then(|| NodeRef::new(self.tree, link))
    }

    pub fn id(&self) -> NodeId {
        NodeId {
            index: self.link.index() as u32,
            generation: self.tree.nodes.generation(self.link),
        }
    }

    pub fn key(&self) -> f64 {
        self.tree.nodes.entry(self.link).key.get()
    }

    pub fn payload(&self) -> &'a V {
        &self.tree.nodes.entry(self.link).payload
    }

    /// Cached subtree height; a leaf has height 1.
    pub fn height(&self) -> u32 {
        self.tree.nodes.height(self.link)
    }

    /// `height(left) - height(right)`, always within `-1..=1`.
    pub fn balance_factor(&self) -> i32 {
        self.tree.nodes.balance_factor(self.link)
    }

    pub fn is_leaf(&self) -> bool {
        self.tree.nodes.left(self.link).is_null() && self.tree.nodes.right(self.link).is_null()
    }

    pub fn left(&self) -> Option<NodeRef<'a, V>> {
        self.wrap(self.tree.nodes.left(self.link))
    }

    pub fn right(&self) -> Option<NodeRef<'a, V>> {
        self.wrap(self.tree.nodes.right(self.link))
    }

    pub fn parent(&self) -> Option<NodeRef<'a, V>> {
        self.wrap(self.tree.nodes.parent(self.link))
    }

    pub fn grandparent(&self) -> Option<NodeRef<'a, V>> {
        self.parent()?.parent()
    }

    /// The grandparent's other child, if there is one.
    pub fn uncle(&self) -> Option<NodeRef<'a, V>> {
        let parent = self.parent()?;
        let grandparent = parent.parent()?;
        let nodes = &self.tree.nodes;
        let other = if nodes.left(grandparent.link) == parent.link {
            nodes.right(grandparent.link)
        } else {
            nodes.left(grandparent.link)
        };
        self.wrap(other)
    }

    /// Number of parent hops to the root; the root is level 0.
    pub fn level(&self) -> usize {
        let nodes = &self.tree.nodes;
        let mut level = 0;
        let mut cur = nodes.parent(self.link);
        while !cur.is_null() {
            level += 1;
            cur = nodes.parent(cur);
        }
        level
    }
}

impl<'a, V: Record> NodeRef<'a, V> {
    /// The tie-break identity of this node's payload.
    pub fn record_id(&self) -> &'a V::Id {
        self.payload().id()
    }
}

impl<V: Record> fmt::Debug for NodeRef<'_, V>
where
    V::Id: fmt::Debug,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NodeRef")
            .field("key", &self.key())
            .field("id", &self.record_id())
            .field("height", &self.height())
            .field("balance_factor", &self.balance_factor())
            .finish()
    }
}
