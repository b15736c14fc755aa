//! Breadth-first enumeration grouped by depth.

use std::iter::FusedIterator;

use crate::arena::Link;
use crate::node::NodeRef;
use crate::AvlTree;

/// Yields one `Vec` per depth, root first, siblings left to right.
///
/// Created by [`AvlTree::level_order`].
pub struct LevelOrder<'a, V> {
    tree: &'a AvlTree<V>,
    frontier: Vec<Link>,
}

impl<'a, V> LevelOrder<'a, V> {
    pub(crate) fn new(tree: &'a AvlTree<V>) -> Self {
        let frontier = if tree.root.is_null() {
            Vec::new()
        } else {
            vec![tree.root]
        };
        Self { tree, frontier }
    }
}

impl<'a, V> Iterator for LevelOrder<'a, V> {
    type Item = Vec<NodeRef<'a, V>>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.frontier.is_empty() {
            return None;
        }

        let nodes = &self.tree.nodes;
        let mut next = Vec::with_capacity(self.frontier.len() * 2);
        for &link in &self.frontier {
            for child in [nodes.left(link), nodes.right(link)] {
                if !child.is_null() {
                    next.push(child);
                }
            }
        }

        let level = std::mem::replace(&mut self.frontier, next);
        Some(
            level
                .into_iter()
                .map(|link| NodeRef::new(self.tree, link))
                .collect(),
        )
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        if self.frontier.is_empty() {
            (0, Some(0))
        } else {
            (1, Some(self.tree.height() as usize))
        }
    }
}

impl<V> FusedIterator for LevelOrder<'_, V> {}
