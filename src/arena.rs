//! Slot storage for tree nodes.
//!
//! Nodes refer to each other through 32-bit slot indices instead of pointers.
//! A node owns its children only in the sense that the tree reaches them
//! through it; the parent index is a plain back-reference. Freed slots are
//! recycled through a free list, and every slot carries a generation so that
//! outstanding [`NodeId`](crate::NodeId)s can tell when the entry they named
//! is gone.

use crate::key::Key;

/// Index link between slots. `NULL` marks an empty subtree or a missing parent.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub(crate) struct Link(u32);

impl Link {
    pub(crate) const NULL: Link = Link(u32::MAX);

    #[inline]
    pub(crate) fn is_null(self) -> bool {
        self == Self::NULL
    }

    #[inline]
    pub(crate) fn index(self) -> usize {
        debug_assert!(!self.is_null());
        self.0 as usize
    }
}

#[derive(Clone)]
pub(crate) struct Entry<V> {
    pub(crate) key: Key,
    pub(crate) payload: V,
}

#[derive(Clone)]
struct Slot<V> {
    /// `None` while the slot sits on the free list.
    entry: Option<Entry<V>>,
    left: Link,
    right: Link,
    parent: Link,
    /// Leaf = 1. Empty subtrees are never stored, their height is 0.
    height: u32,
    generation: u32,
}

#[derive(Clone)]
pub(crate) struct NodeArena<V> {
    slots: Vec<Slot<V>>,
    free: Vec<u32>,
}

impl<V> NodeArena<V> {
    pub(crate) fn with_capacity(capacity: usize) -> Self {
        Self {
            slots: Vec::with_capacity(capacity),
            free: Vec::new(),
        }
    }

    pub(crate) fn alloc(&mut self, entry: Entry<V>, parent: Link) -> Link {
        if let Some(idx) = self.free.pop() {
            let slot = &mut self.slots[idx as usize];
            debug_assert!(slot.entry.is_none());
            slot.entry = Some(entry);
            slot.left = Link::NULL;
            slot.right = Link::NULL;
            slot.parent = parent;
            slot.height = 1;
            return Link(idx);
        }

        let idx = self.slots.len();
        assert!(idx < u32::MAX as usize, "node arena exhausted");
        self.slots.push(Slot {
            entry: Some(entry),
            left: Link::NULL,
            right: Link::NULL,
            parent,
            height: 1,
            generation: 0,
        });
        Link(idx as u32)
    }

    /// Releases a slot, returning its entry. The slot's generation advances.
    pub(crate) fn free(&mut self, link: Link) -> Entry<V> {
        let slot = &mut self.slots[link.index()];
        let entry = slot.entry.take().expect("freeing a vacant slot");
        slot.left = Link::NULL;
        slot.right = Link::NULL;
        slot.parent = Link::NULL;
        slot.height = 0;
        slot.generation = slot.generation.wrapping_add(1);
        self.free.push(link.0);
        entry
    }

    /// Frees every live slot, keeping generations so old handles stay stale.
    pub(crate) fn clear(&mut self) {
        self.free.clear();
        for (idx, slot) in self.slots.iter_mut().enumerate() {
            if slot.entry.take().is_some() {
                slot.generation = slot.generation.wrapping_add(1);
            }
            slot.left = Link::NULL;
            slot.right = Link::NULL;
            slot.parent = Link::NULL;
            slot.height = 0;
            self.free.push(idx as u32);
        }
    }

    /// Moves `from`'s entry into `into`, handing `into`'s old entry to `from`.
    ///
    /// `into` now holds a different logical entry, so its generation advances.
    pub(crate) fn swap_entries(&mut self, into: Link, from: Link) {
        debug_assert_ne!(into, from);
        let a = self.slots[into.index()].entry.take();
        let b = self.slots[from.index()].entry.take();
        self.slots[into.index()].entry = b;
        self.slots[from.index()].entry = a;
        let slot = &mut self.slots[into.index()];
        slot.generation = slot.generation.wrapping_add(1);
    }

    /// Returns the link for `(index, generation)` if that slot is still live
    /// and has not been reused or rewritten since.
    pub(crate) fn resolve(&self, index: u32, generation: u32) -> Option<Link> {
        let slot = self.slots.get(index as usize)?;
        (slot.entry.is_some() && slot.generation == generation).then_some(Link(index))
    }

    #[inline]
    pub(crate) fn entry(&self, link: Link) -> &Entry<V> {
        self.slots[link.index()]
            .entry
            .as_ref()
            .expect("link points at a vacant slot")
    }

    #[inline]
    pub(crate) fn entry_mut(&mut self, link: Link) -> &mut Entry<V> {
        self.slots[link.index()]
            .entry
            .as_mut()
            .expect("link points at a vacant slot")
    }

    #[inline]
    pub(crate) fn generation(&self, link: Link) -> u32 {
        self.slots[link.index()].generation
    }

    #[inline]
    pub(crate) fn left(&self, link: Link) -> Link {
        self.slots[link.index()].left
    }

    #[inline]
    pub(crate) fn right(&self, link: Link) -> Link {
        self.slots[link.index()].right
    }

    #[inline]
    pub(crate) fn parent(&self, link: Link) -> Link {
        self.slots[link.index()].parent
    }

    #[inline]
    pub(crate) fn set_left(&mut self, link: Link, child: Link) {
        self.slots[link.index()].left = child;
    }

    #[inline]
    pub(crate) fn set_right(&mut self, link: Link, child: Link) {
        self.slots[link.index()].right = child;
    }

    #[inline]
    pub(crate) fn set_parent(&mut self, link: Link, parent: Link) {
        self.slots[link.index()].parent = parent;
    }

    /// Height of the subtree rooted at `link`; 0 for an empty subtree.
    #[inline]
    pub(crate) fn height(&self, link: Link) -> u32 {
        if link.is_null() {
            0
        } else {
            self.slots[link.index()].height
        }
    }

    #[inline]
    pub(crate) fn update_height(&mut self, link: Link) {
        let h = 1 + self.height(self.left(link)).max(self.height(self.right(link)));
        self.slots[link.index()].height = h;
    }

    #[inline]
    pub(crate) fn balance_factor(&self, link: Link) -> i32 {
        self.height(self.left(link)) as i32 - self.height(self.right(link)) as i32
    }

    pub(crate) fn leftmost(&self, mut link: Link) -> Link {
        while !self.left(link).is_null() {
            link = self.left(link);
        }
        link
    }

    pub(crate) fn rightmost(&self, mut link: Link) -> Link {
        while !self.right(link).is_null() {
            link = self.right(link);
        }
        link
    }

    /// In-order successor, walking up through parents when there is no right subtree.
    pub(crate) fn successor(&self, link: Link) -> Link {
        let right = self.right(link);
        if !right.is_null() {
            return self.leftmost(right);
        }
        let mut child = link;
        let mut parent = self.parent(link);
        while !parent.is_null() && self.right(parent) == child {
            child = parent;
            parent = self.parent(parent);
        }
        parent
    }

    pub(crate) fn predecessor(&self, link: Link) -> Link {
        let left = self.left(link);
        if !left.is_null() {
            return self.rightmost(left);
        }
        let mut child = link;
        let mut parent = self.parent(link);
        while !parent.is_null() && self.left(parent) == child {
            child = parent;
            parent = self.parent(parent);
        }
        parent
    }

    #[cfg(test)]
    pub(crate) fn live_count(&self) -> usize {
        self.slots.len() - self.free.len()
    }
}
