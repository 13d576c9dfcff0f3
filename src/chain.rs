//! The doubly linked list of leaves, in ascending key order.

use crate::arena::{NodeArena, NodeId};

#[derive(Clone, Copy, Debug)]
pub(crate) struct LeafChain {
    pub head: NodeId,
    pub tail: NodeId,
}

impl Default for LeafChain {
    fn default() -> Self {
        Self {
            head: NodeId::NULL,
            tail: NodeId::NULL,
        }
    }
}

impl LeafChain {
    /// Makes `leaf` the only element.
    pub(crate) fn init(&mut self, arena: &mut NodeArena, leaf: NodeId) {
        debug_assert!(self.head.is_null() && self.tail.is_null());
        let l = arena.leaf_mut(leaf);
        l.prev = NodeId::NULL;
        l.next = NodeId::NULL;
        self.head = leaf;
        self.tail = leaf;
    }

    pub(crate) fn insert_after(&mut self, arena: &mut NodeArena, anchor: NodeId, leaf: NodeId) {
        let next = arena.leaf(anchor).next;
        {
            let l = arena.leaf_mut(leaf);
            l.prev = anchor;
            l.next = next;
        }
        arena.leaf_mut(anchor).next = leaf;
        if next.is_null() {
            self.tail = leaf;
        } else {
            arena.leaf_mut(next).prev = leaf;
        }
    }

    pub(crate) fn insert_before(&mut self, arena: &mut NodeArena, anchor: NodeId, leaf: NodeId) {
        let prev = arena.leaf(anchor).prev;
        {
            let l = arena.leaf_mut(leaf);
            l.prev = prev;
            l.next = anchor;
        }
        arena.leaf_mut(anchor).prev = leaf;
        if prev.is_null() {
            self.head = leaf;
        } else {
            arena.leaf_mut(prev).next = leaf;
        }
    }

    pub(crate) fn unlink(&mut self, arena: &mut NodeArena, leaf: NodeId) {
        let (prev, next) = {
            let l = arena.leaf(leaf);
            (l.prev, l.next)
        };
        if prev.is_null() {
            self.head = next;
        } else {
            arena.leaf_mut(prev).next = next;
        }
        if next.is_null() {
            self.tail = prev;
        } else {
            arena.leaf_mut(next).prev = prev;
        }
        let l = arena.leaf_mut(leaf);
        l.prev = NodeId::NULL;
        l.next = NodeId::NULL;
    }

    /// Leaf after `leaf`, or NULL.
    #[inline]
    pub(crate) fn next(arena: &NodeArena, leaf: NodeId) -> NodeId {
        arena.leaf(leaf).next
    }

    /// Leaf before the position held by `next` (the tail when `next` is NULL).
    #[inline]
    pub(crate) fn prev_of(&self, arena: &NodeArena, next: NodeId) -> NodeId {
        if next.is_null() {
            self.tail
        } else {
            arena.leaf(next).prev
        }
    }
}
