//! Ordered traversal over the leaf chain.

use std::iter::FusedIterator;
use std::marker::PhantomData;

use crate::arena::{NodeArena, NodeId};
use crate::bits::BitVec;
use crate::chain::LeafChain;
use crate::transform::Transform;

/// Keys of a [`crate::TrieEngine`] in ascending order.
pub struct Iter<'a> {
    arena: &'a NodeArena,
    front: NodeId,
    back: NodeId,
    remaining: usize,
}

impl<'a> Iter<'a> {
    pub(crate) fn new(arena: &'a NodeArena, chain: LeafChain, len: usize) -> Self {
        Self {
            arena,
            front: chain.head,
            back: chain.tail,
            remaining: len,
        }
    }
}

impl<'a> Iterator for Iter<'a> {
    type Item = &'a BitVec;

    fn next(&mut self) -> Option<Self::Item> {
        if self.remaining == 0 {
            return None;
        }
        let leaf = self.arena.leaf(self.front);
        self.front = leaf.next;
        self.remaining -= 1;
        Some(&leaf.key)
    }

    #[inline]
    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl DoubleEndedIterator for Iter<'_> {
    fn next_back(&mut self) -> Option<Self::Item> {
        if self.remaining == 0 {
            return None;
        }
        let leaf = self.arena.leaf(self.back);
        self.back = leaf.prev;
        self.remaining -= 1;
        Some(&leaf.key)
    }
}

impl ExactSizeIterator for Iter<'_> {}
impl FusedIterator for Iter<'_> {}

/// A bidirectional position between two adjacent keys.
///
/// `next()` yields the key after the position and moves past it; `prev()`
/// yields the key before the position and moves back over it. Alternating the
/// two returns the same key.
pub struct Cursor<'a> {
    arena: &'a NodeArena,
    chain: LeafChain,
    /// Leaf after the position; NULL past the end.
    next: NodeId,
}

impl<'a> Cursor<'a> {
    pub(crate) fn new(arena: &'a NodeArena, chain: LeafChain, next: NodeId) -> Self {
        Self { arena, chain, next }
    }

    #[inline]
    fn prev_leaf(&self) -> NodeId {
        self.chain.prev_of(self.arena, self.next)
    }

    pub fn has_next(&self) -> bool {
        !self.next.is_null()
    }

    pub fn has_prev(&self) -> bool {
        !self.prev_leaf().is_null()
    }

    pub fn peek_next(&self) -> Option<&'a BitVec> {
        (!self.next.is_null()).then(|| &self.arena.leaf(self.next).key)
    }

    pub fn peek_prev(&self) -> Option<&'a BitVec> {
        let prev = self.prev_leaf();
        (!prev.is_null()).then(|| &self.arena.leaf(prev).key)
    }

    /// Moves back over the previous key and returns it.
    pub fn prev(&mut self) -> Option<&'a BitVec> {
        let prev = self.prev_leaf();
        if prev.is_null() {
            return None;
        }
        self.next = prev;
        Some(&self.arena.leaf(prev).key)
    }
}

impl<'a> Iterator for Cursor<'a> {
    type Item = &'a BitVec;

    fn next(&mut self) -> Option<Self::Item> {
        if self.next.is_null() {
            return None;
        }
        let leaf = self.arena.leaf(self.next);
        self.next = leaf.next;
        Some(&leaf.key)
    }
}

// =============================================================================
// Decoded views
// =============================================================================

/// Keys of a [`crate::ZFastTrie`], decoded, in ascending order.
pub struct SetIter<'a, K: ?Sized, T> {
    pub(crate) inner: Iter<'a>,
    pub(crate) transform: &'a T,
    pub(crate) _key: PhantomData<fn(&K)>,
}

impl<K: ?Sized, T: Transform<K>> Iterator for SetIter<'_, K, T> {
    type Item = T::Owned;

    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next().map(|bits| self.transform.from_bits(bits))
    }

    #[inline]
    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl<K: ?Sized, T: Transform<K>> DoubleEndedIterator for SetIter<'_, K, T> {
    fn next_back(&mut self) -> Option<Self::Item> {
        self.inner.next_back().map(|bits| self.transform.from_bits(bits))
    }
}

impl<K: ?Sized, T: Transform<K>> ExactSizeIterator for SetIter<'_, K, T> {}
impl<K: ?Sized, T: Transform<K>> FusedIterator for SetIter<'_, K, T> {}

/// [`Cursor`] over a [`crate::ZFastTrie`], decoding each key it passes.
pub struct SetCursor<'a, K: ?Sized, T> {
    pub(crate) inner: Cursor<'a>,
    pub(crate) transform: &'a T,
    pub(crate) _key: PhantomData<fn(&K)>,
}

impl<K: ?Sized, T: Transform<K>> SetCursor<'_, K, T> {
    pub fn has_next(&self) -> bool {
        self.inner.has_next()
    }

    pub fn has_prev(&self) -> bool {
        self.inner.has_prev()
    }

    pub fn peek_next(&self) -> Option<T::Owned> {
        self.inner.peek_next().map(|bits| self.transform.from_bits(bits))
    }

    pub fn peek_prev(&self) -> Option<T::Owned> {
        self.inner.peek_prev().map(|bits| self.transform.from_bits(bits))
    }

    pub fn prev(&mut self) -> Option<T::Owned> {
        self.inner.prev().map(|bits| self.transform.from_bits(bits))
    }
}

impl<K: ?Sized, T: Transform<K>> Iterator for SetCursor<'_, K, T> {
    type Item = T::Owned;

    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next().map(|bits| self.transform.from_bits(bits))
    }
}
