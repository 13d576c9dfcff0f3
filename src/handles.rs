//! Handle lengths, prefix signatures and the handle index.
//!
//! Every internal node owns one handle: the prefix of its extent whose length
//! is the two-fattest number of the node's skip interval. The index maps a
//! seeded 64-bit signature of `(length, bits)` to the nodes carrying it. It is
//! only ever a localisation aid; callers confirm each candidate against the
//! node's reference leaf before trusting it.

use std::collections::HashMap;

use smallvec::SmallVec;

use crate::arena::NodeId;
use crate::bits::{head_mask, BitVec};

/// The number in `(a, b]` with the most trailing zeros. `a` may be `-1`.
#[inline]
pub(crate) fn two_fattest(a: i64, b: i64) -> i64 {
    debug_assert!(a < b, "empty interval ({a}, {b}]");
    if a < 0 {
        return 0;
    }
    let msb = 63 - (a ^ b).leading_zeros();
    (-1i64 << msb) & b
}

/// Handle length of a node with the given extent under a parent with
/// `parent_extent` (`None` for the root).
#[inline]
pub(crate) fn handle_length(parent_extent: Option<usize>, extent: usize) -> usize {
    let a = parent_extent.map_or(-1, |e| e as i64);
    two_fattest(a, extent as i64) as usize
}

/// Least extent a jump pointer from a node with handle length `handle_len`
/// must reach. The root (handle length 0) jumps straight to its extreme leaves.
///
/// A jump from a node with handle `h` lands on a node whose skip interval holds
/// `h + lowbit(h)`, so that node's handle has strictly more trailing zeros and
/// any spine is crossed in O(log w) jumps.
#[inline]
pub(crate) fn jump_length(handle_len: usize) -> usize {
    if handle_len == 0 {
        usize::MAX
    } else {
        handle_len + (handle_len & handle_len.wrapping_neg())
    }
}

// =============================================================================
// Signatures
// =============================================================================

const MIX: u64 = 0x9E37_79B9_7F4A_7C15;

#[inline]
fn absorb(state: u64, word: u64) -> u64 {
    (state ^ word).wrapping_mul(MIX).rotate_left(27)
}

#[inline]
fn finish(state: u64, tail: u64, len: usize) -> u64 {
    // murmur3 fmix64
    let mut h = absorb(absorb(state, tail), len as u64);
    h ^= h >> 33;
    h = h.wrapping_mul(0xff51_afd7_ed55_8ccd);
    h ^= h >> 33;
    h = h.wrapping_mul(0xc4ce_b9fe_1a85_ec53);
    h ^ (h >> 33)
}

/// Per-word hash states of one key, so any prefix signature costs O(1).
pub(crate) struct PrefixHashes<'a> {
    key: &'a BitVec,
    /// `states[i]` has absorbed the first `i` full words.
    states: Vec<u64>,
}

impl<'a> PrefixHashes<'a> {
    pub(crate) fn new(key: &'a BitVec, seed: u64) -> Self {
        Self::up_to(key, key.len(), seed)
    }

    fn up_to(key: &'a BitVec, len: usize, seed: u64) -> Self {
        let full = len / 64;
        let mut states = Vec::with_capacity(full + 1);
        let mut state = seed;
        states.push(state);
        for &w in &key.words()[..full] {
            state = absorb(state, w);
            states.push(state);
        }
        Self { key, states }
    }

    /// Signature of `key[0..len)`.
    #[inline]
    pub(crate) fn signature(&self, len: usize) -> u64 {
        debug_assert!(len <= self.key.len());
        let w = len / 64;
        let rem = len % 64;
        let tail = if rem == 0 {
            0
        } else {
            self.key.words()[w] & head_mask(rem)
        };
        finish(self.states[w], tail, len)
    }
}

/// Signature of `bits[0..len)`; equal to what [`PrefixHashes`] produces.
pub(crate) fn signature(bits: &BitVec, len: usize, seed: u64) -> u64 {
    PrefixHashes::up_to(bits, len, seed).signature(len)
}

// =============================================================================
// Handle index
// =============================================================================

#[derive(Clone, Default)]
pub(crate) struct HandleIndex {
    buckets: HashMap<u64, SmallVec<[NodeId; 2]>>,
    len: usize,
}

impl HandleIndex {
    pub(crate) fn with_capacity(capacity: usize) -> Self {
        Self {
            buckets: HashMap::with_capacity(capacity),
            len: 0,
        }
    }

    /// Number of nodes indexed.
    #[inline]
    pub(crate) fn len(&self) -> usize {
        self.len
    }

    pub(crate) fn insert(&mut self, signature: u64, node: NodeId) {
        let bucket = self.buckets.entry(signature).or_default();
        debug_assert!(!bucket.contains(&node), "{node:?} indexed twice");
        if !bucket.is_empty() {
            tracing::trace!(signature, bucket = bucket.len(), "handle signature collision");
        }
        bucket.push(node);
        self.len += 1;
    }

    /// Removes `node` from the bucket of `signature`. Returns whether it was there.
    pub(crate) fn remove(&mut self, signature: u64, node: NodeId) -> bool {
        let Some(bucket) = self.buckets.get_mut(&signature) else {
            return false;
        };
        let Some(pos) = bucket.iter().position(|&n| n == node) else {
            return false;
        };
        bucket.swap_remove(pos);
        if bucket.is_empty() {
            self.buckets.remove(&signature);
        }
        self.len -= 1;
        true
    }

    /// Hands the entry `(signature, from)` over to `to`.
    pub(crate) fn replace(&mut self, signature: u64, from: NodeId, to: NodeId) -> bool {
        match self
            .buckets
            .get_mut(&signature)
            .and_then(|b| b.iter_mut().find(|n| **n == from))
        {
            Some(slot) => {
                *slot = to;
                true
            }
            None => false,
        }
    }

    /// Nodes whose handle signature is `signature`; unconfirmed.
    #[inline]
    pub(crate) fn candidates(&self, signature: u64) -> &[NodeId] {
        self.buckets.get(&signature).map_or(&[][..], |b| b.as_slice())
    }

    pub(crate) fn reserve(&mut self, additional: usize) {
        self.buckets.reserve(additional);
    }

    pub(crate) fn clear(&mut self) {
        self.buckets.clear();
        self.len = 0;
    }

    pub(crate) fn shrink_to_fit(&mut self) {
        self.buckets.shrink_to_fit();
    }

    pub(crate) fn memory_usage(&self) -> usize {
        self.buckets.capacity()
            * (std::mem::size_of::<u64>() + std::mem::size_of::<SmallVec<[NodeId; 2]>>())
    }
}
