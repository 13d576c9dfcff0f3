//! # zfast-trie
//!
//! An ordered set over bit-string keys built on a dynamic z-fast trie.
//!
//! Based on "Dynamic Z-Fast Tries" (SPIRE 2010, Belazzougui, Boldi, Vigna).
//! Membership, insertion, removal and successor/predecessor queries on a key
//! of `w` bits take O(log w) expected hash lookups, independent of the number
//! of stored keys. Iteration in key order is O(1) per step in both
//! directions.
//!
//! [`TrieEngine`] stores raw [`BitVec`] keys; a key and its extensions may be
//! stored side by side. [`ZFastTrie`] wraps it with a [`Transform`] that
//! encodes typed keys; the default encodes UTF-8 strings so that any set of
//! strings is iterated in byte-lexicographic order.
//!
//! ## Example
//!
//! ```rust
//! use zfast_trie::{FixedWidthU64, ZFastTrie};
//!
//! let mut set: ZFastTrie<u64, FixedWidthU64> = ZFastTrie::new();
//! set.add(&10);
//! set.add(&3);
//! set.add(&7);
//!
//! assert!(set.contains(&7));
//! assert_eq!(set.successor(&4), Some(7));
//! assert_eq!(set.predecessor(&4), Some(3));
//! assert_eq!(set.iter().rev().collect::<Vec<_>>(), [10, 7, 3]);
//! ```

mod arena;
mod bits;
mod chain;
mod config;
mod handles;
mod iter;
mod persist;
mod set;
mod transform;
mod trie;

pub use bits::BitVec;
pub use config::{TrieConfig, DEFAULT_SEED};
pub use iter::{Cursor, Iter, SetCursor, SetIter};
pub use persist::{PersistError, SNAPSHOT_MAGIC, SNAPSHOT_VERSION};
pub use set::ZFastTrie;
pub use transform::{FixedWidthU64, Identity, PrefixFreeBytes, PrefixFreeUtf8, Transform};
pub use trie::TrieEngine;


#[cfg(test)]
mod proptests;
