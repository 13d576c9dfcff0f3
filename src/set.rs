//! Typed sets: a [`TrieEngine`] behind a key [`Transform`].

use std::fmt;
use std::marker::PhantomData;

use crate::config::TrieConfig;
use crate::iter::{SetCursor, SetIter};
use crate::transform::{PrefixFreeUtf8, Transform};
use crate::trie::TrieEngine;

/// An ordered set of typed keys backed by a [`TrieEngine`].
///
/// Keys are mapped to bit vectors by the transform `T`; iteration order is the
/// order of the encoded bit vectors. The default transform stores UTF-8
/// strings in byte-lexicographic order.
///
/// ```
/// use zfast_trie::ZFastTrie;
///
/// let mut set: ZFastTrie<str> = ZFastTrie::new();
/// set.add("beta");
/// set.add("alpha");
/// set.add("alphabet");
///
/// assert!(set.contains("alpha"));
/// assert_eq!(set.successor("alphab").as_deref(), Some("alphabet"));
/// assert_eq!(set.iter().collect::<Vec<_>>(), ["alpha", "alphabet", "beta"]);
/// ```
pub struct ZFastTrie<K: ?Sized, T = PrefixFreeUtf8> {
    pub(crate) engine: TrieEngine,
    pub(crate) transform: T,
    pub(crate) _key: PhantomData<fn(&K)>,
}

impl<K: ?Sized, T: Transform<K> + Default> ZFastTrie<K, T> {
    pub fn new() -> Self {
        Self::with_transform(T::default())
    }
}

impl<K: ?Sized, T: Transform<K>> ZFastTrie<K, T> {
    pub fn with_transform(transform: T) -> Self {
        Self::with_config(transform, TrieConfig::default())
    }

    pub fn with_config(transform: T, config: TrieConfig) -> Self {
        Self::from_parts(TrieEngine::with_config(config), transform)
    }

    pub(crate) fn from_parts(engine: TrieEngine, transform: T) -> Self {
        Self {
            engine,
            transform,
            _key: PhantomData,
        }
    }

    /// Builds a set holding `keys`.
    pub fn from_keys<'a, I>(keys: I, transform: T) -> Self
    where
        I: IntoIterator<Item = &'a K>,
        K: 'a,
    {
        let mut set = Self::with_transform(transform);
        set.extend(keys);
        set
    }

    pub fn transform(&self) -> &T {
        &self.transform
    }

    /// The underlying bit-vector set.
    pub fn engine(&self) -> &TrieEngine {
        &self.engine
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.engine.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.engine.is_empty()
    }

    pub fn contains(&self, key: &K) -> bool {
        self.engine.contains(&self.transform.to_bits(key))
    }

    /// Inserts `key`; returns whether it was new.
    pub fn add(&mut self, key: &K) -> bool {
        let bits = self.transform.to_bits(key);
        self.engine.add(bits)
    }

    /// Removes `key`; returns whether it was present.
    pub fn remove(&mut self, key: &K) -> bool {
        self.engine.remove(&self.transform.to_bits(key))
    }

    pub fn clear(&mut self) {
        self.engine.clear();
    }

    pub fn first(&self) -> Option<T::Owned> {
        self.engine.first().map(|b| self.transform.from_bits(b))
    }

    pub fn last(&self) -> Option<T::Owned> {
        self.engine.last().map(|b| self.transform.from_bits(b))
    }

    /// Least key `>= key`.
    pub fn successor(&self, key: &K) -> Option<T::Owned> {
        let bits = self.transform.to_bits(key);
        self.engine.successor(&bits).map(|b| self.transform.from_bits(b))
    }

    /// Least key `> key`.
    pub fn strict_successor(&self, key: &K) -> Option<T::Owned> {
        let bits = self.transform.to_bits(key);
        self.engine
            .strict_successor(&bits)
            .map(|b| self.transform.from_bits(b))
    }

    /// Greatest key `< key`.
    pub fn predecessor(&self, key: &K) -> Option<T::Owned> {
        let bits = self.transform.to_bits(key);
        self.engine.predecessor(&bits).map(|b| self.transform.from_bits(b))
    }

    /// Greatest key `<= key`.
    pub fn weak_predecessor(&self, key: &K) -> Option<T::Owned> {
        let bits = self.transform.to_bits(key);
        self.engine
            .weak_predecessor(&bits)
            .map(|b| self.transform.from_bits(b))
    }

    pub fn iter(&self) -> SetIter<'_, K, T> {
        SetIter {
            inner: self.engine.iter(),
            transform: &self.transform,
            _key: PhantomData,
        }
    }

    pub fn cursor(&self) -> SetCursor<'_, K, T> {
        SetCursor {
            inner: self.engine.cursor(),
            transform: &self.transform,
            _key: PhantomData,
        }
    }

    /// A cursor placed before the least key `>= key`.
    pub fn cursor_from(&self, key: &K) -> SetCursor<'_, K, T> {
        let bits = self.transform.to_bits(key);
        SetCursor {
            inner: self.engine.cursor_from(&bits),
            transform: &self.transform,
            _key: PhantomData,
        }
    }

    pub fn memory_usage(&self) -> usize {
        self.engine.memory_usage()
    }

    pub fn shrink_to_fit(&mut self) {
        self.engine.shrink_to_fit();
    }
}

impl<K: ?Sized, T: Transform<K> + Default> Default for ZFastTrie<K, T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K: ?Sized, T: Clone> Clone for ZFastTrie<K, T> {
    fn clone(&self) -> Self {
        Self {
            engine: self.engine.clone(),
            transform: self.transform.clone(),
            _key: PhantomData,
        }
    }
}

impl<K: ?Sized, T: Transform<K>> fmt::Debug for ZFastTrie<K, T>
where
    T::Owned: fmt::Debug,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.iter()).finish()
    }
}

impl<'a, K: ?Sized + 'a, T: Transform<K>> Extend<&'a K> for ZFastTrie<K, T> {
    fn extend<I: IntoIterator<Item = &'a K>>(&mut self, iter: I) {
        for key in iter {
            self.add(key);
        }
    }
}

impl<'a, K: ?Sized + 'a, T: Transform<K> + Default> FromIterator<&'a K> for ZFastTrie<K, T> {
    fn from_iter<I: IntoIterator<Item = &'a K>>(iter: I) -> Self {
        Self::from_keys(iter, T::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bits::BitVec;
    use crate::transform::{FixedWidthU64, Identity, PrefixFreeBytes};

    #[test]
    fn test_strings_in_byte_order() {
        let set: ZFastTrie<str> = ["b", "", "ab", "a", "abc", "\u{e9}"].into_iter().collect();
        assert_eq!(set.len(), 6);
        let keys: Vec<String> = set.iter().collect();
        assert_eq!(keys, ["", "a", "ab", "abc", "b", "\u{e9}"]);
        assert!(set.contains(""));
        assert!(!set.contains("abcd"));
        assert_eq!(set.first().as_deref(), Some(""));
        assert_eq!(set.last().as_deref(), Some("\u{e9}"));
        assert_eq!(format!("{set:?}"), r#"{"", "a", "ab", "abc", "b", "é"}"#);
    }

    #[test]
    fn test_string_neighbours() {
        let set: ZFastTrie<str> = ["apple", "banana", "cherry"].into_iter().collect();
        assert_eq!(set.successor("b").as_deref(), Some("banana"));
        assert_eq!(set.successor("banana").as_deref(), Some("banana"));
        assert_eq!(set.strict_successor("banana").as_deref(), Some("cherry"));
        assert_eq!(set.predecessor("banana").as_deref(), Some("apple"));
        assert_eq!(set.weak_predecessor("bananas").as_deref(), Some("banana"));
        assert_eq!(set.predecessor("apple"), None);
        assert_eq!(set.successor("d"), None);

        let mut c = set.cursor_from("bz");
        assert_eq!(c.peek_prev().as_deref(), Some("banana"));
        assert_eq!(c.next().as_deref(), Some("cherry"));
        assert!(!c.has_next());
        assert_eq!(c.prev().as_deref(), Some("cherry"));
    }

    #[test]
    fn test_bytes_and_integers() {
        let mut bytes = ZFastTrie::<[u8], PrefixFreeBytes>::new();
        assert!(bytes.add(b"\x00\x01"));
        assert!(bytes.add(b"\x00"));
        assert!(bytes.add(b""));
        assert!(!bytes.add(b"\x00"));
        assert_eq!(
            bytes.iter().collect::<Vec<_>>(),
            [vec![], vec![0u8], vec![0u8, 1]]
        );
        assert!(bytes.remove(b"\x00"));
        assert!(!bytes.contains(b"\x00"));

        let mut ints = ZFastTrie::<u64, FixedWidthU64>::new();
        ints.extend([&40, &2, &u64::MAX, &0]);
        assert_eq!(ints.iter().collect::<Vec<_>>(), [0, 2, 40, u64::MAX]);
        assert_eq!(ints.successor(&3), Some(40));
        assert_eq!(ints.predecessor(&3), Some(2));
        assert_eq!(ints.iter().rev().next(), Some(u64::MAX));
    }

    #[test]
    fn test_identity_exposes_engine() {
        let keys: Vec<BitVec> = ["00", "01", "1"]
            .iter()
            .map(|s| BitVec::from_binary_str(s).unwrap())
            .collect();
        let set = ZFastTrie::<BitVec, Identity>::from_keys(&keys, Identity);
        assert_eq!(set.engine().len(), 3);
        assert_eq!(set.first(), Some(keys[0].clone()));
        assert!(set.memory_usage() > 0);
    }

    #[test]
    fn test_clone_is_independent() {
        let mut a: ZFastTrie<str> = ["x", "y"].into_iter().collect();
        let b = a.clone();
        a.remove("x");
        a.clear();
        assert!(a.is_empty());
        assert_eq!(b.iter().collect::<Vec<_>>(), ["x", "y"]);
    }
}
