//! Bit vectors used as trie keys.
//!
//! Bits are stored most-significant-first inside `u64` words: bit `i` lives in
//! word `i / 64` at shift `63 - i % 64`. With that layout comparing two words
//! as integers compares the bits they hold lexicographically, which is what
//! `lcp` and `Ord` rely on.
//!
//! The trie never branches on raw keys. It works on each key's *path*: every
//! bit preceded by a `1` marker, then a closing `0`. Paths of distinct keys
//! are never prefixes of one another and sort in the same order as the keys,
//! so a key and its extensions can live side by side.

use std::cmp::Ordering;
use std::fmt;

use serde::{Deserialize, Serialize};

const WORD_BITS: usize = 64;

#[inline]
fn words_for(bits: usize) -> usize {
    bits.div_ceil(WORD_BITS)
}

/// Mask keeping the first `bits` (MSB-first) bits of a word. `bits` must be < 64.
#[inline]
pub(crate) fn head_mask(bits: usize) -> u64 {
    debug_assert!(bits < WORD_BITS);
    if bits == 0 {
        0
    } else {
        !(u64::MAX >> bits)
    }
}

/// Odd (marker) positions of a path word.
const MARKERS: u64 = 0xAAAA_AAAA_AAAA_AAAA;

/// Moves bit `s` of a 32-bit value to bit `2s`.
#[inline]
fn spread(x: u64) -> u64 {
    debug_assert!(x <= u64::from(u32::MAX));
    let x = (x | x << 16) & 0x0000_FFFF_0000_FFFF;
    let x = (x | x << 8) & 0x00FF_00FF_00FF_00FF;
    let x = (x | x << 4) & 0x0F0F_0F0F_0F0F_0F0F;
    let x = (x | x << 2) & 0x3333_3333_3333_3333;
    (x | x << 1) & 0x5555_5555_5555_5555
}

/// An arbitrary-length sequence of bits.
#[derive(Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "RawBitVec")]
pub struct BitVec {
    words: Vec<u64>,
    len: usize,
}

impl BitVec {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(bits: usize) -> Self {
        Self {
            words: Vec::with_capacity(words_for(bits)),
            len: 0,
        }
    }

    /// Bits of `bytes`, each byte most significant bit first.
    pub fn from_bytes(bytes: &[u8]) -> Self {
        let mut v = Self::with_capacity(bytes.len() * 8);
        for &b in bytes {
            v.append(u64::from(b), 8);
        }
        v
    }

    /// Parses a string of `0`/`1` digits. Returns `None` on any other character.
    pub fn from_binary_str(s: &str) -> Option<Self> {
        let mut v = Self::with_capacity(s.len());
        for c in s.chars() {
            match c {
                '0' => v.push(false),
                '1' => v.push(true),
                _ => return None,
            }
        }
        Some(v)
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Backing words; bits past `len()` are zero.
    #[inline]
    pub fn words(&self) -> &[u64] {
        &self.words
    }

    /// Returns bit `i`.
    ///
    /// # Panics
    ///
    /// Panics if `i >= len()`.
    #[inline]
    pub fn get(&self, i: usize) -> bool {
        assert!(i < self.len, "bit index {i} out of range for length {}", self.len);
        (self.words[i / WORD_BITS] >> (WORD_BITS - 1 - i % WORD_BITS)) & 1 == 1
    }

    pub fn push(&mut self, bit: bool) {
        let off = self.len % WORD_BITS;
        if off == 0 {
            self.words.push(0);
        }
        if bit {
            let last = self.words.len() - 1;
            self.words[last] |= 1u64 << (WORD_BITS - 1 - off);
        }
        self.len += 1;
    }

    /// Appends the `width` low bits of `value`, most significant first.
    pub fn append(&mut self, value: u64, width: usize) {
        assert!(width <= WORD_BITS, "cannot append {width} bits from a u64");
        if width == 0 {
            return;
        }
        let value = if width == WORD_BITS {
            value
        } else {
            value & ((1u64 << width) - 1)
        };
        // Left-align the payload so its first bit sits at the top of the word.
        let aligned = value << (WORD_BITS - width);
        let off = self.len % WORD_BITS;
        if off == 0 {
            self.words.push(aligned);
        } else {
            let last = self.words.len() - 1;
            self.words[last] |= aligned >> off;
            if off + width > WORD_BITS {
                self.words.push(aligned << (WORD_BITS - off));
            }
        }
        self.len += width;
    }

    /// Reads up to 64 bits starting at `from` as an integer (first bit most significant).
    pub fn read(&self, from: usize, width: usize) -> u64 {
        assert!(width <= WORD_BITS && from + width <= self.len);
        if width == 0 {
            return 0;
        }
        let w = from / WORD_BITS;
        let off = from % WORD_BITS;
        let mut top = self.words[w] << off;
        if off != 0 && w + 1 < self.words.len() {
            top |= self.words[w + 1] >> (WORD_BITS - off);
        }
        top >> (WORD_BITS - width)
    }

    /// The bits in `[from, to)`.
    pub fn slice(&self, from: usize, to: usize) -> BitVec {
        assert!(from <= to && to <= self.len, "invalid range {from}..{to} for length {}", self.len);
        let mut out = BitVec::with_capacity(to - from);
        let mut pos = from;
        while pos < to {
            let width = (to - pos).min(WORD_BITS);
            out.append(self.read(pos, width), width);
            pos += width;
        }
        out
    }

    /// The first `len` bits.
    pub fn prefix(&self, len: usize) -> BitVec {
        assert!(len <= self.len);
        let mut words = self.words[..words_for(len)].to_vec();
        if let Some(last) = words.last_mut() {
            let tail = len % WORD_BITS;
            if tail != 0 {
                *last &= head_mask(tail);
            }
        }
        BitVec { words, len }
    }

    /// Length of the longest common prefix of `self` and `other`.
    pub fn lcp(&self, other: &BitVec) -> usize {
        let max = self.len.min(other.len);
        for (i, (a, b)) in self.words.iter().zip(&other.words).enumerate() {
            let x = a ^ b;
            if x != 0 {
                return (i * WORD_BITS + x.leading_zeros() as usize).min(max);
            }
        }
        max
    }

    pub fn is_prefix_of(&self, other: &BitVec) -> bool {
        self.len <= other.len && self.lcp(other) == self.len
    }

    // =========================================================================
    // Trie paths
    // =========================================================================

    /// Length of this key's path.
    #[inline]
    pub(crate) fn path_len(&self) -> usize {
        2 * self.len + 1
    }

    /// This key's path, materialised for hashing.
    pub(crate) fn to_path(&self) -> BitVec {
        let len = 2 * self.len;
        let mut words = Vec::with_capacity(words_for(len + 1));
        for &w in &self.words {
            words.push(spread(w >> 32) | MARKERS);
            words.push(spread(w & 0xFFFF_FFFF) | MARKERS);
        }
        words.truncate(words_for(len));
        if let Some(last) = words.last_mut() {
            let tail = len % WORD_BITS;
            if tail != 0 {
                *last &= head_mask(tail);
            }
        }
        let mut path = BitVec { words, len };
        path.push(false);
        path
    }

    /// Longest common prefix of the paths of `self` and `other`, computed
    /// from the raw keys.
    #[inline]
    pub(crate) fn path_lcp(&self, other: &BitVec) -> usize {
        let l = self.lcp(other);
        if (l < self.len && l < other.len) || self.len == other.len {
            // Markers agree up to the first differing data bit (or the end).
            2 * l + 1
        } else {
            // One key ends: its closing 0 meets the other's 1 marker.
            2 * l
        }
    }

    pub(crate) fn heap_size(&self) -> usize {
        self.words.capacity() * std::mem::size_of::<u64>()
    }
}

impl Ord for BitVec {
    fn cmp(&self, other: &Self) -> Ordering {
        let l = self.lcp(other);
        match (l == self.len, l == other.len) {
            (true, true) => Ordering::Equal,
            (true, false) => Ordering::Less,
            (false, true) => Ordering::Greater,
            (false, false) => {
                if other.get(l) {
                    Ordering::Less
                } else {
                    Ordering::Greater
                }
            }
        }
    }
}

impl PartialOrd for BitVec {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for BitVec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for i in 0..self.len {
            f.write_str(if self.get(i) { "1" } else { "0" })?;
        }
        Ok(())
    }
}

impl fmt::Debug for BitVec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "BitVec({}, \"{}\")", self.len, self)
    }
}

impl FromIterator<bool> for BitVec {
    fn from_iter<I: IntoIterator<Item = bool>>(iter: I) -> Self {
        let mut v = BitVec::new();
        for bit in iter {
            v.push(bit);
        }
        v
    }
}

/// Wire form of [`BitVec`], validated before it becomes one.
#[derive(Deserialize)]
struct RawBitVec {
    words: Vec<u64>,
    len: usize,
}

impl TryFrom<RawBitVec> for BitVec {
    type Error = String;

    fn try_from(raw: RawBitVec) -> Result<Self, Self::Error> {
        if raw.words.len() != words_for(raw.len) {
            return Err(format!(
                "bit vector of length {} needs {} words, got {}",
                raw.len,
                words_for(raw.len),
                raw.words.len()
            ));
        }
        let tail = raw.len % WORD_BITS;
        if tail != 0 {
            let last = raw.words[raw.words.len() - 1];
            if last & !head_mask(tail) != 0 {
                return Err("bit vector has non-zero padding bits".to_string());
            }
        }
        Ok(BitVec {
            words: raw.words,
            len: raw.len,
        })
    }
}
