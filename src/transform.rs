//! Key transformation strategies.
//!
//! A strategy maps typed keys to bit vectors. It must be injective, and the
//! order of the produced bit vectors is the order the trie iterates in.
//! Encodings may be prefixes of one another; the escaped strategies are
//! prefix-free anyway, which keeps their decoding self-delimiting.

use serde::{Deserialize, Serialize};

use crate::bits::BitVec;

/// Converts keys of type `K` to and from their bit-vector form.
pub trait Transform<K: ?Sized> {
    /// The owned key type handed back by iteration.
    type Owned;

    fn to_bits(&self, key: &K) -> BitVec;

    /// Inverse of [`Transform::to_bits`]. Only called on vectors produced by `to_bits`.
    fn from_bits(&self, bits: &BitVec) -> Self::Owned;
}

/// Uses bit vectors as they are.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity;

impl Transform<BitVec> for Identity {
    type Owned = BitVec;

    fn to_bits(&self, key: &BitVec) -> BitVec {
        key.clone()
    }

    fn from_bits(&self, bits: &BitVec) -> BitVec {
        bits.clone()
    }
}

/// Byte strings, escaped so that the encoding is prefix-free.
///
/// Every byte becomes a `1` bit followed by the byte's 8 bits, and the key is
/// closed by a single `0` bit. Byte-lexicographic order is preserved.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrefixFreeBytes;

fn encode_escaped(bytes: &[u8]) -> BitVec {
    let mut v = BitVec::with_capacity(bytes.len() * 9 + 1);
    for &b in bytes {
        v.append(0x100 | u64::from(b), 9);
    }
    v.push(false);
    v
}

fn decode_escaped(bits: &BitVec) -> Vec<u8> {
    let mut out = Vec::with_capacity(bits.len() / 9);
    let mut pos = 0;
    while pos < bits.len() && bits.get(pos) {
        out.push(bits.read(pos + 1, 8) as u8);
        pos += 9;
    }
    debug_assert_eq!(pos + 1, bits.len(), "missing terminator");
    out
}

impl Transform<[u8]> for PrefixFreeBytes {
    type Owned = Vec<u8>;

    fn to_bits(&self, key: &[u8]) -> BitVec {
        encode_escaped(key)
    }

    fn from_bits(&self, bits: &BitVec) -> Vec<u8> {
        decode_escaped(bits)
    }
}

/// UTF-8 strings, encoded like [`PrefixFreeBytes`] over their bytes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrefixFreeUtf8;

impl Transform<str> for PrefixFreeUtf8 {
    type Owned = String;

    fn to_bits(&self, key: &str) -> BitVec {
        encode_escaped(key.as_bytes())
    }

    fn from_bits(&self, bits: &BitVec) -> String {
        // Only ever decodes what `to_bits` produced from a `str`.
        String::from_utf8_lossy(&decode_escaped(bits)).into_owned()
    }
}

/// Unsigned integers as 64 bits, most significant first.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FixedWidthU64;

impl Transform<u64> for FixedWidthU64 {
    type Owned = u64;

    fn to_bits(&self, key: &u64) -> BitVec {
        let mut v = BitVec::with_capacity(64);
        v.append(*key, 64);
        v
    }

    fn from_bits(&self, bits: &BitVec) -> u64 {
        bits.read(0, 64)
    }
}
