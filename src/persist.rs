//! Snapshots of a trie's key set.
//!
//! A snapshot is a bincode-encoded header (magic and format version) followed
//! by a body holding the trie configuration, the transform and every key in
//! ascending order. Loading validates the key sequence and rebuilds the trie
//! by insertion, so no internal layout is ever trusted from disk.

use std::io::{Read, Write};

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::bits::BitVec;
use crate::config::TrieConfig;
use crate::set::ZFastTrie;
use crate::transform::{Identity, Transform};
use crate::trie::TrieEngine;

pub const SNAPSHOT_MAGIC: [u8; 4] = *b"ZFT\x01";
pub const SNAPSHOT_VERSION: u32 = 1;

#[derive(Debug, Error)]
pub enum PersistError {
    #[error("snapshot I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("snapshot encoding failed: {0}")]
    Codec(bincode::Error),

    #[error("not a trie snapshot (magic {0:02x?})")]
    BadMagic([u8; 4]),

    #[error("unsupported snapshot version {0}")]
    UnsupportedVersion(u32),

    #[error("snapshot key {0} is not greater than its predecessor")]
    UnorderedKeys(usize),
}

impl From<bincode::Error> for PersistError {
    fn from(err: bincode::Error) -> Self {
        match *err {
            bincode::ErrorKind::Io(io) => PersistError::Io(io),
            other => PersistError::Codec(Box::new(other)),
        }
    }
}

#[derive(Serialize, Deserialize)]
struct Header {
    magic: [u8; 4],
    version: u32,
}

#[derive(Serialize)]
struct BodyRef<'a, T> {
    config: TrieConfig,
    transform: &'a T,
    keys: Vec<&'a BitVec>,
}

#[derive(Deserialize)]
struct Body<T> {
    config: TrieConfig,
    transform: T,
    keys: Vec<BitVec>,
}

fn write_snapshot<W: Write, T: Serialize>(
    mut writer: W,
    engine: &TrieEngine,
    transform: &T,
) -> Result<(), PersistError> {
    let header = Header {
        magic: SNAPSHOT_MAGIC,
        version: SNAPSHOT_VERSION,
    };
    bincode::serialize_into(&mut writer, &header)?;
    let body = BodyRef {
        config: engine.config,
        transform,
        keys: engine.iter().collect(),
    };
    bincode::serialize_into(&mut writer, &body)?;
    writer.flush()?;
    debug!(keys = engine.len(), "saved trie snapshot");
    Ok(())
}

fn read_snapshot<R: Read, T: DeserializeOwned>(mut reader: R) -> Result<(TrieEngine, T), PersistError> {
    let header: Header = bincode::deserialize_from(&mut reader)?;
    if header.magic != SNAPSHOT_MAGIC {
        return Err(PersistError::BadMagic(header.magic));
    }
    if header.version != SNAPSHOT_VERSION {
        return Err(PersistError::UnsupportedVersion(header.version));
    }

    let body: Body<T> = bincode::deserialize_from(&mut reader)?;
    let engine = rebuild(body.config, body.keys)?;
    debug!(keys = engine.len(), "loaded trie snapshot");
    Ok((engine, body.transform))
}

/// Checks that `keys` ascend strictly, then inserts them.
///
/// The stored capacity is only a hint from whoever wrote the snapshot; room is
/// reserved for the keys actually read instead.
fn rebuild(config: TrieConfig, keys: Vec<BitVec>) -> Result<TrieEngine, PersistError> {
    if let Some(i) = keys.windows(2).position(|pair| pair[0] >= pair[1]) {
        return Err(PersistError::UnorderedKeys(i + 1));
    }

    let mut engine = TrieEngine::with_config(config.with_capacity(0));
    engine.reserve(keys.len());
    engine.extend(keys);
    engine.config = config;
    Ok(engine)
}

impl TrieEngine {
    /// Writes a snapshot of every key to `writer`.
    pub fn save<W: Write>(&self, writer: W) -> Result<(), PersistError> {
        write_snapshot(writer, self, &Identity)
    }

    /// Reads a snapshot written by [`TrieEngine::save`] (or by a
    /// [`ZFastTrie`] using the [`Identity`] transform).
    pub fn load<R: Read>(reader: R) -> Result<Self, PersistError> {
        let (engine, Identity) = read_snapshot::<_, Identity>(reader)?;
        Ok(engine)
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>, PersistError> {
        let mut buf = Vec::new();
        self.save(&mut buf)?;
        Ok(buf)
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, PersistError> {
        Self::load(bytes)
    }
}

impl<K: ?Sized, T> ZFastTrie<K, T>
where
    T: Transform<K> + Serialize + DeserializeOwned,
{
    /// Writes a snapshot of every key, together with the transform, to `writer`.
    pub fn save<W: Write>(&self, writer: W) -> Result<(), PersistError> {
        write_snapshot(writer, &self.engine, &self.transform)
    }

    pub fn load<R: Read>(reader: R) -> Result<Self, PersistError> {
        let (engine, transform) = read_snapshot(reader)?;
        Ok(Self::from_parts(engine, transform))
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>, PersistError> {
        let mut buf = Vec::new();
        self.save(&mut buf)?;
        Ok(buf)
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, PersistError> {
        Self::load(bytes)
    }
}
