//! Trie construction options.

use serde::{Deserialize, Serialize};

/// Seed used for handle signatures unless one is configured.
pub const DEFAULT_SEED: u64 = 0x5EED_2F47_7A1E_0001;

/// Construction options for a trie.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrieConfig {
    /// Seed mixed into every handle signature.
    pub seed: u64,
    /// Number of keys to reserve room for.
    pub capacity: usize,
}

impl Default for TrieConfig {
    fn default() -> Self {
        Self {
            seed: DEFAULT_SEED,
            capacity: 0,
        }
    }
}

impl TrieConfig {
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    pub fn with_capacity(mut self, capacity: usize) -> Self {
        self.capacity = capacity;
        self
    }
}
