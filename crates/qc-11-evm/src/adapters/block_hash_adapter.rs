//! # Block Hash Adapter
//!
//! Map-backed [`BlockHashes`] oracle.

use crate::domain::value_objects::Hash;
use crate::ports::outbound::BlockHashes;
use std::collections::HashMap;

/// Block hashes held in memory.
#[derive(Clone, Debug, Default)]
pub struct InMemoryBlockHashes {
    hashes: HashMap<u64, Hash>,
}

impl InMemoryBlockHashes {
    /// Creates an empty oracle (every lookup misses).
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Records the hash of block `number`.
    pub fn insert(&mut self, number: u64, hash: Hash) {
        self.hashes.insert(number, hash);
    }

    /// Builder form of [`InMemoryBlockHashes::insert`].
    #[must_use]
    pub fn with_hash(mut self, number: u64, hash: Hash) -> Self {
        self.insert(number, hash);
        self
    }

    /// Number of known blocks.
    #[must_use]
    pub fn len(&self) -> usize {
        self.hashes.len()
    }

    /// Returns true if no hash is known.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.hashes.is_empty()
    }
}

impl BlockHashes for InMemoryBlockHashes {
    fn block_hash(&self, number: u64) -> Option<Hash> {
        self.hashes.get(&number).copied()
    }
}
