mod hash;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub use hash::{BlockHash, ParseHashError, calculate_hash, canonical_timestamp};

use crate::consts::{GENESIS_BPM, GENESIS_INDEX};

/// Builds the next block from a tip and a payload.
///
/// The hash is computed once, when the block is built; callers decide whether
/// the result is ever appended.
#[derive(Debug, Clone)]
pub struct BlockConstructor {
    index: u64,
    bpm: i64,
    prev_hash: Option<BlockHash>,
}

impl BlockConstructor {
    /// First block of a chain: index 0, no parent.
    pub fn genesis() -> Self {
        Self {
            index: GENESIS_INDEX,
            bpm: GENESIS_BPM,
            prev_hash: None,
        }
    }

    /// Block that extends `tip` by one.
    pub fn next(tip: &Block, bpm: i64) -> Self {
        Self {
            index: tip.index() + 1,
            bpm,
            prev_hash: Some(*tip.hash()),
        }
    }

    pub fn build(self) -> Block {
        self.build_at(Utc::now())
    }

    pub fn build_at(self, timestamp: DateTime<Utc>) -> Block {
        let hash = calculate_hash(self.index, &timestamp, self.bpm, self.prev_hash.as_ref());
        Block {
            index: self.index,
            timestamp,
            bpm: self.bpm,
            hash,
            prev_hash: self.prev_hash,
        }
    }
}

/// One ledger entry.
///
/// The stored hash is not trusted: a block decoded from the outside may carry
/// any hash at all, see [`Block::has_valid_hash`].
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Block {
    #[serde(rename = "Index")]
    index: u64,
    #[serde(rename = "Timestamp")]
    timestamp: DateTime<Utc>,
    #[serde(rename = "BPM")]
    bpm: i64,
    #[serde(rename = "Hash")]
    hash: BlockHash,
    #[serde(rename = "PrevHash", with = "hash::prev_hash")]
    prev_hash: Option<BlockHash>,
}

impl Block {
    pub fn index(&self) -> u64 {
        self.index
    }

    pub fn timestamp(&self) -> &DateTime<Utc> {
        &self.timestamp
    }

    pub fn bpm(&self) -> i64 {
        self.bpm
    }

    pub fn hash(&self) -> &BlockHash {
        &self.hash
    }

    /// `None` only for a genesis block.
    pub fn prev_hash(&self) -> Option<&BlockHash> {
        self.prev_hash.as_ref()
    }

    pub fn is_genesis(&self) -> bool {
        self.index == GENESIS_INDEX && self.prev_hash.is_none()
    }

    /// Re-derive the hash from the stored fields.
    pub fn compute_hash(&self) -> BlockHash {
        calculate_hash(
            self.index,
            &self.timestamp,
            self.bpm,
            self.prev_hash.as_ref(),
        )
    }

    /// Whether the stored hash still matches the block's contents.
    pub fn has_valid_hash(&self) -> bool {
        self.compute_hash() == self.hash
    }
}
