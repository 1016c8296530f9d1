//! Block implementation for the ledger
//!
//! A block links to its predecessor by digest and carries the ordered
//! transactions it confirms. Its hash covers every field.

use crate::core::transaction::Transaction;
use crate::crypto::{sha256, DIGEST_LEN};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A 32-byte SHA-256 block digest
pub type BlockHash = [u8; DIGEST_LEN];

/// Block errors
#[derive(Error, Debug)]
pub enum BlockError {
    #[error("Failed to serialize block for hashing: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// A block in the chain
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Block {
    /// Nonce found by proof of work
    pub nonce: u64,
    /// Hash of the previous block
    #[serde(with = "hex_digest")]
    pub previous_hash: BlockHash,
    /// Creation time in Unix nanoseconds
    pub timestamp: i64,
    /// Transactions in insertion order
    pub transactions: Vec<Transaction>,
}

impl Block {
    /// Create a block stamped with the current time
    pub fn new(nonce: u64, previous_hash: BlockHash, transactions: Vec<Transaction>) -> Self {
        Self {
            nonce,
            previous_hash,
            timestamp: now_nanos(),
            transactions,
        }
    }

    /// Create the genesis block.
    ///
    /// Genesis links to the hash of the all-zero empty block and carries
    /// nonce 0; it is exempt from proof of work.
    pub fn genesis() -> Result<Self, BlockError> {
        let empty = Block::default();
        Ok(Self::new(0, empty.hash()?, Vec::new()))
    }

    /// SHA-256 over the canonical JSON encoding
    pub fn hash(&self) -> Result<BlockHash, BlockError> {
        let bytes = serde_json::to_vec(self)?;
        Ok(sha256(&bytes))
    }

    /// Get number of transactions in this block
    pub fn tx_count(&self) -> usize {
        self.transactions.len()
    }
}

fn now_nanos() -> i64 {
    let now = Utc::now();
    // Out of range only after the year 2262
    now.timestamp_nanos_opt()
        .unwrap_or_else(|| now.timestamp_micros().saturating_mul(1_000))
}

/// Serde adapter encoding a digest as lowercase hex
pub mod hex_digest {
    use super::BlockHash;
    use serde::de::Error;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(digest: &BlockHash, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&hex::encode(digest))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<BlockHash, D::Error> {
        let encoded = String::deserialize(deserializer)?;
        let mut digest = BlockHash::default();
        hex::decode_to_slice(&encoded, &mut digest).map_err(D::Error::custom)?;
        Ok(digest)
    }
}
