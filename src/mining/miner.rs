//! Proof-of-work engine for the ledger
//!
//! The search runs over a candidate block whose timestamp is pinned to 0,
//! so the result depends only on nonce, previous hash and transactions.

use crate::core::{Block, BlockError, BlockHash, Transaction};
use crate::crypto::meets_difficulty;
use log::info;
use std::time::Instant;

/// Mining statistics
#[derive(Debug, Clone)]
pub struct MiningStats {
    /// Number of hash attempts
    pub hash_attempts: u64,
    /// Time taken in milliseconds
    pub time_ms: u128,
    /// Hash rate (hashes per second)
    pub hash_rate: f64,
}

/// Check the proof-of-work predicate for a nonce
pub fn valid_proof(
    nonce: u64,
    previous_hash: &BlockHash,
    transactions: &[Transaction],
    difficulty: usize,
) -> Result<bool, BlockError> {
    let guess = Block {
        nonce,
        previous_hash: *previous_hash,
        timestamp: 0,
        transactions: transactions.to_vec(),
    };
    Ok(meets_difficulty(&guess.hash()?, difficulty))
}

/// Nonce searcher for a fixed difficulty
#[derive(Debug, Clone, Copy)]
pub struct Miner {
    pub difficulty: usize,
}

impl Miner {
    pub fn new(difficulty: usize) -> Self {
        Self { difficulty }
    }

    /// Linear nonce scan from 0 until the predicate holds.
    ///
    /// Unbounded: at an unreachable difficulty this never returns.
    pub fn proof_of_work(
        &self,
        previous_hash: &BlockHash,
        transactions: &[Transaction],
    ) -> Result<(u64, MiningStats), BlockError> {
        let start = Instant::now();
        let mut guess = Block {
            nonce: 0,
            previous_hash: *previous_hash,
            timestamp: 0,
            transactions: transactions.to_vec(),
        };

        while !meets_difficulty(&guess.hash()?, self.difficulty) {
            guess.nonce += 1;
        }

        let attempts = guess.nonce + 1;
        let elapsed = start.elapsed().as_millis();
        let hash_rate = if elapsed > 0 {
            (attempts as f64) / (elapsed as f64 / 1000.0)
        } else {
            attempts as f64
        };

        Ok((
            guess.nonce,
            MiningStats {
                hash_attempts: attempts,
                time_ms: elapsed,
                hash_rate,
            },
        ))
    }
}

/// Snapshot of the work to mine, detached from the ledger so the search
/// can run without holding any ledger lock
#[derive(Debug, Clone)]
pub struct BlockTemplate {
    pub previous_hash: BlockHash,
    /// Pool snapshot, in admission order
    pub pooled: Vec<Transaction>,
    pub reward: Transaction,
    pub difficulty: usize,
}

impl BlockTemplate {
    /// Transactions the block will carry: the pool snapshot, then the reward
    pub fn transactions(&self) -> Vec<Transaction> {
        let mut transactions = self.pooled.clone();
        transactions.push(self.reward.clone());
        transactions
    }

    /// Run the proof-of-work search (CPU-bound)
    pub fn solve(self) -> Result<MinedBlock, BlockError> {
        let transactions = self.transactions();
        let miner = Miner::new(self.difficulty);

        info!(
            "Mining block with {} transactions at difficulty {}...",
            transactions.len(),
            self.difficulty
        );
        let (nonce, stats) = miner.proof_of_work(&self.previous_hash, &transactions)?;
        info!(
            "Found nonce {} in {}ms ({} attempts, {:.2} H/s)",
            nonce, stats.time_ms, stats.hash_attempts, stats.hash_rate
        );

        Ok(MinedBlock {
            block: Block::new(nonce, self.previous_hash, transactions),
            pooled: self.pooled.len(),
            stats,
        })
    }
}

/// A block whose nonce satisfies the predicate, ready to be appended
#[derive(Debug, Clone)]
pub struct MinedBlock {
    pub block: Block,
    /// How many leading block transactions came from the pool
    pub pooled: usize,
    pub stats: MiningStats,
}
