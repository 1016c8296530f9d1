//! Ledger engine
//!
//! Owns the chain and the pending pool: transaction admission, mining,
//! balance queries, chain validation and chain replacement.

use crate::core::block::{Block, BlockError};
use crate::core::transaction::{Transaction, TransactionError};
use crate::crypto::{verify_signature, PublicKey, Signature};
use crate::mining::{valid_proof, BlockTemplate, Mempool, MinedBlock};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Default mining difficulty (number of leading zero hex characters)
pub const DEFAULT_DIFFICULTY: usize = 3;

/// Amount credited to the miner for each block
pub const MINING_REWARD: f64 = 0.0001;

/// Ledger-related errors
#[derive(Error, Debug)]
pub enum BlockchainError {
    #[error("Block error: {0}")]
    Block(#[from] BlockError),
    #[error("Chain tip moved while mining; block discarded")]
    StaleBlock,
    #[error("Refusing to install an empty chain")]
    EmptyChain,
}

/// Fixed ledger parameters
#[derive(Debug, Clone)]
pub struct LedgerConfig {
    pub difficulty: usize,
    pub mining_reward: f64,
    /// Reject transfers exceeding the sender's confirmed balance
    pub strict_balance: bool,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            difficulty: DEFAULT_DIFFICULTY,
            mining_reward: MINING_REWARD,
            strict_balance: false,
        }
    }
}

/// Result of a mining attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MineOutcome {
    /// Timestamp of the new block, 0 when nothing was mined
    pub timestamp: i64,
    pub mined: bool,
}

impl MineOutcome {
    pub fn skipped() -> Self {
        Self {
            timestamp: 0,
            mined: false,
        }
    }
}

/// The ledger: chain of blocks plus pending pool
#[derive(Debug, Clone)]
pub struct Blockchain {
    chain: Vec<Block>,
    pool: Mempool,
    address: String,
    config: LedgerConfig,
}

impl Blockchain {
    /// Create a ledger with a genesis block, crediting rewards to `address`
    pub fn new(address: &str) -> Result<Self, BlockchainError> {
        Self::with_config(address, LedgerConfig::default())
    }

    pub fn with_config(address: &str, config: LedgerConfig) -> Result<Self, BlockchainError> {
        Ok(Self {
            chain: vec![Block::genesis()?],
            pool: Mempool::new(),
            address: address.to_string(),
            config,
        })
    }

    /// Address credited with mining rewards
    pub fn address(&self) -> &str {
        &self.address
    }

    /// Admit a transaction into the pending pool.
    ///
    /// Transfers need a signature over the transaction's canonical bytes;
    /// the reward source is exempt. Balance is only checked when
    /// `strict_balance` is set, and then only against confirmed blocks.
    pub fn add_transaction(
        &mut self,
        sender: &str,
        recipient: &str,
        value: f64,
        public_key: Option<&PublicKey>,
        signature: Option<&Signature>,
    ) -> Result<(), TransactionError> {
        let tx = Transaction::new(sender, recipient, value);
        tx.validate_value()?;

        if !tx.is_reward() {
            let (public_key, signature) = public_key
                .zip(signature)
                .ok_or(TransactionError::MissingCredentials)?;

            if !verify_signature(public_key, &tx.canonical_bytes()?, signature)? {
                return Err(TransactionError::InvalidSignature);
            }

            if self.config.strict_balance {
                let have = self.calculate_balance(sender);
                if have < value {
                    return Err(TransactionError::InsufficientBalance { have, need: value });
                }
            }
        }

        log::debug!("Admitted transaction {} -> {} ({})", sender, recipient, value);
        self.pool.push(tx);
        Ok(())
    }

    /// Mine the pending pool into a new block.
    ///
    /// Skipped when the pool is empty.
    pub fn mine(&mut self) -> Result<MineOutcome, BlockchainError> {
        match self.prepare_block()? {
            Some(template) => {
                let mined = template.solve()?;
                self.commit_block(mined)
            }
            None => Ok(MineOutcome::skipped()),
        }
    }

    /// Snapshot the pool and chain tip for a detached proof-of-work search
    pub fn prepare_block(&self) -> Result<Option<BlockTemplate>, BlockchainError> {
        if self.pool.is_empty() {
            log::debug!("Pool empty, nothing to mine");
            return Ok(None);
        }

        Ok(Some(BlockTemplate {
            previous_hash: self.last_block()?.hash()?,
            pooled: self.pool.snapshot(),
            reward: Transaction::reward(&self.address, self.config.mining_reward),
            difficulty: self.config.difficulty,
        }))
    }

    /// Append a solved block and drop its transactions from the pool
    pub fn commit_block(&mut self, mined: MinedBlock) -> Result<MineOutcome, BlockchainError> {
        if mined.block.previous_hash != self.last_block()?.hash()? {
            return Err(BlockchainError::StaleBlock);
        }

        self.pool
            .remove_mined(&mined.block.transactions[..mined.pooled]);

        let timestamp = mined.block.timestamp;
        log::info!(
            "Block {} appended with {} transactions (nonce {})",
            self.chain.len(),
            mined.block.tx_count(),
            mined.block.nonce
        );
        self.chain.push(mined.block);

        Ok(MineOutcome {
            timestamp,
            mined: true,
        })
    }

    /// Signed sum of confirmed transfers touching `address`
    pub fn calculate_balance(&self, address: &str) -> f64 {
        let mut balance = 0.0;
        for tx in self.chain.iter().flat_map(|block| &block.transactions) {
            if tx.recipient == address {
                balance += tx.value;
            }
            if tx.sender == address {
                balance -= tx.value;
            }
        }
        balance
    }

    /// Check hash links and proof of work for every block after genesis.
    ///
    /// An invalid candidate yields `Ok(false)`; only hashing failures are
    /// errors.
    pub fn valid_chain(&self, chain: &[Block]) -> Result<bool, BlockchainError> {
        for pair in chain.windows(2) {
            let (previous, block) = (&pair[0], &pair[1]);

            if block.previous_hash != previous.hash()? {
                return Ok(false);
            }

            if !valid_proof(
                block.nonce,
                &block.previous_hash,
                &block.transactions,
                self.config.difficulty,
            )? {
                return Ok(false);
            }
        }

        Ok(true)
    }

    /// Get the latest block
    pub fn last_block(&self) -> Result<&Block, BlockchainError> {
        self.chain.last().ok_or(BlockchainError::EmptyChain)
    }

    pub fn chain(&self) -> &[Block] {
        &self.chain
    }

    /// Replace the whole chain; used by consensus resolution
    pub fn set_chain(&mut self, chain: Vec<Block>) -> Result<(), BlockchainError> {
        if chain.is_empty() {
            return Err(BlockchainError::EmptyChain);
        }
        self.chain = chain;
        Ok(())
    }

    /// Pending transactions in admission order
    pub fn transactions(&self) -> &[Transaction] {
        self.pool.transactions()
    }

    /// Discard the pending pool, returning how many transactions were dropped
    pub fn truncate_pool(&mut self) -> usize {
        self.pool.truncate()
    }

    pub fn len(&self) -> usize {
        self.chain.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chain.is_empty()
    }
}
