//! Core ledger components
//!
//! This module contains the fundamental building blocks:
//! - Transactions (account-model transfers with canonical JSON encoding)
//! - Blocks (hash-linked, proof of work over nonce)
//! - Blockchain (the ledger engine: pool, mining, balances, validation)

pub mod block;
pub mod blockchain;
pub mod transaction;

pub use block::{hex_digest, Block, BlockError, BlockHash};
pub use blockchain::{
    Blockchain, BlockchainError, LedgerConfig, MineOutcome, DEFAULT_DIFFICULTY, MINING_REWARD,
};
pub use transaction::{Transaction, TransactionError, TransactionRequest, REWARD_SENDER};
