//! Peer Ledger: a peer-replicated proof-of-work ledger node in Rust
//!
//! This crate provides:
//! - An account-model ledger with signed transfers and a pending pool
//! - Proof of work over a hex-prefix difficulty target
//! - ECDSA signatures (secp256k1) and Base58Check addresses
//! - Longest-valid-chain consensus between HTTP peers
//! - Neighbor discovery and periodic background mining
//!
//! # Example
//!
//! ```rust
//! use peer_ledger::core::{Blockchain, LedgerConfig};
//! use peer_ledger::wallet::Wallet;
//!
//! let miner = Wallet::new();
//! let config = LedgerConfig { difficulty: 1, ..LedgerConfig::default() };
//! let mut blockchain = Blockchain::with_config(miner.address(), config).unwrap();
//!
//! // Sign and admit a transfer
//! let alice = Wallet::new();
//! let request = alice.sign_transfer(miner.address(), 0.5).unwrap();
//! let (public_key, signature) = request.credentials().unwrap();
//! blockchain
//!     .add_transaction(
//!         alice.address(),
//!         miner.address(),
//!         0.5,
//!         Some(&public_key),
//!         Some(&signature),
//!     )
//!     .unwrap();
//!
//! // Mine it
//! let outcome = blockchain.mine().unwrap();
//! assert!(outcome.mined);
//! println!("Miner balance: {}", miner.balance(&blockchain));
//! ```

pub mod api;
pub mod cli;
pub mod core;
pub mod crypto;
pub mod mining;
pub mod network;
pub mod scheduler;
pub mod wallet;

// Re-export commonly used types
pub use api::{create_router, ApiState};
pub use core::{
    Block, Blockchain, LedgerConfig, Transaction, TransactionRequest, DEFAULT_DIFFICULTY,
    MINING_REWARD,
};
pub use crypto::KeyPair;
pub use mining::{Mempool, Miner};
pub use network::{HttpPeerClient, Node, NodeConfig, PeerClient};
pub use wallet::Wallet;
