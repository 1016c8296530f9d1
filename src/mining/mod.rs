//! Mining module for proof of work and transaction pooling

pub mod mempool;
pub mod miner;

pub use mempool::Mempool;
pub use miner::{valid_proof, BlockTemplate, MinedBlock, Miner, MiningStats};
