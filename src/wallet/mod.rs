//! Wallet module for key management and transfer signing

pub mod wallet;

pub use wallet::{Wallet, WalletError, WalletInfo};
