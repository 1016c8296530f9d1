//! Wallet implementation for the ledger
//!
//! A wallet is a standalone key pair plus the address derived from it.
//! The node never holds one; wallets sign transfers that nodes verify.

use crate::core::{Blockchain, Transaction, TransactionRequest};
use crate::crypto::{KeyError, KeyPair};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Wallet-related errors
#[derive(Error, Debug)]
pub enum WalletError {
    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),
    #[error("Crypto error: {0}")]
    CryptoError(#[from] KeyError),
}

/// Exported wallet keys
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WalletInfo {
    pub private_key: String,
    pub public_key: String,
    pub blockchain_address: String,
}

/// A key pair with its ledger address
pub struct Wallet {
    key_pair: KeyPair,
    address: String,
}

impl Wallet {
    /// Create a new wallet with a fresh key pair
    pub fn new() -> Self {
        Self::from_key_pair(KeyPair::generate())
    }

    /// Import a wallet from a private key
    pub fn from_private_key(private_key_hex: &str) -> Result<Self, WalletError> {
        Ok(Self::from_key_pair(KeyPair::from_private_key_hex(
            private_key_hex,
        )?))
    }

    fn from_key_pair(key_pair: KeyPair) -> Self {
        let address = key_pair.address();
        Self { key_pair, address }
    }

    /// Get the wallet's address
    pub fn address(&self) -> &str {
        &self.address
    }

    /// Get the wallet's public key (hex)
    pub fn public_key(&self) -> String {
        self.key_pair.public_key_hex()
    }

    /// Get the wallet's private key (hex)
    /// WARNING: Keep this secret!
    pub fn private_key(&self) -> String {
        self.key_pair.private_key_hex()
    }

    /// Confirmed balance on a ledger
    pub fn balance(&self, blockchain: &Blockchain) -> f64 {
        blockchain.calculate_balance(&self.address)
    }

    /// Sign a transfer to `recipient` and package it for submission
    pub fn sign_transfer(
        &self,
        recipient: &str,
        value: f64,
    ) -> Result<TransactionRequest, WalletError> {
        let tx = Transaction::new(&self.address, recipient, value);
        let signature = self.key_pair.sign(&tx.canonical_bytes()?)?;

        Ok(TransactionRequest {
            sender_blockchain_address: self.address.clone(),
            recipient_blockchain_address: recipient.to_string(),
            sender_public_key: self.public_key(),
            value,
            signature: signature.to_string(),
        })
    }

    /// Export all keys
    pub fn export(&self) -> WalletInfo {
        WalletInfo {
            private_key: self.private_key(),
            public_key: self.public_key(),
            blockchain_address: self.address.clone(),
        }
    }
}

impl Default for Wallet {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::LedgerConfig;

    #[test]
    fn test_wallet_creation() {
        let wallet = Wallet::new();
        assert!(!wallet.address().is_empty());
        assert_eq!(wallet.public_key().len(), 128);
        assert_eq!(wallet.private_key().len(), 64);
    }

    #[test]
    fn test_wallet_import() {
        let wallet1 = Wallet::new();
        let wallet2 = Wallet::from_private_key(&wallet1.private_key()).unwrap();

        assert_eq!(wallet1.address(), wallet2.address());
    }

    #[test]
    fn test_wallet_import_rejects_bad_key() {
        assert!(Wallet::from_private_key("not-hex").is_err());
        assert!(Wallet::from_private_key(&"00".repeat(32)).is_err());
    }

    #[test]
    fn test_export_json_shape() {
        let wallet = Wallet::new();
        let json = serde_json::to_value(wallet.export()).unwrap();

        assert_eq!(json["blockchain_address"], wallet.address());
        assert_eq!(json["public_key"], wallet.public_key());
        assert_eq!(json["private_key"], wallet.private_key());
    }

    #[test]
    fn test_signed_transfer_is_admitted() {
        let config = LedgerConfig {
            difficulty: 2,
            ..LedgerConfig::default()
        };
        let mut blockchain = Blockchain::with_config("miner", config).unwrap();
        let wallet = Wallet::new();
        let recipient = Wallet::new();

        let request = wallet.sign_transfer(recipient.address(), 1.0).unwrap();
        let (public_key, signature) = request.credentials().unwrap();
        blockchain
            .add_transaction(
                &request.sender_blockchain_address,
                &request.recipient_blockchain_address,
                request.value,
                Some(&public_key),
                Some(&signature),
            )
            .unwrap();
        blockchain.mine().unwrap();

        assert_eq!(recipient.balance(&blockchain), 1.0);
        assert_eq!(wallet.balance(&blockchain), -1.0);
    }
}
