//! Transaction handling for the ledger
//!
//! An account-model value transfer between two addresses. The JSON form
//! doubles as the canonical byte encoding: it is the payload that gets
//! signed and the input to block hashing, so the field order is fixed.

use crate::crypto::{public_key_from_hex, KeyError, PublicKey, Signature};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Reserved sender identity for system-generated reward transactions
pub const REWARD_SENDER: &str = "THE BLOCKCHAIN";

/// Transaction-related errors
#[derive(Error, Debug)]
pub enum TransactionError {
    #[error("Invalid transaction signature")]
    InvalidSignature,
    #[error("Insufficient balance: have {have}, need {need}")]
    InsufficientBalance { have: f64, need: f64 },
    #[error("Invalid transaction value: {0}")]
    InvalidValue(f64),
    #[error("Missing sender public key or signature")]
    MissingCredentials,
    #[error("Crypto error: {0}")]
    Crypto(#[from] KeyError),
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// A value transfer from `sender` to `recipient`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    #[serde(rename = "sender_blockchain_address")]
    pub sender: String,
    #[serde(rename = "recipient_blockchain_address")]
    pub recipient: String,
    pub value: f64,
}

impl Transaction {
    pub fn new(sender: &str, recipient: &str, value: f64) -> Self {
        Self {
            sender: sender.to_string(),
            recipient: recipient.to_string(),
            value,
        }
    }

    /// Create the mining reward transaction for `recipient`
    pub fn reward(recipient: &str, value: f64) -> Self {
        Self::new(REWARD_SENDER, recipient, value)
    }

    /// Whether this transaction originates from the reward source
    pub fn is_reward(&self) -> bool {
        self.sender == REWARD_SENDER
    }

    /// Canonical byte form used for signing and hashing
    pub fn canonical_bytes(&self) -> Result<Vec<u8>, serde_json::Error> {
        serde_json::to_vec(self)
    }

    /// Amounts must be finite and non-negative
    pub fn validate_value(&self) -> Result<(), TransactionError> {
        if self.value.is_finite() && self.value >= 0.0 {
            Ok(())
        } else {
            Err(TransactionError::InvalidValue(self.value))
        }
    }
}

/// Signed transfer request as submitted by wallets and forwarded between
/// peers
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransactionRequest {
    pub sender_blockchain_address: String,
    pub recipient_blockchain_address: String,
    pub sender_public_key: String,
    pub value: f64,
    pub signature: String,
}

impl TransactionRequest {
    /// The transaction this request asks the ledger to admit
    pub fn transaction(&self) -> Transaction {
        Transaction::new(
            &self.sender_blockchain_address,
            &self.recipient_blockchain_address,
            self.value,
        )
    }

    /// Decode the sender's public key and signature from their hex forms
    pub fn credentials(&self) -> Result<(PublicKey, Signature), KeyError> {
        let public_key = public_key_from_hex(&self.sender_public_key)?;
        let signature = self.signature.parse::<Signature>()?;
        Ok((public_key, signature))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_canonical_bytes_field_order() {
        let tx = Transaction::new("alice", "bob", 1.5);
        let bytes = tx.canonical_bytes().unwrap();

        assert_eq!(
            String::from_utf8(bytes).unwrap(),
            r#"{"sender_blockchain_address":"alice","recipient_blockchain_address":"bob","value":1.5}"#
        );
    }

    #[test]
    fn test_reward_transaction() {
        let tx = Transaction::reward("miner", 0.0001);
        assert!(tx.is_reward());
        assert_eq!(tx.sender, REWARD_SENDER);
        assert!(!Transaction::new("alice", "bob", 1.0).is_reward());
    }

    #[test]
    fn test_validate_value() {
        assert!(Transaction::new("a", "b", 0.0).validate_value().is_ok());
        assert!(matches!(
            Transaction::new("a", "b", -1.0).validate_value(),
            Err(TransactionError::InvalidValue(_))
        ));
        assert!(Transaction::new("a", "b", f64::NAN).validate_value().is_err());
    }

    #[test]
    fn test_request_with_short_signature_fails_to_decode() {
        let request = TransactionRequest {
            sender_blockchain_address: "a".into(),
            recipient_blockchain_address: "b".into(),
            sender_public_key: "00".repeat(64),
            value: 1.0,
            signature: "abc".into(),
        };

        assert!(request.credentials().is_err());
    }
}
