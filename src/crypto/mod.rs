//! Cryptographic utilities for the ledger
//!
//! This module provides:
//! - SHA-256 hashing and the proof-of-work difficulty predicate
//! - ECDSA key management (secp256k1)
//! - Address derivation and fixed-width hex codecs

pub mod hash;
pub mod keys;

pub use hash::{double_sha256, meets_difficulty, sha256, sha256_hex, DIGEST_LEN};
pub use keys::{
    public_key_from_hex, public_key_to_address, public_key_to_hex, sign_message,
    verify_signature, KeyError, KeyPair, Signature, PAIR_HEX_LEN, SCALAR_HEX_LEN,
};
pub use secp256k1::PublicKey;
