//! Cryptographic hashing utilities for the ledger
//!
//! Provides SHA-256 based hashing functions used for block hashes,
//! signature digests, address checksums and the proof-of-work predicate.

use sha2::{Digest, Sha256};

/// Length in bytes of a SHA-256 digest
pub const DIGEST_LEN: usize = 32;

/// Computes SHA-256 hash of the input data
pub fn sha256(data: &[u8]) -> [u8; DIGEST_LEN] {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hasher.finalize().into()
}

/// Computes double SHA-256 hash (SHA-256 of SHA-256)
/// Used for address checksums
pub fn double_sha256(data: &[u8]) -> [u8; DIGEST_LEN] {
    sha256(&sha256(data))
}

/// Computes SHA-256 hash and returns it as a hex string
pub fn sha256_hex(data: &[u8]) -> String {
    hex::encode(sha256(data))
}

/// Checks if a digest meets the difficulty target.
///
/// The lowercase hex rendering of the digest must start with `difficulty`
/// `'0'` characters, so each unit of difficulty is one nibble.
pub fn meets_difficulty(hash: &[u8], difficulty: usize) -> bool {
    if difficulty > hash.len() * 2 {
        return false;
    }

    let full_bytes = difficulty / 2;
    if hash[..full_bytes].iter().any(|byte| *byte != 0) {
        return false;
    }

    // Odd difficulty: the high nibble of the next byte must be zero too
    difficulty % 2 == 0 || hash[full_bytes] >> 4 == 0
}
