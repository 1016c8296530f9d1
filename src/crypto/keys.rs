//! ECDSA key management for the ledger
//!
//! Provides key pair generation, address derivation, signing and
//! verification, plus the fixed-width hex codecs used on the wire:
//! 64 hex characters per 256-bit integer, `x‖y` for public keys and
//! `r‖s` for signatures.

use rand::rngs::OsRng;
use ripemd::Ripemd160;
use secp256k1::{Message, PublicKey, Secp256k1, SecretKey};
use sha2::Digest;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

use super::hash::{double_sha256, sha256};

/// Hex characters used to encode one 256-bit integer
pub const SCALAR_HEX_LEN: usize = 64;

/// Hex characters used to encode a coordinate pair or an `r‖s` signature
pub const PAIR_HEX_LEN: usize = SCALAR_HEX_LEN * 2;

/// Network version byte prepended to the address payload (main network)
pub const ADDRESS_VERSION: u8 = 0x00;

/// Errors that can occur during key operations
#[derive(Error, Debug)]
pub enum KeyError {
    #[error("Invalid encoding length: expected {expected} hex characters, got {actual}")]
    InvalidLength { expected: usize, actual: usize },
    #[error("Invalid hex encoding: {0}")]
    InvalidHex(#[from] hex::FromHexError),
    #[error("Invalid private key")]
    InvalidPrivateKey,
    #[error("Invalid public key")]
    InvalidPublicKey,
    #[error("Invalid signature")]
    InvalidSignature,
    #[error("Secp256k1 error: {0}")]
    Secp256k1Error(#[from] secp256k1::Error),
}

/// An ECDSA signature split into its two 256-bit components
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Signature {
    pub r: [u8; 32],
    pub s: [u8; 32],
}

impl Signature {
    fn from_compact(bytes: [u8; 64]) -> Self {
        let mut r = [0u8; 32];
        let mut s = [0u8; 32];
        r.copy_from_slice(&bytes[..32]);
        s.copy_from_slice(&bytes[32..]);
        Self { r, s }
    }

    fn to_compact(self) -> [u8; 64] {
        let mut bytes = [0u8; 64];
        bytes[..32].copy_from_slice(&self.r);
        bytes[32..].copy_from_slice(&self.s);
        bytes
    }
}

impl fmt::Display for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", hex::encode(self.r), hex::encode(self.s))
    }
}

impl FromStr for Signature {
    type Err = KeyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let bytes = decode_fixed_hex::<64>(s)?;
        Ok(Self::from_compact(bytes))
    }
}

/// A key pair consisting of a private key and its corresponding public key
#[derive(Clone)]
pub struct KeyPair {
    pub secret_key: SecretKey,
    pub public_key: PublicKey,
}

impl KeyPair {
    /// Generate a new random key pair from the OS entropy source
    pub fn generate() -> Self {
        let secp = Secp256k1::new();
        let (secret_key, public_key) = secp.generate_keypair(&mut OsRng);
        Self {
            secret_key,
            public_key,
        }
    }

    /// Create a key pair from an existing secret key
    pub fn from_secret_key(secret_key: SecretKey) -> Self {
        let secp = Secp256k1::new();
        let public_key = PublicKey::from_secret_key(&secp, &secret_key);
        Self {
            secret_key,
            public_key,
        }
    }

    /// Create a key pair from a hex-encoded private key
    pub fn from_private_key_hex(hex_key: &str) -> Result<Self, KeyError> {
        let bytes = decode_fixed_hex::<32>(hex_key)?;
        let secret_key =
            SecretKey::from_slice(&bytes).map_err(|_| KeyError::InvalidPrivateKey)?;
        Ok(Self::from_secret_key(secret_key))
    }

    /// Get the private key as a 64-character hex string
    pub fn private_key_hex(&self) -> String {
        hex::encode(self.secret_key.secret_bytes())
    }

    /// Get the public key as a 128-character `x‖y` hex string
    pub fn public_key_hex(&self) -> String {
        public_key_to_hex(&self.public_key)
    }

    /// Generate a ledger address from the public key
    pub fn address(&self) -> String {
        public_key_to_address(&self.public_key)
    }

    /// Sign a message with the private key
    pub fn sign(&self, message: &[u8]) -> Result<Signature, KeyError> {
        sign_message(&self.secret_key, message)
    }

    /// Verify a signature against this key pair's public key
    pub fn verify(&self, message: &[u8], signature: &Signature) -> Result<bool, KeyError> {
        verify_signature(&self.public_key, message, signature)
    }
}

impl fmt::Debug for KeyPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyPair")
            .field("public_key", &self.public_key_hex())
            .finish_non_exhaustive()
    }
}

/// Convert a public key to a ledger address:
/// `Base58(version ‖ RIPEMD160(SHA256(x‖y)) ‖ checksum)`
///
/// `x` and `y` enter the hash as minimal big-endian integers, leading zero
/// bytes stripped, so the address differs from a fixed-width encoding for
/// coordinates that start with a zero byte.
pub fn public_key_to_address(public_key: &PublicKey) -> String {
    let uncompressed = public_key.serialize_uncompressed();
    let (x, y) = uncompressed[1..].split_at(32);

    let mut coordinates = Vec::with_capacity(64);
    coordinates.extend_from_slice(strip_leading_zeros(x));
    coordinates.extend_from_slice(strip_leading_zeros(y));
    let sha256_hash = sha256(&coordinates);

    let mut ripemd = Ripemd160::new();
    ripemd.update(sha256_hash);
    let ripemd_hash = ripemd.finalize();

    let mut address_bytes = Vec::with_capacity(25);
    address_bytes.push(ADDRESS_VERSION);
    address_bytes.extend_from_slice(&ripemd_hash);

    let checksum = double_sha256(&address_bytes);
    address_bytes.extend_from_slice(&checksum[..4]);

    bs58::encode(address_bytes).into_string()
}

fn strip_leading_zeros(bytes: &[u8]) -> &[u8] {
    let start = bytes.iter().position(|&b| b != 0).unwrap_or(bytes.len());
    &bytes[start..]
}

/// Encode a public key as zero-padded `x‖y` hex
pub fn public_key_to_hex(public_key: &PublicKey) -> String {
    hex::encode(&public_key.serialize_uncompressed()[1..])
}

/// Parse a public key from a 128-character `x‖y` hex string
pub fn public_key_from_hex(hex_key: &str) -> Result<PublicKey, KeyError> {
    let coordinates = decode_fixed_hex::<64>(hex_key)?;

    let mut uncompressed = [0u8; 65];
    uncompressed[0] = 0x04;
    uncompressed[1..].copy_from_slice(&coordinates);

    PublicKey::from_slice(&uncompressed).map_err(|_| KeyError::InvalidPublicKey)
}

/// Sign SHA-256(message) with a secret key
pub fn sign_message(secret_key: &SecretKey, message: &[u8]) -> Result<Signature, KeyError> {
    let secp = Secp256k1::new();
    let digest = Message::from_digest_slice(&sha256(message))?;
    let signature = secp.sign_ecdsa(&digest, secret_key);
    Ok(Signature::from_compact(signature.serialize_compact()))
}

/// Verify a signature over SHA-256(message).
///
/// A well-formed signature that does not match returns `Ok(false)`; only
/// malformed components are an error.
pub fn verify_signature(
    public_key: &PublicKey,
    message: &[u8],
    signature: &Signature,
) -> Result<bool, KeyError> {
    let secp = Secp256k1::new();
    let digest = Message::from_digest_slice(&sha256(message))?;

    let mut sig = secp256k1::ecdsa::Signature::from_compact(&signature.to_compact())
        .map_err(|_| KeyError::InvalidSignature)?;
    // Accept high-S encodings produced by other signers
    sig.normalize_s();

    Ok(secp.verify_ecdsa(&digest, &sig, public_key).is_ok())
}

fn decode_fixed_hex<const N: usize>(s: &str) -> Result<[u8; N], KeyError> {
    if s.len() != N * 2 {
        return Err(KeyError::InvalidLength {
            expected: N * 2,
            actual: s.len(),
        });
    }

    let mut bytes = [0u8; N];
    hex::decode_to_slice(s, &mut bytes)?;
    Ok(bytes)
}
