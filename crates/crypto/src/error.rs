//! Crypto error types

use thiserror::Error;

/// Errors from hashing and signature operations.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CryptoError {
    /// Secret key bytes are not a valid secp256k1 scalar
    #[error("invalid secret key")]
    InvalidSecretKey,

    /// Signature bytes are malformed or r/s out of range
    #[error("invalid signature")]
    InvalidSignature,

    /// Recovery id is not in 0..=3
    #[error("invalid signature recovery id: {0}")]
    InvalidRecoveryId(u8),

    /// Public key recovery failed for the given digest and signature
    #[error("signature recovery failed")]
    RecoveryFailed,

    /// Header version does not map to a known hash function
    #[error("unknown hash version: {0}")]
    UnknownHashVersion(u8),
}
