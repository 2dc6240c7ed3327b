//! Cryptographic primitives for Aquachain.
//!
//! Two families of primitives live here:
//!
//! - Hashing: Keccak-256 plus the three Argon2id variants used by the
//!   versioned proof-of-work, dispatched through [`HashKind`].
//! - Signatures: secp256k1 ECDSA with public key recovery, used for
//!   transaction sender recovery and discovery packet authentication.

pub mod error;
pub mod hash;
pub mod signature;

pub use error::CryptoError;
pub use hash::{version_hash, HashKind, KNOWN_VERSION};
pub use signature::{
    ecrecover, pubkey_to_address, recover_address, recover_pubkey, validate_signature_values,
    SecretKey, SIGNATURE_LENGTH,
};

pub use alloy_primitives::keccak256;

/// Result type for crypto operations.
pub type Result<T> = std::result::Result<T, CryptoError>;
