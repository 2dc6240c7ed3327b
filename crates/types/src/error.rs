//! Type-level error definitions

use aquachain_crypto::CryptoError;
use thiserror::Error;

/// Errors from signature handling and encoding-level validation.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TypesError {
    /// Signature recovery or range validation failed
    #[error("invalid transaction signature")]
    InvalidSignature,

    /// The v value does not encode a known recovery id scheme
    #[error("invalid signature v value")]
    InvalidV,

    /// EIP-155 signature bound to a different chain
    #[error("invalid chain id for signer (expected {expected}, got {got})")]
    WrongChainId {
        /// Chain id the signer is configured for
        expected: u64,
        /// Chain id recovered from the signature
        got: u64,
    },

    /// Intrinsic gas computation overflowed
    #[error("intrinsic gas overflow")]
    IntrinsicGasOverflow,

    /// Underlying crypto failure
    #[error(transparent)]
    Crypto(#[from] CryptoError),
}
