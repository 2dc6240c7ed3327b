//! Pool admission and operation errors.

use aquachain_chain::ChainError;
use thiserror::Error;

/// Why a transaction was not admitted, or why a pool operation failed.
#[derive(Debug, Error)]
pub enum TxPoolError {
    /// The exact transaction is already pooled
    #[error("already known")]
    AlreadyKnown,

    /// Sender recovery or signature validation failed
    #[error("invalid sender: {0}")]
    InvalidSignature(#[from] aquachain_types::TypesError),

    /// Nonce lower than the sender's account nonce
    #[error("nonce too low")]
    NonceTooLow,

    /// Balance cannot cover gas * price + value
    #[error("insufficient funds for gas * price + value")]
    InsufficientFunds,

    /// Gas limit above the current block gas limit
    #[error("exceeds block gas limit")]
    GasLimitTooHigh,

    /// Gas limit below the intrinsic cost
    #[error("intrinsic gas too low")]
    IntrinsicGasTooLow,

    /// Below the price floor while the pool is full
    #[error("transaction underpriced")]
    Underpriced,

    /// Same-slot replacement without a sufficient price bump
    #[error("replacement transaction underpriced")]
    ReplaceUnderpriced,

    /// Chain access failed
    #[error(transparent)]
    Chain(#[from] ChainError),

    /// Journal file failure
    #[error("journal error: {0}")]
    Journal(#[from] std::io::Error),
}
