//! State and execution error types

use alloy_primitives::{Address, B256, U256};
use aquachain_storage::StorageError;
use thiserror::Error;

/// Errors from state access and transaction execution.
#[derive(Debug, Error)]
pub enum StateError {
    /// No state snapshot stored for the requested root
    #[error("missing state for root {0}")]
    MissingState(B256),

    /// Transaction nonce is below the account nonce
    #[error("nonce too low for {address}: tx {tx_nonce}, account {account_nonce}")]
    NonceTooLow {
        /// Sending account
        address: Address,
        /// Nonce carried by the transaction
        tx_nonce: u64,
        /// Current account nonce
        account_nonce: u64,
    },

    /// Transaction nonce is above the account nonce
    #[error("nonce too high for {address}: tx {tx_nonce}, account {account_nonce}")]
    NonceTooHigh {
        /// Sending account
        address: Address,
        /// Nonce carried by the transaction
        tx_nonce: u64,
        /// Current account nonce
        account_nonce: u64,
    },

    /// Account cannot cover gas * price + value
    #[error("insufficient funds for {address}: have {have}, need {need}")]
    InsufficientFunds {
        /// Sending account
        address: Address,
        /// Current balance
        have: U256,
        /// Required balance
        need: U256,
    },

    /// Gas limit below the intrinsic cost of the transaction
    #[error("intrinsic gas too low: limit {limit}, need {need}")]
    IntrinsicGasTooLow {
        /// Gas limit of the transaction
        limit: u64,
        /// Intrinsic gas required
        need: u64,
    },

    /// Block gas pool exhausted
    #[error("gas limit reached: pool {pool}, tx needs {need}")]
    GasPoolExhausted {
        /// Remaining block gas
        pool: u64,
        /// Gas demanded by the transaction
        need: u64,
    },

    /// Sender recovery failed
    #[error("invalid transaction signature: {0}")]
    InvalidSignature(#[from] aquachain_types::TypesError),

    /// Underlying storage failure
    #[error(transparent)]
    Storage(#[from] StorageError),
}
