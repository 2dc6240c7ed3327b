//! Consensus error types

use alloy_primitives::{B256, U256};
use thiserror::Error;

/// A header, seal or uncle rule violation. All of these are permanent:
/// a block failing any of them can never become valid.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConsensusError {
    /// Parent of the verified header is unknown
    #[error("unknown ancestor")]
    UnknownAncestor,

    /// Header number is not parent number + 1
    #[error("invalid block number: parent {parent}, header {header}")]
    InvalidNumber {
        /// Parent block number
        parent: u64,
        /// Header block number
        header: u64,
    },

    /// Header timestamp is not strictly after the parent's
    #[error("timestamp not after parent: parent {parent}, header {header}")]
    InvalidTimestamp {
        /// Parent timestamp
        parent: u64,
        /// Header timestamp
        header: u64,
    },

    /// Extra data exceeds the protocol maximum
    #[error("extra data too long: {len} > {max}")]
    ExtraDataTooLong {
        /// Actual length
        len: usize,
        /// Allowed maximum
        max: usize,
    },

    /// Gas limit out of the allowed band around the parent's
    #[error("invalid gas limit {have} (parent {parent})")]
    InvalidGasLimit {
        /// Header gas limit
        have: u64,
        /// Parent gas limit
        parent: u64,
    },

    /// Header reports more gas used than its limit
    #[error("gas used {used} exceeds gas limit {limit}")]
    GasUsedExceedsLimit {
        /// Reported gas used
        used: u64,
        /// Gas limit
        limit: u64,
    },

    /// Declared difficulty does not match the retargeting rule
    #[error("invalid difficulty: expected {expected}, got {got}")]
    InvalidDifficulty {
        /// Difficulty demanded by the retargeting rule
        expected: U256,
        /// Difficulty declared in the header
        got: U256,
    },

    /// Header version outside the known range
    #[error("invalid header version: {0}")]
    InvalidVersion(u8),

    /// Difficulty is zero
    #[error("difficulty is zero")]
    DifficultyZero,

    /// Mix digest must be all-zero from version 2
    #[error("invalid mix digest")]
    MixDigestNonZero,

    /// Proof-of-work value exceeds the difficulty target
    #[error("invalid proof of work")]
    PowThresholdExceeded,

    /// More uncles than the protocol allows
    #[error("too many uncles: {0}")]
    TooManyUncles(usize),

    /// The same uncle appears twice
    #[error("duplicate uncle {0}")]
    DuplicateUncle(B256),

    /// An uncle that is a direct ancestor of the block
    #[error("uncle {0} is an ancestor")]
    UncleIsAncestor(B256),

    /// Uncle already included by a recent ancestor
    #[error("uncle {0} already included")]
    UncleAlreadyIncluded(B256),

    /// Uncle's parent is outside the allowed ancestor window
    #[error("dangling uncle {0}")]
    DanglingUncle(B256),
}
