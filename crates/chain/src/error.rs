//! Chain engine error types

use alloy_primitives::B256;
use aquachain_consensus::ConsensusError;
use aquachain_params::ConfigCompatError;
use aquachain_state::StateError;
use aquachain_storage::StorageError;
use thiserror::Error;

/// Errors from the chain engine.
#[derive(Debug, Error)]
pub enum ChainError {
    /// Database holds no canonical head; genesis was never committed
    #[error("database contains no canonical chain")]
    NoGenesis,

    /// Stored genesis conflicts with the supplied genesis spec
    #[error("genesis mismatch: database has {stored}, config computes {computed}")]
    GenesisMismatch {
        /// Genesis hash found in the database
        stored: B256,
        /// Genesis hash computed from the supplied spec
        computed: B256,
    },

    /// Stored chain config would be altered in the past; the caller
    /// decides whether to honor the rewind
    #[error(transparent)]
    IncompatibleConfig(#[from] ConfigCompatError),

    /// Parent of an inserted block is not known
    #[error("unknown parent {parent} of block {number}")]
    UnknownParent {
        /// Parent hash the block names
        parent: B256,
        /// Number of the block being inserted
        number: u64,
    },

    /// Block named by hash or number is not stored
    #[error("unknown block {0}")]
    UnknownBlock(B256),

    /// No canonical block at the requested height
    #[error("no canonical block at height {0}")]
    MissingCanonical(u64),

    /// Header, seal or uncle rule violation
    #[error(transparent)]
    Consensus(#[from] ConsensusError),

    /// Body does not match the header's transaction root
    #[error("transaction root mismatch in block {number}: header {header}, body {body}")]
    TxRootMismatch {
        /// Block number
        number: u64,
        /// Root declared by the header
        header: B256,
        /// Root computed from the body
        body: B256,
    },

    /// Body does not match the header's uncle hash
    #[error("uncle hash mismatch in block {number}: header {header}, body {body}")]
    UncleHashMismatch {
        /// Block number
        number: u64,
        /// Hash declared by the header
        header: B256,
        /// Hash computed from the body
        body: B256,
    },

    /// Computed receipts do not match the declared receipt root
    #[error("receipt root mismatch in block {number}: header {header}, computed {computed}")]
    ReceiptRootMismatch {
        /// Block number
        number: u64,
        /// Root declared by the header
        header: B256,
        /// Root computed from execution
        computed: B256,
    },

    /// Executed state does not match the declared state root
    #[error("state root mismatch in block {number}: header {header}, computed {computed}")]
    StateRootMismatch {
        /// Block number
        number: u64,
        /// Root declared by the header
        header: B256,
        /// Root computed from execution
        computed: B256,
    },

    /// Executed gas does not match the declared gas used
    #[error("gas used mismatch in block {number}: header {header}, computed {computed}")]
    GasUsedMismatch {
        /// Block number
        number: u64,
        /// Gas declared by the header
        header: u64,
        /// Gas computed from execution
        computed: u64,
    },

    /// Computed bloom does not match the declared logs bloom
    #[error("bloom mismatch in block {0}")]
    BloomMismatch(u64),

    /// Transaction execution failed while importing a block
    #[error("execution failed in block {number}: {source}")]
    Execution {
        /// Block number
        number: u64,
        /// Underlying execution failure
        #[source]
        source: StateError,
    },

    /// Underlying storage failure
    #[error(transparent)]
    Storage(#[from] StorageError),
}

impl ChainError {
    /// Whether this failure is a consensus violation: permanent, and
    /// grounds for demeriting the peer that delivered the block.
    pub fn is_consensus(&self) -> bool {
        matches!(
            self,
            ChainError::Consensus(_)
                | ChainError::TxRootMismatch { .. }
                | ChainError::UncleHashMismatch { .. }
                | ChainError::ReceiptRootMismatch { .. }
                | ChainError::StateRootMismatch { .. }
                | ChainError::GasUsedMismatch { .. }
                | ChainError::BloomMismatch(_)
                | ChainError::Execution { .. }
        )
    }
}
