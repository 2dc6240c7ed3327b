//! Sync error types and their peer-scoring classification.

use aquachain_chain::ChainError;
use thiserror::Error;

/// Errors during a sync session.
#[derive(Debug, Error)]
pub enum SyncError {
    /// No registered peer can serve the request
    #[error("no usable peers")]
    NoPeers,

    /// The named peer is not registered or is banned
    #[error("peer {0} unavailable")]
    PeerUnavailable(String),

    /// A request to a peer timed out
    #[error("request to peer {peer} timed out")]
    Timeout {
        /// The unresponsive peer
        peer: String,
    },

    /// The peer transport failed
    #[error("network error from peer {peer}: {reason}")]
    Network {
        /// The failing peer
        peer: String,
        /// Transport-level detail
        reason: String,
    },

    /// The peer answered with data violating the protocol
    #[error("bad response from peer {peer}: {reason}")]
    BadResponse {
        /// The misbehaving peer
        peer: String,
        /// What was wrong with the response
        reason: String,
    },

    /// A gap fill did not connect to the enclosing skeleton
    #[error("skeleton fill mismatch from peer {peer} at header {number}")]
    SkeletonMismatch {
        /// The peer that filled the gap
        peer: String,
        /// First offending header number
        number: u64,
    },

    /// A delivered body does not match its header's roots
    #[error("body mismatch from peer {peer} for block {number}")]
    BodyMismatch {
        /// The peer that delivered the body
        peer: String,
        /// The block whose body failed validation
        number: u64,
    },

    /// The chain engine rejected imported blocks
    #[error(transparent)]
    Import(#[from] ChainError),

    /// The sync session was cancelled
    #[error("sync cancelled")]
    Cancelled,
}

impl SyncError {
    /// True when the peer that caused this error should be demerited.
    pub fn is_peer_misbehavior(&self) -> bool {
        match self {
            SyncError::BadResponse { .. }
            | SyncError::SkeletonMismatch { .. }
            | SyncError::BodyMismatch { .. } => true,
            SyncError::Import(err) => err.is_consensus(),
            _ => false,
        }
    }

    /// True when the operation may be retried against another peer.
    pub fn is_retriable(&self) -> bool {
        matches!(
            self,
            SyncError::Timeout { .. } | SyncError::Network { .. } | SyncError::NoPeers
        )
    }
}
