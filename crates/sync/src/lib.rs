//! Header-first block synchronization from untrusted peers.
//!
//! One master peer supplies a header skeleton at fixed stride; gaps are
//! filled from other peers in parallel and verified against the
//! skeleton endpoints; bodies are fetched in batches and verified
//! against the header roots; assembled blocks flow through a bounded
//! queue (backpressure) into the chain engine. Consensus failures
//! demerit the offending peer; a session-wide cancellation signal
//! aborts all in-flight work.

pub mod downloader;
pub mod error;
pub mod peers;

pub use downloader::{
    Downloader, ImportChain, BLOCK_CACHE_LIMIT, IMPORT_BATCH_SIZE, MAX_BLOCK_FETCH,
    MAX_HEADER_FETCH, MAX_SKELETON_SIZE, RESP_TIMEOUT,
};
pub use error::SyncError;
pub use peers::{PeerSet, SyncPeer, BAN_DURATION};

/// Result type for sync operations.
pub type Result<T> = std::result::Result<T, SyncError>;
