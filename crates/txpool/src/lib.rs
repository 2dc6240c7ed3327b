//! The transaction pool.
//!
//! Transactions live in two tiers per sender: **pending** (executable,
//! contiguous nonces from the account nonce upward) and **queued**
//! (nonce gaps, insufficient funds, or spill-over past the per-account
//! pending allowance). Admission is typed: every rejection names its
//! reason so the RPC layer and the protocol handler can act on it.
//! Replacement of a `(sender, nonce)` slot requires a price bump;
//! eviction under global pressure prefers senders that still have
//! queued spill-over; queued transactions expire after a lifetime.
//! Local transactions bypass the price floor (unless disabled) and are
//! journaled to disk across restarts.

pub mod config;
pub mod error;
pub mod journal;
pub mod list;
pub mod maintenance;
pub mod pool;

pub use config::TxPoolConfig;
pub use error::TxPoolError;
pub use journal::TxJournal;
pub use maintenance::spawn_maintenance;
pub use pool::{PoolBackend, TxPool};

/// Result type for pool operations.
pub type Result<T> = std::result::Result<T, TxPoolError>;
