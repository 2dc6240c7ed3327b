//! Account state for the chain engine.
//!
//! State is copy-on-write per block: the importer loads the parent's
//! state, clones it, executes into the clone, and commits. A commit
//! computes the Merkle-Patricia root over all accounts (each with its
//! own storage trie) and persists a snapshot keyed by that root, so any
//! historical root can be re-opened until pruned.

pub mod error;
pub mod executor;
pub mod hardfork;
pub mod statedb;

pub use error::StateError;
pub use executor::{ExecutionOutcome, Executor, TransferExecutor};
pub use hardfork::{ForkMutationRegistry, ForkMutations};
pub use statedb::{AccountData, StateDb};

/// Result type for state operations.
pub type Result<T> = std::result::Result<T, StateError>;
