//! The canonical blockchain state machine.
//!
//! Blocks move `unknown → known-header → known-body → executed →
//! canonical | side`. [`Blockchain::insert_header_chain`] takes headers
//! through validation and storage; [`Blockchain::insert_chain`]
//! executes full blocks, verifies the declared roots, pays rewards and
//! selects the heaviest chain, reorganizing the canonical pointers when
//! a heavier branch appears.
//!
//! Writes serialize on a single chain-mutation lock held per block;
//! readers take atomic snapshots of the current head. Events are
//! published only after the lock is released.

pub mod blockchain;
pub mod bloombits;
pub mod error;
pub mod generate;
pub mod genesis;

pub use blockchain::{Blockchain, CacheConfig, ChainFeeds};
pub use bloombits::{BloomBitsGenerator, BloomIndexer, LogFilter};
pub use error::ChainError;
pub use genesis::{setup_genesis, Genesis, GenesisAccount};

/// Result type for chain operations.
pub type Result<T> = std::result::Result<T, ChainError>;
