//! Aquahash: the Aquachain proof-of-work consensus engine.
//!
//! The engine validates headers against their parent (linkage,
//! timestamp, gas limit, extra data, exact difficulty), checks the
//! versioned proof-of-work seal, validates uncle inclusion and pays
//! block and uncle rewards at finalization.

pub mod difficulty;
pub mod engine;
pub mod error;
pub mod reward;

pub use difficulty::calc_difficulty;
pub use engine::{Aquahash, ChainHeaderReader, PowMode, MAX_UNCLES, UNCLE_DEPTH_LIMIT};
pub use error::ConsensusError;
pub use reward::{accumulate_rewards, block_reward, normal_uncle_reward};

/// Result type for consensus checks.
pub type Result<T> = std::result::Result<T, ConsensusError>;
