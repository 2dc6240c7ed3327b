//! Header, seal and uncle verification.

use std::collections::HashMap;
use std::sync::Arc;

use alloy_primitives::{B256, U256, U512};
use aquachain_crypto::{version_hash, KNOWN_VERSION};
use aquachain_params::{protocol, ChainConfig, HeaderVersion};
use aquachain_state::StateDb;
use aquachain_types::{Block, Header};
use tracing::trace;

use crate::difficulty::calc_difficulty;
use crate::reward::accumulate_rewards;
use crate::{ConsensusError, Result};

/// Maximum number of uncles allowed in a single block.
pub const MAX_UNCLES: usize = 2;

/// How many generations back an uncle's parent may be.
pub const UNCLE_DEPTH_LIMIT: u64 = 7;

/// Read access to stored headers, as needed for uncle verification.
pub trait ChainHeaderReader {
    /// Header by hash and number.
    fn header(&self, hash: &B256, number: u64) -> Option<Header>;
    /// Full block by hash and number.
    fn block(&self, hash: &B256, number: u64) -> Option<Block>;
}

/// Seal verification mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PowMode {
    /// Verify proofs of work for real.
    Normal,
    /// Accept every seal; for chain construction in tests.
    Fake,
}

/// The Aquahash consensus engine.
#[derive(Debug, Clone)]
pub struct Aquahash {
    config: Arc<ChainConfig>,
    mode: PowMode,
}

impl Aquahash {
    /// Full-verification engine for `config`.
    pub fn new(config: Arc<ChainConfig>) -> Self {
        Self {
            config,
            mode: PowMode::Normal,
        }
    }

    /// Engine that accepts any seal. Header fields (difficulty, gas,
    /// timestamps, linkage) are still verified.
    pub fn fake(config: Arc<ChainConfig>) -> Self {
        Self {
            config,
            mode: PowMode::Fake,
        }
    }

    /// The chain config this engine enforces.
    pub fn config(&self) -> &ChainConfig {
        &self.config
    }

    /// The difficulty a child of `parent` must declare at `time`.
    pub fn calc_difficulty(&self, time: u64, parent: &Header) -> U256 {
        calc_difficulty(&self.config, time, parent)
    }

    /// Verify a header against its parent; with `seal`, also check the
    /// proof of work.
    pub fn verify_header(&self, header: &Header, parent: &Header, seal: bool) -> Result<()> {
        if header.number != parent.number + 1 {
            return Err(ConsensusError::InvalidNumber {
                parent: parent.number,
                header: header.number,
            });
        }
        if header.time <= parent.time {
            return Err(ConsensusError::InvalidTimestamp {
                parent: parent.time,
                header: header.time,
            });
        }
        if header.extra_data.len() > protocol::MAXIMUM_EXTRA_DATA_SIZE {
            return Err(ConsensusError::ExtraDataTooLong {
                len: header.extra_data.len(),
                max: protocol::MAXIMUM_EXTRA_DATA_SIZE,
            });
        }
        if header.gas_used > header.gas_limit {
            return Err(ConsensusError::GasUsedExceedsLimit {
                used: header.gas_used,
                limit: header.gas_limit,
            });
        }
        let limit_step = parent.gas_limit / protocol::GAS_LIMIT_BOUND_DIVISOR;
        let diff = header.gas_limit.abs_diff(parent.gas_limit);
        if diff >= limit_step || header.gas_limit < protocol::MIN_GAS_LIMIT {
            return Err(ConsensusError::InvalidGasLimit {
                have: header.gas_limit,
                parent: parent.gas_limit,
            });
        }
        let expected = self.calc_difficulty(header.time, parent);
        if header.difficulty != expected {
            return Err(ConsensusError::InvalidDifficulty {
                expected,
                got: header.difficulty,
            });
        }
        if seal {
            self.verify_seal(header)?;
        }
        trace!(number = header.number, hash = %header.hash(), "verified header");
        Ok(())
    }

    /// Verify the proof-of-work seal of a header stamped with its
    /// fork-derived version.
    pub fn verify_seal(&self, header: &Header) -> Result<()> {
        if self.mode == PowMode::Fake {
            return Ok(());
        }
        let version = header.version.as_u8();
        if version == 0 || version > KNOWN_VERSION {
            return Err(ConsensusError::InvalidVersion(version));
        }
        if header.difficulty.is_zero() {
            return Err(ConsensusError::DifficultyZero);
        }
        // mixdigest is outside the seed; forbid malleability past v1
        if header.version >= HeaderVersion::Argon2idA && header.mix_digest != B256::ZERO {
            return Err(ConsensusError::MixDigestNonZero);
        }

        let digest = version_hash(version, &header.pow_seed())
            .map_err(|_| ConsensusError::InvalidVersion(version))?;
        let value = U512::from(U256::from_be_bytes(digest.0));
        let target = (U512::from(1) << 256) / U512::from(header.difficulty);
        if value > target {
            return Err(ConsensusError::PowThresholdExceeded);
        }
        Ok(())
    }

    /// Verify the uncles of a block: at most [`MAX_UNCLES`], each a
    /// valid header whose parent is a canonical-side ancestor within
    /// [`UNCLE_DEPTH_LIMIT`] generations, not an ancestor itself, and
    /// not already included by one.
    pub fn verify_uncles<C: ChainHeaderReader + ?Sized>(
        &self,
        block: &Block,
        chain: &C,
    ) -> Result<()> {
        if block.uncles().is_empty() {
            return Ok(());
        }
        if block.uncles().len() > MAX_UNCLES {
            return Err(ConsensusError::TooManyUncles(block.uncles().len()));
        }

        // gather the ancestor window and every uncle it already includes
        let mut ancestors: HashMap<B256, Header> = HashMap::new();
        let mut included: Vec<B256> = Vec::new();
        let mut parent_hash = block.header.parent_hash;
        let mut number = block.number().saturating_sub(1);
        for _ in 0..UNCLE_DEPTH_LIMIT {
            let Some(ancestor) = chain.block(&parent_hash, number) else {
                break;
            };
            for uncle in ancestor.uncles() {
                included.push(uncle.hash());
            }
            let header = ancestor.header.clone();
            parent_hash = header.parent_hash;
            ancestors.insert(ancestor.hash(), header);
            if number == 0 {
                break;
            }
            number -= 1;
        }

        let mut seen: Vec<B256> = Vec::new();
        for uncle in block.uncles() {
            let uncle = uncle
                .clone()
                .with_version(self.config.get_block_version(uncle.number));
            let hash = uncle.hash();
            if seen.contains(&hash) {
                return Err(ConsensusError::DuplicateUncle(hash));
            }
            seen.push(hash);

            if ancestors.contains_key(&hash) || hash == block.hash() {
                return Err(ConsensusError::UncleIsAncestor(hash));
            }
            if included.contains(&hash) {
                return Err(ConsensusError::UncleAlreadyIncluded(hash));
            }
            let Some(uncle_parent) = ancestors.get(&uncle.parent_hash) else {
                return Err(ConsensusError::DanglingUncle(hash));
            };
            self.verify_header(&uncle, uncle_parent, true)?;
        }
        Ok(())
    }

    /// Finalize a block: credit the block and uncle rewards. The caller
    /// computes and compares the state root afterwards.
    pub fn finalize(&self, state: &mut StateDb, header: &Header, uncles: &[Header]) {
        accumulate_rewards(&self.config, state, header, uncles);
    }
}
