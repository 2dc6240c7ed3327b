//! Protocol constants: rewards, difficulty bounds, gas rules.

/// Block reward in wei on aqua networks (1 AQUA).
pub const BLOCK_REWARD: u128 = 1_000_000_000_000_000_000;
/// Legacy-eth era block reward in wei (5 coins, pre-byzantium).
pub const ETH_BLOCK_REWARD: u128 = 5_000_000_000_000_000_000;
/// Legacy-eth era block reward in wei (3 coins, byzantium).
pub const ETH_BLOCK_REWARD_BYZANTIUM: u128 = 3_000_000_000_000_000_000;

/// Aggregate payout cap for a block's uncles including the nephew
/// bonus: the exact two-uncle total of 1.0625 AQUA.
pub const MAX_UNCLE_REWARD: u128 = 1_062_500_000_000_000_000;

/// Bound divisor of the gas limit, used in update calculations.
pub const GAS_LIMIT_BOUND_DIVISOR: u64 = 1024;
/// Minimum the gas limit may ever be.
pub const MIN_GAS_LIMIT: u64 = 5000;
/// Gas limit of the genesis block.
pub const GENESIS_GAS_LIMIT: u64 = 4_712_388;

/// Maximum size extra data may be after genesis.
pub const MAXIMUM_EXTRA_DATA_SIZE: usize = 32;

/// Per transaction not creating a contract.
pub const TX_GAS: u64 = 21_000;
/// Per transaction that creates a contract.
pub const TX_GAS_CONTRACT_CREATION: u64 = 53_000;
/// Per byte of transaction data that equals zero.
pub const TX_DATA_ZERO_GAS: u64 = 4;
/// Per byte of transaction data that is not zero.
pub const TX_DATA_NON_ZERO_GAS: u64 = 68;

/// Difficulty of the genesis block.
pub const GENESIS_DIFFICULTY: u64 = 99_999_999;
/// Minimum difficulty before any hard fork.
pub const MINIMUM_DIFFICULTY_GENESIS: u64 = 99_999_999;
/// HF1 minimum: the genesis minimum raised to the next multiple of 2048.
pub const MINIMUM_DIFFICULTY_HF1: u64 = 100_001_792;
/// HF3 minimum, raised in anticipation of gpu mining.
pub const MINIMUM_DIFFICULTY_HF3: u64 = 30_959_185_800;
/// HF5 minimum, reset for the switch to Argon2id.
pub const MINIMUM_DIFFICULTY_HF5: u64 = 46_039_386;
/// HF8 minimum, re-evaluated for the 16 KiB Argon2id class.
pub const MINIMUM_DIFFICULTY_HF8: u64 = 46_039_386;

/// Difficulty bound divisor at launch and again from HF9.
pub const DIFFICULTY_BOUND_DIVISOR: u64 = 2048;
/// Bound divisor from HF5.
pub const DIFFICULTY_BOUND_DIVISOR_HF5: u64 = 16;
/// Bound divisor from HF6.
pub const DIFFICULTY_BOUND_DIVISOR_HF6: u64 = 128;
/// Bound divisor from HF8.
pub const DIFFICULTY_BOUND_DIVISOR_HF8: u64 = 1024;

/// Block-time decision boundary for the difficulty direction.
pub const DURATION_LIMIT: u64 = 240;
/// HF6 lowers the boundary while keeping the 240 second target.
pub const DURATION_LIMIT_HF6: u64 = 180;

/// Number of blocks in one bloom-bits index section.
pub const BLOOM_BITS_BLOCKS: u64 = 4096;
