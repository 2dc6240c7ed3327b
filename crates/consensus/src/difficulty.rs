//! Difficulty retargeting across the hard fork schedule.
//!
//! The chain launched with the homestead-style algorithm, switched to a
//! simple up/down rule at HF2, and then retuned the bound divisor and
//! minimum floor at several later forks. Forks that replace the
//! proof-of-work function (HF5, HF8, HF9) restart difficulty from the
//! new function's floor at their activation block; the difficulty
//! reached under the previous hash function carries no meaning for the
//! new one.

use alloy_primitives::U256;
use aquachain_params::{protocol, ChainConfig};
use aquachain_types::Header;

/// The difficulty required of a block at `parent.number + 1` with
/// timestamp `time`.
pub fn calc_difficulty(config: &ChainConfig, time: u64, parent: &Header) -> U256 {
    let next = parent.number + 1;

    for fork in [9u8, 8, 5] {
        if config.hf.activation(fork) == Some(next) {
            return U256::from(pow_switch_minimum(fork));
        }
    }

    if config.is_hf(9, next) {
        calc_simple(
            time,
            parent,
            protocol::DURATION_LIMIT_HF6,
            protocol::DIFFICULTY_BOUND_DIVISOR,
            protocol::MINIMUM_DIFFICULTY_HF8,
        )
    } else if config.is_hf(8, next) {
        calc_simple(
            time,
            parent,
            protocol::DURATION_LIMIT_HF6,
            protocol::DIFFICULTY_BOUND_DIVISOR_HF8,
            protocol::MINIMUM_DIFFICULTY_HF8,
        )
    } else if config.is_hf(6, next) {
        calc_simple(
            time,
            parent,
            protocol::DURATION_LIMIT_HF6,
            protocol::DIFFICULTY_BOUND_DIVISOR_HF6,
            protocol::MINIMUM_DIFFICULTY_HF5,
        )
    } else if config.is_hf(5, next) {
        calc_simple(
            time,
            parent,
            protocol::DURATION_LIMIT,
            protocol::DIFFICULTY_BOUND_DIVISOR_HF5,
            protocol::MINIMUM_DIFFICULTY_HF5,
        )
    } else if config.is_hf(3, next) {
        calc_simple(
            time,
            parent,
            protocol::DURATION_LIMIT,
            protocol::DIFFICULTY_BOUND_DIVISOR,
            protocol::MINIMUM_DIFFICULTY_HF3,
        )
    } else if config.is_hf(2, next) {
        calc_simple(
            time,
            parent,
            protocol::DURATION_LIMIT,
            protocol::DIFFICULTY_BOUND_DIVISOR,
            protocol::MINIMUM_DIFFICULTY_HF1,
        )
    } else if config.is_hf(1, next) {
        calc_homestead(time, parent, protocol::MINIMUM_DIFFICULTY_HF1)
    } else {
        calc_homestead(time, parent, protocol::MINIMUM_DIFFICULTY_GENESIS)
    }
}

fn pow_switch_minimum(fork: u8) -> u64 {
    match fork {
        5 => protocol::MINIMUM_DIFFICULTY_HF5,
        _ => protocol::MINIMUM_DIFFICULTY_HF8,
    }
}

/// The simple retargeting rule active since HF2: move by
/// `parent / divisor`, up when the block came faster than
/// `duration_limit`, down otherwise, floored at `minimum`.
fn calc_simple(time: u64, parent: &Header, duration_limit: u64, divisor: u64, minimum: u64) -> U256 {
    let adjust = parent.difficulty / U256::from(divisor);
    let elapsed = time.saturating_sub(parent.time);
    let diff = if elapsed < duration_limit {
        parent.difficulty.saturating_add(adjust)
    } else {
        parent.difficulty.saturating_sub(adjust)
    };
    diff.max(U256::from(minimum))
}

/// The launch-era homestead rule:
/// `parent + parent/2048 * max(1 - elapsed/10, -99)`, floored.
fn calc_homestead(time: u64, parent: &Header, minimum: u64) -> U256 {
    let adjust = parent.difficulty / U256::from(protocol::DIFFICULTY_BOUND_DIVISOR);
    let elapsed = time.saturating_sub(parent.time);
    let x = (elapsed / 10) as i64;
    let sign = (1 - x).max(-99);
    let diff = if sign >= 0 {
        parent
            .difficulty
            .saturating_add(adjust * U256::from(sign as u64))
    } else {
        parent
            .difficulty
            .saturating_sub(adjust * U256::from((-sign) as u64))
    };
    diff.max(U256::from(minimum))
}

#[cfg(test)]
mod tests {
    use super::*;
    use aquachain_params::protocol::{DURATION_LIMIT_HF6, MINIMUM_DIFFICULTY_HF5};
    use aquachain_params::{dev, testnet, ChainConfig, ForkMap};

    fn parent(number: u64, time: u64, difficulty: u64) -> Header {
        Header {
            number,
            time,
            difficulty: U256::from(difficulty),
            ..Default::default()
        }
    }

    struct DiffTest {
        parent_timestamp: u64,
        parent_difficulty: u64,
        current_timestamp: u64,
        current_blocknumber: u64,
        current_difficulty: u64,
    }

    // the historical retargeting vectors under the all-forks config
    #[test]
    fn test_calc_difficulty_vectors() {
        let tests = [
            ("below-min", DiffTest {
                parent_timestamp: 0,
                parent_difficulty: 131_072,
                current_timestamp: 240,
                current_blocknumber: 1,
                current_difficulty: MINIMUM_DIFFICULTY_HF5,
            }),
            ("below-min-2", DiffTest {
                parent_timestamp: 0,
                parent_difficulty: 131_072,
                current_timestamp: 240,
                current_blocknumber: 2,
                current_difficulty: MINIMUM_DIFFICULTY_HF5,
            }),
            ("go up", DiffTest {
                parent_timestamp: 0,
                parent_difficulty: 46_039_386,
                current_timestamp: DURATION_LIMIT_HF6 - 1,
                current_blocknumber: 1,
                current_difficulty: 46_399_068,
            }),
            ("go up again", DiffTest {
                parent_timestamp: 0,
                parent_difficulty: 46_399_068,
                current_timestamp: DURATION_LIMIT_HF6 - 1,
                current_blocknumber: 1,
                current_difficulty: 46_761_560,
            }),
            ("stay same", DiffTest {
                parent_timestamp: 0,
                parent_difficulty: 46_039_386,
                current_timestamp: DURATION_LIMIT_HF6 + 1,
                current_blocknumber: 1,
                current_difficulty: 46_039_386,
            }),
            ("go down ok", DiffTest {
                parent_timestamp: 0,
                parent_difficulty: 46_761_560,
                current_timestamp: DURATION_LIMIT_HF6 + 1,
                current_blocknumber: 1,
                current_difficulty: 46_396_236,
            }),
        ];
        let config = dev();
        for (name, test) in tests {
            let parent = parent(
                test.current_blocknumber - 1,
                test.parent_timestamp,
                test.parent_difficulty,
            );
            let diff = calc_difficulty(config, test.current_timestamp, &parent);
            assert_eq!(
                diff,
                U256::from(test.current_difficulty),
                "vector {name} failed"
            );
        }
    }

    #[test]
    fn test_hf5_boundary_fast_block() {
        // HF5 rules alone: divisor 16, duration limit 240
        let config = ChainConfig {
            chain_id: 1,
            hf: ForkMap::from([(1, 0), (2, 0), (3, 0), (4, 0), (5, 0)]),
            ..Default::default()
        };
        let p = parent(0, 0, 46_039_386);
        let diff = calc_difficulty(&config, 120, &p);
        assert_eq!(diff, U256::from(46_039_386u64 + 2_877_461));
        assert_eq!(diff, U256::from(48_916_847u64));
        assert!(diff >= U256::from(MINIMUM_DIFFICULTY_HF5));
    }

    #[test]
    fn test_pow_switch_jumps_to_floor() {
        // testnet activates HF8 at 650; the inherited argon2id-A
        // difficulty resets to the HF8 floor at the boundary
        let config = testnet();
        let p = parent(649, 1000, 999_999_999);
        assert_eq!(
            calc_difficulty(config, 1001, &p),
            U256::from(protocol::MINIMUM_DIFFICULTY_HF8)
        );
    }

    #[test]
    fn test_bounded_step() {
        // |child - parent| <= parent / divisor under the simple rule
        let config = dev();
        let p = parent(100, 0, 50_000_000);
        for time in [1u64, 100, 179, 180, 500, 10_000] {
            let diff = calc_difficulty(config, time, &p);
            let step = U256::from(50_000_000u64 / 128);
            let lo = U256::from(50_000_000u64) - step;
            let hi = U256::from(50_000_000u64) + step;
            assert!(diff >= lo && diff <= hi, "time {time} diff {diff}");
        }
    }

    #[test]
    fn test_result_always_positive_and_floored() {
        let config = dev();
        let p = parent(5, 0, 1);
        let diff = calc_difficulty(config, 100_000, &p);
        assert_eq!(diff, U256::from(MINIMUM_DIFFICULTY_HF5));
        assert!(diff > U256::ZERO);
    }

    #[test]
    fn test_homestead_era_pre_forks() {
        // no forks scheduled: launch-era homestead rule with genesis floor
        let config = ChainConfig {
            chain_id: 1,
            homestead_block: Some(0),
            ..Default::default()
        };
        let p = parent(0, 0, 200_000_000);
        // fast block: up by parent/2048
        let up = calc_difficulty(&config, 5, &p);
        assert_eq!(up, U256::from(200_000_000u64 + 200_000_000 / 2048));
        // slow block: down, clamped at the genesis minimum
        let down = calc_difficulty(&config, 2000, &p);
        assert!(down >= U256::from(protocol::MINIMUM_DIFFICULTY_GENESIS));
        assert!(down < U256::from(200_000_000u64));
    }
}
