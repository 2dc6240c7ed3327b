//! Block and uncle rewards.
//!
//! Aqua networks pay a flat 1 AQUA per block. Uncles split one further
//! block reward between them and earn the miner a 1/32 nephew bonus
//! each; the aggregate uncle payout is capped at the two-uncle total of
//! 1.0625 AQUA.

use alloy_primitives::U256;
use aquachain_params::{protocol, ChainConfig};
use aquachain_state::StateDb;
use aquachain_types::Header;

/// The base reward for mining a block at `number` under `config`.
pub fn block_reward(config: &ChainConfig, number: u64) -> U256 {
    if config.hf.is_empty() {
        // legacy-eth schedule for chains without maintenance forks
        if config.is_byzantium(number) {
            U256::from(protocol::ETH_BLOCK_REWARD_BYZANTIUM)
        } else {
            U256::from(protocol::ETH_BLOCK_REWARD)
        }
    } else {
        U256::from(protocol::BLOCK_REWARD)
    }
}

/// Aggregate uncle payout (uncle shares plus nephew bonuses) for a
/// block with `uncle_count` uncles, capped at the two-uncle total.
pub fn normal_uncle_reward(uncle_count: usize) -> U256 {
    if uncle_count == 0 {
        return U256::ZERO;
    }
    let reward = U256::from(protocol::BLOCK_REWARD);
    let total = reward + reward / U256::from(32) * U256::from(uncle_count as u64);
    total.min(U256::from(protocol::MAX_UNCLE_REWARD))
}

/// Credit the coinbase of `header` with the block reward plus nephew
/// bonuses, and each uncle coinbase with its share.
pub fn accumulate_rewards(
    config: &ChainConfig,
    state: &mut StateDb,
    header: &Header,
    uncles: &[Header],
) {
    let reward = block_reward(config, header.number);
    let mut miner_reward = reward;

    if !uncles.is_empty() {
        let n = U256::from(uncles.len() as u64);
        let bonus = reward / U256::from(32);
        let bonus_total = bonus * n;

        // one block reward split evenly across the uncles, clamped so
        // the aggregate never exceeds the two-uncle total
        let mut uncle_pool = reward;
        if reward + bonus_total > U256::from(protocol::MAX_UNCLE_REWARD) {
            uncle_pool = U256::from(protocol::MAX_UNCLE_REWARD).saturating_sub(bonus_total);
        }
        let per_uncle = uncle_pool / n;
        for uncle in uncles {
            state.add_balance(uncle.coinbase, per_uncle);
        }
        miner_reward += bonus_total;
    }

    state.add_balance(header.coinbase, miner_reward);
}
