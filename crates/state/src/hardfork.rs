//! Hard-fork state mutations.
//!
//! Two maintenance forks rewrite state directly at their activation
//! block: HF4 removes the inherited ethereum genesis allocation, HF5
//! patches a set of balances for the proof-of-work switch. Both are
//! pure functions of the state, kept as data tables so tests can apply
//! them to a fresh state in isolation.

use std::collections::BTreeMap;

use alloy_primitives::{Address, U256};
use aquachain_params::ChainConfig;
use tracing::info;

use crate::statedb::StateDb;

/// The state rewrite applied by one fork.
#[derive(Debug, Clone, Default)]
pub struct ForkMutations {
    /// Accounts deleted outright.
    pub removed_accounts: Vec<Address>,
    /// Balances set to a fixed value.
    pub balance_patches: Vec<(Address, U256)>,
}

impl ForkMutations {
    /// Apply this rewrite to `state`.
    pub fn apply(&self, state: &mut StateDb) {
        for address in &self.removed_accounts {
            state.remove_account(address);
        }
        for (address, balance) in &self.balance_patches {
            state.account_mut(*address).balance = *balance;
        }
    }

    /// True when the rewrite does nothing.
    pub fn is_empty(&self) -> bool {
        self.removed_accounts.is_empty() && self.balance_patches.is_empty()
    }
}

/// Fork number → state rewrite.
#[derive(Debug, Clone, Default)]
pub struct ForkMutationRegistry {
    mutations: BTreeMap<u8, ForkMutations>,
}

impl ForkMutationRegistry {
    /// Registry with no rewrites.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Build from explicit `(fork, mutations)` pairs.
    pub fn new(entries: impl IntoIterator<Item = (u8, ForkMutations)>) -> Self {
        Self {
            mutations: entries.into_iter().collect(),
        }
    }

    /// The rewrite registered for `fork`.
    pub fn for_fork(&self, fork: u8) -> Option<&ForkMutations> {
        self.mutations.get(&fork)
    }

    /// Apply every rewrite whose fork activates exactly at `number`.
    ///
    /// Activation is exact: the rewrite runs once, in the block that
    /// crosses the fork, before transaction execution.
    pub fn apply_at(&self, config: &ChainConfig, number: u64, state: &mut StateDb) {
        for (fork, mutations) in &self.mutations {
            if config.hf.activation(*fork) == Some(number) && !mutations.is_empty() {
                info!(
                    fork = *fork,
                    number,
                    removed = mutations.removed_accounts.len(),
                    patched = mutations.balance_patches.len(),
                    "applying hard fork state mutation"
                );
                mutations.apply(state);
            }
        }
    }
}
