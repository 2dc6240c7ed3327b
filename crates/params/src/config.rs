//! Chain configuration and the scheduled hard fork table.
//!
//! The config is stored in the database keyed by genesis hash, which
//! means any network identified by its genesis block carries its own
//! fork schedule. On restart the stored schedule is compared against
//! the configured one; rewriting a fork the local chain has already
//! passed is a [`ConfigCompatError`] and requires an explicit rewind.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Highest scheduled hard fork known to this build.
pub const KNOWN_HF: u8 = 9;

/// The proof-of-work hash function version carried by a header.
///
/// Never serialized inside the header; always derived from
/// [`ChainConfig::get_block_version`] at the header's number.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(u8)]
pub enum HeaderVersion {
    /// Keccak-256 (launch algorithm).
    Keccak256 = 1,
    /// Argon2id, 1 KiB class (HF5).
    Argon2idA = 2,
    /// Argon2id, 16 KiB class (HF8).
    Argon2idB = 3,
    /// Argon2id, 32 KiB class (HF9).
    Argon2idC = 4,
}

impl HeaderVersion {
    /// The raw version byte.
    pub fn as_u8(self) -> u8 {
        self as u8
    }
}

/// Map of hard fork number to activation block. A missing entry means
/// the fork is not scheduled on this chain.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ForkMap(BTreeMap<u8, u64>);

impl ForkMap {
    /// Build a fork map from `(fork, activation_block)` pairs.
    pub fn new(entries: impl IntoIterator<Item = (u8, u64)>) -> Self {
        Self(entries.into_iter().collect())
    }

    /// Activation block of `fork`, if scheduled.
    pub fn activation(&self, fork: u8) -> Option<u64> {
        self.0.get(&fork).copied()
    }

    /// Whether `fork` is active at `number`.
    pub fn is_active(&self, fork: u8, number: u64) -> bool {
        self.activation(fork).is_some_and(|at| at <= number)
    }

    /// True if no forks are scheduled.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterate scheduled forks in ascending fork order.
    pub fn iter(&self) -> impl Iterator<Item = (u8, u64)> + '_ {
        self.0.iter().map(|(k, v)| (*k, *v))
    }
}

impl<const N: usize> From<[(u8, u64); N]> for ForkMap {
    fn from(entries: [(u8, u64); N]) -> Self {
        Self::new(entries)
    }
}

/// Core blockchain settings for one network.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ChainConfig {
    /// Chain id, bound into EIP-155 signatures for replay protection.
    pub chain_id: u64,

    /// Homestead switch block (None = never).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub homestead_block: Option<u64>,
    /// EIP-150 gas repricing block.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub eip150_block: Option<u64>,
    /// EIP-155 replay protection block.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub eip155_block: Option<u64>,
    /// EIP-158 state clearing block.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub eip158_block: Option<u64>,
    /// Byzantium switch block.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub byzantium_block: Option<u64>,

    /// Scheduled maintenance hard forks.
    #[serde(skip_serializing_if = "ForkMap::is_empty")]
    pub hf: ForkMap,

    /// Default p2p port (tcp and udp) for this network.
    #[serde(skip_serializing_if = "is_zero_port")]
    pub default_port: u16,
    /// Default bootstrap discovery port.
    #[serde(skip_serializing_if = "is_zero_port")]
    pub default_bootstrap_port: u16,
}

fn is_zero_port(p: &u16) -> bool {
    *p == 0
}

impl ChainConfig {
    /// Whether maintenance hard fork `fork` is active at `number`.
    pub fn is_hf(&self, fork: u8, number: u64) -> bool {
        self.hf.is_active(fork, number)
    }

    /// Whether homestead rules apply at `number`.
    pub fn is_homestead(&self, number: u64) -> bool {
        is_forked(self.homestead_block, number)
    }

    /// Whether EIP-155 replay protection applies at `number`.
    pub fn is_eip155(&self, number: u64) -> bool {
        is_forked(self.eip155_block, number)
    }

    /// Whether EIP-158 state clearing applies at `number`.
    pub fn is_eip158(&self, number: u64) -> bool {
        is_forked(self.eip158_block, number)
    }

    /// Whether byzantium rules apply at `number`.
    pub fn is_byzantium(&self, number: u64) -> bool {
        is_forked(self.byzantium_block, number)
    }

    /// The proof-of-work hash version for a header at `number`.
    ///
    /// HF5 moved mining to Argon2id; HF8 and HF9 raise the memory class.
    pub fn get_block_version(&self, number: u64) -> HeaderVersion {
        if self.is_hf(9, number) {
            HeaderVersion::Argon2idC
        } else if self.is_hf(8, number) {
            HeaderVersion::Argon2idB
        } else if self.is_hf(5, number) {
            HeaderVersion::Argon2idA
        } else {
            HeaderVersion::Keccak256
        }
    }

    /// The hash version of the genesis block.
    pub fn genesis_version(&self) -> HeaderVersion {
        self.get_block_version(0)
    }

    /// Check whether scheduled fork transitions already imported under
    /// this (stored) config would be altered by `newcfg`.
    ///
    /// Walks to the lowest conflicting fork so the returned `rewind_to`
    /// is the deepest rewind the caller must perform.
    pub fn check_compatible(
        &self,
        newcfg: &ChainConfig,
        height: u64,
    ) -> Option<ConfigCompatError> {
        let mut head = height;
        let mut last: Option<ConfigCompatError> = None;
        loop {
            let err = self.check_compatible_at(newcfg, head);
            match err {
                None => break,
                Some(err) => {
                    if last.as_ref().is_some_and(|l| l.rewind_to == err.rewind_to) {
                        break;
                    }
                    head = err.rewind_to;
                    last = Some(err);
                }
            }
        }
        last
    }

    fn check_compatible_at(&self, newcfg: &ChainConfig, head: u64) -> Option<ConfigCompatError> {
        for fork in 1..=KNOWN_HF {
            let stored = self.hf.activation(fork);
            let new = newcfg.hf.activation(fork);
            if stored.is_none() && new.is_none() {
                continue;
            }
            if is_fork_incompatible(stored, new, head) {
                return Some(ConfigCompatError::new(
                    format!("HF{fork} block"),
                    stored,
                    new,
                ));
            }
        }
        let checks: [(&str, Option<u64>, Option<u64>); 5] = [
            ("homestead fork block", self.homestead_block, newcfg.homestead_block),
            ("EIP150 fork block", self.eip150_block, newcfg.eip150_block),
            ("EIP155 fork block", self.eip155_block, newcfg.eip155_block),
            ("EIP158 fork block", self.eip158_block, newcfg.eip158_block),
            ("byzantium fork block", self.byzantium_block, newcfg.byzantium_block),
        ];
        for (what, stored, new) in checks {
            if is_fork_incompatible(stored, new, head) {
                return Some(ConfigCompatError::new(what.to_string(), stored, new));
            }
        }
        if self.is_eip158(head) && self.chain_id != newcfg.chain_id {
            return Some(ConfigCompatError::new(
                "EIP158 chain id".to_string(),
                self.eip158_block,
                newcfg.eip158_block,
            ));
        }
        None
    }
}

/// True if a fork scheduled at `s1` cannot be rescheduled to `s2`
/// because the head is already past one of them.
fn is_fork_incompatible(s1: Option<u64>, s2: Option<u64>, head: u64) -> bool {
    (is_forked(s1, head) || is_forked(s2, head)) && s1 != s2
}

fn is_forked(at: Option<u64>, head: u64) -> bool {
    at.is_some_and(|at| at <= head)
}

/// Raised when the locally stored chain was imported under a config
/// that the newly supplied config would alter in the past.
///
/// The caller decides whether to honor `rewind_to` by calling the chain
/// engine's set-head; it is never applied implicitly.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("mismatching {what} in database (have {stored:?}, want {new:?}, rewind to {rewind_to})")]
pub struct ConfigCompatError {
    /// Human-readable name of the conflicting setting.
    pub what: String,
    /// Activation block in the stored config.
    pub stored: Option<u64>,
    /// Activation block in the new config.
    pub new: Option<u64>,
    /// Block number the local chain must rewind to.
    pub rewind_to: u64,
}

impl ConfigCompatError {
    fn new(what: String, stored: Option<u64>, new: Option<u64>) -> Self {
        let rew = match (stored, new) {
            (None, new) => new,
            (Some(s), None) => Some(s),
            (Some(s), Some(n)) => Some(s.min(n)),
        };
        let rewind_to = match rew {
            Some(r) if r > 0 => r - 1,
            _ => 0,
        };
        Self {
            what,
            stored,
            new,
            rewind_to,
        }
    }
}
