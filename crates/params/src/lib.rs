//! Chain configuration and protocol constants for Aquachain.
//!
//! A [`ChainConfig`] pins a network's identity (chain id, genesis hash)
//! and its scheduled hard forks. Consensus code never hard-codes fork
//! behavior; it asks the config which rules are active at a block number
//! and which proof-of-work hash version headers carry there.

pub mod chains;
pub mod config;
pub mod protocol;

pub use chains::{
    all_chain_configs, dev, get_chain_config, get_chain_config_by_chain_id,
    known_genesis_config, mainnet, test_config, testnet, testnet2, testnet3,
    MAINNET_GENESIS_HASH, TESTNET2_GENESIS_HASH, TESTNET3_GENESIS_HASH, TESTNET_GENESIS_HASH,
};
pub use config::{ChainConfig, ConfigCompatError, ForkMap, HeaderVersion, KNOWN_HF};
