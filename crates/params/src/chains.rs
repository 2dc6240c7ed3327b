//! Built-in network presets.

use alloy_primitives::{b256, B256};
use once_cell::sync::Lazy;

use crate::config::{ChainConfig, ForkMap};

/// Mainnet genesis hash, used to enforce the mainnet config on it.
pub const MAINNET_GENESIS_HASH: B256 =
    b256!("381c8d2c3e3bc702533ee504d7621d510339cafd830028337a4b532ff27cd505");
/// Testnet genesis hash.
pub const TESTNET_GENESIS_HASH: B256 =
    b256!("a8773cb7d32b8f7e1b32b0c2c8b735c293b8936dd3760c15afc291a23eb0cf88");
/// Testnet2 genesis hash.
pub const TESTNET2_GENESIS_HASH: B256 =
    b256!("de434983d3ada19cd43c44d8ad5511bad01ed12b3cc9a99b1717449a245120df");
/// Testnet3 genesis hash.
pub const TESTNET3_GENESIS_HASH: B256 =
    b256!("05c1df1f60eedd42bdf3f002bedc4688c5bf0443771d1d30341bc5e4fe76bce8");

static MAINNET: Lazy<ChainConfig> = Lazy::new(|| ChainConfig {
    chain_id: 61_717_561,
    homestead_block: Some(0),
    eip150_block: Some(0),
    eip155_block: Some(36_050),
    eip158_block: Some(36_050),
    byzantium_block: Some(36_050),
    hf: ForkMap::from([
        (1, 3600),   // raise min difficulty to the next multiple of 2048
        (2, 7200),   // simple difficulty algo (240 second target)
        (3, 13_026), // gpu-era minimum difficulty
        (4, 21_800), // remove the ethereum genesis allocation
        (5, 22_800), // argon2id proof of work
        (6, 36_000), // divisor increase
        (7, 36_050), // EIP 155, 158
    ]),
    default_port: 21_303,
    default_bootstrap_port: 21_000,
});

static TESTNET: Lazy<ChainConfig> = Lazy::new(|| ChainConfig {
    chain_id: 617_175_611,
    homestead_block: Some(0),
    eip150_block: Some(0),
    eip155_block: Some(25),
    eip158_block: Some(25),
    byzantium_block: Some(25),
    hf: ForkMap::from([
        (1, 1),
        (2, 2),
        (3, 3),
        (4, 4),
        (5, 5),
        (6, 6),
        (7, 25),
        (8, 650),
    ]),
    default_port: 21_304,
    default_bootstrap_port: 21_001,
});

static TESTNET2: Lazy<ChainConfig> = Lazy::new(|| ChainConfig {
    chain_id: 617_175_612,
    homestead_block: Some(0),
    eip150_block: Some(0),
    eip155_block: Some(0),
    eip158_block: Some(0),
    byzantium_block: Some(0),
    hf: ForkMap::from([(5, 0), (6, 0), (7, 0), (8, 8), (9, 19)]),
    default_port: 21_305,
    default_bootstrap_port: 21_002,
});

static TESTNET3: Lazy<ChainConfig> = Lazy::new(|| ChainConfig {
    chain_id: 617_175_613,
    homestead_block: Some(0),
    eip150_block: Some(0),
    eip155_block: Some(0),
    eip158_block: Some(0),
    byzantium_block: Some(0),
    hf: ForkMap::from([(5, 0), (7, 0)]),
    default_port: 21_306,
    default_bootstrap_port: 21_003,
});

/// Every protocol change active from genesis; for development nodes.
static DEV: Lazy<ChainConfig> = Lazy::new(|| ChainConfig {
    chain_id: 1337,
    homestead_block: Some(0),
    eip150_block: Some(0),
    eip155_block: Some(0),
    eip158_block: Some(0),
    byzantium_block: Some(0),
    hf: ForkMap::from([(1, 0), (2, 0), (3, 0), (4, 0), (5, 0), (6, 0), (7, 0)]),
    default_port: 21_398,
    default_bootstrap_port: 21_099,
});

/// Config for the testing suite: forks activate one block apart.
static TEST: Lazy<ChainConfig> = Lazy::new(|| ChainConfig {
    chain_id: 3,
    homestead_block: Some(0),
    eip150_block: Some(0),
    eip155_block: Some(0),
    eip158_block: Some(0),
    byzantium_block: Some(0),
    hf: ForkMap::from([(1, 1), (2, 2), (3, 3), (4, 4), (5, 5), (6, 6), (7, 7)]),
    default_port: 21_397,
    default_bootstrap_port: 21_097,
});

/// The mainnet chain parameters.
pub fn mainnet() -> &'static ChainConfig {
    &MAINNET
}

/// The public testnet chain parameters.
pub fn testnet() -> &'static ChainConfig {
    &TESTNET
}

/// The testnet2 private network parameters.
pub fn testnet2() -> &'static ChainConfig {
    &TESTNET2
}

/// The testnet3 private network parameters.
pub fn testnet3() -> &'static ChainConfig {
    &TESTNET3
}

/// All-forks-active development config.
pub fn dev() -> &'static ChainConfig {
    &DEV
}

/// Config used by the testing suite.
pub fn test_config() -> &'static ChainConfig {
    &TEST
}

/// Look up a built-in config by chain name.
pub fn get_chain_config(name: &str) -> Option<&'static ChainConfig> {
    match name {
        "aqua" | "mainnet" | "aquachain" => Some(mainnet()),
        "testnet" => Some(testnet()),
        "testnet2" => Some(testnet2()),
        "testnet3" => Some(testnet3()),
        "dev" => Some(dev()),
        "test" => Some(test_config()),
        _ => None,
    }
}

/// Look up a built-in config by chain id.
pub fn get_chain_config_by_chain_id(chain_id: u64) -> Option<&'static ChainConfig> {
    all_chain_configs()
        .iter()
        .find(|cfg| cfg.chain_id == chain_id)
        .copied()
}

/// Look up the config enforced for a known genesis hash.
pub fn known_genesis_config(genesis: &B256) -> Option<&'static ChainConfig> {
    match *genesis {
        MAINNET_GENESIS_HASH => Some(mainnet()),
        TESTNET_GENESIS_HASH => Some(testnet()),
        TESTNET2_GENESIS_HASH => Some(testnet2()),
        TESTNET3_GENESIS_HASH => Some(testnet3()),
        _ => None,
    }
}

/// Every built-in chain config.
pub fn all_chain_configs() -> &'static [&'static ChainConfig] {
    static ALL: Lazy<Vec<&'static ChainConfig>> = Lazy::new(|| {
        vec![
            mainnet(),
            testnet(),
            testnet2(),
            testnet3(),
            dev(),
            test_config(),
        ]
    });
    &ALL
}
