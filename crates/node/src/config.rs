//! Node configuration.

use aquachain_chain::Genesis;
use aquachain_state::ForkMutationRegistry;
use aquachain_txpool::TxPoolConfig;

/// Everything needed to assemble a node.
#[derive(Debug)]
pub struct NodeConfig {
    /// The genesis spec defining the chain to run.
    pub genesis: Genesis,
    /// Keep all historical state instead of pruning.
    pub archive: bool,
    /// Honor a config-compatibility rewind automatically. When false,
    /// an incompatible stored config aborts startup and the operator
    /// must opt in.
    pub allow_rewind: bool,
    /// Hard-fork state mutation tables.
    pub mutations: ForkMutationRegistry,
    /// Transaction pool settings.
    pub txpool: TxPoolConfig,
}

impl NodeConfig {
    /// Config for the given genesis with defaults everywhere else.
    pub fn new(genesis: Genesis) -> Self {
        Self {
            genesis,
            archive: false,
            allow_rewind: false,
            mutations: ForkMutationRegistry::empty(),
            txpool: TxPoolConfig::default(),
        }
    }
}
