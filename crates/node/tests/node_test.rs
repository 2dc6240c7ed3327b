//! Node assembly: startup, genesis identity, config-compat rewind.

use std::sync::Arc;

use alloy_primitives::{Address, Bytes, U256};
use aquachain_chain::{
    generate::generate_chain, genesis::setup_genesis, Blockchain, CacheConfig, Genesis,
    GenesisAccount,
};
use aquachain_consensus::Aquahash;
use aquachain_crypto::SecretKey;
use aquachain_node::{Node, NodeConfig};
use aquachain_params::{ChainConfig, ForkMap};
use aquachain_state::{ForkMutationRegistry, TransferExecutor};
use aquachain_storage::{rawdb, MemoryKv};
use aquachain_types::{Signer, Transaction};
use rand::rngs::OsRng;

fn chain_config(hf2_at: u64) -> ChainConfig {
    ChainConfig {
        chain_id: 777,
        homestead_block: Some(0),
        eip150_block: Some(0),
        eip155_block: Some(0),
        eip158_block: Some(0),
        byzantium_block: Some(0),
        hf: ForkMap::from([(1, 1), (2, hf2_at)]),
        ..Default::default()
    }
}

fn genesis_with(config: ChainConfig, faucet: Address) -> Genesis {
    let mut genesis = Genesis::new(config);
    genesis.alloc.insert(
        faucet,
        GenesisAccount {
            balance: U256::from(10u128.pow(21)),
            ..Default::default()
        },
    );
    genesis
}

/// Seed a database with a canonical chain of `length` empty blocks.
fn seeded_db(genesis: &Genesis, length: usize) -> Arc<MemoryKv> {
    let db = Arc::new(MemoryKv::new());
    let (config, _) = setup_genesis(db.as_ref(), genesis).unwrap();
    let config = Arc::new(config);
    let engine = Aquahash::fake(config.clone());
    let chain = Blockchain::new(
        db.clone(),
        config.clone(),
        engine.clone(),
        Arc::new(TransferExecutor),
        ForkMutationRegistry::empty(),
        CacheConfig::default(),
    )
    .unwrap();

    let genesis_block = chain.current_block();
    let (blocks, _) = generate_chain(
        &config,
        &genesis_block,
        &engine,
        &TransferExecutor,
        &ForkMutationRegistry::empty(),
        db.as_ref(),
        length,
        |_, _| {},
    );
    chain.insert_chain(blocks).unwrap();
    assert_eq!(chain.current_block().number(), length as u64);
    db
}

#[tokio::test]
async fn test_node_lifecycle_and_local_tx() {
    let key = SecretKey::generate(&mut OsRng);
    let genesis = genesis_with(chain_config(5), key.address());
    let db = Arc::new(MemoryKv::new());

    let mut node = Node::new(db, NodeConfig::new(genesis)).unwrap();
    node.start();

    assert_eq!(node.chain().current_block().number(), 0);

    let tx = Transaction::new(
        0,
        U256::from(1),
        21_000,
        Some(Address::repeat_byte(0x55)),
        U256::from(9),
        Bytes::new(),
    )
    .sign(&Signer::Eip155 { chain_id: 777 }, &key)
    .unwrap();
    node.pool().add_local(tx).unwrap();
    assert_eq!(node.pool().stats().0, 1);

    node.shutdown().await;
}

#[tokio::test]
async fn test_restart_with_same_config_keeps_head() {
    let key = SecretKey::generate(&mut OsRng);
    let genesis = genesis_with(chain_config(5), key.address());
    let db = seeded_db(&genesis, 8);

    let node = Node::new(db, NodeConfig::new(genesis)).unwrap();
    assert_eq!(node.chain().current_block().number(), 8);
    node.shutdown().await;
}

#[tokio::test]
async fn test_incompatible_config_aborts_without_opt_in() {
    let key = SecretKey::generate(&mut OsRng);
    let stored = genesis_with(chain_config(5), key.address());
    let db = seeded_db(&stored, 8);

    // rescheduling HF2 below the head is not applied silently
    let conflicting = genesis_with(chain_config(3), key.address());
    let err = Node::new(db, NodeConfig::new(conflicting)).unwrap_err();
    assert!(err.to_string().contains("genesis setup"));
}

#[tokio::test]
async fn test_incompatible_config_rewinds_when_allowed() {
    let key = SecretKey::generate(&mut OsRng);
    let stored = genesis_with(chain_config(5), key.address());
    let db = seeded_db(&stored, 8);

    let conflicting = genesis_with(chain_config(3), key.address());
    let expected_config = conflicting.config.clone();
    let mut node_config = NodeConfig::new(conflicting);
    node_config.allow_rewind = true;

    let node = Node::new(db.clone(), node_config).unwrap();
    // rewound below the rescheduled fork
    assert_eq!(node.chain().current_block().number(), 2);

    // and the new schedule is now the stored one
    let genesis_hash = rawdb::read_canonical_hash(db.as_ref(), 0).unwrap().unwrap();
    let stored_config = rawdb::read_chain_config(db.as_ref(), &genesis_hash)
        .unwrap()
        .unwrap();
    assert_eq!(stored_config, expected_config);
    node.shutdown().await;
}
