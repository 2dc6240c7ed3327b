//! Full block import: execution, rewards, root checks and queries.

mod common;

use std::sync::Arc;

use alloy_primitives::{Address, U256};
use aquachain_chain::{generate::generate_chain, ChainError};
use aquachain_params::protocol::BLOCK_REWARD;
use aquachain_state::{ForkMutationRegistry, TransferExecutor};
use common::{test_chain, transfer};

#[test]
fn test_import_chain_and_query_roundtrip() {
    let fixture = test_chain(Arc::new(TransferExecutor));
    let config = fixture.config.as_ref();
    let recipient = Address::repeat_byte(0x99);

    let (blocks, _) = generate_chain(
        config,
        &fixture.genesis,
        &fixture.engine,
        &TransferExecutor,
        &ForkMutationRegistry::empty(),
        fixture.db.as_ref(),
        6,
        |i, gen| {
            if i % 2 == 0 {
                let tx = transfer(
                    &fixture.key,
                    config,
                    gen.tx_nonce(&fixture.key.address()),
                    recipient,
                    1_000,
                );
                gen.add_tx(tx);
            }
        },
    );

    let imported = fixture.chain.insert_chain(blocks.clone()).unwrap();
    assert_eq!(imported, 6);

    let head = fixture.chain.current_block();
    assert_eq!(head.number(), 6);
    assert_eq!(head.hash(), blocks[5].hash());

    // imported blocks come back identical by hash and by number
    for block in &blocks {
        let by_hash = fixture
            .chain
            .block_by_hash(&block.hash())
            .unwrap()
            .expect("block by hash");
        assert_eq!(&by_hash, block);
        let by_number = fixture
            .chain
            .block_by_number(block.number())
            .unwrap()
            .expect("block by number");
        assert_eq!(&by_number, block);
    }

    // three transfers landed
    let state = fixture.chain.state().unwrap();
    assert_eq!(state.balance(&recipient), U256::from(3_000));
    assert_eq!(state.nonce(&fixture.key.address()), 3);
}

#[test]
fn test_total_difficulty_accumulates() {
    let fixture = test_chain(Arc::new(TransferExecutor));
    let (blocks, _) = generate_chain(
        fixture.config.as_ref(),
        &fixture.genesis,
        &fixture.engine,
        &TransferExecutor,
        &ForkMutationRegistry::empty(),
        fixture.db.as_ref(),
        3,
        |_, _| {},
    );
    fixture.chain.insert_chain(blocks.clone()).unwrap();

    let mut expected = fixture.genesis.header.difficulty;
    for block in &blocks {
        expected += block.header.difficulty;
        let td = fixture
            .chain
            .total_difficulty(&block.hash())
            .unwrap()
            .expect("td stored");
        assert_eq!(td, expected);
    }
    assert_eq!(fixture.chain.current_td(), expected);
}

#[test]
fn test_reimport_is_idempotent() {
    let fixture = test_chain(Arc::new(TransferExecutor));
    let (blocks, _) = generate_chain(
        fixture.config.as_ref(),
        &fixture.genesis,
        &fixture.engine,
        &TransferExecutor,
        &ForkMutationRegistry::empty(),
        fixture.db.as_ref(),
        3,
        |_, _| {},
    );
    fixture.chain.insert_chain(blocks.clone()).unwrap();
    let head = fixture.chain.current_block().hash();

    fixture.chain.insert_chain(blocks).unwrap();
    assert_eq!(fixture.chain.current_block().hash(), head);
}

#[test]
fn test_miner_receives_block_reward() {
    let fixture = test_chain(Arc::new(TransferExecutor));
    let miner = Address::repeat_byte(0xb0);
    let (blocks, _) = generate_chain(
        fixture.config.as_ref(),
        &fixture.genesis,
        &fixture.engine,
        &TransferExecutor,
        &ForkMutationRegistry::empty(),
        fixture.db.as_ref(),
        2,
        |_, gen| gen.set_coinbase(miner),
    );
    fixture.chain.insert_chain(blocks).unwrap();

    let state = fixture.chain.state().unwrap();
    assert_eq!(
        state.balance(&miner),
        U256::from(BLOCK_REWARD) * U256::from(2u64)
    );
}

#[test]
fn test_unknown_parent_rejected() {
    let fixture = test_chain(Arc::new(TransferExecutor));
    let (mut blocks, _) = generate_chain(
        fixture.config.as_ref(),
        &fixture.genesis,
        &fixture.engine,
        &TransferExecutor,
        &ForkMutationRegistry::empty(),
        fixture.db.as_ref(),
        3,
        |_, _| {},
    );
    // drop the first block; the second now has no known parent
    blocks.remove(0);
    let err = fixture.chain.insert_chain(blocks).unwrap_err();
    assert!(matches!(err, ChainError::UnknownParent { .. }));
}

#[test]
fn test_tampered_state_root_rejected() {
    let fixture = test_chain(Arc::new(TransferExecutor));
    let (mut blocks, _) = generate_chain(
        fixture.config.as_ref(),
        &fixture.genesis,
        &fixture.engine,
        &TransferExecutor,
        &ForkMutationRegistry::empty(),
        fixture.db.as_ref(),
        1,
        |_, _| {},
    );
    blocks[0].header.state_root = alloy_primitives::B256::repeat_byte(0xde);
    let err = fixture.chain.insert_chain(blocks).unwrap_err();
    assert!(matches!(err, ChainError::StateRootMismatch { .. }));
    assert!(err.is_consensus());
}

#[test]
fn test_tampered_gas_used_rejected() {
    let fixture = test_chain(Arc::new(TransferExecutor));
    let config = fixture.config.clone();
    let (mut blocks, _) = generate_chain(
        config.as_ref(),
        &fixture.genesis,
        &fixture.engine,
        &TransferExecutor,
        &ForkMutationRegistry::empty(),
        fixture.db.as_ref(),
        1,
        |_, gen| {
            let tx = transfer(
                &fixture.key,
                config.as_ref(),
                0,
                Address::repeat_byte(0x01),
                1,
            );
            gen.add_tx(tx);
        },
    );
    blocks[0].header.gas_used += 1;
    let err = fixture.chain.insert_chain(blocks).unwrap_err();
    assert!(matches!(err, ChainError::GasUsedMismatch { .. }));
}

#[test]
fn test_insert_header_chain_stores_headers() {
    let fixture = test_chain(Arc::new(TransferExecutor));
    let (blocks, _) = generate_chain(
        fixture.config.as_ref(),
        &fixture.genesis,
        &fixture.engine,
        &TransferExecutor,
        &ForkMutationRegistry::empty(),
        fixture.db.as_ref(),
        4,
        |_, _| {},
    );
    let headers: Vec<_> = blocks.iter().map(|b| b.header.clone()).collect();

    let imported = fixture.chain.insert_header_chain(&headers).unwrap();
    assert_eq!(imported, 4);

    // headers are retrievable but not canonical
    for block in &blocks {
        assert!(fixture
            .chain
            .header_by_hash(&block.hash())
            .unwrap()
            .is_some());
        assert!(fixture
            .chain
            .block_by_number(block.number())
            .unwrap()
            .is_none());
    }
    assert_eq!(fixture.chain.current_block().number(), 0);
}
