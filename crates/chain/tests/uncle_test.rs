//! Uncle inclusion: validation window, rewards, limits.

mod common;

use std::sync::Arc;

use alloy_primitives::{Address, U256};
use aquachain_chain::{generate::generate_chain, ChainError};
use aquachain_consensus::ConsensusError;
use aquachain_params::protocol::BLOCK_REWARD;
use aquachain_state::{ForkMutationRegistry, TransferExecutor};
use common::test_chain;

#[test]
fn test_uncle_inclusion_pays_rewards() {
    let fixture = test_chain(Arc::new(TransferExecutor));
    let config = fixture.config.as_ref();
    let uncle_miner = Address::repeat_byte(0x0c);
    let miner = Address::repeat_byte(0x0d);

    // a sibling of block 1, mined by someone else
    let (uncle_branch, _) = generate_chain(
        config,
        &fixture.genesis,
        &fixture.engine,
        &TransferExecutor,
        &ForkMutationRegistry::empty(),
        fixture.db.as_ref(),
        1,
        |_, gen| gen.set_coinbase(uncle_miner),
    );
    let uncle = uncle_branch[0].header.clone();

    // the canonical chain includes it as an uncle in block 2
    let (blocks, _) = generate_chain(
        config,
        &fixture.genesis,
        &fixture.engine,
        &TransferExecutor,
        &ForkMutationRegistry::empty(),
        fixture.db.as_ref(),
        3,
        |i, gen| {
            gen.set_coinbase(miner);
            if i == 1 {
                gen.add_uncle(uncle.clone());
            }
        },
    );
    fixture.chain.insert_chain(blocks).unwrap();
    assert_eq!(fixture.chain.current_block().number(), 3);

    let state = fixture.chain.state().unwrap();
    let reward = U256::from(BLOCK_REWARD);
    // the uncle miner gets a full block reward (single uncle split)
    assert_eq!(state.balance(&uncle_miner), reward);
    // the miner gets three block rewards plus one nephew bonus
    assert_eq!(
        state.balance(&miner),
        reward * U256::from(3u64) + reward / U256::from(32u64)
    );
}

#[test]
fn test_too_many_uncles_rejected() {
    let fixture = test_chain(Arc::new(TransferExecutor));
    let config = fixture.config.as_ref();

    // three siblings of block 1
    let mut uncles = Vec::new();
    for byte in [0x01u8, 0x02, 0x03] {
        let (branch, _) = generate_chain(
            config,
            &fixture.genesis,
            &fixture.engine,
            &TransferExecutor,
            &ForkMutationRegistry::empty(),
            fixture.db.as_ref(),
            1,
            |_, gen| gen.set_coinbase(Address::repeat_byte(byte)),
        );
        uncles.push(branch[0].header.clone());
    }

    let (blocks, _) = generate_chain(
        config,
        &fixture.genesis,
        &fixture.engine,
        &TransferExecutor,
        &ForkMutationRegistry::empty(),
        fixture.db.as_ref(),
        2,
        |i, gen| {
            if i == 1 {
                for uncle in &uncles {
                    gen.add_uncle(uncle.clone());
                }
            }
        },
    );
    let err = fixture.chain.insert_chain(blocks).unwrap_err();
    assert!(matches!(
        err,
        ChainError::Consensus(ConsensusError::TooManyUncles(3))
    ));
}

#[test]
fn test_duplicate_uncle_rejected() {
    let fixture = test_chain(Arc::new(TransferExecutor));
    let config = fixture.config.as_ref();

    let (branch, _) = generate_chain(
        config,
        &fixture.genesis,
        &fixture.engine,
        &TransferExecutor,
        &ForkMutationRegistry::empty(),
        fixture.db.as_ref(),
        1,
        |_, gen| gen.set_coinbase(Address::repeat_byte(0x0e)),
    );
    let uncle = branch[0].header.clone();

    let (blocks, _) = generate_chain(
        config,
        &fixture.genesis,
        &fixture.engine,
        &TransferExecutor,
        &ForkMutationRegistry::empty(),
        fixture.db.as_ref(),
        2,
        |i, gen| {
            if i == 1 {
                gen.add_uncle(uncle.clone());
                gen.add_uncle(uncle.clone());
            }
        },
    );
    let err = fixture.chain.insert_chain(blocks).unwrap_err();
    assert!(matches!(
        err,
        ChainError::Consensus(ConsensusError::DuplicateUncle(_))
    ));
}

#[test]
fn test_ancestor_as_uncle_rejected() {
    let fixture = test_chain(Arc::new(TransferExecutor));
    let config = fixture.config.as_ref();

    let (blocks, _) = generate_chain(
        config,
        &fixture.genesis,
        &fixture.engine,
        &TransferExecutor,
        &ForkMutationRegistry::empty(),
        fixture.db.as_ref(),
        3,
        |_, _| {},
    );
    let ancestor = blocks[0].header.clone();

    let (extension, _) = generate_chain(
        config,
        &blocks[2],
        &fixture.engine,
        &TransferExecutor,
        &ForkMutationRegistry::empty(),
        fixture.db.as_ref(),
        1,
        |_, gen| gen.add_uncle(ancestor.clone()),
    );
    fixture.chain.insert_chain(blocks).unwrap();
    let err = fixture.chain.insert_chain(extension).unwrap_err();
    assert!(matches!(
        err,
        ChainError::Consensus(ConsensusError::UncleIsAncestor(_))
    ));
}
