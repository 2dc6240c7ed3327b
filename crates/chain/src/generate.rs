//! Deterministic chain construction for tests and tooling.
//!
//! [`generate_chain`] builds `n` blocks on top of a parent, executing
//! any transactions added by the per-block closure and finalizing
//! rewards exactly like the import pipeline, so the produced blocks
//! re-import cleanly. Generated blocks carry no valid proof of work;
//! inserting them requires the fake-seal engine.

use alloy_primitives::{Address, Bytes, U256};
use aquachain_consensus::Aquahash;
use aquachain_params::ChainConfig;
use aquachain_state::{Executor, ForkMutationRegistry, StateDb};
use aquachain_storage::KeyValue;
use aquachain_types::trie::derive_root;
use aquachain_types::{create_bloom, Block, Body, Header, Receipt, Transaction};

/// Builder for one block under construction.
pub struct BlockGen<'a> {
    index: usize,
    parent: &'a Block,
    header: Header,
    state: &'a mut StateDb,
    config: &'a ChainConfig,
    engine: &'a Aquahash,
    executor: &'a dyn Executor,
    gas_pool: u64,
    gas_used: u64,
    txs: Vec<Transaction>,
    receipts: Vec<Receipt>,
    uncles: Vec<Header>,
}

impl<'a> BlockGen<'a> {
    /// Number of the block being generated.
    pub fn number(&self) -> u64 {
        self.header.number
    }

    /// Index of the block within the generated batch.
    pub fn index(&self) -> usize {
        self.index
    }

    /// Set the coinbase. Must happen before any transaction is added.
    pub fn set_coinbase(&mut self, address: Address) {
        assert!(
            self.txs.is_empty(),
            "coinbase must be set before adding transactions"
        );
        self.header.coinbase = address;
    }

    /// Set the extra data field.
    pub fn set_extra(&mut self, data: Bytes) {
        self.header.extra_data = data;
    }

    /// Shift the block time, implicitly retargeting its difficulty.
    ///
    /// Panics if the shifted time does not stay after the parent's.
    pub fn offset_time(&mut self, seconds: i64) {
        let time = self.header.time.saturating_add_signed(seconds);
        assert!(time > self.parent.header.time, "block time out of range");
        self.header.time = time;
        self.header.difficulty = self.engine.calc_difficulty(time, &self.parent.header);
    }

    /// Execute and include a transaction. Panics if execution fails,
    /// matching the contract that generated chains are always valid.
    pub fn add_tx(&mut self, tx: Transaction) {
        let outcome = self
            .executor
            .execute(
                self.config,
                &self.header,
                &tx,
                self.state,
                &mut self.gas_pool,
            )
            .expect("transaction in generated chain must execute");
        self.gas_used += outcome.gas_used;
        self.receipts
            .push(Receipt::new(outcome.status, self.gas_used, outcome.logs));
        self.txs.push(tx);
    }

    /// Include an uncle header.
    pub fn add_uncle(&mut self, uncle: Header) {
        self.uncles
            .push(uncle.with_version(self.config.get_block_version(self.header.number)));
    }

    /// Next valid nonce for an account in the block's state.
    pub fn tx_nonce(&self, address: &Address) -> u64 {
        self.state.nonce(address)
    }

    /// Balance of an account in the block's state.
    pub fn balance(&self, address: &Address) -> U256 {
        self.state.balance(address)
    }
}

/// Generate `n` valid blocks on top of `parent`, whose state must be
/// present in `db`. Returns the blocks and their receipts.
#[allow(clippy::too_many_arguments)]
pub fn generate_chain<K: KeyValue>(
    config: &ChainConfig,
    parent: &Block,
    engine: &Aquahash,
    executor: &dyn Executor,
    mutations: &ForkMutationRegistry,
    db: &K,
    n: usize,
    mut gen: impl FnMut(usize, &mut BlockGen<'_>),
) -> (Vec<Block>, Vec<Vec<Receipt>>) {
    let mut blocks = Vec::with_capacity(n);
    let mut receipts = Vec::with_capacity(n);
    let mut parent = parent.clone();

    for index in 0..n {
        let mut state = StateDb::at_root(db, parent.header.state_root)
            .expect("parent state must be present for chain generation");

        let header = make_header(config, engine, &parent);
        mutations.apply_at(config, header.number, &mut state);

        let mut block_gen = BlockGen {
            index,
            parent: &parent,
            gas_pool: header.gas_limit,
            gas_used: 0,
            header,
            state: &mut state,
            config,
            engine,
            executor,
            txs: Vec::new(),
            receipts: Vec::new(),
            uncles: Vec::new(),
        };
        gen(index, &mut block_gen);

        let BlockGen {
            mut header,
            txs,
            receipts: block_receipts,
            uncles,
            gas_used,
            ..
        } = block_gen;

        engine.finalize(&mut state, &header, &uncles);
        let root = state.commit(db).expect("state commit during generation");

        let body = Body {
            transactions: txs,
            uncles,
        };
        header.state_root = root;
        header.gas_used = gas_used;
        header.tx_root = body.tx_root();
        header.uncle_hash = body.uncle_hash();
        header.receipt_root = derive_root(&block_receipts);
        header.bloom = create_bloom(&block_receipts);

        let block = Block::new(header, body);
        receipts.push(block_receipts);
        parent = block.clone();
        blocks.push(block);
    }
    (blocks, receipts)
}

fn make_header(config: &ChainConfig, engine: &Aquahash, parent: &Block) -> Header {
    let number = parent.header.number + 1;
    let time = parent.header.time + 240;
    Header {
        parent_hash: parent.hash(),
        coinbase: parent.header.coinbase,
        difficulty: engine.calc_difficulty(time, &parent.header),
        gas_limit: parent.header.gas_limit,
        number,
        time,
        version: config.get_block_version(number),
        ..Default::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::genesis::Genesis;
    use aquachain_state::TransferExecutor;
    use aquachain_storage::MemoryKv;
    use aquachain_types::Signer;
    use aquachain_crypto::SecretKey;
    use rand::rngs::OsRng;
    use std::sync::Arc;

    #[test]
    fn test_generated_chain_links() {
        let db = MemoryKv::new();
        let key = SecretKey::generate(&mut OsRng);
        let genesis = Genesis::dev([key.address()]).commit(&db).unwrap();
        let config = aquachain_params::dev();
        let engine = Aquahash::fake(Arc::new(config.clone()));

        let (blocks, receipts) = generate_chain(
            config,
            &genesis,
            &engine,
            &TransferExecutor,
            &ForkMutationRegistry::empty(),
            &db,
            5,
            |i, gen| {
                if i == 2 {
                    let tx = Transaction::new(
                        gen.tx_nonce(&key.address()),
                        U256::from(1),
                        21_000,
                        Some(Address::repeat_byte(0x99)),
                        U256::from(1000),
                        Bytes::new(),
                    )
                    .sign(&Signer::for_block(config, gen.number()), &key)
                    .unwrap();
                    gen.add_tx(tx);
                }
            },
        );

        assert_eq!(blocks.len(), 5);
        assert_eq!(blocks[0].header.parent_hash, genesis.hash());
        for pair in blocks.windows(2) {
            assert_eq!(pair[1].header.parent_hash, pair[0].hash());
            assert_eq!(pair[1].number(), pair[0].number() + 1);
        }
        assert_eq!(blocks[2].transactions().len(), 1);
        assert_eq!(receipts[2].len(), 1);
        assert_eq!(blocks[2].header.gas_used, 21_000);
        // bodies match their headers
        for block in &blocks {
            assert!(block.body.matches_header(&block.header));
        }
    }
}
