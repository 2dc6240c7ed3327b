//! Shared fixtures for chain tests.

#![allow(dead_code)] // each test binary uses a subset of the fixtures

use std::sync::Arc;

use alloy_primitives::{Address, Bytes, B256, U256};
use aquachain_chain::{Blockchain, CacheConfig, Genesis};
use aquachain_consensus::Aquahash;
use aquachain_crypto::SecretKey;
use aquachain_params::ChainConfig;
use aquachain_state::{
    ExecutionOutcome, Executor, ForkMutationRegistry, StateDb, TransferExecutor,
};
use aquachain_storage::MemoryKv;
use aquachain_types::{Header, Log, Signer, Transaction};
use rand::rngs::OsRng;

/// Value-transfer executor that additionally emits one log per
/// transaction, so log-event plumbing can be observed in tests.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogTransferExecutor;

impl Executor for LogTransferExecutor {
    fn execute(
        &self,
        config: &ChainConfig,
        header: &Header,
        tx: &Transaction,
        state: &mut StateDb,
        gas_pool: &mut u64,
    ) -> aquachain_state::Result<ExecutionOutcome> {
        let mut outcome = TransferExecutor.execute(config, header, tx, state, gas_pool)?;
        outcome.logs.push(Log {
            address: tx.to.unwrap_or_default(),
            topics: vec![B256::from(tx.hash())],
            data: Bytes::new(),
            ..Default::default()
        });
        Ok(outcome)
    }
}

pub struct TestChain {
    pub db: Arc<MemoryKv>,
    pub chain: Blockchain<MemoryKv>,
    pub config: Arc<ChainConfig>,
    pub engine: Aquahash,
    pub key: SecretKey,
    pub genesis: aquachain_types::Block,
}

/// A fresh dev chain with a funded account and fake-seal engine.
pub fn test_chain(executor: Arc<dyn Executor>) -> TestChain {
    let db = Arc::new(MemoryKv::new());
    let key = SecretKey::generate(&mut OsRng);
    let genesis = Genesis::dev([key.address()])
        .commit(db.as_ref())
        .expect("genesis commit");
    let config = Arc::new(aquachain_params::dev().clone());
    let engine = Aquahash::fake(config.clone());
    let chain = Blockchain::new(
        db.clone(),
        config.clone(),
        engine.clone(),
        executor,
        ForkMutationRegistry::empty(),
        CacheConfig::default(),
    )
    .expect("open chain");
    TestChain {
        db,
        chain,
        config,
        engine,
        key,
        genesis,
    }
}

/// A signed transfer of `value` wei to `to`.
pub fn transfer(
    key: &SecretKey,
    config: &ChainConfig,
    nonce: u64,
    to: Address,
    value: u64,
) -> Transaction {
    Transaction::new(
        nonce,
        U256::from(1),
        21_000,
        Some(to),
        U256::from(value),
        Bytes::new(),
    )
    .sign(&Signer::for_block(config, 1), key)
    .expect("sign transfer")
}
