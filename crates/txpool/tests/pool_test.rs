//! Pool behavior: admission kinds, replacement, promotion, eviction,
//! journaling and reorg reaction.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use alloy_primitives::{Address, Bytes, B256, U256};
use aquachain_chain::{generate::generate_chain, Blockchain, CacheConfig, Genesis};
use aquachain_consensus::Aquahash;
use aquachain_crypto::SecretKey;
use aquachain_params::ChainConfig;
use aquachain_state::{ForkMutationRegistry, StateDb, TransferExecutor};
use aquachain_storage::MemoryKv;
use aquachain_txpool::{PoolBackend, TxPool, TxPoolConfig, TxPoolError};
use aquachain_types::{Block, Body, Header, Signer, Transaction};
use parking_lot::RwLock;
use rand::rngs::OsRng;

/// Backend with a fixed head and a directly editable state.
struct MockBackend {
    head: RwLock<Arc<Block>>,
    state: RwLock<StateDb>,
}

impl MockBackend {
    fn new() -> Self {
        let header = Header {
            number: 0,
            gas_limit: 4_712_388,
            ..Default::default()
        };
        Self {
            head: RwLock::new(Arc::new(Block::new(header, Body::default()))),
            state: RwLock::new(StateDb::new()),
        }
    }

    fn fund(&self, address: Address, wei: u128) {
        self.state.write().add_balance(address, U256::from(wei));
    }
}

impl PoolBackend for MockBackend {
    fn current_block(&self) -> Arc<Block> {
        self.head.read().clone()
    }

    fn block_by_hash(&self, _hash: &B256) -> Option<Block> {
        None
    }

    fn state_at(
        &self,
        _root: B256,
    ) -> Result<StateDb, aquachain_chain::ChainError> {
        Ok(self.state.read().clone())
    }
}

struct Fixture {
    pool: TxPool,
    backend: Arc<MockBackend>,
    config: Arc<ChainConfig>,
    key: SecretKey,
}

fn fixture_with(pool_config: TxPoolConfig) -> Fixture {
    let backend = Arc::new(MockBackend::new());
    let key = SecretKey::generate(&mut OsRng);
    backend.fund(key.address(), 10_000_000_000_000_000_000);
    let config = Arc::new(aquachain_params::dev().clone());
    let pool = TxPool::new(pool_config, config.clone(), backend.clone()).unwrap();
    Fixture {
        pool,
        backend,
        config,
        key,
    }
}

fn fixture() -> Fixture {
    fixture_with(TxPoolConfig::default())
}

fn signed(key: &SecretKey, config: &ChainConfig, nonce: u64, price: u64) -> Transaction {
    Transaction::new(
        nonce,
        U256::from(price),
        21_000,
        Some(Address::repeat_byte(0xee)),
        U256::from(100),
        Bytes::new(),
    )
    .sign(&Signer::for_block(config, 1), key)
    .unwrap()
}

#[test]
fn test_pending_promotion_contiguous() {
    let f = fixture();
    // out-of-order arrival: 2 queues, 0 and 1 promote, then 2 follows
    f.pool.add_remote(signed(&f.key, &f.config, 2, 1000)).unwrap();
    let (pending, queued) = f.pool.stats();
    assert_eq!((pending, queued), (0, 1));

    f.pool.add_remote(signed(&f.key, &f.config, 0, 1000)).unwrap();
    f.pool.add_remote(signed(&f.key, &f.config, 1, 1000)).unwrap();
    let (pending, queued) = f.pool.stats();
    assert_eq!((pending, queued), (3, 0));

    // pending nonces form a contiguous run from the account nonce
    let pending: HashMap<_, _> = f.pool.pending();
    let run = &pending[&f.key.address()];
    let nonces: Vec<u64> = run.iter().map(|tx| tx.nonce).collect();
    assert_eq!(nonces, vec![0, 1, 2]);
    assert_eq!(f.pool.pending_nonce(&f.key.address()), 3);
}

#[test]
fn test_replacement_accepted_at_bump() {
    let f = fixture();
    let old = signed(&f.key, &f.config, 5, 1000);
    let old_hash = old.hash();
    f.pool.add_remote(old).unwrap();

    // nonce 5 sits in the queue (gap from 0); replacement still applies
    let replaced = f
        .pool
        .add_remote(signed(&f.key, &f.config, 5, 1100))
        .unwrap();
    assert!(replaced);
    assert!(f.pool.get(&old_hash).is_none());
}

#[test]
fn test_replacement_rejected_below_bump() {
    let f = fixture();
    let old = signed(&f.key, &f.config, 5, 1000);
    let old_hash = old.hash();
    f.pool.add_remote(old).unwrap();

    let err = f
        .pool
        .add_remote(signed(&f.key, &f.config, 5, 1099))
        .unwrap_err();
    assert!(matches!(err, TxPoolError::ReplaceUnderpriced));
    // the original stays pooled
    assert!(f.pool.get(&old_hash).is_some());
}

#[test]
fn test_pending_replacement() {
    let f = fixture();
    f.pool.add_remote(signed(&f.key, &f.config, 0, 1000)).unwrap();
    let (pending, _) = f.pool.stats();
    assert_eq!(pending, 1);

    let replaced = f
        .pool
        .add_remote(signed(&f.key, &f.config, 0, 1100))
        .unwrap();
    assert!(replaced);
    let (pending, queued) = f.pool.stats();
    assert_eq!((pending, queued), (1, 0));
    let run = &f.pool.pending()[&f.key.address()];
    assert_eq!(run[0].gas_price, U256::from(1100));
}

#[test]
fn test_admission_rejections() {
    let f = fixture();

    // duplicate
    let tx = signed(&f.key, &f.config, 0, 1000);
    f.pool.add_remote(tx.clone()).unwrap();
    assert!(matches!(
        f.pool.add_remote(tx).unwrap_err(),
        TxPoolError::AlreadyKnown
    ));

    // nonce below the account nonce
    let mut state = f.backend.state.write();
    state.increment_nonce(f.key.address());
    state.increment_nonce(f.key.address());
    drop(state);
    let stale = signed(&f.key, &f.config, 1, 1000);
    // refresh the pool's state view
    f.pool.reset_to_head(f.backend.current_block());
    assert!(matches!(
        f.pool.add_remote(stale).unwrap_err(),
        TxPoolError::NonceTooLow
    ));

    // gas above the block gas limit
    let mut huge = Transaction::new(
        5,
        U256::from(1000),
        10_000_000,
        Some(Address::ZERO),
        U256::ZERO,
        Bytes::new(),
    );
    huge = huge.sign(&Signer::for_block(&f.config, 1), &f.key).unwrap();
    assert!(matches!(
        f.pool.add_remote(huge).unwrap_err(),
        TxPoolError::GasLimitTooHigh
    ));

    // gas below the intrinsic cost
    let tiny = Transaction::new(
        5,
        U256::from(1000),
        20_000,
        Some(Address::ZERO),
        U256::ZERO,
        Bytes::new(),
    )
    .sign(&Signer::for_block(&f.config, 1), &f.key)
    .unwrap();
    assert!(matches!(
        f.pool.add_remote(tiny).unwrap_err(),
        TxPoolError::IntrinsicGasTooLow
    ));

    // pauper account
    let pauper = SecretKey::generate(&mut OsRng);
    let broke = signed(&pauper, &f.config, 0, 1000);
    assert!(matches!(
        f.pool.add_remote(broke).unwrap_err(),
        TxPoolError::InsufficientFunds
    ));
}

#[test]
fn test_invalid_signature_rejected() {
    let f = fixture();
    let mut tx = signed(&f.key, &f.config, 0, 1000);
    tx.r = U256::ZERO;
    assert!(matches!(
        f.pool.add_remote(tx).unwrap_err(),
        TxPoolError::InvalidSignature(_)
    ));
}

#[test]
fn test_underpriced_when_full() {
    let small = TxPoolConfig {
        price_limit: 100,
        global_slots: 2,
        global_queue: 2,
        account_slots: 4,
        ..Default::default()
    };
    let f = fixture_with(small);
    let other = SecretKey::generate(&mut OsRng);
    f.backend.fund(other.address(), 10_000_000_000_000_000_000);

    for nonce in 0..2 {
        f.pool.add_remote(signed(&f.key, &f.config, nonce, 500)).unwrap();
        f.pool.add_remote(signed(&other, &f.config, nonce, 500)).unwrap();
    }
    let (pending, queued) = f.pool.stats();
    assert_eq!(pending + queued, 4);

    // below the floor and the pool is full
    let cheap = SecretKey::generate(&mut OsRng);
    f.backend.fund(cheap.address(), 10_000_000_000_000_000_000);
    // refresh state view so the new account is visible
    f.pool.reset_to_head(f.backend.current_block());
    let err = f.pool.add_remote(signed(&cheap, &f.config, 0, 50)).unwrap_err();
    assert!(matches!(err, TxPoolError::Underpriced));
}

#[test]
fn test_eviction_prefers_pending_with_queued_spillover() {
    let small = TxPoolConfig {
        global_slots: 2,
        global_queue: 1,
        account_slots: 4,
        ..Default::default()
    };
    let f = fixture_with(small);
    let rich = SecretKey::generate(&mut OsRng);
    f.backend.fund(rich.address(), 10_000_000_000_000_000_000);
    f.pool.reset_to_head(f.backend.current_block());

    // budget is 3 slots: two pending, one queued (nonce gap)
    f.pool.add_remote(signed(&f.key, &f.config, 0, 200)).unwrap();
    f.pool.add_remote(signed(&f.key, &f.config, 5, 100)).unwrap();
    f.pool.add_remote(signed(&rich, &f.config, 0, 300)).unwrap();
    assert_eq!(f.pool.stats(), (2, 1));

    // overflow: the victim is the pending transaction whose sender
    // still has queued spill-over, not the better-priced rich sender
    let victim = f.pool.pending()[&f.key.address()][0].hash();
    f.pool.add_remote(signed(&rich, &f.config, 1, 400)).unwrap();
    let (pending, queued) = f.pool.stats();
    assert_eq!(pending + queued, 3);
    assert!(f.pool.get(&victim).is_none());
    // the rich sender's transactions are untouched
    assert_eq!(f.pool.pending()[&rich.address()].len(), 2);
}

#[test]
fn test_eviction_falls_back_to_cheapest_queued() {
    let small = TxPoolConfig {
        global_slots: 2,
        global_queue: 2,
        account_slots: 4,
        ..Default::default()
    };
    let f = fixture_with(small);
    let rich = SecretKey::generate(&mut OsRng);
    f.backend.fund(rich.address(), 10_000_000_000_000_000_000);
    f.pool.reset_to_head(f.backend.current_block());

    // fill the budget with queued-only senders (nonce gaps everywhere)
    f.pool.add_remote(signed(&f.key, &f.config, 5, 100)).unwrap();
    f.pool.add_remote(signed(&f.key, &f.config, 7, 300)).unwrap();
    f.pool.add_remote(signed(&rich, &f.config, 5, 200)).unwrap();
    f.pool.add_remote(signed(&rich, &f.config, 7, 400)).unwrap();
    assert_eq!(f.pool.stats(), (0, 4));

    // no pending victims exist; the cheapest queued transaction goes
    let cheapest = f.pool.queued()[&f.key.address()][0].hash();
    f.pool.add_remote(signed(&rich, &f.config, 9, 500)).unwrap();
    let (pending, queued) = f.pool.stats();
    assert_eq!(pending + queued, 4);
    assert!(f.pool.get(&cheapest).is_none());
}

#[test]
fn test_total_slots_invariant() {
    let small = TxPoolConfig {
        global_slots: 3,
        global_queue: 3,
        account_slots: 8,
        account_queue: 8,
        ..Default::default()
    };
    let f = fixture_with(small);
    let budget = f.pool.config().total_slots();

    for nonce in 0..20u64 {
        let _ = f.pool.add_remote(signed(&f.key, &f.config, nonce, 100 + nonce));
        let (pending, queued) = f.pool.stats();
        assert!(pending + queued <= budget);
    }
}

#[test]
fn test_lifetime_eviction() {
    let config = TxPoolConfig {
        lifetime: Duration::from_millis(0),
        ..Default::default()
    };
    let f = fixture_with(config);

    // queued (nonce gap) transaction expires...
    f.pool.add_remote(signed(&f.key, &f.config, 7, 1000)).unwrap();
    // ...pending transactions do not
    f.pool.add_remote(signed(&f.key, &f.config, 0, 1000)).unwrap();

    std::thread::sleep(Duration::from_millis(5));
    f.pool.evict_expired();
    let (pending, queued) = f.pool.stats();
    assert_eq!((pending, queued), (1, 0));
}

#[test]
fn test_locals_exempt_from_price_floor() {
    let small = TxPoolConfig {
        price_limit: 100,
        global_slots: 1,
        global_queue: 1,
        ..Default::default()
    };
    let f = fixture_with(small);
    let other = SecretKey::generate(&mut OsRng);
    f.backend.fund(other.address(), 10_000_000_000_000_000_000);
    f.pool.reset_to_head(f.backend.current_block());

    f.pool.add_remote(signed(&other, &f.config, 0, 500)).unwrap();
    f.pool.add_remote(signed(&other, &f.config, 1, 500)).unwrap();

    // a remote below the floor bounces, a local sails through
    let err = f.pool.add_remote(signed(&f.key, &f.config, 0, 10)).unwrap_err();
    assert!(matches!(err, TxPoolError::Underpriced));
    f.pool.add_local(signed(&f.key, &f.config, 0, 10)).unwrap();
}

#[test]
fn test_journal_survives_restart() {
    let dir = tempfile::tempdir().unwrap();
    let journal_path = dir.path().join("transactions.rlp");

    let backend = Arc::new(MockBackend::new());
    let key = SecretKey::generate(&mut OsRng);
    backend.fund(key.address(), 10_000_000_000_000_000_000);
    let chain_config = Arc::new(aquachain_params::dev().clone());
    let pool_config = TxPoolConfig {
        journal: Some(journal_path.clone()),
        ..Default::default()
    };

    let tx = signed(&key, &chain_config, 0, 1000);
    let hash = tx.hash();
    {
        let pool = TxPool::new(pool_config.clone(), chain_config.clone(), backend.clone()).unwrap();
        pool.add_local(tx).unwrap();
        pool.rotate_journal();
    }

    let pool = TxPool::new(pool_config, chain_config, backend).unwrap();
    assert!(pool.get(&hash).is_some());
}

#[test]
fn test_reorg_reinjects_dropped_transactions() {
    // a real chain this time: the pool must pull transactions of the
    // abandoned branch back in
    let db = Arc::new(MemoryKv::new());
    let key = SecretKey::generate(&mut OsRng);
    let genesis = Genesis::dev([key.address()]).commit(db.as_ref()).unwrap();
    let config = Arc::new(aquachain_params::dev().clone());
    let engine = Aquahash::fake(config.clone());
    let chain = Arc::new(
        Blockchain::new(
            db.clone(),
            config.clone(),
            engine.clone(),
            Arc::new(TransferExecutor),
            ForkMutationRegistry::empty(),
            CacheConfig::default(),
        )
        .unwrap(),
    );

    let tx = Transaction::new(
        0,
        U256::from(1),
        21_000,
        Some(Address::repeat_byte(0x77)),
        U256::from(123),
        Bytes::new(),
    )
    .sign(&Signer::for_block(&config, 1), &key)
    .unwrap();
    let tx_hash = tx.hash();

    // branch A carries the transaction in a fast (heavy) block
    let tx_for_a = tx.clone();
    let (branch_a, _) = generate_chain(
        &config,
        &genesis,
        &engine,
        &TransferExecutor,
        &ForkMutationRegistry::empty(),
        db.as_ref(),
        1,
        |_, gen| gen.add_tx(tx_for_a.clone()),
    );
    chain.insert_chain(branch_a.clone()).unwrap();

    // the pool tracks the head that includes the transaction
    let pool = TxPool::new(TxPoolConfig::default(), config.clone(), chain.clone()).unwrap();

    // branch B is two empty blocks, heavier in total
    let (branch_b, _) = generate_chain(
        &config,
        &genesis,
        &engine,
        &TransferExecutor,
        &ForkMutationRegistry::empty(),
        db.as_ref(),
        2,
        |_, gen| gen.set_extra(Bytes::from_static(b"b")),
    );
    chain.insert_chain(branch_b).unwrap();
    assert_ne!(chain.current_block().hash(), branch_a[0].hash());

    pool.reset_to_head(chain.current_block());
    let pooled = pool.get(&tx_hash).expect("dropped tx reinjected");
    assert_eq!(pooled.hash(), tx_hash);
    let (pending, _) = pool.stats();
    assert_eq!(pending, 1);
}
