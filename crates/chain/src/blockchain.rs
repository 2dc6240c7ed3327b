//! The canonical chain state machine.

use std::collections::VecDeque;
use std::sync::Arc;

use alloy_primitives::{B256, U256};
use aquachain_consensus::{Aquahash, ChainHeaderReader};
use aquachain_events::{
    ChainEvent, ChainHeadEvent, ChainSideEvent, Feed, LogsEvent, RemovedLogsEvent, Subscription,
};
use aquachain_params::ChainConfig;
use aquachain_state::{Executor, ForkMutationRegistry, StateDb};
use aquachain_storage::{rawdb, schema, KeyValue, WriteBatch};
use aquachain_types::trie::derive_root;
use aquachain_types::{create_bloom, Block, Header, Log, Receipt};
use parking_lot::{Mutex, RwLock};
use tracing::{debug, info, warn};

use crate::{ChainError, Result};

/// State retention policy.
#[derive(Debug, Clone)]
pub struct CacheConfig {
    /// Keep every historical state (archive mode).
    pub archive: bool,
    /// In full mode, how many recent blocks keep their state.
    pub state_history: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            archive: false,
            state_history: 128,
        }
    }
}

/// Event feeds published by the chain.
#[derive(Debug, Clone, Default)]
pub struct ChainFeeds {
    chain_head: Feed<ChainHeadEvent>,
    chain: Feed<ChainEvent>,
    chain_side: Feed<ChainSideEvent>,
    logs: Feed<LogsEvent>,
    removed_logs: Feed<RemovedLogsEvent>,
}

#[derive(Clone)]
struct CurrentHead {
    block: Arc<Block>,
    td: U256,
}

enum PendingEvent {
    Head(ChainHeadEvent),
    Chain(ChainEvent),
    Side(ChainSideEvent),
    Logs(LogsEvent),
    RemovedLogs(RemovedLogsEvent),
}

/// The canonical blockchain over an abstract key-value store.
pub struct Blockchain<K: KeyValue> {
    db: Arc<K>,
    config: Arc<ChainConfig>,
    engine: Aquahash,
    executor: Arc<dyn Executor>,
    mutations: ForkMutationRegistry,
    cache: CacheConfig,
    genesis_hash: B256,
    genesis_root: B256,

    /// Chain mutation lock; held for one block's execute+commit.
    mu: Mutex<()>,
    /// Atomic snapshot of the current head; reads never take `mu`.
    current: RwLock<CurrentHead>,
    /// Canonical `(number, state_root)` window used by full-mode
    /// state pruning.
    recent_roots: Mutex<VecDeque<(u64, B256)>>,

    feeds: ChainFeeds,
}

impl<K: KeyValue> Blockchain<K> {
    /// Open the chain stored in `db`. The genesis must have been
    /// committed already (see [`crate::setup_genesis`]).
    pub fn new(
        db: Arc<K>,
        config: Arc<ChainConfig>,
        engine: Aquahash,
        executor: Arc<dyn Executor>,
        mutations: ForkMutationRegistry,
        cache: CacheConfig,
    ) -> Result<Self> {
        let genesis_hash =
            rawdb::read_canonical_hash(db.as_ref(), 0)?.ok_or(ChainError::NoGenesis)?;
        let genesis_header = rawdb::read_header(db.as_ref(), 0, &genesis_hash)?
            .ok_or(ChainError::UnknownBlock(genesis_hash))?;
        let genesis_root = genesis_header.state_root;

        let head_hash =
            rawdb::read_head_block_hash(db.as_ref())?.ok_or(ChainError::NoGenesis)?;
        let head_number = rawdb::read_header_number(db.as_ref(), &head_hash)?
            .ok_or(ChainError::UnknownBlock(head_hash))?;
        let head_block = rawdb::read_block(db.as_ref(), head_number, &head_hash)?
            .ok_or(ChainError::UnknownBlock(head_hash))?
            .with_version(config.get_block_version(head_number));
        let head_td = rawdb::read_td(db.as_ref(), head_number, &head_hash)?
            .ok_or(ChainError::UnknownBlock(head_hash))?;

        let chain = Self {
            db,
            config,
            engine,
            executor,
            mutations,
            cache,
            genesis_hash,
            genesis_root,
            mu: Mutex::new(()),
            current: RwLock::new(CurrentHead {
                block: Arc::new(head_block),
                td: head_td,
            }),
            recent_roots: Mutex::new(VecDeque::new()),
            feeds: ChainFeeds::default(),
        };
        chain.rebuild_recent_roots()?;

        let head = chain.current.read();
        info!(
            number = head.block.number(),
            hash = %head.block.hash(),
            td = %head.td,
            "loaded chain head"
        );
        drop(head);
        Ok(chain)
    }

    /// The chain config.
    pub fn config(&self) -> &Arc<ChainConfig> {
        &self.config
    }

    /// The underlying database.
    pub fn db(&self) -> &Arc<K> {
        &self.db
    }

    /// The consensus engine.
    pub fn engine(&self) -> &Aquahash {
        &self.engine
    }

    /// Hash of the genesis block.
    pub fn genesis_hash(&self) -> B256 {
        self.genesis_hash
    }

    /// Snapshot of the current head block.
    pub fn current_block(&self) -> Arc<Block> {
        self.current.read().block.clone()
    }

    /// Snapshot of the current head header.
    pub fn current_header(&self) -> Header {
        self.current.read().block.header.clone()
    }

    /// Total difficulty of the current head.
    pub fn current_td(&self) -> U256 {
        self.current.read().td
    }

    /// Subscribe to head-change events.
    pub fn subscribe_chain_head(&self) -> Subscription<ChainHeadEvent> {
        self.feeds.chain_head.subscribe()
    }

    /// Subscribe to canonical-insertion events.
    pub fn subscribe_chain(&self) -> Subscription<ChainEvent> {
        self.feeds.chain.subscribe()
    }

    /// Subscribe to side-chain events.
    pub fn subscribe_chain_side(&self) -> Subscription<ChainSideEvent> {
        self.feeds.chain_side.subscribe()
    }

    /// Subscribe to new-logs events.
    pub fn subscribe_logs(&self) -> Subscription<LogsEvent> {
        self.feeds.logs.subscribe()
    }

    /// Subscribe to removed-logs events.
    pub fn subscribe_removed_logs(&self) -> Subscription<RemovedLogsEvent> {
        self.feeds.removed_logs.subscribe()
    }

    /// Canonical hash at `number`.
    pub fn canonical_hash(&self, number: u64) -> Result<Option<B256>> {
        Ok(rawdb::read_canonical_hash(self.db.as_ref(), number)?)
    }

    /// Block by hash, any chain.
    pub fn block_by_hash(&self, hash: &B256) -> Result<Option<Block>> {
        let Some(number) = rawdb::read_header_number(self.db.as_ref(), hash)? else {
            return Ok(None);
        };
        Ok(rawdb::read_block(self.db.as_ref(), number, hash)?
            .map(|b| b.with_version(self.config.get_block_version(number))))
    }

    /// Canonical block by number.
    pub fn block_by_number(&self, number: u64) -> Result<Option<Block>> {
        let Some(hash) = rawdb::read_canonical_hash(self.db.as_ref(), number)? else {
            return Ok(None);
        };
        Ok(rawdb::read_block(self.db.as_ref(), number, &hash)?
            .map(|b| b.with_version(self.config.get_block_version(number))))
    }

    /// Header by hash, any chain.
    pub fn header_by_hash(&self, hash: &B256) -> Result<Option<Header>> {
        let Some(number) = rawdb::read_header_number(self.db.as_ref(), hash)? else {
            return Ok(None);
        };
        Ok(rawdb::read_header(self.db.as_ref(), number, hash)?
            .map(|h| h.with_version(self.config.get_block_version(number))))
    }

    /// Canonical header by number.
    pub fn header_by_number(&self, number: u64) -> Result<Option<Header>> {
        let Some(hash) = rawdb::read_canonical_hash(self.db.as_ref(), number)? else {
            return Ok(None);
        };
        Ok(rawdb::read_header(self.db.as_ref(), number, &hash)?
            .map(|h| h.with_version(self.config.get_block_version(number))))
    }

    /// Whether a block is stored, canonical or not.
    pub fn has_block(&self, hash: &B256) -> Result<bool> {
        Ok(rawdb::read_header_number(self.db.as_ref(), hash)?.is_some())
    }

    /// Stored total difficulty of a block.
    pub fn total_difficulty(&self, hash: &B256) -> Result<Option<U256>> {
        let Some(number) = rawdb::read_header_number(self.db.as_ref(), hash)? else {
            return Ok(None);
        };
        Ok(rawdb::read_td(self.db.as_ref(), number, hash)?)
    }

    /// Receipts of a stored block.
    pub fn receipts_by_hash(&self, hash: &B256) -> Result<Option<Vec<Receipt>>> {
        let Some(number) = rawdb::read_header_number(self.db.as_ref(), hash)? else {
            return Ok(None);
        };
        Ok(rawdb::read_receipts(self.db.as_ref(), number, hash)?)
    }

    /// The state at a given root.
    pub fn state_at(&self, root: B256) -> Result<StateDb> {
        StateDb::at_root(self.db.as_ref(), root).map_err(|source| ChainError::Execution {
            number: 0,
            source,
        })
    }

    /// The state at the current head.
    pub fn state(&self) -> Result<StateDb> {
        self.state_at(self.current_header().state_root)
    }

    /// Validate and store a batch of headers without making them
    /// canonical. Rejects on the first invalid header.
    pub fn insert_header_chain(&self, headers: &[Header]) -> Result<usize> {
        let mut imported = 0;
        for header in headers {
            let _guard = self.mu.lock();

            let header = header
                .clone()
                .with_version(self.config.get_block_version(header.number));
            let hash = header.hash();
            if rawdb::has_header(self.db.as_ref(), header.number, &hash)? {
                imported += 1;
                continue;
            }

            let parent = self
                .header_by_hash(&header.parent_hash)?
                .ok_or(ChainError::UnknownParent {
                    parent: header.parent_hash,
                    number: header.number,
                })?;
            self.engine.verify_header(&header, &parent, true)?;

            let parent_td = rawdb::read_td(self.db.as_ref(), parent.number, &header.parent_hash)?
                .ok_or(ChainError::UnknownBlock(header.parent_hash))?;
            let td = parent_td + header.difficulty;

            let mut batch = WriteBatch::new();
            rawdb::write_header(&mut batch, &header, &hash);
            rawdb::write_td(&mut batch, header.number, &hash, &td);
            self.db.write(batch)?;
            rawdb::write_head_header_hash(self.db.as_ref(), &hash)?;
            imported += 1;
        }
        debug!(count = imported, "imported header chain");
        Ok(imported)
    }

    /// Execute and import full blocks in order, selecting the heaviest
    /// chain as canonical. The chain-mutation lock is held per block and
    /// events are published between blocks, after it is released.
    pub fn insert_chain(&self, blocks: Vec<Block>) -> Result<usize> {
        let mut imported = 0;
        for block in blocks {
            let number = block.header.number;
            let block = Arc::new(block.with_version(self.config.get_block_version(number)));
            let events = {
                let _guard = self.mu.lock();
                self.insert_block(&block)?
            };
            self.emit(events);
            imported += 1;
        }
        Ok(imported)
    }

    fn insert_block(&self, block: &Arc<Block>) -> Result<Vec<PendingEvent>> {
        let hash = block.hash();
        let number = block.number();

        if rawdb::read_td(self.db.as_ref(), number, &hash)?.is_some() {
            debug!(number, hash = %hash, "block already known");
            return Ok(Vec::new());
        }

        let parent =
            self.block_by_hash(&block.header.parent_hash)?
                .ok_or(ChainError::UnknownParent {
                    parent: block.header.parent_hash,
                    number,
                })?;
        let parent_td = rawdb::read_td(self.db.as_ref(), parent.number(), &parent.hash())?
            .ok_or(ChainError::UnknownBlock(parent.hash()))?;

        // header, body and uncle validation
        self.engine.verify_header(&block.header, &parent.header, true)?;
        let tx_root = block.body.tx_root();
        if tx_root != block.header.tx_root {
            return Err(ChainError::TxRootMismatch {
                number,
                header: block.header.tx_root,
                body: tx_root,
            });
        }
        let uncle_hash = block.body.uncle_hash();
        if uncle_hash != block.header.uncle_hash {
            return Err(ChainError::UncleHashMismatch {
                number,
                header: block.header.uncle_hash,
                body: uncle_hash,
            });
        }
        self.engine.verify_uncles(block.as_ref(), self)?;

        // execute against the parent state
        let mut state = self
            .state_at(parent.header.state_root)
            .map_err(|e| match e {
                ChainError::Execution { source, .. } => ChainError::Execution { number, source },
                other => other,
            })?;
        self.mutations.apply_at(&self.config, number, &mut state);

        let mut gas_pool = block.header.gas_limit;
        let mut cumulative_gas = 0u64;
        let mut receipts = Vec::with_capacity(block.transactions().len());
        let mut logs: Vec<Log> = Vec::new();
        let mut log_index = 0u64;
        for (tx_index, tx) in block.transactions().iter().enumerate() {
            let outcome = self
                .executor
                .execute(&self.config, &block.header, tx, &mut state, &mut gas_pool)
                .map_err(|source| ChainError::Execution { number, source })?;
            cumulative_gas += outcome.gas_used;

            let mut tx_logs = outcome.logs;
            for log in &mut tx_logs {
                log.block_number = number;
                log.block_hash = hash;
                log.tx_hash = tx.hash();
                log.tx_index = tx_index as u64;
                log.index = log_index;
                log_index += 1;
            }
            logs.extend(tx_logs.iter().cloned());
            receipts.push(Receipt::new(outcome.status, cumulative_gas, tx_logs));
        }
        self.engine.finalize(&mut state, &block.header, block.uncles());

        // declared roots must match what execution produced
        let receipt_root = derive_root(&receipts);
        if receipt_root != block.header.receipt_root {
            return Err(ChainError::ReceiptRootMismatch {
                number,
                header: block.header.receipt_root,
                computed: receipt_root,
            });
        }
        if cumulative_gas != block.header.gas_used {
            return Err(ChainError::GasUsedMismatch {
                number,
                header: block.header.gas_used,
                computed: cumulative_gas,
            });
        }
        let bloom = create_bloom(&receipts);
        if bloom != block.header.bloom {
            return Err(ChainError::BloomMismatch(number));
        }
        let root = state
            .commit(self.db.as_ref())
            .map_err(|source| ChainError::Execution { number, source })?;
        if root != block.header.state_root {
            return Err(ChainError::StateRootMismatch {
                number,
                header: block.header.state_root,
                computed: root,
            });
        }

        // persist the block and its total difficulty
        let td = parent_td + block.header.difficulty;
        let mut batch = WriteBatch::new();
        rawdb::write_block(&mut batch, block);
        rawdb::write_receipts(&mut batch, number, &hash, &receipts);
        rawdb::write_td(&mut batch, number, &hash, &td);
        self.db.write(batch)?;

        // heaviest chain wins; equal weight resolves to the lower hash
        let current = self.current.read().clone();
        let heavier = td > current.td
            || (td == current.td && hash < current.block.hash());
        let mut events = Vec::new();
        if heavier {
            if block.header.parent_hash == current.block.hash() {
                self.extend_canonical(block.clone(), td, logs, &mut events)?;
            } else {
                self.reorg(&current, block.clone(), td, &mut events)?;
            }
        } else {
            debug!(number, hash = %hash, "block landed on side chain");
            events.push(PendingEvent::Side(ChainSideEvent {
                block: block.clone(),
            }));
        }
        Ok(events)
    }

    fn extend_canonical(
        &self,
        block: Arc<Block>,
        td: U256,
        logs: Vec<Log>,
        events: &mut Vec<PendingEvent>,
    ) -> Result<()> {
        let hash = block.hash();
        let number = block.number();

        let mut batch = WriteBatch::new();
        rawdb::write_canonical_hash(&mut batch, number, &hash);
        self.db.write(batch)?;
        rawdb::write_head_block_hash(self.db.as_ref(), &hash)?;
        rawdb::write_head_header_hash(self.db.as_ref(), &hash)?;

        *self.current.write() = CurrentHead {
            block: block.clone(),
            td,
        };
        self.note_canonical_root(number, block.header.state_root)?;

        debug!(number, hash = %hash, td = %td, "extended canonical chain");
        events.push(PendingEvent::Chain(ChainEvent {
            block: block.clone(),
            hash,
            logs: logs.clone(),
        }));
        if !logs.is_empty() {
            events.push(PendingEvent::Logs(LogsEvent { logs }));
        }
        events.push(PendingEvent::Head(ChainHeadEvent { block }));
        Ok(())
    }

    /// Rewind the canonical pointers to the common ancestor of `old`
    /// and `new_block`, then roll forward through the new branch.
    fn reorg(
        &self,
        old: &CurrentHead,
        new_block: Arc<Block>,
        new_td: U256,
        events: &mut Vec<PendingEvent>,
    ) -> Result<()> {
        let mut old_chain: Vec<Block> = Vec::new();
        let mut new_chain: Vec<Block> = Vec::new();

        let mut old_cursor = (*old.block).clone();
        let mut new_cursor = (*new_block).clone();

        while new_cursor.number() > old_cursor.number() {
            new_chain.push(new_cursor.clone());
            new_cursor = self.parent_of(&new_cursor)?;
        }
        while old_cursor.number() > new_cursor.number() {
            old_chain.push(old_cursor.clone());
            old_cursor = self.parent_of(&old_cursor)?;
        }
        while old_cursor.hash() != new_cursor.hash() {
            old_chain.push(old_cursor.clone());
            new_chain.push(new_cursor.clone());
            old_cursor = self.parent_of(&old_cursor)?;
            new_cursor = self.parent_of(&new_cursor)?;
        }
        let ancestor = old_cursor;

        info!(
            drop = old_chain.len(),
            add = new_chain.len(),
            ancestor = ancestor.number(),
            new_head = %new_block.hash(),
            "chain reorganization"
        );

        // rewind: drop canonical mappings above the ancestor, emitting
        // removed-logs newest-first
        let mut batch = WriteBatch::new();
        for dropped in &old_chain {
            rawdb::delete_canonical_hash(&mut batch, dropped.number());
            let removed = self.block_logs(dropped, true)?;
            if !removed.is_empty() {
                events.push(PendingEvent::RemovedLogs(RemovedLogsEvent { logs: removed }));
            }
        }

        // roll forward oldest-first
        for adopted in new_chain.iter().rev() {
            rawdb::write_canonical_hash(&mut batch, adopted.number(), &adopted.hash());
            let logs = self.block_logs(adopted, false)?;
            events.push(PendingEvent::Chain(ChainEvent {
                block: Arc::new(adopted.clone()),
                hash: adopted.hash(),
                logs: logs.clone(),
            }));
            if !logs.is_empty() {
                events.push(PendingEvent::Logs(LogsEvent { logs }));
            }
        }
        self.db.write(batch)?;
        rawdb::write_head_block_hash(self.db.as_ref(), &new_block.hash())?;
        rawdb::write_head_header_hash(self.db.as_ref(), &new_block.hash())?;

        *self.current.write() = CurrentHead {
            block: new_block.clone(),
            td: new_td,
        };
        self.rebuild_recent_roots()?;

        events.push(PendingEvent::Head(ChainHeadEvent { block: new_block }));
        Ok(())
    }

    /// Rewind the canonical chain to `number`. State above the new head
    /// is discarded. Used to honor a config-compatibility rewind.
    pub fn set_head(&self, number: u64) -> Result<()> {
        let events = {
            let _guard = self.mu.lock();
            let current = self.current.read().clone();
            if number >= current.block.number() {
                return Ok(());
            }

            let target_hash = rawdb::read_canonical_hash(self.db.as_ref(), number)?
                .ok_or(ChainError::MissingCanonical(number))?;
            let target = self
                .block_by_hash(&target_hash)?
                .ok_or(ChainError::UnknownBlock(target_hash))?;
            let target_td = rawdb::read_td(self.db.as_ref(), number, &target_hash)?
                .ok_or(ChainError::UnknownBlock(target_hash))?;

            // snapshots are content-addressed: a root still reachable
            // from a retained block must survive the rewind
            let mut retained = vec![self.genesis_root, target.header.state_root];
            let window_from = number.saturating_sub(self.cache.state_history);
            for n in window_from..number {
                if let Some(header) = self.header_by_number(n)? {
                    retained.push(header.state_root);
                }
            }

            let mut batch = WriteBatch::new();
            for n in (number + 1)..=current.block.number() {
                if let Some(hash) = rawdb::read_canonical_hash(self.db.as_ref(), n)? {
                    if let Some(header) = rawdb::read_header(self.db.as_ref(), n, &hash)? {
                        if !retained.contains(&header.state_root) {
                            batch.delete(schema::state_key(&header.state_root));
                        }
                    }
                }
                rawdb::delete_canonical_hash(&mut batch, n);
            }
            self.db.write(batch)?;
            rawdb::write_head_block_hash(self.db.as_ref(), &target_hash)?;
            rawdb::write_head_header_hash(self.db.as_ref(), &target_hash)?;

            let target = Arc::new(target);
            *self.current.write() = CurrentHead {
                block: target.clone(),
                td: target_td,
            };
            self.rebuild_recent_roots()?;

            warn!(number, hash = %target_hash, "rewound chain head");
            vec![PendingEvent::Head(ChainHeadEvent { block: target })]
        };
        self.emit(events);
        Ok(())
    }

    /// Logs of a stored block, from its receipts, with derived fields
    /// populated and `removed` set as requested.
    fn block_logs(&self, block: &Block, removed: bool) -> Result<Vec<Log>> {
        let hash = block.hash();
        let receipts = rawdb::read_receipts(self.db.as_ref(), block.number(), &hash)?
            .unwrap_or_default();
        let mut logs = Vec::new();
        let mut log_index = 0u64;
        for (tx_index, receipt) in receipts.iter().enumerate() {
            for log in &receipt.logs {
                let mut log = log.clone();
                log.block_number = block.number();
                log.block_hash = hash;
                log.tx_index = tx_index as u64;
                log.tx_hash = block
                    .transactions()
                    .get(tx_index)
                    .map(|tx| tx.hash())
                    .unwrap_or_default();
                log.index = log_index;
                log.removed = removed;
                log_index += 1;
                logs.push(log);
            }
        }
        Ok(logs)
    }

    fn parent_of(&self, block: &Block) -> Result<Block> {
        self.block_by_hash(&block.header.parent_hash)?
            .ok_or(ChainError::UnknownParent {
                parent: block.header.parent_hash,
                number: block.number(),
            })
    }

    /// Record a new canonical state root and prune the one that fell
    /// out of the retention window, unless a retained block shares it.
    fn note_canonical_root(&self, number: u64, root: B256) -> Result<()> {
        if self.cache.archive {
            return Ok(());
        }
        let mut roots = self.recent_roots.lock();
        roots.push_back((number, root));
        while let Some(&(front_number, front_root)) = roots.front() {
            if front_number + self.cache.state_history >= number {
                break;
            }
            roots.pop_front();
            let shared = roots.iter().any(|(_, r)| *r == front_root);
            if !shared && front_root != self.genesis_root {
                self.db.delete(&schema::state_key(&front_root))?;
                debug!(number = front_number, root = %front_root, "pruned historical state");
            }
        }
        Ok(())
    }

    fn rebuild_recent_roots(&self) -> Result<()> {
        if self.cache.archive {
            return Ok(());
        }
        let head = self.current.read().block.number();
        let from = head.saturating_sub(self.cache.state_history);
        let mut window = VecDeque::new();
        for number in from..=head {
            if let Some(header) = self.header_by_number(number)? {
                window.push_back((number, header.state_root));
            }
        }
        *self.recent_roots.lock() = window;
        Ok(())
    }

    fn emit(&self, events: Vec<PendingEvent>) {
        for event in events {
            match event {
                PendingEvent::Head(e) => {
                    self.feeds.chain_head.send(e);
                }
                PendingEvent::Chain(e) => {
                    self.feeds.chain.send(e);
                }
                PendingEvent::Side(e) => {
                    self.feeds.chain_side.send(e);
                }
                PendingEvent::Logs(e) => {
                    self.feeds.logs.send(e);
                }
                PendingEvent::RemovedLogs(e) => {
                    self.feeds.removed_logs.send(e);
                }
            }
        }
    }
}

impl<K: KeyValue> ChainHeaderReader for Blockchain<K> {
    fn header(&self, hash: &B256, number: u64) -> Option<Header> {
        rawdb::read_header(self.db.as_ref(), number, hash)
            .ok()
            .flatten()
            .map(|h| h.with_version(self.config.get_block_version(number)))
    }

    fn block(&self, hash: &B256, number: u64) -> Option<Block> {
        rawdb::read_block(self.db.as_ref(), number, hash)
            .ok()
            .flatten()
            .map(|b| b.with_version(self.config.get_block_version(number)))
    }
}
