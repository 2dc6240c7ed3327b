//! The pool proper: admission, promotion, demotion, eviction.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::{Duration, Instant};

use alloy_primitives::{Address, B256, U256};
use aquachain_chain::{Blockchain, ChainError};
use aquachain_events::{Feed, Subscription, TxPreEvent};
use aquachain_params::ChainConfig;
use aquachain_state::StateDb;
use aquachain_storage::KeyValue;
use aquachain_types::{Block, Header, Signer, Transaction};
use parking_lot::Mutex;
use tracing::{debug, trace, warn};

use crate::config::TxPoolConfig;
use crate::journal::TxJournal;
use crate::list::{ListInsert, TxList};
use crate::{Result, TxPoolError};

/// Chain access the pool needs.
pub trait PoolBackend: Send + Sync + 'static {
    /// The current canonical head block.
    fn current_block(&self) -> Arc<Block>;
    /// A block by hash, canonical or not.
    fn block_by_hash(&self, hash: &B256) -> Option<Block>;
    /// The state at a given root.
    fn state_at(&self, root: B256) -> std::result::Result<StateDb, ChainError>;
}

impl<K: KeyValue> PoolBackend for Blockchain<K> {
    fn current_block(&self) -> Arc<Block> {
        Blockchain::current_block(self)
    }

    fn block_by_hash(&self, hash: &B256) -> Option<Block> {
        Blockchain::block_by_hash(self, hash).ok().flatten()
    }

    fn state_at(&self, root: B256) -> std::result::Result<StateDb, ChainError> {
        Blockchain::state_at(self, root)
    }
}

struct PoolEntry {
    tx: Arc<Transaction>,
    local: bool,
    seq: u64,
    queued_at: Instant,
}

struct Inner {
    head: Header,
    state: StateDb,
    pending: HashMap<Address, TxList>,
    queue: HashMap<Address, TxList>,
    all: HashMap<B256, PoolEntry>,
    locals: HashSet<Address>,
    seq: u64,
}

impl Inner {
    fn remove_entry(&mut self, hash: &B256) -> Option<PoolEntry> {
        self.all.remove(hash)
    }

    fn drop_all(&mut self, txs: &[Arc<Transaction>]) {
        for tx in txs {
            self.all.remove(&tx.hash());
        }
    }
}

/// The transaction pool.
pub struct TxPool {
    config: TxPoolConfig,
    chain_config: Arc<ChainConfig>,
    backend: Arc<dyn PoolBackend>,
    inner: Mutex<Inner>,
    journal: Option<Mutex<TxJournal>>,
    tx_feed: Feed<TxPreEvent>,
}

impl TxPool {
    /// Open a pool against the backend's current head, replaying the
    /// journal if one is configured.
    pub fn new(
        config: TxPoolConfig,
        chain_config: Arc<ChainConfig>,
        backend: Arc<dyn PoolBackend>,
    ) -> Result<Self> {
        let config = config.sanitize();
        let head_block = backend.current_block();
        let state = backend.state_at(head_block.header.state_root)?;

        let journal = config
            .journal
            .as_ref()
            .map(|path| Mutex::new(TxJournal::new(path.clone())));

        let pool = Self {
            config,
            chain_config,
            backend,
            inner: Mutex::new(Inner {
                head: head_block.header.clone(),
                state,
                pending: HashMap::new(),
                queue: HashMap::new(),
                all: HashMap::new(),
                locals: HashSet::new(),
                seq: 0,
            }),
            journal,
            tx_feed: Feed::new(),
        };

        if let Some(journal) = &pool.journal {
            let mut replayed = Vec::new();
            journal
                .lock()
                .load(|tx| replayed.push(tx))
                .map_err(TxPoolError::Journal)?;
            for tx in replayed {
                if let Err(err) = pool.add_local(tx) {
                    trace!(%err, "journaled transaction no longer valid");
                }
            }
            // compact away replay duplicates and dead entries
            pool.rotate_journal();
        }
        Ok(pool)
    }

    /// The pool configuration.
    pub fn config(&self) -> &TxPoolConfig {
        &self.config
    }

    /// Subscribe to pending-promotion events.
    pub fn subscribe_tx_pre(&self) -> Subscription<TxPreEvent> {
        self.tx_feed.subscribe()
    }

    /// Add a transaction submitted by this node's operator.
    pub fn add_local(&self, tx: Transaction) -> Result<bool> {
        self.add(tx, !self.config.no_locals)
    }

    /// Add a transaction received from the network.
    pub fn add_remote(&self, tx: Transaction) -> Result<bool> {
        self.add(tx, false)
    }

    /// Add a batch of remote transactions, returning per-tx results.
    pub fn add_remotes(&self, txs: Vec<Transaction>) -> Vec<Result<bool>> {
        txs.into_iter().map(|tx| self.add_remote(tx)).collect()
    }

    fn add(&self, tx: Transaction, local: bool) -> Result<bool> {
        let tx = Arc::new(tx);
        let (replaced, events) = {
            let mut inner = self.inner.lock();
            self.add_locked(&mut inner, tx.clone(), local)?
        };
        if local {
            if let Some(journal) = &self.journal {
                if let Err(err) = journal.lock().insert(tx.as_ref()) {
                    warn!(%err, "failed to journal local transaction");
                }
            }
        }
        self.emit(events);
        Ok(replaced)
    }

    fn add_locked(
        &self,
        inner: &mut Inner,
        tx: Arc<Transaction>,
        local: bool,
    ) -> Result<(bool, Vec<TxPreEvent>)> {
        let hash = tx.hash();
        if inner.all.contains_key(&hash) {
            return Err(TxPoolError::AlreadyKnown);
        }
        let sender = self.validate_tx(inner, &tx, local)?;

        if local {
            inner.locals.insert(sender);
        }
        let mut events = Vec::new();

        // a pending slot for this nonce is replaced in place
        let replaces_pending = inner
            .pending
            .get(&sender)
            .is_some_and(|list| list.get(tx.nonce).is_some());
        let replaced = if replaces_pending {
            let list = inner
                .pending
                .get_mut(&sender)
                .expect("pending list exists for occupied slot");
            match list.insert(tx.clone(), self.config.price_bump) {
                ListInsert::Replaced(old) => {
                    debug!(hash = %hash, old = %old.hash(), "replaced pending transaction");
                    inner.remove_entry(&old.hash());
                    self.insert_entry(inner, tx.clone(), local);
                    events.push(TxPreEvent { tx: tx.clone() });
                    true
                }
                ListInsert::Underpriced => return Err(TxPoolError::ReplaceUnderpriced),
                ListInsert::Added => unreachable!("occupied slot cannot be fresh"),
            }
        } else {
            // everything else goes through the queue first
            let list = inner.queue.entry(sender).or_default();
            match list.insert(tx.clone(), self.config.price_bump) {
                ListInsert::Added => {
                    self.insert_entry(inner, tx.clone(), local);
                    false
                }
                ListInsert::Replaced(old) => {
                    inner.remove_entry(&old.hash());
                    self.insert_entry(inner, tx.clone(), local);
                    true
                }
                ListInsert::Underpriced => return Err(TxPoolError::ReplaceUnderpriced),
            }
        };

        events.extend(self.promote_executables(inner, &[sender]));
        self.enforce_limits(inner);
        trace!(hash = %hash, sender = %sender, local, "pooled transaction");
        Ok((replaced, events))
    }

    fn insert_entry(&self, inner: &mut Inner, tx: Arc<Transaction>, local: bool) {
        inner.seq += 1;
        let seq = inner.seq;
        inner.all.insert(
            tx.hash(),
            PoolEntry {
                tx,
                local,
                seq,
                queued_at: Instant::now(),
            },
        );
    }

    fn signer(&self, inner: &Inner) -> Signer {
        Signer::for_block(&self.chain_config, inner.head.number + 1)
    }

    fn validate_tx(&self, inner: &Inner, tx: &Transaction, local: bool) -> Result<Address> {
        if tx.gas > inner.head.gas_limit {
            return Err(TxPoolError::GasLimitTooHigh);
        }
        let sender = tx.sender(&self.signer(inner))?;

        let exempt = local || inner.locals.contains(&sender);
        let full = inner.all.len() >= self.config.total_slots();
        if !exempt && full && tx.gas_price < U256::from(self.config.price_limit) {
            return Err(TxPoolError::Underpriced);
        }
        if tx.nonce < inner.state.nonce(&sender) {
            return Err(TxPoolError::NonceTooLow);
        }
        if inner.state.balance(&sender) < tx.cost() {
            return Err(TxPoolError::InsufficientFunds);
        }
        let homestead = self.chain_config.is_homestead(inner.head.number + 1);
        let intrinsic = tx.intrinsic_gas(homestead)?;
        if tx.gas < intrinsic {
            return Err(TxPoolError::IntrinsicGasTooLow);
        }
        Ok(sender)
    }

    /// Move queued transactions that became executable into the
    /// pending tier. Returns the promotion events to publish.
    fn promote_executables(&self, inner: &mut Inner, senders: &[Address]) -> Vec<TxPreEvent> {
        let mut events = Vec::new();
        for sender in senders {
            let state_nonce = inner.state.nonce(sender);
            let balance = inner.state.balance(sender);
            let gas_limit = inner.head.gas_limit;
            let start = inner
                .pending
                .get(sender)
                .and_then(|l| l.last_nonce())
                .map(|n| n + 1)
                .unwrap_or(state_nonce)
                .max(state_nonce);

            let Some(qlist) = inner.queue.get_mut(sender) else {
                continue;
            };
            let stale = qlist.forward(state_nonce);
            let unpayable = qlist.drop_unpayable(balance, gas_limit);
            let ready = qlist.ready(start);
            if qlist.is_empty() {
                inner.queue.remove(sender);
            }
            inner.drop_all(&stale);
            inner.drop_all(&unpayable);

            if !ready.is_empty() {
                let plist = inner.pending.entry(*sender).or_default();
                for tx in &ready {
                    plist.insert(tx.clone(), self.config.price_bump);
                }
                // spill-over past the per-account allowance returns to
                // the queue
                let overflow = plist.cap(self.config.account_slots);
                let overflow_hashes: HashSet<B256> =
                    overflow.iter().map(|tx| tx.hash()).collect();
                if !overflow.is_empty() {
                    let qlist = inner.queue.entry(*sender).or_default();
                    for tx in overflow {
                        qlist.insert(tx, self.config.price_bump);
                    }
                }
                for tx in ready {
                    if !overflow_hashes.contains(&tx.hash()) {
                        events.push(TxPreEvent { tx });
                    }
                }
            }

            // per-account queue bound
            if let Some(qlist) = inner.queue.get_mut(sender) {
                let dropped = qlist.cap(self.config.account_queue);
                if qlist.is_empty() {
                    inner.queue.remove(sender);
                }
                inner.drop_all(&dropped);
            }
        }
        events
    }

    /// Drop pending transactions invalidated by the current state and
    /// shift no-longer-contiguous runs back to the queue.
    fn demote_unexecutables(&self, inner: &mut Inner) {
        let senders: Vec<Address> = inner.pending.keys().copied().collect();
        for sender in senders {
            let state_nonce = inner.state.nonce(&sender);
            let balance = inner.state.balance(&sender);
            let gas_limit = inner.head.gas_limit;

            let Some(plist) = inner.pending.get_mut(&sender) else {
                continue;
            };
            let mined = plist.forward(state_nonce);
            let unpayable = plist.drop_unpayable(balance, gas_limit);
            inner.drop_all(&mined);
            inner.drop_all(&unpayable);

            // a gap at the front makes the whole run non-executable
            let plist = inner.pending.get_mut(&sender).expect("list still present");
            let gapped = match plist.first_nonce() {
                Some(first) if first > state_nonce => plist.forward(u64::MAX),
                _ => Vec::new(),
            };
            if !gapped.is_empty() {
                let qlist = inner.queue.entry(sender).or_default();
                for tx in gapped {
                    qlist.insert(tx, self.config.price_bump);
                }
            }
            if plist.is_empty() {
                inner.pending.remove(&sender);
            }
        }
    }

    /// Evict until the global slot budget holds. Pending victims with
    /// queued spill-over go first; otherwise the cheapest queued
    /// transaction goes. Locals are spared.
    fn enforce_limits(&self, inner: &mut Inner) {
        while inner.all.len() > self.config.total_slots() {
            // lowest (price, oldest seq) pending tx of a sender that
            // still has queued transactions
            let mut victim: Option<(U256, u64, Address, u64)> = None;
            for (sender, plist) in &inner.pending {
                if !inner.queue.get(sender).is_some_and(|q| !q.is_empty()) {
                    continue;
                }
                let Some(nonce) = plist.last_nonce() else {
                    continue;
                };
                let Some(tx) = plist.get(nonce) else { continue };
                let Some(entry) = inner.all.get(&tx.hash()) else {
                    continue;
                };
                if entry.local {
                    continue;
                }
                let key = (tx.gas_price, entry.seq, *sender, nonce);
                if victim
                    .as_ref()
                    .is_none_or(|v| (key.0, key.1) < (v.0, v.1))
                {
                    victim = Some(key);
                }
            }
            if let Some((_, _, sender, nonce)) = victim {
                if let Some(plist) = inner.pending.get_mut(&sender) {
                    let (removed, _) = plist.remove(nonce, false);
                    if plist.is_empty() {
                        inner.pending.remove(&sender);
                    }
                    if let Some(tx) = removed {
                        debug!(hash = %tx.hash(), "evicted pending transaction");
                        inner.remove_entry(&tx.hash());
                        continue;
                    }
                }
            }

            // otherwise the cheapest queued transaction pool-wide
            let mut victim: Option<(U256, u64, Address, u64)> = None;
            for (sender, qlist) in &inner.queue {
                for tx in qlist.flatten() {
                    let Some(entry) = inner.all.get(&tx.hash()) else {
                        continue;
                    };
                    if entry.local {
                        continue;
                    }
                    let key = (tx.gas_price, entry.seq, *sender, tx.nonce);
                    if victim
                        .as_ref()
                        .is_none_or(|v| (key.0, key.1) < (v.0, v.1))
                    {
                        victim = Some(key);
                    }
                }
            }
            let Some((_, _, sender, nonce)) = victim else {
                // only locals remain; the budget yields to them
                break;
            };
            if let Some(qlist) = inner.queue.get_mut(&sender) {
                let (removed, _) = qlist.remove(nonce, false);
                if qlist.is_empty() {
                    inner.queue.remove(&sender);
                }
                if let Some(tx) = removed {
                    debug!(hash = %tx.hash(), "evicted queued transaction");
                    inner.remove_entry(&tx.hash());
                }
            }
        }
    }

    /// Drop queued remote transactions older than the configured
    /// lifetime.
    pub fn evict_expired(&self) {
        let mut inner = self.inner.lock();
        let deadline = self.config.lifetime;
        let expired: Vec<(Address, u64, B256)> = inner
            .queue
            .iter()
            .flat_map(|(sender, list)| {
                list.flatten().into_iter().map(move |tx| (*sender, tx))
            })
            .filter_map(|(sender, tx)| {
                let entry = inner.all.get(&tx.hash())?;
                (!entry.local && entry.queued_at.elapsed() > deadline)
                    .then(|| (sender, tx.nonce, tx.hash()))
            })
            .collect();
        for (sender, nonce, hash) in expired {
            if let Some(list) = inner.queue.get_mut(&sender) {
                list.remove(nonce, false);
                if list.is_empty() {
                    inner.queue.remove(&sender);
                }
            }
            inner.remove_entry(&hash);
            debug!(%hash, "dropped expired queued transaction");
        }
    }

    /// React to a new canonical head: reinject reorged-out
    /// transactions, refresh the state view, then demote and promote.
    pub fn reset_to_head(&self, new_head: Arc<Block>) {
        let events = {
            let mut inner = self.inner.lock();

            let reinject = self.reorg_reinjects(&inner, &new_head);
            match self.backend.state_at(new_head.header.state_root) {
                Ok(state) => inner.state = state,
                Err(err) => {
                    warn!(%err, "failed to load state at new head; keeping stale view");
                    return;
                }
            }
            inner.head = new_head.header.clone();

            for tx in reinject {
                let tx = Arc::new(tx);
                if let Err(err) = self.add_locked(&mut inner, tx, false) {
                    trace!(%err, "reinjected transaction rejected");
                }
            }

            self.demote_unexecutables(&mut inner);
            let senders: Vec<Address> = inner.queue.keys().copied().collect();
            let events = self.promote_executables(&mut inner, &senders);
            self.enforce_limits(&mut inner);
            events
        };
        self.emit(events);
    }

    /// Transactions on the old canonical branch but not on the new
    /// one, eligible for reinjection.
    fn reorg_reinjects(&self, inner: &Inner, new_head: &Block) -> Vec<Transaction> {
        let old_hash = inner.head.hash();
        if old_hash == new_head.hash() || old_hash == new_head.header.parent_hash {
            return Vec::new();
        }
        let Some(mut old_cursor) = self.backend.block_by_hash(&old_hash) else {
            return Vec::new();
        };
        let mut new_cursor = new_head.clone();
        let mut discarded: Vec<Transaction> = Vec::new();
        let mut included: HashSet<B256> = HashSet::new();

        loop {
            while old_cursor.number() > new_cursor.number() {
                discarded.extend(old_cursor.transactions().iter().cloned());
                match self.backend.block_by_hash(&old_cursor.header.parent_hash) {
                    Some(parent) => old_cursor = parent,
                    None => return Vec::new(),
                }
            }
            while new_cursor.number() > old_cursor.number() {
                included.extend(new_cursor.transactions().iter().map(|tx| tx.hash()));
                match self.backend.block_by_hash(&new_cursor.header.parent_hash) {
                    Some(parent) => new_cursor = parent,
                    None => return Vec::new(),
                }
            }
            if old_cursor.hash() == new_cursor.hash() {
                break;
            }
            discarded.extend(old_cursor.transactions().iter().cloned());
            included.extend(new_cursor.transactions().iter().map(|tx| tx.hash()));
            match (
                self.backend.block_by_hash(&old_cursor.header.parent_hash),
                self.backend.block_by_hash(&new_cursor.header.parent_hash),
            ) {
                (Some(old_parent), Some(new_parent)) => {
                    old_cursor = old_parent;
                    new_cursor = new_parent;
                }
                _ => return Vec::new(),
            }
        }

        discarded
            .into_iter()
            .filter(|tx| !included.contains(&tx.hash()))
            .collect()
    }

    /// The executable transactions, grouped by sender in nonce order.
    pub fn pending(&self) -> HashMap<Address, Vec<Arc<Transaction>>> {
        let inner = self.inner.lock();
        inner
            .pending
            .iter()
            .map(|(sender, list)| (*sender, list.flatten()))
            .collect()
    }

    /// The non-executable transactions, grouped by sender.
    pub fn queued(&self) -> HashMap<Address, Vec<Arc<Transaction>>> {
        let inner = self.inner.lock();
        inner
            .queue
            .iter()
            .map(|(sender, list)| (*sender, list.flatten()))
            .collect()
    }

    /// Counts of (pending, queued) transactions.
    pub fn stats(&self) -> (usize, usize) {
        let inner = self.inner.lock();
        let pending = inner.pending.values().map(|l| l.len()).sum();
        let queued = inner.queue.values().map(|l| l.len()).sum();
        (pending, queued)
    }

    /// Look up a pooled transaction.
    pub fn get(&self, hash: &B256) -> Option<Arc<Transaction>> {
        self.inner.lock().all.get(hash).map(|e| e.tx.clone())
    }

    /// The next nonce an account should use, accounting for its
    /// pending run.
    pub fn pending_nonce(&self, address: &Address) -> u64 {
        let inner = self.inner.lock();
        inner
            .pending
            .get(address)
            .and_then(|list| list.last_nonce())
            .map(|n| n + 1)
            .unwrap_or_else(|| inner.state.nonce(address))
    }

    /// Rewrite the journal from the currently pooled local
    /// transactions.
    pub fn rotate_journal(&self) {
        let Some(journal) = &self.journal else { return };
        let locals: Vec<Arc<Transaction>> = {
            let inner = self.inner.lock();
            let mut locals: Vec<(u64, Arc<Transaction>)> = inner
                .all
                .values()
                .filter(|e| e.local)
                .map(|e| (e.seq, e.tx.clone()))
                .collect();
            locals.sort_by_key(|(seq, _)| *seq);
            locals.into_iter().map(|(_, tx)| tx).collect()
        };
        if let Err(err) = journal.lock().rotate(&locals) {
            warn!(%err, "failed to rotate transaction journal");
        }
    }

    /// How long entries may stay queued; exposed for tests.
    pub fn lifetime(&self) -> Duration {
        self.config.lifetime
    }

    fn emit(&self, events: Vec<TxPreEvent>) {
        for event in events {
            self.tx_feed.send(event);
        }
    }
}
