//! The header-first downloader.
//!
//! A session against a master peer runs four phases in a pipeline:
//! skeleton (strided headers from the master), fill (gap headers from
//! other peers, verified against the skeleton endpoints), bodies
//! (batched, verified against the header roots) and commit (ordered
//! blocks into the chain engine through a bounded queue).

use std::sync::Arc;
use std::time::Duration;

use alloy_primitives::{B256, U256};
use aquachain_chain::{Blockchain, ChainError};
use aquachain_params::HeaderVersion;
use aquachain_storage::KeyValue;
use aquachain_types::{Block, Body, Header};
use parking_lot::Mutex;
use tokio::sync::mpsc;
use tokio::task::{JoinHandle, JoinSet};
use tokio::time::timeout;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::peers::{PeerSet, SyncPeer};
use crate::{Result, SyncError};

/// Headers requested per fetch, and the skeleton stride.
pub const MAX_HEADER_FETCH: usize = 192;
/// Skeleton entries requested per round.
pub const MAX_SKELETON_SIZE: usize = 128;
/// Bodies requested per fetch.
pub const MAX_BLOCK_FETCH: usize = 128;
/// Blocks handed to the chain engine per import call.
pub const IMPORT_BATCH_SIZE: usize = 2048;
/// Bound of the fetch → commit queue; fillers block beyond it.
pub const BLOCK_CACHE_LIMIT: usize = 8192;
/// Per-request timeout.
pub const RESP_TIMEOUT: Duration = Duration::from_secs(4);

const MAX_FETCH_ATTEMPTS: usize = 3;

/// What the downloader needs from the chain engine.
pub trait ImportChain: Send + Sync + 'static {
    /// Current canonical head number.
    fn head_number(&self) -> u64;
    /// Current total difficulty.
    fn head_td(&self) -> U256;
    /// Canonical hash at a height.
    fn canonical_hash(&self, number: u64) -> Option<B256>;
    /// Fork-derived header version at a height.
    fn block_version(&self, number: u64) -> HeaderVersion;
    /// Import ordered blocks; returns how many were inserted.
    fn insert_blocks(&self, blocks: Vec<Block>) -> std::result::Result<usize, ChainError>;
}

impl<K: KeyValue> ImportChain for Blockchain<K> {
    fn head_number(&self) -> u64 {
        self.current_block().number()
    }

    fn head_td(&self) -> U256 {
        self.current_td()
    }

    fn canonical_hash(&self, number: u64) -> Option<B256> {
        Blockchain::canonical_hash(self, number).ok().flatten()
    }

    fn block_version(&self, number: u64) -> HeaderVersion {
        self.config().get_block_version(number)
    }

    fn insert_blocks(&self, blocks: Vec<Block>) -> std::result::Result<usize, ChainError> {
        self.insert_chain(blocks)
    }
}

/// The block downloader.
pub struct Downloader {
    chain: Arc<dyn ImportChain>,
    peers: Arc<PeerSet>,
    session: Mutex<Option<CancellationToken>>,
}

impl Downloader {
    /// Downloader over `chain`, fetching from `peers`.
    pub fn new(chain: Arc<dyn ImportChain>, peers: Arc<PeerSet>) -> Self {
        Self {
            chain,
            peers,
            session: Mutex::new(None),
        }
    }

    /// The peer set this downloader fetches from.
    pub fn peers(&self) -> &Arc<PeerSet> {
        &self.peers
    }

    /// Abort the running session, if any. All in-flight requests stop;
    /// blocks not yet committed are discarded.
    pub fn cancel(&self) {
        if let Some(token) = self.session.lock().as_ref() {
            token.cancel();
        }
    }

    /// Whether a session is in progress.
    pub fn is_syncing(&self) -> bool {
        self.session.lock().is_some()
    }

    /// Synchronise with the best available peer.
    pub async fn synchronise_best(&self) -> Result<()> {
        let peer = self.peers.best_peer().ok_or(SyncError::NoPeers)?;
        self.synchronise(&peer.id()).await
    }

    /// Run one sync session against the named master peer.
    pub async fn synchronise(&self, peer_id: &str) -> Result<()> {
        let cancel = CancellationToken::new();
        {
            let mut session = self.session.lock();
            if session.is_some() {
                debug!("sync already in progress");
                return Ok(());
            }
            *session = Some(cancel.clone());
        }

        let result = self.run_session(peer_id, cancel).await;
        *self.session.lock() = None;

        match &result {
            Ok(()) => {}
            Err(err) if err.is_peer_misbehavior() => {
                self.peers.demerit(peer_id);
            }
            Err(err) => {
                debug!(peer = %peer_id, %err, "sync session failed");
                self.peers.record_failure(peer_id);
            }
        }
        result
    }

    async fn run_session(&self, peer_id: &str, cancel: CancellationToken) -> Result<()> {
        let master = self
            .peers
            .get(peer_id)
            .ok_or_else(|| SyncError::PeerUnavailable(peer_id.to_string()))?;

        let (head_hash, peer_td) = master.head();
        if peer_td <= self.chain.head_td() {
            debug!(peer = %peer_id, "peer not ahead, nothing to sync");
            return Ok(());
        }

        let latest = fetch_header_by_hash(&self.chain, &self.peers, &master, head_hash)
            .await?
            .ok_or_else(|| SyncError::BadResponse {
                peer: peer_id.to_string(),
                reason: "peer does not know its own head".to_string(),
            })?;
        let ancestor = self.find_ancestor(&master, &latest).await?;
        info!(
            peer = %peer_id,
            ancestor,
            target = latest.number,
            td = %peer_td,
            "starting block synchronisation"
        );

        let (block_tx, block_rx) = mpsc::channel::<Block>(BLOCK_CACHE_LIMIT);
        let committer = spawn_commit_loop(self.chain.clone(), block_rx, cancel.clone());

        let fetch_result = self
            .fetch_all(&master, ancestor, latest.number, &block_tx, &cancel)
            .await;
        if fetch_result.is_err() {
            // abandon buffered but uncommitted blocks
            cancel.cancel();
        }
        drop(block_tx);

        let commit_result = match committer.await {
            Ok(result) => result,
            Err(join_err) => Err(SyncError::Network {
                peer: peer_id.to_string(),
                reason: format!("commit task failed: {join_err}"),
            }),
        };

        // an import failure cancels the fetch side; report the root cause
        match (fetch_result, commit_result) {
            (Ok(()), commit) => commit,
            (Err(SyncError::Cancelled), Err(commit_err)) => Err(commit_err),
            (Err(fetch_err), _) => Err(fetch_err),
        }
    }

    async fn fetch_all(
        &self,
        master: &Arc<dyn SyncPeer>,
        ancestor: u64,
        target: u64,
        block_tx: &mpsc::Sender<Block>,
        cancel: &CancellationToken,
    ) -> Result<()> {
        let mut from = ancestor + 1;
        let mut prev_hash = self
            .chain
            .canonical_hash(ancestor)
            .ok_or(SyncError::Import(ChainError::MissingCanonical(ancestor)))?;

        while from <= target {
            if cancel.is_cancelled() {
                return Err(SyncError::Cancelled);
            }

            let skeleton = fetch_headers(
                &self.chain,
                &self.peers,
                master,
                from + MAX_HEADER_FETCH as u64 - 1,
                MAX_SKELETON_SIZE,
                MAX_HEADER_FETCH as u64 - 1,
                false,
            )
            .await?;

            let headers = if skeleton.is_empty() {
                // the tail is nearer than one stride: fetch it directly
                let headers = fetch_headers(
                    &self.chain,
                    &self.peers,
                    master,
                    from,
                    MAX_HEADER_FETCH,
                    0,
                    false,
                )
                .await?;
                if headers.is_empty() {
                    break;
                }
                verify_span(&master.id(), prev_hash, from, &headers)?;
                headers
            } else {
                // validate the skeleton stride before filling
                for (i, entry) in skeleton.iter().enumerate() {
                    let expected = from + (i as u64 + 1) * MAX_HEADER_FETCH as u64 - 1;
                    if entry.number != expected {
                        return Err(SyncError::BadResponse {
                            peer: master.id(),
                            reason: format!(
                                "skeleton header at {} instead of {expected}",
                                entry.number
                            ),
                        });
                    }
                }
                self.fill_gaps(master, from, prev_hash, &skeleton, cancel)
                    .await?
            };

            prev_hash = headers
                .last()
                .map(|h| h.hash())
                .unwrap_or(prev_hash);
            let count = headers.len() as u64;
            self.fetch_and_dispatch_bodies(master, headers, block_tx, cancel)
                .await?;
            from += count;
        }
        Ok(())
    }

    /// Fill every skeleton gap, in parallel, from idle peers.
    async fn fill_gaps(
        &self,
        master: &Arc<dyn SyncPeer>,
        from: u64,
        anchor: B256,
        skeleton: &[Header],
        cancel: &CancellationToken,
    ) -> Result<Vec<Header>> {
        let mut tasks: JoinSet<Result<(usize, Vec<Header>)>> = JoinSet::new();
        for (i, entry) in skeleton.iter().enumerate() {
            let start = from + (i as u64) * MAX_HEADER_FETCH as u64;
            let expected_parent = if i == 0 {
                anchor
            } else {
                skeleton[i - 1].hash()
            };
            let expected_last = entry.hash();
            let chain = self.chain.clone();
            let peers = self.peers.clone();
            let master = master.clone();
            let cancel = cancel.clone();
            tasks.spawn(async move {
                let headers = fill_one_gap(
                    &chain,
                    &peers,
                    &master,
                    start,
                    expected_parent,
                    expected_last,
                    &cancel,
                )
                .await?;
                Ok((i, headers))
            });
        }

        let mut filled: Vec<Option<Vec<Header>>> = vec![None; skeleton.len()];
        while let Some(joined) = tasks.join_next().await {
            let (index, headers) = joined.map_err(|e| SyncError::Network {
                peer: master.id(),
                reason: format!("fill task failed: {e}"),
            })??;
            filled[index] = Some(headers);
        }

        let mut out = Vec::with_capacity(skeleton.len() * MAX_HEADER_FETCH);
        for slot in filled {
            out.extend(slot.expect("every gap either filled or errored"));
        }
        Ok(out)
    }

    /// Fetch bodies for the span and stream assembled blocks into the
    /// commit queue.
    async fn fetch_and_dispatch_bodies(
        &self,
        master: &Arc<dyn SyncPeer>,
        headers: Vec<Header>,
        block_tx: &mpsc::Sender<Block>,
        cancel: &CancellationToken,
    ) -> Result<()> {
        for chunk in headers.chunks(MAX_BLOCK_FETCH) {
            if cancel.is_cancelled() {
                return Err(SyncError::Cancelled);
            }
            let need_bodies: Vec<Header> = chunk
                .iter()
                .filter(|h| !header_has_empty_body(h))
                .cloned()
                .collect();

            let mut bodies = std::collections::HashMap::new();
            if !need_bodies.is_empty() {
                let fetched = fetch_bodies_validated(&self.peers, master, &need_bodies).await?;
                for (header, body) in need_bodies.iter().zip(fetched) {
                    bodies.insert(header.hash(), body);
                }
            }

            for header in chunk {
                let body = bodies.remove(&header.hash()).unwrap_or_default();
                let block = Block::new(header.clone(), body);
                tokio::select! {
                    _ = cancel.cancelled() => return Err(SyncError::Cancelled),
                    sent = block_tx.send(block) => {
                        if sent.is_err() {
                            // committer bailed; its error surfaces on join
                            return Err(SyncError::Cancelled);
                        }
                    }
                }
            }
        }
        Ok(())
    }

    /// Locate the highest block number shared with the peer.
    async fn find_ancestor(&self, peer: &Arc<dyn SyncPeer>, latest: &Header) -> Result<u64> {
        let local = self.chain.head_number();
        let check_from = local.min(latest.number);

        // scan the most recent window first
        let amount = MAX_HEADER_FETCH.min(check_from as usize + 1);
        let recent = fetch_headers(
            &self.chain,
            &self.peers,
            peer,
            check_from,
            amount,
            0,
            true,
        )
        .await?;
        for header in &recent {
            if self.chain.canonical_hash(header.number) == Some(header.hash()) {
                return Ok(header.number);
            }
        }

        // binary search the remainder; the genesis is always shared
        let mut lo = 0u64;
        let mut hi = check_from.saturating_sub(amount as u64);
        while lo < hi {
            let mid = (lo + hi + 1) / 2;
            let response =
                fetch_headers(&self.chain, &self.peers, peer, mid, 1, 0, false).await?;
            let matched = response
                .first()
                .map(|h| self.chain.canonical_hash(mid) == Some(h.hash()))
                .unwrap_or(false);
            if matched {
                lo = mid;
            } else {
                hi = mid - 1;
            }
        }
        Ok(lo)
    }
}

fn header_has_empty_body(header: &Header) -> bool {
    header.tx_root == aquachain_types::EMPTY_ROOT_HASH
        && header.uncle_hash == aquachain_types::EMPTY_UNCLE_HASH
}

/// Verify a directly-fetched span: contiguous numbers from `from`,
/// linked hashes, anchored at `prev_hash`.
fn verify_span(peer: &str, prev_hash: B256, from: u64, headers: &[Header]) -> Result<()> {
    let mut expected_parent = prev_hash;
    for (i, header) in headers.iter().enumerate() {
        let expected_number = from + i as u64;
        if header.number != expected_number || header.parent_hash != expected_parent {
            return Err(SyncError::SkeletonMismatch {
                peer: peer.to_string(),
                number: header.number,
            });
        }
        expected_parent = header.hash();
    }
    Ok(())
}

async fn fetch_headers(
    chain: &Arc<dyn ImportChain>,
    peers: &PeerSet,
    peer: &Arc<dyn SyncPeer>,
    start: u64,
    amount: usize,
    skip: u64,
    reverse: bool,
) -> Result<Vec<Header>> {
    match timeout(RESP_TIMEOUT, peer.headers_by_number(start, amount, skip, reverse)).await {
        Ok(Ok(headers)) => Ok(headers
            .into_iter()
            .map(|h| {
                let version = chain.block_version(h.number);
                h.with_version(version)
            })
            .collect()),
        Ok(Err(err)) => {
            peers.record_failure(&peer.id());
            Err(err)
        }
        Err(_) => {
            peers.record_failure(&peer.id());
            Err(SyncError::Timeout { peer: peer.id() })
        }
    }
}

async fn fetch_header_by_hash(
    chain: &Arc<dyn ImportChain>,
    peers: &PeerSet,
    peer: &Arc<dyn SyncPeer>,
    hash: B256,
) -> Result<Option<Header>> {
    match timeout(RESP_TIMEOUT, peer.header_by_hash(hash)).await {
        Ok(Ok(header)) => Ok(header.map(|h| {
            let version = chain.block_version(h.number);
            h.with_version(version)
        })),
        Ok(Err(err)) => {
            peers.record_failure(&peer.id());
            Err(err)
        }
        Err(_) => {
            peers.record_failure(&peer.id());
            Err(SyncError::Timeout { peer: peer.id() })
        }
    }
}

/// Fill one skeleton gap, rotating through peers on failure. A fill
/// that does not connect to the skeleton demerits its source.
async fn fill_one_gap(
    chain: &Arc<dyn ImportChain>,
    peers: &PeerSet,
    master: &Arc<dyn SyncPeer>,
    start: u64,
    expected_parent: B256,
    expected_last: B256,
    cancel: &CancellationToken,
) -> Result<Vec<Header>> {
    let mut last_err = SyncError::NoPeers;
    let mut candidates = peers.idle_peers(&master.id());
    candidates.push(master.clone());

    for peer in candidates.into_iter().take(MAX_FETCH_ATTEMPTS) {
        if cancel.is_cancelled() {
            return Err(SyncError::Cancelled);
        }
        let headers =
            match fetch_headers(chain, peers, &peer, start, MAX_HEADER_FETCH, 0, false).await {
                Ok(headers) => headers,
                Err(err) if err.is_retriable() => {
                    last_err = err;
                    continue;
                }
                Err(err) => return Err(err),
            };

        match check_gap(&peer.id(), start, expected_parent, expected_last, &headers) {
            Ok(()) => return Ok(headers),
            Err(err) => {
                warn!(peer = %peer.id(), %err, "dropping mismatched gap fill");
                peers.demerit(&peer.id());
                last_err = err;
            }
        }
    }
    Err(last_err)
}

/// A gap fill is valid iff it is exactly one stride of linked headers
/// whose first parent is the previous skeleton entry and whose last
/// hash is the next one.
fn check_gap(
    peer: &str,
    start: u64,
    expected_parent: B256,
    expected_last: B256,
    headers: &[Header],
) -> Result<()> {
    if headers.len() != MAX_HEADER_FETCH {
        return Err(SyncError::BadResponse {
            peer: peer.to_string(),
            reason: format!("gap fill of {} headers", headers.len()),
        });
    }
    verify_span(peer, expected_parent, start, headers)?;
    let last = headers.last().expect("length checked above");
    if last.hash() != expected_last {
        return Err(SyncError::SkeletonMismatch {
            peer: peer.to_string(),
            number: last.number,
        });
    }
    Ok(())
}

/// Fetch and validate bodies for `headers`, rotating through peers.
async fn fetch_bodies_validated(
    peers: &PeerSet,
    master: &Arc<dyn SyncPeer>,
    headers: &[Header],
) -> Result<Vec<Body>> {
    let hashes: Vec<B256> = headers.iter().map(|h| h.hash()).collect();
    let mut last_err = SyncError::NoPeers;
    let mut candidates = peers.idle_peers(&master.id());
    candidates.push(master.clone());

    for peer in candidates.into_iter().take(MAX_FETCH_ATTEMPTS) {
        let bodies = match timeout(RESP_TIMEOUT, peer.bodies(hashes.clone())).await {
            Ok(Ok(bodies)) => bodies,
            Ok(Err(err)) if err.is_retriable() => {
                peers.record_failure(&peer.id());
                last_err = err;
                continue;
            }
            Ok(Err(err)) => return Err(err),
            Err(_) => {
                peers.record_failure(&peer.id());
                last_err = SyncError::Timeout { peer: peer.id() };
                continue;
            }
        };

        if bodies.len() != headers.len() {
            peers.demerit(&peer.id());
            last_err = SyncError::BadResponse {
                peer: peer.id(),
                reason: format!(
                    "{} bodies for {} requests",
                    bodies.len(),
                    headers.len()
                ),
            };
            continue;
        }
        match headers
            .iter()
            .zip(&bodies)
            .find(|(header, body)| !body.matches_header(header))
        {
            None => return Ok(bodies),
            Some((header, _)) => {
                peers.demerit(&peer.id());
                last_err = SyncError::BodyMismatch {
                    peer: peer.id(),
                    number: header.number,
                };
            }
        }
    }
    Err(last_err)
}

/// The commit loop: batches ordered blocks into the chain engine. On
/// import failure the whole session is cancelled.
fn spawn_commit_loop(
    chain: Arc<dyn ImportChain>,
    mut blocks: mpsc::Receiver<Block>,
    cancel: CancellationToken,
) -> JoinHandle<Result<()>> {
    tokio::spawn(async move {
        let mut batch: Vec<Block> = Vec::new();
        loop {
            tokio::select! {
                _ = cancel.cancelled() => return Err(SyncError::Cancelled),
                received = blocks.recv() => match received {
                    Some(block) => {
                        batch.push(block);
                        if batch.len() >= IMPORT_BATCH_SIZE {
                            let pending = std::mem::take(&mut batch);
                            if let Err(err) = chain.insert_blocks(pending) {
                                cancel.cancel();
                                return Err(SyncError::Import(err));
                            }
                        }
                    }
                    None => break,
                }
            }
        }
        if !batch.is_empty() {
            let count = batch.len();
            if let Err(err) = chain.insert_blocks(batch) {
                cancel.cancel();
                return Err(SyncError::Import(err));
            }
            debug!(count, "committed final sync batch");
        }
        Ok(())
    })
}
