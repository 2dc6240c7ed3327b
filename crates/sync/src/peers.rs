//! Peer registry, scoring and demerit tracking for the downloader.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use alloy_primitives::{B256, U256};
use aquachain_types::{Body, Header};
use async_trait::async_trait;
use parking_lot::RwLock;
use tracing::{info, warn};

use crate::Result;

/// How long a demerited peer is excluded.
pub const BAN_DURATION: Duration = Duration::from_secs(3600);

/// Maximum concurrent requests per peer.
pub const MAX_REQUESTS_PER_PEER: u32 = 4;

/// A remote peer the downloader can fetch from.
#[async_trait]
pub trait SyncPeer: Send + Sync {
    /// Stable identifier of the peer.
    fn id(&self) -> String;

    /// The peer's advertised head hash and total difficulty.
    fn head(&self) -> (B256, U256);

    /// Fetch a single header by hash.
    async fn header_by_hash(&self, hash: B256) -> Result<Option<Header>>;

    /// Fetch up to `amount` headers starting at `start`, each `skip`
    /// blocks apart, descending when `reverse`.
    async fn headers_by_number(
        &self,
        start: u64,
        amount: usize,
        skip: u64,
        reverse: bool,
    ) -> Result<Vec<Header>>;

    /// Fetch the bodies of the given blocks.
    async fn bodies(&self, hashes: Vec<B256>) -> Result<Vec<Body>>;
}

struct PeerEntry {
    peer: Arc<dyn SyncPeer>,
    banned_until: Option<Instant>,
    pending_requests: u32,
    failures: u64,
}

impl PeerEntry {
    fn is_banned(&self) -> bool {
        self.banned_until.is_some_and(|t| Instant::now() < t)
    }
}

/// The set of peers available for synchronization.
#[derive(Default)]
pub struct PeerSet {
    peers: RwLock<HashMap<String, PeerEntry>>,
}

impl PeerSet {
    /// Empty peer set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a connected peer.
    pub fn register(&self, peer: Arc<dyn SyncPeer>) {
        let id = peer.id();
        self.peers.write().insert(
            id.clone(),
            PeerEntry {
                peer,
                banned_until: None,
                pending_requests: 0,
                failures: 0,
            },
        );
        info!(peer = %id, "registered sync peer");
    }

    /// Drop a disconnected peer.
    pub fn unregister(&self, id: &str) {
        self.peers.write().remove(id);
        info!(peer = %id, "unregistered sync peer");
    }

    /// A specific usable peer.
    pub fn get(&self, id: &str) -> Option<Arc<dyn SyncPeer>> {
        let peers = self.peers.read();
        peers
            .get(id)
            .filter(|entry| !entry.is_banned())
            .map(|entry| entry.peer.clone())
    }

    /// The usable peer advertising the highest total difficulty.
    pub fn best_peer(&self) -> Option<Arc<dyn SyncPeer>> {
        let peers = self.peers.read();
        peers
            .values()
            .filter(|entry| !entry.is_banned())
            .max_by_key(|entry| entry.peer.head().1)
            .map(|entry| entry.peer.clone())
    }

    /// Usable peers ordered by fewest failures, preferring peers other
    /// than `except`.
    pub fn idle_peers(&self, except: &str) -> Vec<Arc<dyn SyncPeer>> {
        let peers = self.peers.read();
        let mut usable: Vec<(&String, &PeerEntry)> = peers
            .iter()
            .filter(|(_, entry)| !entry.is_banned())
            .filter(|(_, entry)| entry.pending_requests < MAX_REQUESTS_PER_PEER)
            .collect();
        usable.sort_by_key(|(id, entry)| (id.as_str() == except, entry.failures));
        usable.into_iter().map(|(_, e)| e.peer.clone()).collect()
    }

    /// Record a failed request.
    pub fn record_failure(&self, id: &str) {
        if let Some(entry) = self.peers.write().get_mut(id) {
            entry.failures += 1;
        }
    }

    /// Demerit a misbehaving peer, excluding it for [`BAN_DURATION`].
    pub fn demerit(&self, id: &str) {
        if let Some(entry) = self.peers.write().get_mut(id) {
            entry.banned_until = Some(Instant::now() + BAN_DURATION);
            entry.failures += 1;
            warn!(peer = %id, "demerited sync peer");
        }
    }

    /// Whether a peer is currently banned.
    pub fn is_banned(&self, id: &str) -> bool {
        self.peers
            .read()
            .get(id)
            .is_some_and(|entry| entry.is_banned())
    }

    /// Number of usable peers.
    pub fn len(&self) -> usize {
        self.peers
            .read()
            .values()
            .filter(|entry| !entry.is_banned())
            .count()
    }

    /// True when no usable peers exist.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
