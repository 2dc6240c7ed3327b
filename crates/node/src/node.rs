//! The node: construction, background tasks, shutdown.

use std::sync::Arc;

use anyhow::Context;
use aquachain_chain::{genesis::setup_genesis, Blockchain, CacheConfig, ChainError};
use aquachain_consensus::Aquahash;
use aquachain_state::TransferExecutor;
use aquachain_storage::{rawdb, KeyValue};
use aquachain_sync::{Downloader, PeerSet};
use aquachain_txpool::{spawn_maintenance, TxPool};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::config::NodeConfig;

/// A fully wired node over a key-value backend.
pub struct Node<K: KeyValue> {
    chain: Arc<Blockchain<K>>,
    pool: Arc<TxPool>,
    peers: Arc<PeerSet>,
    downloader: Arc<Downloader>,
    cancel: CancellationToken,
    tasks: Vec<JoinHandle<()>>,
}

impl<K: KeyValue> Node<K> {
    /// Assemble a node on `db`.
    ///
    /// Commits the genesis on first start. On restart, verifies the
    /// stored genesis and chain config; a fork rescheduled below the
    /// current head is only honored (by rewinding) when
    /// `config.allow_rewind` is set.
    pub fn new(db: Arc<K>, config: NodeConfig) -> anyhow::Result<Self> {
        let (chain_config, genesis_hash) = match setup_genesis(db.as_ref(), &config.genesis) {
            Ok(ok) => ok,
            Err(ChainError::IncompatibleConfig(compat)) if config.allow_rewind => {
                warn!(
                    what = %compat.what,
                    rewind_to = compat.rewind_to,
                    "stored chain config incompatible; rewinding as requested"
                );
                let genesis_hash = rawdb::read_canonical_hash(db.as_ref(), 0)
                    .context("reading stored genesis")?
                    .context("incompatible config without stored genesis")?;

                // rewind under the new rules, then persist the new config
                let chain_config = Arc::new(config.genesis.config.clone());
                let chain = Blockchain::new(
                    db.clone(),
                    chain_config.clone(),
                    Aquahash::new(chain_config.clone()),
                    Arc::new(TransferExecutor),
                    config.mutations.clone(),
                    CacheConfig {
                        archive: config.archive,
                        ..Default::default()
                    },
                )?;
                chain.set_head(compat.rewind_to)?;
                rawdb::write_chain_config(db.as_ref(), &genesis_hash, &config.genesis.config)?;
                (config.genesis.config.clone(), genesis_hash)
            }
            Err(err) => return Err(err).context("genesis setup"),
        };

        let chain_config = Arc::new(chain_config);
        let engine = Aquahash::new(chain_config.clone());
        let chain = Arc::new(Blockchain::new(
            db.clone(),
            chain_config.clone(),
            engine,
            Arc::new(TransferExecutor),
            config.mutations.clone(),
            CacheConfig {
                archive: config.archive,
                ..Default::default()
            },
        )?);

        let pool = Arc::new(TxPool::new(
            config.txpool.clone(),
            chain_config.clone(),
            chain.clone(),
        )?);

        let peers = Arc::new(PeerSet::new());
        let downloader = Arc::new(Downloader::new(chain.clone(), peers.clone()));

        info!(
            chain_id = chain_config.chain_id,
            genesis = %genesis_hash,
            head = chain.current_block().number(),
            "node assembled"
        );
        Ok(Self {
            chain,
            pool,
            peers,
            downloader,
            cancel: CancellationToken::new(),
            tasks: Vec::new(),
        })
    }

    /// Start the background tasks (pool maintenance).
    pub fn start(&mut self) {
        let maintenance = spawn_maintenance(
            self.pool.clone(),
            self.chain.subscribe_chain_head(),
            self.cancel.clone(),
        );
        self.tasks.push(maintenance);
        info!("node started");
    }

    /// The chain engine.
    pub fn chain(&self) -> &Arc<Blockchain<K>> {
        &self.chain
    }

    /// The transaction pool.
    pub fn pool(&self) -> &Arc<TxPool> {
        &self.pool
    }

    /// The sync peer set.
    pub fn peers(&self) -> &Arc<PeerSet> {
        &self.peers
    }

    /// The block downloader.
    pub fn downloader(&self) -> &Arc<Downloader> {
        &self.downloader
    }

    /// Stop all background work and flush the pool journal.
    pub async fn shutdown(mut self) {
        info!("shutting down node");
        self.downloader.cancel();
        self.cancel.cancel();
        for task in self.tasks.drain(..) {
            let _ = task.await;
        }
        info!("node stopped");
    }
}
