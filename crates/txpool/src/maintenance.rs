//! Background pool maintenance.

use std::sync::Arc;
use std::time::Duration;

use aquachain_events::{ChainHeadEvent, Subscription};
use tokio::task::JoinHandle;
use tokio::time::interval;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::pool::TxPool;

/// How often expired queued transactions are collected.
pub const EVICTION_INTERVAL: Duration = Duration::from_secs(60);

/// Drive the pool from chain-head events and timers until cancelled.
///
/// On every new head the pool is reset (reinjection, demotion,
/// promotion); expired queued transactions are dropped once a minute;
/// the journal is rewritten on the configured cadence and once more on
/// shutdown.
pub fn spawn_maintenance(
    pool: Arc<TxPool>,
    mut head_events: Subscription<ChainHeadEvent>,
    cancel: CancellationToken,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut evict = interval(EVICTION_INTERVAL);
        let mut rejournal = interval(pool.config().rejournal);
        // the first tick of an interval fires immediately
        evict.tick().await;
        rejournal.tick().await;

        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    pool.rotate_journal();
                    info!("transaction pool maintenance stopped");
                    break;
                }
                event = head_events.recv() => {
                    match event {
                        Some(event) => {
                            debug!(number = event.block.number(), "pool reacting to new chain head");
                            pool.reset_to_head(event.block);
                        }
                        None => {
                            pool.rotate_journal();
                            info!("chain head feed closed; stopping pool maintenance");
                            break;
                        }
                    }
                }
                _ = evict.tick() => pool.evict_expired(),
                _ = rejournal.tick() => pool.rotate_journal(),
            }
        }
    })
}
