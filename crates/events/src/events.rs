//! Event payloads published by the chain engine and the pool.

use std::sync::Arc;

use alloy_primitives::B256;
use aquachain_types::{Block, Log, Transaction};

/// The canonical head moved to a new block.
#[derive(Debug, Clone)]
pub struct ChainHeadEvent {
    /// The new head block.
    pub block: Arc<Block>,
}

/// A block joined the canonical chain.
#[derive(Debug, Clone)]
pub struct ChainEvent {
    /// The inserted block.
    pub block: Arc<Block>,
    /// Its canonical hash.
    pub hash: B256,
    /// Logs it produced.
    pub logs: Vec<Log>,
}

/// A valid block landed on a side chain.
#[derive(Debug, Clone)]
pub struct ChainSideEvent {
    /// The side-chain block.
    pub block: Arc<Block>,
}

/// Logs emitted by a newly canonical block.
#[derive(Debug, Clone)]
pub struct LogsEvent {
    /// The logs, in block order.
    pub logs: Vec<Log>,
}

/// Logs undone by a reorganization, with `removed` set.
#[derive(Debug, Clone)]
pub struct RemovedLogsEvent {
    /// The removed logs.
    pub logs: Vec<Log>,
}

/// A transaction entered the pending set of the pool.
#[derive(Debug, Clone)]
pub struct TxPreEvent {
    /// The promoted transaction.
    pub tx: Arc<Transaction>,
}
