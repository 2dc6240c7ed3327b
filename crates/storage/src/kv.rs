//! The abstract key-value backend and its in-memory implementation.

use std::collections::BTreeMap;

use parking_lot::RwLock;

use crate::Result;

/// One operation in a write batch.
#[derive(Debug, Clone)]
pub enum BatchOp {
    /// Store `value` under `key`.
    Put(Vec<u8>, Vec<u8>),
    /// Remove `key`.
    Delete(Vec<u8>),
}

/// A set of writes applied atomically.
#[derive(Debug, Clone, Default)]
pub struct WriteBatch {
    ops: Vec<BatchOp>,
}

impl WriteBatch {
    /// Create an empty batch.
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a put.
    pub fn put(&mut self, key: impl Into<Vec<u8>>, value: impl Into<Vec<u8>>) {
        self.ops.push(BatchOp::Put(key.into(), value.into()));
    }

    /// Queue a delete.
    pub fn delete(&mut self, key: impl Into<Vec<u8>>) {
        self.ops.push(BatchOp::Delete(key.into()));
    }

    /// Number of queued operations.
    pub fn len(&self) -> usize {
        self.ops.len()
    }

    /// True if nothing is queued.
    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }

    /// Consume the batch, yielding its operations in order.
    pub fn into_ops(self) -> Vec<BatchOp> {
        self.ops
    }
}

/// Abstract key-value store with batched writes.
///
/// All methods are synchronous; the chain engine holds its mutation
/// lock across a block's worth of writes and expects the backend to be
/// cheap or internally buffered.
pub trait KeyValue: Send + Sync + 'static {
    /// Read the value stored under `key`.
    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>>;

    /// Store `value` under `key`.
    fn put(&self, key: &[u8], value: &[u8]) -> Result<()>;

    /// Remove `key` if present.
    fn delete(&self, key: &[u8]) -> Result<()>;

    /// Iterate all entries whose key starts with `prefix`, in ascending
    /// key order.
    fn iter_prefix(&self, prefix: &[u8]) -> Result<Vec<(Vec<u8>, Vec<u8>)>>;

    /// Apply a batch of writes atomically.
    fn write(&self, batch: WriteBatch) -> Result<()>;
}

/// In-memory [`KeyValue`] backend over an ordered map.
#[derive(Debug, Default)]
pub struct MemoryKv {
    map: RwLock<BTreeMap<Vec<u8>, Vec<u8>>>,
}

impl MemoryKv {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored entries.
    pub fn len(&self) -> usize {
        self.map.read().len()
    }

    /// True if nothing is stored.
    pub fn is_empty(&self) -> bool {
        self.map.read().is_empty()
    }
}

impl KeyValue for MemoryKv {
    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>> {
        Ok(self.map.read().get(key).cloned())
    }

    fn put(&self, key: &[u8], value: &[u8]) -> Result<()> {
        self.map.write().insert(key.to_vec(), value.to_vec());
        Ok(())
    }

    fn delete(&self, key: &[u8]) -> Result<()> {
        self.map.write().remove(key);
        Ok(())
    }

    fn iter_prefix(&self, prefix: &[u8]) -> Result<Vec<(Vec<u8>, Vec<u8>)>> {
        let map = self.map.read();
        Ok(map
            .range(prefix.to_vec()..)
            .take_while(|(k, _)| k.starts_with(prefix))
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect())
    }

    fn write(&self, batch: WriteBatch) -> Result<()> {
        let mut map = self.map.write();
        for op in batch.into_ops() {
            match op {
                BatchOp::Put(k, v) => {
                    map.insert(k, v);
                }
                BatchOp::Delete(k) => {
                    map.remove(&k);
                }
            }
        }
        Ok(())
    }
}
