//! Durable journal of local transactions.
//!
//! Local transactions survive restarts: each is appended to the
//! journal as one hex-encoded RLP line, and the whole file is rewritten
//! from the live pool content on every rotation.

use std::fs::{File, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use alloy_primitives::hex;
use alloy_rlp::Decodable;
use aquachain_types::Transaction;
use tracing::{info, warn};

/// Append-oriented journal of local transactions.
#[derive(Debug)]
pub struct TxJournal {
    path: PathBuf,
}

impl TxJournal {
    /// Journal backed by `path`. The file is created on first write.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// The journal location.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Replay the journal, feeding every decodable transaction to
    /// `add`. Undecodable lines are skipped with a warning.
    pub fn load(&self, mut add: impl FnMut(Transaction)) -> std::io::Result<usize> {
        if !self.path.exists() {
            return Ok(0);
        }
        let file = File::open(&self.path)?;
        let mut loaded = 0usize;
        let mut dropped = 0usize;
        for line in BufReader::new(file).lines() {
            let line = line?;
            let trimmed = line.trim();
            if trimmed.is_empty() {
                continue;
            }
            match hex::decode(trimmed)
                .ok()
                .and_then(|raw| Transaction::decode(&mut raw.as_slice()).ok())
            {
                Some(tx) => {
                    add(tx);
                    loaded += 1;
                }
                None => dropped += 1,
            }
        }
        if dropped > 0 {
            warn!(dropped, "dropped undecodable journal entries");
        }
        info!(loaded, path = %self.path.display(), "loaded transaction journal");
        Ok(loaded)
    }

    /// Append one transaction.
    pub fn insert(&self, tx: &Transaction) -> std::io::Result<()> {
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        writeln!(file, "{}", hex::encode(alloy_rlp::encode(tx)))?;
        Ok(())
    }

    /// Atomically rewrite the journal with the given transactions.
    pub fn rotate(&self, txs: &[Arc<Transaction>]) -> std::io::Result<()> {
        let tmp = self.path.with_extension("new");
        {
            let mut file = File::create(&tmp)?;
            for tx in txs {
                writeln!(file, "{}", hex::encode(alloy_rlp::encode(tx.as_ref())))?;
            }
            file.sync_all()?;
        }
        std::fs::rename(&tmp, &self.path)?;
        info!(count = txs.len(), path = %self.path.display(), "rotated transaction journal");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy_primitives::{Address, Bytes, U256};
    use aquachain_crypto::SecretKey;
    use aquachain_types::Signer;
    use rand::rngs::OsRng;

    fn sample_tx(nonce: u64) -> Transaction {
        let key = SecretKey::generate(&mut OsRng);
        Transaction::new(
            nonce,
            U256::from(1),
            21_000,
            Some(Address::repeat_byte(1)),
            U256::from(5),
            Bytes::new(),
        )
        .sign(&Signer::Homestead, &key)
        .unwrap()
    }

    #[test]
    fn test_insert_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let journal = TxJournal::new(dir.path().join("transactions.rlp"));

        let a = sample_tx(0);
        let b = sample_tx(1);
        journal.insert(&a).unwrap();
        journal.insert(&b).unwrap();

        let mut loaded = Vec::new();
        let count = journal.load(|tx| loaded.push(tx)).unwrap();
        assert_eq!(count, 2);
        assert_eq!(loaded, vec![a, b]);
    }

    #[test]
    fn test_rotate_replaces_contents() {
        let dir = tempfile::tempdir().unwrap();
        let journal = TxJournal::new(dir.path().join("transactions.rlp"));
        journal.insert(&sample_tx(0)).unwrap();

        let kept = Arc::new(sample_tx(7));
        journal.rotate(std::slice::from_ref(&kept)).unwrap();

        let mut loaded = Vec::new();
        journal.load(|tx| loaded.push(tx)).unwrap();
        assert_eq!(loaded.len(), 1);
        assert_eq!(loaded[0].nonce, 7);
    }

    #[test]
    fn test_missing_file_loads_empty() {
        let dir = tempfile::tempdir().unwrap();
        let journal = TxJournal::new(dir.path().join("none.rlp"));
        let count = journal.load(|_| {}).unwrap();
        assert_eq!(count, 0);
    }
}
