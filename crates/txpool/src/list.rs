//! Per-sender nonce-sorted transaction lists.

use std::collections::BTreeMap;
use std::sync::Arc;

use alloy_primitives::U256;
use aquachain_types::Transaction;

/// Outcome of inserting into a [`TxList`].
pub(crate) enum ListInsert {
    /// Stored in a fresh nonce slot.
    Added,
    /// Replaced the previous occupant of the slot.
    Replaced(Arc<Transaction>),
    /// Rejected: the occupant's price bump threshold was not met.
    Underpriced,
}

/// Nonce-sorted transactions of one sender.
#[derive(Debug, Default)]
pub(crate) struct TxList {
    txs: BTreeMap<u64, Arc<Transaction>>,
}

impl TxList {
    /// Insert `tx`, replacing a same-nonce occupant only when the new
    /// price is at least `old * (100 + price_bump) / 100`.
    pub fn insert(&mut self, tx: Arc<Transaction>, price_bump: u64) -> ListInsert {
        if let Some(old) = self.txs.get(&tx.nonce) {
            let threshold = old.gas_price * U256::from(100 + price_bump) / U256::from(100);
            if tx.gas_price < threshold {
                return ListInsert::Underpriced;
            }
            let old = old.clone();
            self.txs.insert(tx.nonce, tx);
            ListInsert::Replaced(old)
        } else {
            self.txs.insert(tx.nonce, tx);
            ListInsert::Added
        }
    }

    /// Remove and return every transaction with a nonce below
    /// `threshold`.
    pub fn forward(&mut self, threshold: u64) -> Vec<Arc<Transaction>> {
        let keep = self.txs.split_off(&threshold);
        let removed = std::mem::replace(&mut self.txs, keep);
        removed.into_values().collect()
    }

    /// Remove and return every transaction whose cost exceeds `balance`
    /// or whose gas exceeds `gas_limit`.
    pub fn drop_unpayable(&mut self, balance: U256, gas_limit: u64) -> Vec<Arc<Transaction>> {
        let unpayable: Vec<u64> = self
            .txs
            .iter()
            .filter(|(_, tx)| tx.cost() > balance || tx.gas > gas_limit)
            .map(|(nonce, _)| *nonce)
            .collect();
        unpayable
            .into_iter()
            .filter_map(|nonce| self.txs.remove(&nonce))
            .collect()
    }

    /// Remove and return the contiguous run starting at `start`.
    pub fn ready(&mut self, start: u64) -> Vec<Arc<Transaction>> {
        let mut out = Vec::new();
        let mut next = start;
        while let Some(tx) = self.txs.remove(&next) {
            out.push(tx);
            next += 1;
        }
        out
    }

    /// Trim to at most `max` transactions, removing the highest nonces.
    pub fn cap(&mut self, max: usize) -> Vec<Arc<Transaction>> {
        let mut removed = Vec::new();
        while self.txs.len() > max {
            if let Some((&nonce, _)) = self.txs.iter().next_back() {
                if let Some(tx) = self.txs.remove(&nonce) {
                    removed.push(tx);
                }
            }
        }
        removed
    }

    /// Remove one nonce. Returns the occupant and, for strict
    /// (pending) lists, every higher-nonce transaction which is no
    /// longer executable.
    pub fn remove(&mut self, nonce: u64, strict: bool) -> (Option<Arc<Transaction>>, Vec<Arc<Transaction>>) {
        let removed = self.txs.remove(&nonce);
        let mut tail = Vec::new();
        if removed.is_some() && strict {
            tail = self.forward_from(nonce + 1);
        }
        (removed, tail)
    }

    fn forward_from(&mut self, from: u64) -> Vec<Arc<Transaction>> {
        let tail = self.txs.split_off(&from);
        tail.into_values().collect()
    }

    /// The transaction at `nonce`.
    pub fn get(&self, nonce: u64) -> Option<&Arc<Transaction>> {
        self.txs.get(&nonce)
    }

    /// Lowest stored nonce.
    pub fn first_nonce(&self) -> Option<u64> {
        self.txs.keys().next().copied()
    }

    /// Highest stored nonce.
    pub fn last_nonce(&self) -> Option<u64> {
        self.txs.keys().next_back().copied()
    }

    /// All transactions in nonce order.
    pub fn flatten(&self) -> Vec<Arc<Transaction>> {
        self.txs.values().cloned().collect()
    }

    /// Number of stored transactions.
    pub fn len(&self) -> usize {
        self.txs.len()
    }

    /// True when no transactions are stored.
    pub fn is_empty(&self) -> bool {
        self.txs.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy_primitives::{Address, Bytes};

    fn tx(nonce: u64, price: u64) -> Arc<Transaction> {
        Arc::new(Transaction::new(
            nonce,
            U256::from(price),
            21_000,
            Some(Address::ZERO),
            U256::ZERO,
            Bytes::new(),
        ))
    }

    #[test]
    fn test_insert_and_ready() {
        let mut list = TxList::default();
        for nonce in [3u64, 1, 0, 5] {
            assert!(matches!(list.insert(tx(nonce, 100), 10), ListInsert::Added));
        }
        let ready = list.ready(0);
        let nonces: Vec<u64> = ready.iter().map(|t| t.nonce).collect();
        assert_eq!(nonces, vec![0, 1]);
        // 3 and 5 remain queued behind the gap at 2
        assert_eq!(list.len(), 2);
    }

    #[test]
    fn test_replacement_bump() {
        let mut list = TxList::default();
        list.insert(tx(5, 1000), 10);
        assert!(matches!(
            list.insert(tx(5, 1099), 10),
            ListInsert::Underpriced
        ));
        match list.insert(tx(5, 1100), 10) {
            ListInsert::Replaced(old) => assert_eq!(old.gas_price, U256::from(1000)),
            _ => panic!("expected replacement"),
        }
    }

    #[test]
    fn test_forward_and_cap() {
        let mut list = TxList::default();
        for nonce in 0..10u64 {
            list.insert(tx(nonce, 100), 10);
        }
        let forwarded = list.forward(4);
        assert_eq!(forwarded.len(), 4);
        let capped = list.cap(3);
        assert_eq!(capped.len(), 3);
        assert_eq!(list.last_nonce(), Some(6));
    }

    #[test]
    fn test_strict_remove_returns_tail() {
        let mut list = TxList::default();
        for nonce in 0..5u64 {
            list.insert(tx(nonce, 100), 10);
        }
        let (removed, tail) = list.remove(2, true);
        assert!(removed.is_some());
        let nonces: Vec<u64> = tail.iter().map(|t| t.nonce).collect();
        assert_eq!(nonces, vec![3, 4]);
        assert_eq!(list.len(), 2);
    }
}
