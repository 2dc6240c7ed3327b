//! The account state map and its Merkle-Patricia commitment.

use std::collections::BTreeMap;

use alloy_primitives::{keccak256, Address, Bytes, B256, U256};
use alloy_rlp::{Decodable, RlpDecodable, RlpEncodable};
use alloy_trie::{HashBuilder, Nibbles, EMPTY_ROOT_HASH};
use aquachain_storage::{schema, KeyValue, StorageError, WriteBatch};
use aquachain_types::{Account, KECCAK_EMPTY};

use crate::{Result, StateError};

/// Full in-memory state of one account.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AccountData {
    /// Transaction count.
    pub nonce: u64,
    /// Balance in wei.
    pub balance: U256,
    /// Contract code; empty for externally owned accounts.
    pub code: Bytes,
    /// Contract storage.
    pub storage: BTreeMap<U256, U256>,
}

impl AccountData {
    /// The trie representation of this account.
    pub fn account(&self) -> Account {
        Account {
            nonce: self.nonce,
            balance: self.balance,
            storage_root: storage_root(&self.storage),
            code_hash: if self.code.is_empty() {
                KECCAK_EMPTY
            } else {
                keccak256(&self.code)
            },
        }
    }
}

#[derive(RlpEncodable, RlpDecodable)]
struct StorageEntry {
    key: U256,
    value: U256,
}

#[derive(RlpEncodable, RlpDecodable)]
struct SnapshotAccount {
    address: Address,
    nonce: u64,
    balance: U256,
    code: Bytes,
    storage: Vec<StorageEntry>,
}

/// Copy-on-write account state.
///
/// Cloning is the copy-on-write step: the importer clones the parent
/// state and executes into the clone, leaving the parent's snapshot
/// untouched until the child commits under its own root.
#[derive(Debug, Clone, Default)]
pub struct StateDb {
    accounts: BTreeMap<Address, AccountData>,
}

impl StateDb {
    /// Fresh empty state.
    pub fn new() -> Self {
        Self::default()
    }

    /// Load the state snapshot committed under `root`.
    pub fn at_root<K: KeyValue + ?Sized>(db: &K, root: B256) -> Result<Self> {
        if root == EMPTY_ROOT_HASH {
            return Ok(Self::new());
        }
        let Some(raw) = db.get(&schema::state_key(&root))? else {
            return Err(StateError::MissingState(root));
        };
        let snapshot = Vec::<SnapshotAccount>::decode(&mut raw.as_slice())
            .map_err(|e| StorageError::Database(format!("corrupt state snapshot: {e}")))?;
        let accounts = snapshot
            .into_iter()
            .map(|acc| {
                (
                    acc.address,
                    AccountData {
                        nonce: acc.nonce,
                        balance: acc.balance,
                        code: acc.code,
                        storage: acc.storage.into_iter().map(|e| (e.key, e.value)).collect(),
                    },
                )
            })
            .collect();
        Ok(Self { accounts })
    }

    /// The state trie root over the current contents.
    pub fn root(&self) -> B256 {
        if self.accounts.is_empty() {
            return EMPTY_ROOT_HASH;
        }
        let mut entries: Vec<(B256, Vec<u8>)> = self
            .accounts
            .iter()
            .filter(|(_, data)| !data.account().is_empty() || !data.storage.is_empty())
            .map(|(address, data)| {
                (
                    keccak256(address),
                    alloy_rlp::encode(data.account()),
                )
            })
            .collect();
        if entries.is_empty() {
            return EMPTY_ROOT_HASH;
        }
        entries.sort_by(|a, b| a.0.cmp(&b.0));

        let mut builder = HashBuilder::default();
        for (key, value) in &entries {
            builder.add_leaf(Nibbles::unpack(key), value);
        }
        builder.root()
    }

    /// Compute the root and persist the snapshot under it.
    pub fn commit<K: KeyValue + ?Sized>(&self, db: &K) -> Result<B256> {
        let root = self.root();
        if root == EMPTY_ROOT_HASH {
            return Ok(root);
        }
        let snapshot: Vec<SnapshotAccount> = self
            .accounts
            .iter()
            .map(|(address, data)| SnapshotAccount {
                address: *address,
                nonce: data.nonce,
                balance: data.balance,
                code: data.code.clone(),
                storage: data
                    .storage
                    .iter()
                    .filter(|(_, v)| !v.is_zero())
                    .map(|(k, v)| StorageEntry { key: *k, value: *v })
                    .collect(),
            })
            .collect();
        let mut batch = WriteBatch::new();
        batch.put(schema::state_key(&root), alloy_rlp::encode(snapshot));
        db.write(batch)?;
        Ok(root)
    }

    /// Whether an account exists.
    pub fn exists(&self, address: &Address) -> bool {
        self.accounts.contains_key(address)
    }

    /// Read-only account view.
    pub fn account(&self, address: &Address) -> Option<&AccountData> {
        self.accounts.get(address)
    }

    /// Mutable account view, creating an empty account if absent.
    pub fn account_mut(&mut self, address: Address) -> &mut AccountData {
        self.accounts.entry(address).or_default()
    }

    /// Current nonce of an account (zero if absent).
    pub fn nonce(&self, address: &Address) -> u64 {
        self.accounts.get(address).map(|a| a.nonce).unwrap_or(0)
    }

    /// Current balance of an account (zero if absent).
    pub fn balance(&self, address: &Address) -> U256 {
        self.accounts
            .get(address)
            .map(|a| a.balance)
            .unwrap_or(U256::ZERO)
    }

    /// Credit `amount` wei.
    pub fn add_balance(&mut self, address: Address, amount: U256) {
        let account = self.account_mut(address);
        account.balance = account.balance.saturating_add(amount);
    }

    /// Debit `amount` wei, failing if the balance cannot cover it.
    pub fn sub_balance(&mut self, address: Address, amount: U256) -> Result<()> {
        let have = self.balance(&address);
        if have < amount {
            return Err(StateError::InsufficientFunds {
                address,
                have,
                need: amount,
            });
        }
        self.account_mut(address).balance = have - amount;
        Ok(())
    }

    /// Bump an account's nonce by one.
    pub fn increment_nonce(&mut self, address: Address) {
        let account = self.account_mut(address);
        account.nonce += 1;
    }

    /// Read a storage slot (zero if absent).
    pub fn storage(&self, address: &Address, slot: &U256) -> U256 {
        self.accounts
            .get(address)
            .and_then(|a| a.storage.get(slot).copied())
            .unwrap_or(U256::ZERO)
    }

    /// Write a storage slot.
    pub fn set_storage(&mut self, address: Address, slot: U256, value: U256) {
        let account = self.account_mut(address);
        if value.is_zero() {
            account.storage.remove(&slot);
        } else {
            account.storage.insert(slot, value);
        }
    }

    /// Delete an account outright.
    pub fn remove_account(&mut self, address: &Address) -> bool {
        self.accounts.remove(address).is_some()
    }

    /// Iterate all accounts.
    pub fn accounts(&self) -> impl Iterator<Item = (&Address, &AccountData)> {
        self.accounts.iter()
    }

    /// Number of accounts.
    pub fn len(&self) -> usize {
        self.accounts.len()
    }

    /// True when no accounts exist.
    pub fn is_empty(&self) -> bool {
        self.accounts.is_empty()
    }
}

/// Storage trie root over an account's slots; zero-valued slots are
/// absent from the trie.
fn storage_root(storage: &BTreeMap<U256, U256>) -> B256 {
    let mut entries: Vec<(B256, Vec<u8>)> = storage
        .iter()
        .filter(|(_, v)| !v.is_zero())
        .map(|(slot, value)| {
            (
                keccak256(slot.to_be_bytes::<32>()),
                alloy_rlp::encode(value),
            )
        })
        .collect();
    if entries.is_empty() {
        return EMPTY_ROOT_HASH;
    }
    entries.sort_by(|a, b| a.0.cmp(&b.0));

    let mut builder = HashBuilder::default();
    for (key, value) in &entries {
        builder.add_leaf(Nibbles::unpack(key), value);
    }
    builder.root()
}
