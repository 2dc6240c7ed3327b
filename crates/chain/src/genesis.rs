//! Declarative genesis blocks.
//!
//! A [`Genesis`] spec pins a chain's identity: config, header fields
//! and the initial allocation. It is committed to the database exactly
//! once; afterwards [`setup_genesis`] verifies the stored genesis
//! matches and checks the stored chain config for compatibility with
//! the configured one.

use std::collections::BTreeMap;

use alloy_primitives::{Address, Bytes, B256, U256};
use aquachain_params::{protocol, ChainConfig};
use aquachain_state::StateDb;
use aquachain_storage::{rawdb, KeyValue, WriteBatch};
use aquachain_types::{Block, Body, Header, EMPTY_ROOT_HASH};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::{ChainError, Result};

/// One account of the genesis allocation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GenesisAccount {
    /// Initial balance in wei.
    pub balance: U256,
    /// Initial nonce.
    #[serde(skip_serializing_if = "is_zero")]
    pub nonce: u64,
    /// Contract code.
    #[serde(skip_serializing_if = "Bytes::is_empty")]
    pub code: Bytes,
    /// Initial storage.
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub storage: BTreeMap<U256, U256>,
}

fn is_zero(v: &u64) -> bool {
    *v == 0
}

/// A declarative genesis block.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Genesis {
    /// The chain config enforced from this genesis.
    pub config: ChainConfig,
    /// Proof-of-work nonce of the genesis header.
    pub nonce: u64,
    /// Genesis timestamp.
    pub timestamp: u64,
    /// Extra data of the genesis header.
    pub extra_data: Bytes,
    /// Gas limit of the genesis header.
    pub gas_limit: u64,
    /// Starting difficulty.
    pub difficulty: U256,
    /// Mix digest of the genesis header.
    pub mix_digest: B256,
    /// Coinbase of the genesis header.
    pub coinbase: Address,
    /// Initial account allocation.
    pub alloc: BTreeMap<Address, GenesisAccount>,
}

impl Genesis {
    /// Genesis spec with protocol defaults for `config`.
    pub fn new(config: ChainConfig) -> Self {
        Self {
            config,
            nonce: 42,
            timestamp: 0,
            extra_data: Bytes::new(),
            gas_limit: protocol::GENESIS_GAS_LIMIT,
            difficulty: U256::from(protocol::GENESIS_DIFFICULTY),
            mix_digest: B256::ZERO,
            coinbase: Address::ZERO,
            alloc: BTreeMap::new(),
        }
    }

    /// Development genesis: all-forks config with the given accounts
    /// funded.
    pub fn dev(faucets: impl IntoIterator<Item = Address>) -> Self {
        let mut genesis = Self::new(aquachain_params::dev().clone());
        genesis.difficulty = U256::from(1);
        for address in faucets {
            genesis.alloc.insert(
                address,
                GenesisAccount {
                    balance: U256::from(protocol::BLOCK_REWARD) * U256::from(1000u64),
                    ..Default::default()
                },
            );
        }
        genesis
    }

    /// Build the genesis state.
    fn state(&self) -> StateDb {
        let mut state = StateDb::new();
        for (address, account) in &self.alloc {
            let data = state.account_mut(*address);
            data.balance = account.balance;
            data.nonce = account.nonce;
            data.code = account.code.clone();
            data.storage = account
                .storage
                .iter()
                .filter(|(_, v)| !v.is_zero())
                .map(|(k, v)| (*k, *v))
                .collect();
        }
        state
    }

    /// Materialize the genesis block, committing its state to `db`.
    pub fn to_block<K: KeyValue + ?Sized>(&self, db: &K) -> Result<Block> {
        let state = self.state();
        let root = state
            .commit(db)
            .map_err(|source| ChainError::Execution { number: 0, source })?;

        let mut header = Header {
            state_root: root,
            tx_root: EMPTY_ROOT_HASH,
            receipt_root: EMPTY_ROOT_HASH,
            coinbase: self.coinbase,
            difficulty: self.difficulty,
            gas_limit: self.gas_limit,
            time: self.timestamp,
            extra_data: self.extra_data.clone(),
            mix_digest: self.mix_digest,
            version: self.config.genesis_version(),
            ..Default::default()
        };
        header.set_nonce(self.nonce);
        Ok(Block::new(header, Body::default()))
    }

    /// Commit the genesis block and its metadata to the database.
    pub fn commit<K: KeyValue + ?Sized>(&self, db: &K) -> Result<Block> {
        let block = self.to_block(db)?;
        let hash = block.hash();

        let mut batch = WriteBatch::new();
        rawdb::write_block(&mut batch, &block);
        rawdb::write_td(&mut batch, 0, &hash, &block.header.difficulty);
        rawdb::write_canonical_hash(&mut batch, 0, &hash);
        db.write(batch)?;
        rawdb::write_head_block_hash(db, &hash)?;
        rawdb::write_head_header_hash(db, &hash)?;
        rawdb::write_chain_config(db, &hash, &self.config)?;

        info!(hash = %hash, chain_id = self.config.chain_id, "committed genesis block");
        Ok(block)
    }
}

/// Initialize or validate the genesis in `db`.
///
/// - Empty database: commits `genesis` and returns its config and hash.
/// - Existing database: the stored genesis hash must match the one the
///   spec computes, and the stored chain config must be compatible with
///   the configured one at the current head. An incompatibility is
///   returned as [`ChainError::IncompatibleConfig`]; the caller decides
///   whether to honor `rewind_to` (via set-head) and then persist the
///   new config.
pub fn setup_genesis<K: KeyValue + ?Sized>(db: &K, genesis: &Genesis) -> Result<(ChainConfig, B256)> {
    let stored = rawdb::read_canonical_hash(db, 0)?;
    let Some(stored_hash) = stored else {
        let block = genesis.commit(db)?;
        return Ok((genesis.config.clone(), block.hash()));
    };

    let computed = genesis.to_block(db)?.hash();
    if computed != stored_hash {
        return Err(ChainError::GenesisMismatch {
            stored: stored_hash,
            computed,
        });
    }

    let stored_config = rawdb::read_chain_config(db, &stored_hash)?;
    let Some(stored_config) = stored_config else {
        // config never persisted (pre-upgrade database); adopt the new one
        rawdb::write_chain_config(db, &stored_hash, &genesis.config)?;
        return Ok((genesis.config.clone(), stored_hash));
    };

    let head_number = match rawdb::read_head_block_hash(db)? {
        Some(head_hash) => rawdb::read_header_number(db, &head_hash)?.unwrap_or(0),
        None => 0,
    };
    if let Some(err) = stored_config.check_compatible(&genesis.config, head_number) {
        return Err(ChainError::IncompatibleConfig(err));
    }

    rawdb::write_chain_config(db, &stored_hash, &genesis.config)?;
    Ok((genesis.config.clone(), stored_hash))
}

#[cfg(test)]
mod tests {
    use super::*;
    use aquachain_params::{test_config, ForkMap};
    use aquachain_storage::MemoryKv;

    #[test]
    fn test_genesis_commit_and_setup() {
        let db = MemoryKv::new();
        let genesis = Genesis::dev([Address::repeat_byte(1)]);

        let (config, hash) = setup_genesis(&db, &genesis).unwrap();
        assert_eq!(config.chain_id, aquachain_params::dev().chain_id);
        assert_eq!(rawdb::read_canonical_hash(&db, 0).unwrap(), Some(hash));
        assert_eq!(rawdb::read_head_block_hash(&db).unwrap(), Some(hash));

        // second run against the same database is a no-op
        let (_, hash2) = setup_genesis(&db, &genesis).unwrap();
        assert_eq!(hash2, hash);
    }

    #[test]
    fn test_genesis_determinism() {
        let a = Genesis::dev([Address::repeat_byte(1)])
            .to_block(&MemoryKv::new())
            .unwrap();
        let b = Genesis::dev([Address::repeat_byte(1)])
            .to_block(&MemoryKv::new())
            .unwrap();
        assert_eq!(a.hash(), b.hash());

        // the allocation is part of the identity
        let c = Genesis::dev([Address::repeat_byte(2)])
            .to_block(&MemoryKv::new())
            .unwrap();
        assert_ne!(a.hash(), c.hash());
    }

    #[test]
    fn test_genesis_mismatch_detected() {
        let db = MemoryKv::new();
        setup_genesis(&db, &Genesis::dev([Address::repeat_byte(1)])).unwrap();

        let other = Genesis::dev([Address::repeat_byte(9)]);
        let err = setup_genesis(&db, &other).unwrap_err();
        assert!(matches!(err, ChainError::GenesisMismatch { .. }));
    }

    #[test]
    fn test_incompatible_config_carries_rewind() {
        let db = MemoryKv::new();
        let genesis = Genesis::new(test_config().clone());
        setup_genesis(&db, &genesis).unwrap();

        // fake a head that is already past HF2
        let head = genesis.to_block(&db).unwrap();
        let mut batch = WriteBatch::new();
        let fake_head = Header {
            number: 100,
            parent_hash: head.hash(),
            ..Default::default()
        };
        rawdb::write_header(&mut batch, &fake_head, &fake_head.hash());
        db.write(batch).unwrap();
        rawdb::write_head_block_hash(&db, &fake_head.hash()).unwrap();

        let mut conflicting = genesis.clone();
        conflicting.config.hf = ForkMap::from([(1, 1), (2, 50)]);
        let err = setup_genesis(&db, &conflicting).unwrap_err();
        match err {
            ChainError::IncompatibleConfig(compat) => {
                assert_eq!(compat.rewind_to, 1);
            }
            other => panic!("unexpected error: {other}"),
        }
    }
}
