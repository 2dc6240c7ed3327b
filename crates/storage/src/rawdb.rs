//! Typed accessors over the raw database schema.
//!
//! Writers take a [`WriteBatch`] where multiple entries must land
//! together (block insertion); single-entry writers go straight to the
//! backend.

use alloy_primitives::{B256, U256};
use alloy_rlp::Decodable;
use aquachain_params::ChainConfig;
use aquachain_types::{Block, Body, Header, Receipt};
use tracing::error;

use crate::kv::{KeyValue, WriteBatch};
use crate::schema;
use crate::{Result, StorageError};

/// Hash of the canonical block at `number`.
pub fn read_canonical_hash<K: KeyValue + ?Sized>(db: &K, number: u64) -> Result<Option<B256>> {
    let Some(raw) = db.get(&schema::canonical_key(number))? else {
        return Ok(None);
    };
    if raw.len() != 32 {
        return Err(StorageError::corrupt("canonical hash", "bad length"));
    }
    Ok(Some(B256::from_slice(&raw)))
}

/// Map `number` to `hash` in the canonical index.
pub fn write_canonical_hash(batch: &mut WriteBatch, number: u64, hash: &B256) {
    batch.put(schema::canonical_key(number), hash.as_slice());
}

/// Remove the canonical mapping at `number`.
pub fn delete_canonical_hash(batch: &mut WriteBatch, number: u64) {
    batch.delete(schema::canonical_key(number));
}

/// The number stored for a header hash.
pub fn read_header_number<K: KeyValue + ?Sized>(db: &K, hash: &B256) -> Result<Option<u64>> {
    let Some(raw) = db.get(&schema::header_number_key(hash))? else {
        return Ok(None);
    };
    let bytes: [u8; 8] = raw
        .as_slice()
        .try_into()
        .map_err(|_| StorageError::corrupt("header number", "bad length"))?;
    Ok(Some(u64::from_be_bytes(bytes)))
}

/// Hash of the current head block.
pub fn read_head_block_hash<K: KeyValue + ?Sized>(db: &K) -> Result<Option<B256>> {
    let Some(raw) = db.get(schema::HEAD_BLOCK_KEY)? else {
        return Ok(None);
    };
    Ok(Some(B256::from_slice(&raw)))
}

/// Persist the head block hash.
pub fn write_head_block_hash<K: KeyValue + ?Sized>(db: &K, hash: &B256) -> Result<()> {
    db.put(schema::HEAD_BLOCK_KEY, hash.as_slice())
}

/// Hash of the current head header (may be ahead of the head block
/// during header-first sync).
pub fn read_head_header_hash<K: KeyValue + ?Sized>(db: &K) -> Result<Option<B256>> {
    let Some(raw) = db.get(schema::HEAD_HEADER_KEY)? else {
        return Ok(None);
    };
    Ok(Some(B256::from_slice(&raw)))
}

/// Persist the head header hash.
pub fn write_head_header_hash<K: KeyValue + ?Sized>(db: &K, hash: &B256) -> Result<()> {
    db.put(schema::HEAD_HEADER_KEY, hash.as_slice())
}

/// Store a header under its number and hash, plus the hash → number
/// index entry.
pub fn write_header(batch: &mut WriteBatch, header: &Header, hash: &B256) {
    batch.put(
        schema::header_number_key(hash),
        header.number.to_be_bytes().to_vec(),
    );
    batch.put(
        schema::header_key(header.number, hash),
        alloy_rlp::encode(header),
    );
}

/// Read a header by number and hash.
pub fn read_header<K: KeyValue + ?Sized>(
    db: &K,
    number: u64,
    hash: &B256,
) -> Result<Option<Header>> {
    let Some(raw) = db.get(&schema::header_key(number, hash))? else {
        return Ok(None);
    };
    Header::decode(&mut raw.as_slice())
        .map(Some)
        .map_err(|e| StorageError::corrupt("header", e))
}

/// Whether a header is stored for `(number, hash)`.
pub fn has_header<K: KeyValue + ?Sized>(db: &K, number: u64, hash: &B256) -> Result<bool> {
    Ok(db.get(&schema::header_key(number, hash))?.is_some())
}

/// Store a block body.
pub fn write_body(batch: &mut WriteBatch, number: u64, hash: &B256, body: &Body) {
    batch.put(schema::body_key(number, hash), alloy_rlp::encode(body));
}

/// Read a block body.
pub fn read_body<K: KeyValue + ?Sized>(db: &K, number: u64, hash: &B256) -> Result<Option<Body>> {
    let Some(raw) = db.get(&schema::body_key(number, hash))? else {
        return Ok(None);
    };
    Body::decode(&mut raw.as_slice())
        .map(Some)
        .map_err(|e| StorageError::corrupt("body", e))
}

/// Store the receipts of a block.
pub fn write_receipts(batch: &mut WriteBatch, number: u64, hash: &B256, receipts: &[Receipt]) {
    let mut out = Vec::new();
    alloy_rlp::encode_list(receipts, &mut out);
    batch.put(schema::receipts_key(number, hash), out);
}

/// Read the receipts of a block.
pub fn read_receipts<K: KeyValue + ?Sized>(
    db: &K,
    number: u64,
    hash: &B256,
) -> Result<Option<Vec<Receipt>>> {
    let Some(raw) = db.get(&schema::receipts_key(number, hash))? else {
        return Ok(None);
    };
    Vec::<Receipt>::decode(&mut raw.as_slice())
        .map(Some)
        .map_err(|e| StorageError::corrupt("receipts", e))
}

/// Store the total difficulty of a block.
pub fn write_td(batch: &mut WriteBatch, number: u64, hash: &B256, td: &U256) {
    batch.put(schema::td_key(number, hash), alloy_rlp::encode(td));
}

/// Read the total difficulty of a block.
pub fn read_td<K: KeyValue + ?Sized>(db: &K, number: u64, hash: &B256) -> Result<Option<U256>> {
    let Some(raw) = db.get(&schema::td_key(number, hash))? else {
        return Ok(None);
    };
    U256::decode(&mut raw.as_slice())
        .map(Some)
        .map_err(|e| StorageError::corrupt("total difficulty", e))
}

/// Store a full block (header, hash → number index, body).
pub fn write_block(batch: &mut WriteBatch, block: &Block) {
    let hash = block.hash();
    write_header(batch, &block.header, &hash);
    write_body(batch, block.number(), &hash, &block.body);
}

/// Read a full block by number and hash.
pub fn read_block<K: KeyValue + ?Sized>(db: &K, number: u64, hash: &B256) -> Result<Option<Block>> {
    let Some(header) = read_header(db, number, hash)? else {
        return Ok(None);
    };
    let Some(body) = read_body(db, number, hash)? else {
        return Ok(None);
    };
    Ok(Some(Block::new(header, body)))
}

/// Remove everything stored for a block.
pub fn delete_block(batch: &mut WriteBatch, number: u64, hash: &B256) {
    batch.delete(schema::header_key(number, hash));
    batch.delete(schema::header_number_key(hash));
    batch.delete(schema::body_key(number, hash));
    batch.delete(schema::receipts_key(number, hash));
    batch.delete(schema::td_key(number, hash));
}

/// Store the chain config under its genesis hash.
pub fn write_chain_config<K: KeyValue + ?Sized>(
    db: &K,
    genesis: &B256,
    config: &ChainConfig,
) -> Result<()> {
    let encoded = serde_json::to_vec(config)
        .map_err(|e| StorageError::Database(format!("encode chain config: {e}")))?;
    db.put(&schema::config_key(genesis), &encoded)
}

/// Read the chain config stored for a genesis hash.
pub fn read_chain_config<K: KeyValue + ?Sized>(
    db: &K,
    genesis: &B256,
) -> Result<Option<ChainConfig>> {
    let Some(raw) = db.get(&schema::config_key(genesis))? else {
        return Ok(None);
    };
    match serde_json::from_slice(&raw) {
        Ok(cfg) => Ok(Some(cfg)),
        Err(e) => {
            error!(genesis = %genesis, err = %e, "stored chain config is unreadable");
            Err(StorageError::corrupt("chain config", e))
        }
    }
}

/// Store one compressed bloom-bits bitset.
pub fn write_bloom_bits<K: KeyValue + ?Sized>(
    db: &K,
    bit: u32,
    section: u64,
    head: &B256,
    bits: &[u8],
) -> Result<()> {
    db.put(&schema::bloom_bits_key(bit, section, head), bits)
}

/// Read one compressed bloom-bits bitset.
pub fn read_bloom_bits<K: KeyValue + ?Sized>(
    db: &K,
    bit: u32,
    section: u64,
    head: &B256,
) -> Result<Option<Vec<u8>>> {
    db.get(&schema::bloom_bits_key(bit, section, head))
}
