//! Database key layout.
//!
//! - `h` + num (8B BE) + hash → header RLP
//! - `h` + num (8B BE) + hash + `t` → total difficulty RLP
//! - `b` + num (8B BE) + hash → body RLP
//! - `r` + num (8B BE) + hash → receipts RLP
//! - `H` + hash → num (8B BE)
//! - `n` + num (8B BE) → canonical hash
//! - `LastBlock` → head block hash
//! - `LastHeader` → head header hash
//! - `bloomBits-` + varint(bit) + varint(section) + section head hash → compressed bitset
//! - `aquachain-config-` + genesis hash → chain config JSON
//! - `S` + state root → state snapshot RLP

use alloy_primitives::B256;

/// Key of the current head block hash.
pub const HEAD_BLOCK_KEY: &[u8] = b"LastBlock";
/// Key of the current head header hash.
pub const HEAD_HEADER_KEY: &[u8] = b"LastHeader";
/// Key of the number of fully indexed bloom-bits sections.
pub const BLOOM_SECTIONS_KEY: &[u8] = b"bloomSections";

const HEADER_PREFIX: u8 = b'h';
const BODY_PREFIX: u8 = b'b';
const RECEIPTS_PREFIX: u8 = b'r';
const HEADER_NUMBER_PREFIX: u8 = b'H';
const CANONICAL_PREFIX: u8 = b'n';
const TD_SUFFIX: u8 = b't';
const BLOOM_BITS_PREFIX: &[u8] = b"bloomBits-";
const CONFIG_PREFIX: &[u8] = b"aquachain-config-";
const STATE_PREFIX: u8 = b'S';

fn num_hash_key(prefix: u8, number: u64, hash: &B256) -> Vec<u8> {
    let mut key = Vec::with_capacity(1 + 8 + 32);
    key.push(prefix);
    key.extend_from_slice(&number.to_be_bytes());
    key.extend_from_slice(hash.as_slice());
    key
}

/// `h` + num + hash → header RLP
pub fn header_key(number: u64, hash: &B256) -> Vec<u8> {
    num_hash_key(HEADER_PREFIX, number, hash)
}

/// `h` + num + hash + `t` → total difficulty
pub fn td_key(number: u64, hash: &B256) -> Vec<u8> {
    let mut key = header_key(number, hash);
    key.push(TD_SUFFIX);
    key
}

/// `b` + num + hash → body RLP
pub fn body_key(number: u64, hash: &B256) -> Vec<u8> {
    num_hash_key(BODY_PREFIX, number, hash)
}

/// `r` + num + hash → receipts RLP
pub fn receipts_key(number: u64, hash: &B256) -> Vec<u8> {
    num_hash_key(RECEIPTS_PREFIX, number, hash)
}

/// `H` + hash → num
pub fn header_number_key(hash: &B256) -> Vec<u8> {
    let mut key = Vec::with_capacity(1 + 32);
    key.push(HEADER_NUMBER_PREFIX);
    key.extend_from_slice(hash.as_slice());
    key
}

/// `n` + num → canonical hash
pub fn canonical_key(number: u64) -> Vec<u8> {
    let mut key = Vec::with_capacity(1 + 8);
    key.push(CANONICAL_PREFIX);
    key.extend_from_slice(&number.to_be_bytes());
    key
}

/// `bloomBits-` + varint(bit) + varint(section) + head hash → bitset
pub fn bloom_bits_key(bit: u32, section: u64, head: &B256) -> Vec<u8> {
    let mut key = Vec::with_capacity(BLOOM_BITS_PREFIX.len() + 10 + 32);
    key.extend_from_slice(BLOOM_BITS_PREFIX);
    put_uvarint(&mut key, bit as u64);
    put_uvarint(&mut key, section);
    key.extend_from_slice(head.as_slice());
    key
}

/// `aquachain-config-` + genesis hash → config JSON
pub fn config_key(genesis: &B256) -> Vec<u8> {
    let mut key = Vec::with_capacity(CONFIG_PREFIX.len() + 32);
    key.extend_from_slice(CONFIG_PREFIX);
    key.extend_from_slice(genesis.as_slice());
    key
}

/// `S` + root → state snapshot RLP
pub fn state_key(root: &B256) -> Vec<u8> {
    let mut key = Vec::with_capacity(1 + 32);
    key.push(STATE_PREFIX);
    key.extend_from_slice(root.as_slice());
    key
}

/// Unsigned LEB128, as used inside bloom-bits keys.
pub fn put_uvarint(out: &mut Vec<u8>, mut v: u64) {
    while v >= 0x80 {
        out.push((v as u8) | 0x80);
        v >>= 7;
    }
    out.push(v as u8);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_shapes() {
        let hash = B256::repeat_byte(0xab);
        let key = header_key(0x0102, &hash);
        assert_eq!(key[0], b'h');
        assert_eq!(&key[1..9], &0x0102u64.to_be_bytes());
        assert_eq!(&key[9..], hash.as_slice());

        assert_eq!(td_key(0x0102, &hash).last(), Some(&b't'));
        assert_eq!(canonical_key(5).len(), 9);
        assert_eq!(header_number_key(&hash).len(), 33);
    }

    #[test]
    fn test_uvarint() {
        let mut out = Vec::new();
        put_uvarint(&mut out, 0);
        assert_eq!(out, [0]);
        out.clear();
        put_uvarint(&mut out, 127);
        assert_eq!(out, [127]);
        out.clear();
        put_uvarint(&mut out, 300);
        assert_eq!(out, [0xac, 0x02]);
    }

    #[test]
    fn test_bloom_keys_distinct() {
        let head = B256::repeat_byte(1);
        let a = bloom_bits_key(1, 2, &head);
        let b = bloom_bits_key(2, 1, &head);
        assert_ne!(a, b);
    }
}
