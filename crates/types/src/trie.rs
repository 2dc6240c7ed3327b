//! Merkle-Patricia root helpers shared by headers and body validation.

use alloy_primitives::{keccak256, B256};
use alloy_rlp::Encodable;
use alloy_trie::{HashBuilder, Nibbles};

pub use alloy_trie::EMPTY_ROOT_HASH;

/// Compute the root of an index-keyed trie, as used for the transaction
/// and receipt roots: entry `i` is stored under `rlp(i)`.
pub fn ordered_trie_root(items: impl IntoIterator<Item = Vec<u8>>) -> B256 {
    let mut entries: Vec<(Vec<u8>, Vec<u8>)> = items
        .into_iter()
        .enumerate()
        .map(|(i, item)| {
            let mut key = Vec::new();
            (i as u64).encode(&mut key);
            (key, item)
        })
        .collect();

    if entries.is_empty() {
        return EMPTY_ROOT_HASH;
    }

    // HashBuilder requires leaves in ascending nibble order.
    entries.sort_by(|a, b| a.0.cmp(&b.0));

    let mut builder = HashBuilder::default();
    for (key, value) in &entries {
        builder.add_leaf(Nibbles::unpack(key), value);
    }
    builder.root()
}

/// Root over the RLP encodings of a slice of encodable items.
pub fn derive_root<T: Encodable>(items: &[T]) -> B256 {
    ordered_trie_root(items.iter().map(alloy_rlp::encode))
}

/// Keccak-256 of the RLP list encoding of `items`.
pub fn rlp_list_hash<T: Encodable>(items: &[T]) -> B256 {
    let mut out = Vec::new();
    alloy_rlp::encode_list(items, &mut out);
    keccak256(out)
}
