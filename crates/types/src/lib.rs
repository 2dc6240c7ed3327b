//! Core chain types: headers, blocks, transactions, receipts, accounts.
//!
//! Everything here is consensus-critical: the RLP encodings decide block
//! hashes and the roots committed into headers. The header's hash
//! function is selected by its [version](aquachain_params::HeaderVersion),
//! which is derived from the chain config and never serialized.

pub mod account;
pub mod block;
pub mod error;
pub mod header;
pub mod receipt;
pub mod transaction;
pub mod trie;

pub use account::{Account, KECCAK_EMPTY};
pub use block::{Block, Body};
pub use error::TypesError;
pub use header::{BlockNonce, Header, EMPTY_UNCLE_HASH};
pub use receipt::{create_bloom, logs_bloom, Log, Receipt};
pub use transaction::{Signer, Transaction};
pub use trie::{ordered_trie_root, EMPTY_ROOT_HASH};

/// Result type for fallible type-level operations.
pub type Result<T> = std::result::Result<T, TypesError>;
