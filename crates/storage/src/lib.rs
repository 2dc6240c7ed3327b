//! Chain storage: an abstract key-value backend plus the database
//! schema used by the chain engine.
//!
//! # Architecture
//!
//! The engine consumes any backend implementing [`KeyValue`]
//! (`get/put/delete/iter/batch`). [`MemoryKv`] is the in-memory
//! implementation used by tests and development nodes; a production
//! backend plugs in behind the same trait.
//!
//! [`rawdb`] holds the typed accessors over the raw schema: headers,
//! bodies, receipts, total difficulty, the canonical number index, head
//! pointers, bloom-bits sections and the stored chain config.

pub mod error;
pub mod kv;
pub mod rawdb;
pub mod schema;

pub use error::StorageError;
pub use kv::{BatchOp, KeyValue, MemoryKv, WriteBatch};

/// Result type for storage operations.
pub type Result<T> = std::result::Result<T, StorageError>;
