//! Storage error types

use thiserror::Error;

/// Errors from the key-value backend or the schema layer.
#[derive(Debug, Error)]
pub enum StorageError {
    /// Backend read/write failure
    #[error("database error: {0}")]
    Database(String),

    /// Stored bytes failed to decode
    #[error("corrupt database entry for {what}: {reason}")]
    Corrupt {
        /// What was being decoded
        what: &'static str,
        /// Decoder failure detail
        reason: String,
    },

    /// IO error from a file-backed backend
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl StorageError {
    pub(crate) fn corrupt(what: &'static str, reason: impl ToString) -> Self {
        Self::Corrupt {
            what,
            reason: reason.to_string(),
        }
    }
}
