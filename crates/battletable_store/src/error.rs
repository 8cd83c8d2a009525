//! Error types for store operations.

use thiserror::Error;

/// Result type for store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Errors that can occur while loading or saving session documents.
#[derive(Debug, Error)]
pub enum StoreError {
    /// An I/O error occurred.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A stored document could not be decoded.
    #[error("document corrupted for session {session_id}: {detail}")]
    Corrupted {
        /// Session the document belongs to.
        session_id: String,
        /// What went wrong.
        detail: String,
    },

    /// The backing store rejected the operation.
    #[error("store unavailable: {0}")]
    Unavailable(String),
}
