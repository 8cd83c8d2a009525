//! Error types for the protocol crate.

use thiserror::Error;

/// Result type for protocol operations.
pub type ProtocolResult<T> = Result<T, ProtocolError>;

/// Errors that can occur while encoding, decoding, or assembling messages.
#[derive(Error, Debug)]
pub enum ProtocolError {
    /// JSON encoding or decoding failed.
    #[error("codec error: {0}")]
    Codec(#[from] serde_json::Error),

    /// A chunk arrived for a transfer that was never started (or already
    /// completed or expired).
    #[error("unknown transfer: {transfer_id}")]
    UnknownTransfer {
        /// The transfer id carried by the chunk.
        transfer_id: String,
    },

    /// A transfer was started twice with the same id.
    #[error("transfer already in progress: {transfer_id}")]
    DuplicateTransfer {
        /// The repeated transfer id.
        transfer_id: String,
    },

    /// A chunk index fell outside the announced chunk count.
    #[error("chunk index {index} out of range for {total} chunks")]
    ChunkIndexOutOfRange {
        /// Offending chunk index.
        index: u32,
        /// Announced total chunk count.
        total: u32,
    },

    /// The final chunk arrived but earlier chunks are missing.
    #[error("transfer {transfer_id} incomplete: {missing} chunk(s) missing")]
    IncompleteTransfer {
        /// The transfer id.
        transfer_id: String,
        /// How many chunks never arrived.
        missing: u32,
    },

    /// A transfer announced more chunks than any accepted payload needs.
    #[error("transfer {transfer_id} announced {total_chunks} chunks, limit {max}")]
    TooManyChunks {
        /// The transfer id.
        transfer_id: String,
        /// Announced chunk count.
        total_chunks: u32,
        /// Largest chunk count an accepted payload can need.
        max: u32,
    },

    /// A payload exceeds the hard size limit and must not be sent at all.
    #[error("payload of {len} bytes exceeds limit of {max} bytes")]
    PayloadTooLarge {
        /// Actual payload length.
        len: usize,
        /// Maximum accepted length.
        max: usize,
    },
}
