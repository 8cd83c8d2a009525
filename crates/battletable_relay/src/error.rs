//! Error types for the relay.

use thiserror::Error;

/// Result type for relay operations.
pub type RelayResult<T> = Result<T, RelayError>;

/// Errors that can occur while processing client events.
///
/// Store failures never appear here: persistence is best-effort and a
/// failed read or write is logged, not propagated.
#[derive(Debug, Error)]
pub enum RelayError {
    /// A chunked transfer violated the protocol.
    #[error(transparent)]
    Protocol(#[from] battletable_protocol::ProtocolError),
}
