//! Error types for the client.

use thiserror::Error;

/// Result type for client operations.
pub type ClientResult<T> = Result<T, ClientError>;

/// Errors that can occur in the client-side reconciler.
#[derive(Debug, Error)]
pub enum ClientError {
    /// The link to the relay is down.
    #[error("not connected")]
    NotConnected,

    /// An edit was attempted before the initial snapshots arrived.
    #[error("session not synchronized yet")]
    NotSynchronized,

    /// The edit targets an entity the local state does not know.
    #[error("unknown entity: {0}")]
    UnknownEntity(String),

    /// Encoding, decoding, or payload-size rules were violated.
    #[error(transparent)]
    Protocol(#[from] battletable_protocol::ProtocolError),

    /// The link rejected a send.
    #[error("link error: {0}")]
    Link(String),
}
