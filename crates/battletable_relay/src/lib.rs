//! # Battletable Relay
//!
//! The session relay and broadcast engine for battletable.
//!
//! The relay is the hub of a star topology: browser clients publish
//! [`battletable_protocol::ClientEvent`]s, and the relay validates each
//! one, applies it to the session's in-memory cache, queues a best-effort
//! document write, and fans the resulting
//! [`battletable_protocol::ServerEvent`] out to every other member of the
//! session room. It never originates mutations of its own.
//!
//! The crate is transport-agnostic: a WebSocket front end (or an
//! in-process loopback in tests) owns the connections and forwards
//! decoded events to [`Relay::handle_event`].

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod config;
mod error;
mod persist;
mod relay;
mod rooms;
mod session;

pub use config::RelayConfig;
pub use error::{RelayError, RelayResult};
pub use persist::{PersistQueue, PersistTask, PersistWorker};
pub use relay::Relay;
pub use rooms::{ClientId, RoomRegistry};
pub use session::SessionState;
