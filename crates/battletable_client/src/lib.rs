//! # Battletable Client
//!
//! The client-side reconciler for battletable sessions.
//!
//! A [`SessionClient`] keeps local copies of the three shared topics
//! (roster, dice tray, battlefield) and keeps them aligned with the relay:
//!
//! - Local edits apply immediately and publish optimistically; rapid
//!   bursts (HP steppers, name typing) collapse through a trailing-edge
//!   [`Debouncer`] so only the final value hits the wire.
//! - Inbound events apply without acknowledgement; full snapshots
//!   reconcile via diffing rather than wholesale replacement, so unrelated
//!   local state survives.
//! - A connect walks the [`ConnectionStatus`] state machine and gates
//!   edits until the initial snapshot of every topic has arrived.
//!
//! The network itself sits behind the [`RelayLink`] trait; tests wire a
//! [`MockLink`] or an in-process loopback to a relay.

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod battlefield;
mod client;
mod config;
mod connection;
mod debounce;
mod dice;
mod error;
mod roster;

pub use battlefield::{BackgroundSend, BattlefieldView};
pub use client::{MockLink, RelayLink, SessionClient};
pub use config::ClientConfig;
pub use connection::{ConnectionStatus, ConnectionTracker};
pub use debounce::{Debouncer, FieldClass};
pub use dice::DiceView;
pub use error::{ClientError, ClientResult};
pub use roster::{RosterDiff, RosterView};
