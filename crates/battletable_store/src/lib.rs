//! # Battletable Store
//!
//! Per-session document persistence for battletable.
//!
//! The relay keeps live state in memory and writes documents through a
//! [`SessionStore`] on a best-effort basis: one whole document per session
//! and kind (roster, dice, battlefield), replaced on every save. This
//! crate defines the trait, the document shapes, and two implementations:
//! [`MemoryStore`] for tests and ephemeral deployments, and
//! [`FailingStore`] for exercising degraded-persistence paths.

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod document;
mod error;
mod failing;
mod memory;
mod store;

pub use document::{
    unix_time_ms, BattlefieldDocument, DiceDocument, RosterDocument,
};
pub use error::{StoreError, StoreResult};
pub use failing::FailingStore;
pub use memory::MemoryStore;
pub use store::SessionStore;
