//! Session store trait definition.

use crate::document::{BattlefieldDocument, DiceDocument, RosterDocument};
use crate::error::StoreResult;

/// Persistence for per-session documents.
///
/// Stores are **whole-document** key-value maps keyed by session id: every
/// save replaces the previous document for that session, and loads return
/// the latest saved one or `None` for a session never written. There is no
/// partial update and no cross-document transaction; the relay's in-memory
/// caches are the live truth and the store only has to catch up eventually.
///
/// Implementations must be `Send + Sync`; the relay calls them from its
/// persistence worker while readers serve cache misses.
pub trait SessionStore: Send + Sync {
    /// Loads the roster document for a session.
    fn load_roster(&self, session_id: &str) -> StoreResult<Option<RosterDocument>>;

    /// Saves a roster document, replacing any previous one.
    fn save_roster(&self, doc: &RosterDocument) -> StoreResult<()>;

    /// Loads the dice document for a session.
    fn load_dice(&self, session_id: &str) -> StoreResult<Option<DiceDocument>>;

    /// Saves a dice document, replacing any previous one.
    fn save_dice(&self, doc: &DiceDocument) -> StoreResult<()>;

    /// Loads the battlefield document for a session.
    fn load_battlefield(&self, session_id: &str) -> StoreResult<Option<BattlefieldDocument>>;

    /// Saves a battlefield document, replacing any previous one.
    fn save_battlefield(&self, doc: &BattlefieldDocument) -> StoreResult<()>;

    /// Deletes every document belonging to a session.
    fn delete_session(&self, session_id: &str) -> StoreResult<()>;

    /// Ids of all sessions with at least one stored document.
    fn session_ids(&self) -> StoreResult<Vec<String>>;
}
