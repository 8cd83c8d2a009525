//! In-memory session store.

use crate::document::{BattlefieldDocument, DiceDocument, RosterDocument};
use crate::error::StoreResult;
use crate::store::SessionStore;
use parking_lot::RwLock;
use std::collections::BTreeSet;
use std::collections::HashMap;

/// An in-memory session store.
///
/// Documents live in maps keyed by session id. Suitable for tests and for
/// ephemeral deployments where losing session documents on restart is
/// acceptable.
///
/// # Thread Safety
///
/// All maps sit behind [`parking_lot::RwLock`]; the store can be shared
/// across threads.
#[derive(Debug, Default)]
pub struct MemoryStore {
    rosters: RwLock<HashMap<String, RosterDocument>>,
    dice: RwLock<HashMap<String, DiceDocument>>,
    battlefields: RwLock<HashMap<String, BattlefieldDocument>>,
}

impl MemoryStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Total number of stored documents across all kinds.
    pub fn document_count(&self) -> usize {
        self.rosters.read().len() + self.dice.read().len() + self.battlefields.read().len()
    }
}

impl SessionStore for MemoryStore {
    fn load_roster(&self, session_id: &str) -> StoreResult<Option<RosterDocument>> {
        Ok(self.rosters.read().get(session_id).cloned())
    }

    fn save_roster(&self, doc: &RosterDocument) -> StoreResult<()> {
        self.rosters
            .write()
            .insert(doc.session_id.clone(), doc.clone());
        Ok(())
    }

    fn load_dice(&self, session_id: &str) -> StoreResult<Option<DiceDocument>> {
        Ok(self.dice.read().get(session_id).cloned())
    }

    fn save_dice(&self, doc: &DiceDocument) -> StoreResult<()> {
        self.dice.write().insert(doc.session_id.clone(), doc.clone());
        Ok(())
    }

    fn load_battlefield(&self, session_id: &str) -> StoreResult<Option<BattlefieldDocument>> {
        Ok(self.battlefields.read().get(session_id).cloned())
    }

    fn save_battlefield(&self, doc: &BattlefieldDocument) -> StoreResult<()> {
        self.battlefields
            .write()
            .insert(doc.session_id.clone(), doc.clone());
        Ok(())
    }

    fn delete_session(&self, session_id: &str) -> StoreResult<()> {
        self.rosters.write().remove(session_id);
        self.dice.write().remove(session_id);
        self.battlefields.write().remove(session_id);
        Ok(())
    }

    fn session_ids(&self) -> StoreResult<Vec<String>> {
        let mut ids = BTreeSet::new();
        ids.extend(self.rosters.read().keys().cloned());
        ids.extend(self.dice.read().keys().cloned());
        ids.extend(self.battlefields.read().keys().cloned());
        Ok(ids.into_iter().collect())
    }
}
