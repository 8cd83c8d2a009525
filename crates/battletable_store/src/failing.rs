//! A store that fails on demand, for exercising degraded-persistence paths.

use crate::document::{BattlefieldDocument, DiceDocument, RosterDocument};
use crate::error::{StoreError, StoreResult};
use crate::memory::MemoryStore;
use crate::store::SessionStore;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

/// Wraps a [`MemoryStore`] and fails every operation while tripped.
///
/// The relay must stay fully functional when persistence is down; tests
/// flip `set_failing` mid-run to prove it. `write_count` counts successful
/// saves, which lets tests observe the write-behind queue draining.
#[derive(Debug, Default)]
pub struct FailingStore {
    inner: MemoryStore,
    failing: AtomicBool,
    writes: AtomicUsize,
}

impl FailingStore {
    /// Creates a store that starts healthy.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Trips or heals the store.
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    /// Number of saves that have succeeded.
    pub fn write_count(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    fn check(&self) -> StoreResult<()> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("injected failure".into()));
        }
        Ok(())
    }

    fn record_write(&self) {
        self.writes.fetch_add(1, Ordering::SeqCst);
    }
}

impl SessionStore for FailingStore {
    fn load_roster(&self, session_id: &str) -> StoreResult<Option<RosterDocument>> {
        self.check()?;
        self.inner.load_roster(session_id)
    }

    fn save_roster(&self, doc: &RosterDocument) -> StoreResult<()> {
        self.check()?;
        self.inner.save_roster(doc)?;
        self.record_write();
        Ok(())
    }

    fn load_dice(&self, session_id: &str) -> StoreResult<Option<DiceDocument>> {
        self.check()?;
        self.inner.load_dice(session_id)
    }

    fn save_dice(&self, doc: &DiceDocument) -> StoreResult<()> {
        self.check()?;
        self.inner.save_dice(doc)?;
        self.record_write();
        Ok(())
    }

    fn load_battlefield(&self, session_id: &str) -> StoreResult<Option<BattlefieldDocument>> {
        self.check()?;
        self.inner.load_battlefield(session_id)
    }

    fn save_battlefield(&self, doc: &BattlefieldDocument) -> StoreResult<()> {
        self.check()?;
        self.inner.save_battlefield(doc)?;
        self.record_write();
        Ok(())
    }

    fn delete_session(&self, session_id: &str) -> StoreResult<()> {
        self.check()?;
        self.inner.delete_session(session_id)
    }

    fn session_ids(&self) -> StoreResult<Vec<String>> {
        self.check()?;
        self.inner.session_ids()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use battletable_protocol::RosterSnapshot;

    #[test]
    fn healthy_store_passes_through() {
        let store = FailingStore::new();
        store
            .save_roster(&RosterDocument::new("s1", RosterSnapshot::default()))
            .unwrap();
        assert_eq!(store.write_count(), 1);
        assert!(store.load_roster("s1").unwrap().is_some());
    }

    #[test]
    fn tripped_store_fails_everything() {
        let store = FailingStore::new();
        store.set_failing(true);
        assert!(store.load_roster("s1").is_err());
        assert!(store
            .save_roster(&RosterDocument::new("s1", RosterSnapshot::default()))
            .is_err());
        assert_eq!(store.write_count(), 0);

        store.set_failing(false);
        assert!(store.load_roster("s1").unwrap().is_none());
    }
}
