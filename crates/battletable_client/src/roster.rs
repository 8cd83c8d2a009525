//! Local roster state and snapshot reconciliation.

use crate::error::{ClientError, ClientResult};
use battletable_protocol::{RosterEntry, RosterSnapshot};
use tracing::debug;

/// What a snapshot reconciliation changed, for targeted UI refreshes.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct RosterDiff {
    /// Ids removed locally because the snapshot no longer has them.
    pub removed: Vec<String>,
    /// Ids added locally from the snapshot.
    pub added: Vec<String>,
    /// Ids whose fields changed.
    pub updated: Vec<String>,
}

impl RosterDiff {
    /// True when the snapshot matched the local state exactly.
    pub fn is_empty(&self) -> bool {
        self.removed.is_empty() && self.added.is_empty() && self.updated.is_empty()
    }
}

/// The local copy of the session roster.
///
/// Local edits apply immediately (the optimistic path) and the caller
/// publishes the matching event; remote events and snapshots flow in
/// through the `apply_*` and [`reconcile`] methods.
///
/// [`reconcile`]: RosterView::reconcile
#[derive(Debug, Default)]
pub struct RosterView {
    snapshot: RosterSnapshot,
}

impl RosterView {
    /// Creates an empty roster.
    pub fn new() -> Self {
        Self::default()
    }

    /// The entry for an id, if known.
    pub fn get(&self, id: &str) -> Option<&RosterEntry> {
        self.snapshot.monsters.get(id)
    }

    /// Entries in display order. Entries missing from the order list
    /// trail in id order.
    pub fn ordered(&self) -> Vec<&RosterEntry> {
        let mut seen: Vec<&RosterEntry> = self
            .snapshot
            .order
            .iter()
            .filter_map(|id| self.snapshot.monsters.get(id))
            .collect();
        for (id, entry) in &self.snapshot.monsters {
            if !self.snapshot.order.contains(id) {
                seen.push(entry);
            }
        }
        seen
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.snapshot.monsters.len()
    }

    /// True when the roster is empty.
    pub fn is_empty(&self) -> bool {
        self.snapshot.monsters.is_empty()
    }

    /// The full local snapshot.
    pub fn snapshot(&self) -> &RosterSnapshot {
        &self.snapshot
    }

    /// Adds an entry locally.
    pub fn add(&mut self, entry: RosterEntry) {
        let id = entry.id.clone();
        self.snapshot.monsters.insert(id.clone(), entry);
        if !self.snapshot.order.contains(&id) {
            self.snapshot.order.push(id);
        }
    }

    /// Mutates an entry locally, failing when the id is unknown.
    pub fn mutate(
        &mut self,
        id: &str,
        mutate: impl FnOnce(&mut RosterEntry),
    ) -> ClientResult<()> {
        let entry = self
            .snapshot
            .monsters
            .get_mut(id)
            .ok_or_else(|| ClientError::UnknownEntity(id.to_string()))?;
        mutate(entry);
        Ok(())
    }

    /// Removes an entry locally. Returns true when it existed.
    pub fn remove(&mut self, id: &str) -> bool {
        let existed = self.snapshot.monsters.remove(id).is_some();
        self.snapshot.order.retain(|other| other != id);
        existed
    }

    /// Ids of unlocked entries, the set a bulk reset deletes.
    pub fn unlocked_ids(&self) -> Vec<String> {
        self.snapshot
            .monsters
            .values()
            .filter(|entry| !entry.is_locked)
            .map(|entry| entry.id.clone())
            .collect()
    }

    /// Replaces the display order locally.
    pub fn reorder(&mut self, order: Vec<String>) {
        for (index, id) in order.iter().enumerate() {
            if let Some(entry) = self.snapshot.monsters.get_mut(id) {
                entry.order_index = index as u32;
            }
        }
        self.snapshot.order = order;
    }

    /// Applies a remote add-or-update.
    pub fn apply_monster_updated(&mut self, entry: RosterEntry) {
        self.add(entry);
    }

    /// Applies a remote delete.
    pub fn apply_monster_deleted(&mut self, id: &str) {
        self.remove(id);
    }

    /// Applies a remote batch delete.
    pub fn apply_batch_deleted(&mut self, ids: &[String]) {
        for id in ids {
            self.remove(id);
        }
    }

    /// Reconciles the local roster against an authoritative snapshot:
    /// removals first, then additions, then field updates, then the
    /// display order. Applying the same snapshot twice yields an empty
    /// diff.
    pub fn reconcile(&mut self, incoming: RosterSnapshot) -> RosterDiff {
        let mut diff = RosterDiff::default();

        let stale: Vec<String> = self
            .snapshot
            .monsters
            .keys()
            .filter(|id| !incoming.monsters.contains_key(*id))
            .cloned()
            .collect();
        for id in stale {
            self.remove(&id);
            diff.removed.push(id);
        }

        for (id, entry) in incoming.monsters {
            match self.snapshot.monsters.get(&id) {
                None => {
                    diff.added.push(id.clone());
                    self.add(entry);
                }
                Some(existing) if *existing != entry => {
                    diff.updated.push(id.clone());
                    self.snapshot.monsters.insert(id, entry);
                }
                Some(_) => {}
            }
        }

        if self.snapshot.order != incoming.order {
            self.reorder(incoming.order);
        }

        if !diff.is_empty() {
            debug!(
                removed = diff.removed.len(),
                added = diff.added.len(),
                updated = diff.updated.len(),
                "roster reconciled"
            );
        }
        diff
    }
}
