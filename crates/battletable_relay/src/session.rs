//! Write-through caches for one session's live state.

use battletable_protocol::{
    BattlefieldState, DiceState, RollHistory, RollRecord, RosterEntry, RosterSnapshot,
};

/// Live state for one session, mutated on every relayed event.
///
/// Each topic is `None` until the first mutation (or a store hydrate on a
/// cache miss). The caches are the read path for latest-state requests:
/// persistence trails behind and is never consulted while a cache is warm.
#[derive(Debug, Default)]
pub struct SessionState {
    /// Roster snapshot, once any roster mutation has landed.
    pub roster: Option<RosterSnapshot>,
    /// Shared dice configuration, once any dice mutation has landed.
    pub dice: Option<DiceState>,
    /// Bounded roll history ring.
    pub history: RollHistory,
    /// Battlefield state, once any battlefield mutation has landed.
    pub battlefield: Option<BattlefieldState>,
}

impl SessionState {
    /// Creates an empty session state.
    pub fn new() -> Self {
        Self::default()
    }

    /// The roster cache, created empty on first touch.
    pub fn roster_mut(&mut self) -> &mut RosterSnapshot {
        self.roster.get_or_insert_with(RosterSnapshot::default)
    }

    /// The battlefield cache, created with defaults on first touch.
    pub fn battlefield_mut(&mut self) -> &mut BattlefieldState {
        self.battlefield.get_or_insert_with(BattlefieldState::default)
    }

    /// Inserts or replaces a roster entry and keeps the order list
    /// consistent.
    pub fn upsert_monster(&mut self, entry: RosterEntry) {
        let roster = self.roster_mut();
        let id = entry.id.clone();
        roster.monsters.insert(id.clone(), entry);
        if !roster.order.contains(&id) {
            roster.order.push(id);
        }
    }

    /// Removes a roster entry. Returns true when it existed.
    pub fn remove_monster(&mut self, monster_id: &str) -> bool {
        let roster = self.roster_mut();
        let existed = roster.monsters.remove(monster_id).is_some();
        roster.order.retain(|id| id != monster_id);
        existed
    }

    /// Removes several roster entries, returning the ids that existed.
    /// Unknown ids are skipped.
    pub fn remove_monsters(&mut self, monster_ids: &[String]) -> Vec<String> {
        monster_ids
            .iter()
            .filter(|id| self.remove_monster(id))
            .cloned()
            .collect()
    }

    /// Replaces the roster display order wholesale.
    pub fn reorder(&mut self, order: Vec<String>) {
        let roster = self.roster_mut();
        for (index, id) in order.iter().enumerate() {
            if let Some(entry) = roster.monsters.get_mut(id) {
                entry.order_index = index as u32;
            }
        }
        roster.order = order;
    }

    /// Records a roll in the bounded history.
    pub fn record_roll(&mut self, record: RollRecord) {
        self.history.push(record);
    }

    /// Clears the dice configuration and roll history.
    pub fn reset_dice(&mut self) {
        self.dice = Some(DiceState::default());
        self.history.clear();
    }
}
