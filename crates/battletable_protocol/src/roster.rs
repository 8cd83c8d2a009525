//! Roster entries (combatants) and their hit-point rules.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A tracked combatant: a monster or a player-controlled adventurer.
///
/// No client owns an entry; any participant may mutate any unlocked one.
/// `is_locked` is advisory only: it excludes the entry from bulk resets
/// but is not an access-control mechanism.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RosterEntry {
    /// Opaque client-generated id, stable for the combatant's lifetime.
    pub id: String,
    /// Display name.
    pub name: String,
    /// Current hit points, always within `[0, max_hp]`.
    pub current_hp: u32,
    /// Maximum hit points, at least 1.
    pub max_hp: u32,
    /// Temporary hit points, absorbed before `current_hp` on damage.
    #[serde(default)]
    pub temp_hp: u32,
    /// Whether this entry is a player-controlled adventurer.
    #[serde(default)]
    pub is_adventurer: bool,
    /// Active condition ids.
    #[serde(default)]
    pub conditions: Vec<String>,
    /// Advisory lock flag; locked entries survive bulk resets.
    #[serde(default)]
    pub is_locked: bool,
    /// Position in the roster display order.
    #[serde(default)]
    pub order_index: u32,
}

impl RosterEntry {
    /// Creates a new entry at full health with no conditions.
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        max_hp: u32,
        is_adventurer: bool,
    ) -> Self {
        let max_hp = max_hp.max(1);
        Self {
            id: id.into(),
            name: name.into(),
            current_hp: max_hp,
            max_hp,
            temp_hp: 0,
            is_adventurer,
            conditions: Vec::new(),
            is_locked: false,
            order_index: 0,
        }
    }

    /// Replaces the full HP triple, re-establishing the invariants:
    /// `max_hp >= 1` and `current_hp <= max_hp`.
    pub fn set_hp(&mut self, current_hp: u32, max_hp: u32, temp_hp: u32) {
        self.max_hp = max_hp.max(1);
        self.current_hp = current_hp.min(self.max_hp);
        self.temp_hp = temp_hp;
    }

    /// Applies damage, absorbing it with temporary HP first; overflow is
    /// subtracted from current HP, which never drops below zero.
    pub fn apply_damage(&mut self, amount: u32) {
        let absorbed = self.temp_hp.min(amount);
        self.temp_hp -= absorbed;
        let remaining = amount - absorbed;
        self.current_hp = self.current_hp.saturating_sub(remaining);
    }

    /// Applies healing, clamped at `max_hp`. Temporary HP is unaffected.
    pub fn apply_heal(&mut self, amount: u32) {
        self.current_hp = (self.current_hp + amount).min(self.max_hp);
    }

    /// Returns true while the combatant has hit points left.
    pub fn is_alive(&self) -> bool {
        self.current_hp > 0
    }
}

/// A full roster snapshot: the authoritative monster map plus display order.
///
/// Served in response to a latest-state request and reconciled against the
/// local roster with a three-way diff on the receiving side.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RosterSnapshot {
    /// All entries keyed by id.
    pub monsters: BTreeMap<String, RosterEntry>,
    /// Display order as a list of entry ids.
    #[serde(default)]
    pub order: Vec<String>,
}

impl RosterSnapshot {
    /// Returns true when the snapshot has no entries.
    pub fn is_empty(&self) -> bool {
        self.monsters.is_empty()
    }
}
