//! Dice configuration, roll records, and the bounded roll history.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, VecDeque};

/// Highest count a single die type may be set to.
pub const MAX_DIE_COUNT: u32 = 99;

/// Maximum number of roll records retained per session.
pub const MAX_ROLL_HISTORY: usize = 20;

/// The shared dice configuration for a session.
///
/// `advantage` and `disadvantage` are mutually exclusive; the setters
/// enforce it and `normalize` re-establishes it for values that arrived
/// off the wire.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DiceState {
    /// Die counts keyed by die label (`"d4"` .. `"d100"`).
    #[serde(default)]
    pub dice: BTreeMap<String, u32>,
    /// Roll each die twice, keep the higher result.
    #[serde(default)]
    pub advantage: bool,
    /// Roll each die twice, keep the lower result.
    #[serde(default)]
    pub disadvantage: bool,
}

impl DiceState {
    /// Sets the count for a die type, clamped to `[0, 99]`.
    pub fn set_count(&mut self, die: impl Into<String>, count: u32) {
        self.dice.insert(die.into(), count.min(MAX_DIE_COUNT));
    }

    /// Adjusts the count for a die type by a signed delta, clamped to
    /// `[0, 99]`.
    pub fn adjust_count(&mut self, die: &str, delta: i32) {
        let current = self.dice.get(die).copied().unwrap_or(0) as i64;
        let next = (current + i64::from(delta)).clamp(0, i64::from(MAX_DIE_COUNT)) as u32;
        self.dice.insert(die.to_string(), next);
    }

    /// Enables or disables advantage; enabling clears disadvantage.
    pub fn set_advantage(&mut self, enabled: bool) {
        self.advantage = enabled;
        if enabled {
            self.disadvantage = false;
        }
    }

    /// Enables or disables disadvantage; enabling clears advantage.
    pub fn set_disadvantage(&mut self, enabled: bool) {
        self.disadvantage = enabled;
        if enabled {
            self.advantage = false;
        }
    }

    /// Total number of dice currently selected.
    pub fn total_dice(&self) -> u32 {
        self.dice.values().sum()
    }

    /// Re-establishes the invariants on a state received off the wire:
    /// counts clamped to `[0, 99]`, and disadvantage cleared if both
    /// flags arrived set.
    pub fn normalize(&mut self) {
        for count in self.dice.values_mut() {
            *count = (*count).min(MAX_DIE_COUNT);
        }
        if self.advantage && self.disadvantage {
            self.disadvantage = false;
        }
    }
}

/// Parses the number of sides from a die label such as `"d20"`.
pub fn die_sides(label: &str) -> Option<u32> {
    let rest = label.strip_prefix(['d', 'D'])?;
    let sides: u32 = rest.parse().ok()?;
    (sides >= 2).then_some(sides)
}

/// A single die result.
///
/// Under advantage or disadvantage each die is rolled twice and the pair
/// is kept alongside the chosen result; otherwise the result is a bare
/// integer. The untagged representation matches both wire shapes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum DieRoll {
    /// A twice-rolled die with the kept result.
    #[serde(rename_all = "camelCase")]
    Pair {
        /// First roll of the pair.
        roll1: u32,
        /// Second roll of the pair.
        roll2: u32,
        /// The kept result: `max` under advantage, `min` under disadvantage.
        final_roll: u32,
        /// True when the pair was rolled with advantage.
        is_advantage: bool,
    },
    /// A plain single roll in `[1, sides]`.
    Single(u32),
}

impl DieRoll {
    /// The value this roll contributes to its group subtotal.
    pub fn value(&self) -> u32 {
        match self {
            DieRoll::Pair { final_roll, .. } => *final_roll,
            DieRoll::Single(value) => *value,
        }
    }
}

/// All results for one die type within a roll.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DieGroup {
    /// How many dice of this type were rolled.
    pub quantity: u32,
    /// Sum of the kept results.
    pub subtotal: u32,
    /// Individual results in roll order.
    pub rolls: Vec<DieRoll>,
}

/// One player's complete roll, as relayed to the session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RollRecord {
    /// Display name of the roller.
    pub player_name: String,
    /// Unix timestamp in milliseconds.
    pub timestamp: u64,
    /// Results grouped by die label.
    pub rolls: BTreeMap<String, DieGroup>,
}

impl RollRecord {
    /// Sum over all die groups.
    pub fn grand_total(&self) -> u32 {
        self.rolls.values().map(|group| group.subtotal).sum()
    }
}

/// Bounded FIFO of roll records, oldest evicted first.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RollHistory {
    records: VecDeque<RollRecord>,
}

impl RollHistory {
    /// Creates an empty history.
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuilds a history from records, keeping only the newest
    /// `MAX_ROLL_HISTORY` of them.
    pub fn from_records(records: Vec<RollRecord>) -> Self {
        let mut history = Self::new();
        for record in records {
            history.push(record);
        }
        history
    }

    /// Appends a record, evicting the oldest once the cap is reached.
    pub fn push(&mut self, record: RollRecord) {
        if self.records.len() >= MAX_ROLL_HISTORY {
            self.records.pop_front();
        }
        self.records.push_back(record);
    }

    /// Removes all records.
    pub fn clear(&mut self) {
        self.records.clear();
    }

    /// Number of retained records.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Returns true when no records are retained.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Records in arrival order.
    pub fn iter(&self) -> impl Iterator<Item = &RollRecord> {
        self.records.iter()
    }

    /// Records sorted by timestamp ascending, the display order.
    pub fn sorted_for_display(&self) -> Vec<RollRecord> {
        let mut records: Vec<_> = self.records.iter().cloned().collect();
        records.sort_by_key(|record| record.timestamp);
        records
    }

    /// Records in arrival order as an owned vector.
    pub fn to_vec(&self) -> Vec<RollRecord> {
        self.records.iter().cloned().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(player: &str, timestamp: u64) -> RollRecord {
        let mut rolls = BTreeMap::new();
        rolls.insert(
            "d20".to_string(),
            DieGroup {
                quantity: 1,
                subtotal: 12,
                rolls: vec![DieRoll::Single(12)],
            },
        );
        RollRecord {
            player_name: player.to_string(),
            timestamp,
            rolls,
        }
    }

    #[test]
    fn counts_clamp_to_ninety_nine() {
        let mut state = DiceState::default();
        state.set_count("d6", 250);
        assert_eq!(state.dice["d6"], MAX_DIE_COUNT);

        state.adjust_count("d6", 50);
        assert_eq!(state.dice["d6"], MAX_DIE_COUNT);

        state.adjust_count("d6", -200);
        assert_eq!(state.dice["d6"], 0);
    }

    #[test]
    fn advantage_and_disadvantage_are_exclusive() {
        let mut state = DiceState::default();
        state.set_advantage(true);
        assert!(state.advantage && !state.disadvantage);

        state.set_disadvantage(true);
        assert!(!state.advantage && state.disadvantage);

        state.set_advantage(true);
        assert!(state.advantage && !state.disadvantage);
    }

    #[test]
    fn normalize_resolves_conflicting_flags() {
        let mut state = DiceState {
            advantage: true,
            disadvantage: true,
            ..Default::default()
        };
        state.dice.insert("d8".into(), 500);
        state.normalize();
        assert!(state.advantage);
        assert!(!state.disadvantage);
        assert_eq!(state.dice["d8"], MAX_DIE_COUNT);
    }

    #[test]
    fn die_label_parsing() {
        assert_eq!(die_sides("d20"), Some(20));
        assert_eq!(die_sides("D100"), Some(100));
        assert_eq!(die_sides("d1"), None);
        assert_eq!(die_sides("20"), None);
        assert_eq!(die_sides("dmax"), None);
    }

    #[test]
    fn history_evicts_oldest_at_cap() {
        let mut history = RollHistory::new();
        for i in 0..21 {
            history.push(record("p", i));
        }
        assert_eq!(history.len(), MAX_ROLL_HISTORY);
        // The record with timestamp 0 was evicted.
        assert_eq!(history.iter().next().unwrap().timestamp, 1);
        assert_eq!(history.iter().last().unwrap().timestamp, 20);
    }

    #[test]
    fn display_order_is_timestamp_ascending() {
        let mut history = RollHistory::new();
        history.push(record("a", 30));
        history.push(record("b", 10));
        history.push(record("c", 20));

        let sorted = history.sorted_for_display();
        let stamps: Vec<u64> = sorted.iter().map(|r| r.timestamp).collect();
        assert_eq!(stamps, vec![10, 20, 30]);
    }

    #[test]
    fn die_roll_wire_shapes() {
        let single: DieRoll = serde_json::from_str("17").unwrap();
        assert_eq!(single, DieRoll::Single(17));

        let pair: DieRoll = serde_json::from_str(
            r#"{"roll1":3,"roll2":15,"finalRoll":15,"isAdvantage":true}"#,
        )
        .unwrap();
        assert_eq!(pair.value(), 15);

        // Round-trips preserve the shape.
        assert_eq!(serde_json::to_string(&single).unwrap(), "17");
        assert!(serde_json::to_string(&pair).unwrap().contains("finalRoll"));
    }

    #[test]
    fn grand_total_sums_subtotals() {
        let mut rolls = BTreeMap::new();
        rolls.insert(
            "d6".to_string(),
            DieGroup {
                quantity: 2,
                subtotal: 7,
                rolls: vec![DieRoll::Single(3), DieRoll::Single(4)],
            },
        );
        rolls.insert(
            "d20".to_string(),
            DieGroup {
                quantity: 1,
                subtotal: 18,
                rolls: vec![DieRoll::Single(18)],
            },
        );
        let record = RollRecord {
            player_name: "p".into(),
            timestamp: 0,
            rolls,
        };
        assert_eq!(record.grand_total(), 25);
    }
}
