//! Local dice state, roll computation, and roll history.

use battletable_protocol::{
    die_sides, DiceState, DieGroup, DieRoll, RollHistory, RollRecord,
};
use rand::Rng;
use std::collections::BTreeMap;

/// The local copy of the shared dice tray.
///
/// Rolls are computed on the rolling client and published as a finished
/// [`RollRecord`]; the relay and the other clients treat the record as
/// opaque. Configuration changes replicate wholesale.
#[derive(Debug, Default)]
pub struct DiceView {
    state: DiceState,
    history: RollHistory,
}

impl DiceView {
    /// Creates an empty tray.
    pub fn new() -> Self {
        Self::default()
    }

    /// The current configuration.
    pub fn state(&self) -> &DiceState {
        &self.state
    }

    /// The retained roll history.
    pub fn history(&self) -> &RollHistory {
        &self.history
    }

    /// Sets a die count locally, clamped.
    pub fn set_count(&mut self, die: &str, count: u32) {
        self.state.set_count(die, count);
    }

    /// Adjusts a die count locally by a signed delta, clamped.
    pub fn adjust_count(&mut self, die: &str, delta: i32) {
        self.state.adjust_count(die, delta);
    }

    /// Toggles advantage, clearing disadvantage when enabled.
    pub fn set_advantage(&mut self, enabled: bool) {
        self.state.set_advantage(enabled);
    }

    /// Toggles disadvantage, clearing advantage when enabled.
    pub fn set_disadvantage(&mut self, enabled: bool) {
        self.state.set_disadvantage(enabled);
    }

    /// Computes a roll from the current configuration.
    ///
    /// Returns `None` when no dice are selected or every selected label
    /// fails to parse. Under advantage or disadvantage each die is rolled
    /// twice and the higher (or lower) result is kept.
    pub fn roll<R: Rng>(
        &mut self,
        player_name: &str,
        timestamp: u64,
        rng: &mut R,
    ) -> Option<RollRecord> {
        let advantage = self.state.advantage;
        let disadvantage = self.state.disadvantage;
        let paired = advantage || disadvantage;

        let mut groups = BTreeMap::new();
        for (label, count) in &self.state.dice {
            if *count == 0 {
                continue;
            }
            let Some(sides) = die_sides(label) else {
                continue;
            };
            let mut rolls = Vec::with_capacity(*count as usize);
            let mut subtotal = 0;
            for _ in 0..*count {
                let roll = if paired {
                    let roll1 = rng.gen_range(1..=sides);
                    let roll2 = rng.gen_range(1..=sides);
                    let final_roll = if advantage {
                        roll1.max(roll2)
                    } else {
                        roll1.min(roll2)
                    };
                    DieRoll::Pair {
                        roll1,
                        roll2,
                        final_roll,
                        is_advantage: advantage,
                    }
                } else {
                    DieRoll::Single(rng.gen_range(1..=sides))
                };
                subtotal += roll.value();
                rolls.push(roll);
            }
            groups.insert(
                label.clone(),
                DieGroup {
                    quantity: *count,
                    subtotal,
                    rolls,
                },
            );
        }

        if groups.is_empty() {
            return None;
        }
        let record = RollRecord {
            player_name: player_name.to_string(),
            timestamp,
            rolls: groups,
        };
        self.history.push(record.clone());
        Some(record)
    }

    /// Replaces the configuration with a remote one.
    pub fn apply_remote_state(&mut self, mut state: DiceState) {
        state.normalize();
        self.state = state;
    }

    /// Records another player's roll.
    pub fn apply_roll(&mut self, record: RollRecord) {
        self.history.push(record);
    }

    /// Replaces the history with a synced one.
    pub fn apply_history_sync(&mut self, records: Vec<RollRecord>) {
        self.history = RollHistory::from_records(records);
    }

    /// Clears the configuration and history.
    pub fn reset(&mut self) {
        self.state = DiceState::default();
        self.history.clear();
    }
}
