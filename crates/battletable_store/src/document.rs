//! The per-session documents the store persists.
//!
//! One document of each kind exists per session, keyed by session id and
//! replaced wholesale on every write. `last_updated` is refreshed on each
//! save and lets an operator expire abandoned sessions.

use battletable_protocol::{BattlefieldState, DiceState, RollRecord, RosterSnapshot};
use serde::{Deserialize, Serialize};
use std::time::{SystemTime, UNIX_EPOCH};

/// Current time as Unix milliseconds, the timestamp unit used on the wire.
pub fn unix_time_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_millis() as u64)
        .unwrap_or(0)
}

/// Persisted roster for one session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RosterDocument {
    /// Owning session.
    pub session_id: String,
    /// The full roster snapshot.
    #[serde(flatten)]
    pub snapshot: RosterSnapshot,
    /// Unix milliseconds of the last write.
    pub last_updated: u64,
}

impl RosterDocument {
    /// Wraps a snapshot into a document stamped with the current time.
    pub fn new(session_id: impl Into<String>, snapshot: RosterSnapshot) -> Self {
        Self {
            session_id: session_id.into(),
            snapshot,
            last_updated: unix_time_ms(),
        }
    }
}

/// Persisted dice configuration and roll history for one session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DiceDocument {
    /// Owning session.
    pub session_id: String,
    /// The shared dice configuration.
    pub state: DiceState,
    /// Retained roll records, oldest first.
    #[serde(default)]
    pub history: Vec<RollRecord>,
    /// Unix milliseconds of the last write.
    pub last_updated: u64,
}

impl DiceDocument {
    /// Wraps dice state and history into a document stamped with the
    /// current time.
    pub fn new(
        session_id: impl Into<String>,
        state: DiceState,
        history: Vec<RollRecord>,
    ) -> Self {
        Self {
            session_id: session_id.into(),
            state,
            history,
            last_updated: unix_time_ms(),
        }
    }
}

/// Persisted battlefield for one session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BattlefieldDocument {
    /// Owning session.
    pub session_id: String,
    /// The full battlefield state.
    #[serde(flatten)]
    pub state: BattlefieldState,
    /// Unix milliseconds of the last write.
    pub last_updated: u64,
}

impl BattlefieldDocument {
    /// Wraps a battlefield state into a document stamped with the current
    /// time.
    pub fn new(session_id: impl Into<String>, state: BattlefieldState) -> Self {
        Self {
            session_id: session_id.into(),
            state,
            last_updated: unix_time_ms(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use battletable_protocol::RosterEntry;

    #[test]
    fn roster_document_flattens_snapshot() {
        let mut snapshot = RosterSnapshot::default();
        snapshot
            .monsters
            .insert("m1".into(), RosterEntry::new("m1", "Goblin", 7, false));
        snapshot.order.push("m1".into());

        let doc = RosterDocument::new("s1", snapshot);
        let json = serde_json::to_string(&doc).unwrap();
        assert!(json.contains("\"sessionId\":\"s1\""));
        assert!(json.contains("\"monsters\""));
        assert!(json.contains("\"order\":[\"m1\"]"));
        assert!(json.contains("\"lastUpdated\""));

        let decoded: RosterDocument = serde_json::from_str(&json).unwrap();
        assert_eq!(decoded, doc);
    }

    #[test]
    fn new_documents_carry_a_timestamp() {
        let doc = BattlefieldDocument::new("s1", BattlefieldState::default());
        assert!(doc.last_updated > 0);
    }
}
