//! The closed sets of session messages exchanged with the relay.
//!
//! Event names on the wire are the kebab-case variant names (for example
//! `update-grid-visibility`), carried in a `type` field next to camelCase
//! payload fields, matching the browser clients.

use crate::battlefield::BattlefieldState;
use crate::dice::{DiceState, RollRecord};
use crate::error::ProtocolResult;
use crate::roster::{RosterEntry, RosterSnapshot};
use serde::{Deserialize, Serialize};

/// A message sent by a client to the relay.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case", rename_all_fields = "camelCase")]
pub enum ClientEvent {
    /// Joins the session room; idempotent per connection.
    JoinSession {
        /// Session to join.
        session_id: String,
        /// Display name used for dice rolls.
        player_name: String,
    },
    /// Adds a combatant to the roster.
    AddMonster {
        /// Target session.
        session_id: String,
        /// The new entry, including its client-generated id.
        monster: RosterEntry,
    },
    /// Replaces a combatant's full HP triple.
    UpdateHp {
        /// Target session.
        session_id: String,
        /// Target entry id.
        monster_id: String,
        /// New current HP (clamped by the receiver).
        current_hp: u32,
        /// New maximum HP.
        max_hp: u32,
        /// New temporary HP.
        temp_hp: u32,
    },
    /// Renames a combatant.
    UpdateName {
        /// Target session.
        session_id: String,
        /// Target entry id.
        monster_id: String,
        /// New display name.
        name: String,
    },
    /// Replaces a combatant's condition list.
    UpdateConditions {
        /// Target session.
        session_id: String,
        /// Target entry id.
        monster_id: String,
        /// New condition ids.
        conditions: Vec<String>,
    },
    /// Toggles the advisory lock flag.
    UpdateLockStatus {
        /// Target session.
        session_id: String,
        /// Target entry id.
        monster_id: String,
        /// New lock state.
        is_locked: bool,
    },
    /// Removes one combatant.
    DeleteMonster {
        /// Target session.
        session_id: String,
        /// Entry id to remove.
        monster_id: String,
    },
    /// Removes several combatants at once (the bulk reset path).
    BatchDeleteMonsters {
        /// Target session.
        session_id: String,
        /// Entry ids to remove; unknown ids are skipped without error.
        monster_ids: Vec<String>,
    },
    /// Replaces the roster display order wholesale.
    ReorderMonsters {
        /// Target session.
        session_id: String,
        /// The complete ordered id list.
        order: Vec<String>,
    },
    /// Replaces the shared dice configuration wholesale.
    UpdateDiceState {
        /// Target session.
        session_id: String,
        /// Display name of the editor.
        player_name: String,
        /// The complete new configuration.
        dice_state: DiceState,
    },
    /// Publishes a completed roll.
    RollDice {
        /// Target session.
        session_id: String,
        /// The roll, computed by the sender.
        roll_data: RollRecord,
    },
    /// Clears the dice configuration and roll history for everyone.
    ResetDice {
        /// Target session.
        session_id: String,
        /// Display name of the resetter.
        player_name: String,
    },
    /// Moves a battlefield piece; only the position changes.
    MovePiece {
        /// Target session.
        session_id: String,
        /// Piece id (equals the roster entry id).
        piece_id: String,
        /// New horizontal position.
        x: f64,
        /// New vertical position.
        y: f64,
    },
    /// Replaces the battlefield background image directly (small payloads).
    UpdateBackground {
        /// Target session.
        session_id: String,
        /// Data URI or URL.
        image_url: String,
    },
    /// Sets the battlefield zoom factor.
    UpdateScale {
        /// Target session.
        session_id: String,
        /// New zoom factor (clamped by the receiver).
        scale: f64,
    },
    /// Shows or hides the grid overlay.
    UpdateGridVisibility {
        /// Target session.
        session_id: String,
        /// New visibility.
        is_visible: bool,
    },
    /// Sets the piece size.
    UpdatePieceSize {
        /// Target session.
        session_id: String,
        /// New size in pixels (clamped by the receiver).
        size: u32,
    },
    /// Replaces the full battlefield state (the explicit save path).
    UpdateBattlefieldState {
        /// Target session.
        session_id: String,
        /// The complete new state.
        state: BattlefieldState,
    },
    /// Announces a chunked background transfer.
    BackgroundTransferStart {
        /// Target session.
        session_id: String,
        /// Transfer id, unique per transfer.
        transfer_id: String,
        /// Number of chunks that will follow.
        total_chunks: u32,
    },
    /// Carries one chunk of a background transfer.
    BackgroundTransferChunk {
        /// Target session.
        session_id: String,
        /// Transfer this chunk belongs to.
        transfer_id: String,
        /// Zero-based position of this chunk.
        chunk_index: u32,
        /// The chunk payload.
        chunk: String,
        /// True on the final chunk, triggering reassembly.
        is_last_chunk: bool,
    },
    /// Requests the latest roster snapshot (direct reply).
    RequestLatestState {
        /// Target session.
        session_id: String,
    },
    /// Requests the latest dice configuration (direct reply).
    RequestLatestDiceState {
        /// Target session.
        session_id: String,
    },
    /// Requests the retained roll history (direct reply).
    RequestLatestRollHistory {
        /// Target session.
        session_id: String,
    },
    /// Requests the latest battlefield state (direct reply).
    RequestLatestBattlefieldState {
        /// Target session.
        session_id: String,
    },
}

impl ClientEvent {
    /// The session this event addresses.
    pub fn session_id(&self) -> &str {
        match self {
            ClientEvent::JoinSession { session_id, .. }
            | ClientEvent::AddMonster { session_id, .. }
            | ClientEvent::UpdateHp { session_id, .. }
            | ClientEvent::UpdateName { session_id, .. }
            | ClientEvent::UpdateConditions { session_id, .. }
            | ClientEvent::UpdateLockStatus { session_id, .. }
            | ClientEvent::DeleteMonster { session_id, .. }
            | ClientEvent::BatchDeleteMonsters { session_id, .. }
            | ClientEvent::ReorderMonsters { session_id, .. }
            | ClientEvent::UpdateDiceState { session_id, .. }
            | ClientEvent::RollDice { session_id, .. }
            | ClientEvent::ResetDice { session_id, .. }
            | ClientEvent::MovePiece { session_id, .. }
            | ClientEvent::UpdateBackground { session_id, .. }
            | ClientEvent::UpdateScale { session_id, .. }
            | ClientEvent::UpdateGridVisibility { session_id, .. }
            | ClientEvent::UpdatePieceSize { session_id, .. }
            | ClientEvent::UpdateBattlefieldState { session_id, .. }
            | ClientEvent::BackgroundTransferStart { session_id, .. }
            | ClientEvent::BackgroundTransferChunk { session_id, .. }
            | ClientEvent::RequestLatestState { session_id }
            | ClientEvent::RequestLatestDiceState { session_id }
            | ClientEvent::RequestLatestRollHistory { session_id }
            | ClientEvent::RequestLatestBattlefieldState { session_id } => session_id,
        }
    }

    /// The entity id this event targets, for events scoped to one entity.
    pub fn entity_id(&self) -> Option<&str> {
        match self {
            ClientEvent::AddMonster { monster, .. } => Some(&monster.id),
            ClientEvent::UpdateHp { monster_id, .. }
            | ClientEvent::UpdateName { monster_id, .. }
            | ClientEvent::UpdateConditions { monster_id, .. }
            | ClientEvent::UpdateLockStatus { monster_id, .. }
            | ClientEvent::DeleteMonster { monster_id, .. } => Some(monster_id),
            ClientEvent::MovePiece { piece_id, .. } => Some(piece_id),
            ClientEvent::BackgroundTransferStart { transfer_id, .. }
            | ClientEvent::BackgroundTransferChunk { transfer_id, .. } => Some(transfer_id),
            _ => None,
        }
    }

    /// Whether the required identifiers are present and non-empty. The
    /// relay drops events failing this check without answering.
    pub fn is_well_formed(&self) -> bool {
        if self.session_id().is_empty() {
            return false;
        }
        match self.entity_id() {
            Some(id) => !id.is_empty(),
            None => true,
        }
    }

    /// Encodes to the JSON wire form.
    pub fn to_json(&self) -> ProtocolResult<String> {
        Ok(serde_json::to_string(self)?)
    }

    /// Decodes from the JSON wire form.
    pub fn from_json(json: &str) -> ProtocolResult<Self> {
        Ok(serde_json::from_str(json)?)
    }
}

/// A message pushed by the relay to clients in a session room.
///
/// Broadcasts go to every room member except the originator; the
/// latest-state variants are direct replies to the requesting client
/// only, with `None` as the explicit "no data yet" marker.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case", rename_all_fields = "camelCase")]
pub enum ServerEvent {
    /// A combatant was added or mutated.
    MonsterUpdated {
        /// The full updated entry.
        monster: RosterEntry,
    },
    /// A combatant was removed.
    MonsterDeleted {
        /// The removed entry id.
        monster_id: String,
    },
    /// Several combatants were removed at once.
    MonstersBatchDeleted {
        /// The removed entry ids (only those that existed).
        monster_ids: Vec<String>,
    },
    /// The roster display order was replaced.
    MonstersReordered {
        /// The complete ordered id list.
        order: Vec<String>,
    },
    /// Direct reply to a roster snapshot request.
    SessionUpdated {
        /// The snapshot, or `None` when the session has no roster yet.
        state: Option<RosterSnapshot>,
    },
    /// The shared dice configuration was replaced.
    DiceStateUpdated {
        /// The complete new configuration.
        dice_state: DiceState,
    },
    /// Another player rolled.
    DiceRolled {
        /// The roll record.
        roll_data: RollRecord,
    },
    /// Direct reply to a roll history request.
    RollHistorySync {
        /// Retained records, oldest first.
        history: Vec<RollRecord>,
    },
    /// The dice configuration and history were reset.
    DiceReset,
    /// A piece moved.
    PieceMoved {
        /// Piece id.
        piece_id: String,
        /// New horizontal position.
        x: f64,
        /// New vertical position.
        y: f64,
    },
    /// The background image was replaced.
    BackgroundUpdated {
        /// Data URI or URL.
        image_url: String,
    },
    /// A chunked background transfer completed and was applied.
    BackgroundTransferComplete {
        /// The reassembled data URI or URL.
        image_url: String,
    },
    /// The zoom factor changed.
    ScaleUpdated {
        /// The clamped zoom factor.
        scale: f64,
    },
    /// The grid overlay was shown or hidden.
    GridVisibilityUpdated {
        /// New visibility.
        is_visible: bool,
    },
    /// The piece size changed.
    PieceSizeUpdated {
        /// The clamped size in pixels.
        size: u32,
    },
    /// Full battlefield state: either a broadcast replace or a direct
    /// reply, with `None` when the session has no battlefield yet.
    BattlefieldStateUpdated {
        /// The state, or `None` when no data exists.
        state: Option<BattlefieldState>,
    },
}

impl ServerEvent {
    /// Encodes to the JSON wire form.
    pub fn to_json(&self) -> ProtocolResult<String> {
        Ok(serde_json::to_string(self)?)
    }

    /// Decodes from the JSON wire form.
    pub fn from_json(json: &str) -> ProtocolResult<Self> {
        Ok(serde_json::from_str(json)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn client_event_wire_names() {
        let event = ClientEvent::UpdateGridVisibility {
            session_id: "s1".into(),
            is_visible: false,
        };
        let json = event.to_json().unwrap();
        assert!(json.contains("\"type\":\"update-grid-visibility\""));
        assert!(json.contains("\"sessionId\":\"s1\""));
        assert!(json.contains("\"isVisible\":false"));

        let decoded = ClientEvent::from_json(&json).unwrap();
        assert_eq!(decoded, event);
    }

    #[test]
    fn server_event_wire_names() {
        let event = ServerEvent::PieceMoved {
            piece_id: "m1".into(),
            x: 12.0,
            y: 34.0,
        };
        let json = event.to_json().unwrap();
        assert!(json.contains("\"type\":\"piece-moved\""));
        assert!(json.contains("\"pieceId\":\"m1\""));
    }

    #[test]
    fn unit_variant_encodes_as_bare_type() {
        let json = ServerEvent::DiceReset.to_json().unwrap();
        assert_eq!(json, r#"{"type":"dice-reset"}"#);
        assert_eq!(ServerEvent::from_json(&json).unwrap(), ServerEvent::DiceReset);
    }

    #[test]
    fn absent_state_is_explicit_null() {
        let json = ServerEvent::SessionUpdated { state: None }.to_json().unwrap();
        assert!(json.contains("\"state\":null"));
    }

    #[test]
    fn well_formedness_requires_ids() {
        let good = ClientEvent::DeleteMonster {
            session_id: "s1".into(),
            monster_id: "m1".into(),
        };
        assert!(good.is_well_formed());

        let no_session = ClientEvent::DeleteMonster {
            session_id: String::new(),
            monster_id: "m1".into(),
        };
        assert!(!no_session.is_well_formed());

        let no_entity = ClientEvent::MovePiece {
            session_id: "s1".into(),
            piece_id: String::new(),
            x: 0.0,
            y: 0.0,
        };
        assert!(!no_entity.is_well_formed());
    }

    #[test]
    fn session_id_accessor_covers_requests() {
        let event = ClientEvent::RequestLatestDiceState {
            session_id: "s9".into(),
        };
        assert_eq!(event.session_id(), "s9");
        assert!(event.entity_id().is_none());
    }

    #[test]
    fn unknown_event_type_fails_to_decode() {
        let result = ClientEvent::from_json(r#"{"type":"self-destruct","sessionId":"s1"}"#);
        assert!(result.is_err());
    }
}
