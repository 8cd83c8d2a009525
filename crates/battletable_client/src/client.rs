//! The session client: link abstraction, connect flow, and the optimistic
//! edit surface.

use crate::battlefield::{BackgroundSend, BattlefieldView};
use crate::config::ClientConfig;
use crate::connection::{ConnectionStatus, ConnectionTracker};
use crate::debounce::{Debouncer, FieldClass};
use crate::dice::DiceView;
use crate::error::{ClientError, ClientResult};
use crate::roster::{RosterDiff, RosterView};
use battletable_protocol::{ClientEvent, RollRecord, RosterEntry, ServerEvent};
use rand::Rng;
use std::time::Instant;
use tracing::debug;

/// The client's outbound path to the relay.
///
/// This trait abstracts the network layer, allowing different
/// implementations (WebSocket, in-process loopback, mock for testing).
pub trait RelayLink: Send + Sync {
    /// Publishes one event to the relay.
    fn send(&self, event: ClientEvent) -> ClientResult<()>;

    /// Whether the link is up.
    fn is_connected(&self) -> bool;
}

/// A mock link for testing. Records every sent event.
#[derive(Debug, Default)]
pub struct MockLink {
    connected: std::sync::atomic::AtomicBool,
    sent: parking_lot::Mutex<Vec<ClientEvent>>,
}

impl MockLink {
    /// Creates a connected mock link.
    pub fn new() -> Self {
        Self {
            connected: std::sync::atomic::AtomicBool::new(true),
            sent: parking_lot::Mutex::new(Vec::new()),
        }
    }

    /// Sets the connected state.
    pub fn set_connected(&self, connected: bool) {
        self.connected
            .store(connected, std::sync::atomic::Ordering::SeqCst);
    }

    /// Everything sent so far, in order.
    pub fn sent(&self) -> Vec<ClientEvent> {
        self.sent.lock().clone()
    }

    /// Clears the sent log.
    pub fn clear(&self) {
        self.sent.lock().clear();
    }
}

impl RelayLink for MockLink {
    fn send(&self, event: ClientEvent) -> ClientResult<()> {
        if !self.is_connected() {
            return Err(ClientError::NotConnected);
        }
        self.sent.lock().push(event);
        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.connected.load(std::sync::atomic::Ordering::SeqCst)
    }
}

/// One participant's view of a session.
///
/// Every local edit applies to the local state immediately and publishes
/// (directly or through the debouncer) the matching event; every inbound
/// event applies without acknowledgement. Editing is gated on
/// [`ConnectionStatus::Synchronized`], reached once the initial roster,
/// dice, and battlefield snapshots have all arrived.
pub struct SessionClient<L: RelayLink> {
    config: ClientConfig,
    link: L,
    session_id: String,
    player_name: String,
    connection: ConnectionTracker,
    roster: RosterView,
    dice: DiceView,
    battlefield: BattlefieldView,
    debouncer: Debouncer,
}

impl<L: RelayLink> SessionClient<L> {
    /// Creates a disconnected client.
    pub fn new(config: ClientConfig, link: L) -> Self {
        let debouncer = Debouncer::new(config.debounce_window);
        let battlefield = BattlefieldView::new(config.position_epsilon);
        Self {
            config,
            link,
            session_id: String::new(),
            player_name: String::new(),
            connection: ConnectionTracker::new(),
            roster: RosterView::new(),
            dice: DiceView::new(),
            battlefield,
            debouncer,
        }
    }

    /// Current connection status.
    pub fn status(&self) -> ConnectionStatus {
        self.connection.status()
    }

    /// The local roster.
    pub fn roster(&self) -> &RosterView {
        &self.roster
    }

    /// The local dice tray.
    pub fn dice(&self) -> &DiceView {
        &self.dice
    }

    /// The local battlefield.
    pub fn battlefield(&self) -> &BattlefieldView {
        &self.battlefield
    }

    /// The joined session id, empty before the first connect.
    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    /// Joins a session and requests the initial snapshots for every
    /// topic. Edits stay rejected until all of them arrive.
    pub fn connect(&mut self, session_id: &str, player_name: &str) -> ClientResult<()> {
        self.connection.connecting();
        if !self.link.is_connected() {
            self.connection.disconnected();
            return Err(ClientError::NotConnected);
        }
        self.connection.connected();
        self.session_id = session_id.to_string();
        self.player_name = player_name.to_string();

        self.link.send(ClientEvent::JoinSession {
            session_id: self.session_id.clone(),
            player_name: self.player_name.clone(),
        })?;
        self.connection.session_joined();

        self.link.send(ClientEvent::RequestLatestState {
            session_id: self.session_id.clone(),
        })?;
        self.link.send(ClientEvent::RequestLatestDiceState {
            session_id: self.session_id.clone(),
        })?;
        self.link.send(ClientEvent::RequestLatestRollHistory {
            session_id: self.session_id.clone(),
        })?;
        self.link.send(ClientEvent::RequestLatestBattlefieldState {
            session_id: self.session_id.clone(),
        })?;
        debug!(session_id, player_name, "join sent, awaiting snapshots");
        Ok(())
    }

    /// Drops the link. Pending debounced edits are discarded; the next
    /// connect re-syncs from the relay's snapshots.
    pub fn disconnect(&mut self) {
        let dropped = self.debouncer.flush().len();
        if dropped > 0 {
            debug!(dropped, "discarding unsent debounced edits");
        }
        self.connection.disconnected();
    }

    /// Applies one inbound event to the local state. Returns the roster
    /// diff when the event was a roster snapshot, for targeted UI
    /// refreshes.
    pub fn handle_server_event(&mut self, event: ServerEvent) -> Option<RosterDiff> {
        match event {
            ServerEvent::MonsterUpdated { monster } => {
                self.roster.apply_monster_updated(monster);
            }
            ServerEvent::MonsterDeleted { monster_id } => {
                self.roster.apply_monster_deleted(&monster_id);
            }
            ServerEvent::MonstersBatchDeleted { monster_ids } => {
                self.roster.apply_batch_deleted(&monster_ids);
            }
            ServerEvent::MonstersReordered { order } => {
                self.roster.reorder(order);
            }
            ServerEvent::SessionUpdated { state } => {
                let diff = state.map(|snapshot| self.roster.reconcile(snapshot));
                self.connection.mark_roster();
                return diff;
            }
            ServerEvent::DiceStateUpdated { dice_state } => {
                self.dice.apply_remote_state(dice_state);
                self.connection.mark_dice();
            }
            ServerEvent::DiceRolled { roll_data } => {
                self.dice.apply_roll(roll_data);
            }
            ServerEvent::RollHistorySync { history } => {
                self.dice.apply_history_sync(history);
            }
            ServerEvent::DiceReset => {
                self.dice.reset();
            }
            ServerEvent::PieceMoved { piece_id, x, y } => {
                self.battlefield.apply_piece_moved(&piece_id, x, y);
            }
            ServerEvent::BackgroundUpdated { image_url }
            | ServerEvent::BackgroundTransferComplete { image_url } => {
                self.battlefield.apply_background(image_url);
            }
            ServerEvent::ScaleUpdated { scale } => {
                self.battlefield.apply_scale(scale);
            }
            ServerEvent::GridVisibilityUpdated { is_visible } => {
                self.battlefield.apply_grid_visibility(is_visible);
            }
            ServerEvent::PieceSizeUpdated { size } => {
                self.battlefield.apply_piece_size(size);
            }
            ServerEvent::BattlefieldStateUpdated { state } => {
                if let Some(state) = state {
                    self.battlefield.apply_snapshot(state, &self.roster);
                }
                self.connection.mark_battlefield();
            }
        }
        None
    }

    /// Publishes every debounced edit whose window has elapsed at `now`.
    /// Returns how many were sent.
    pub fn flush_debounced(&mut self, now: Instant) -> ClientResult<usize> {
        let events = self.debouncer.ready(now);
        let count = events.len();
        for event in events {
            self.link.send(event)?;
        }
        Ok(count)
    }

    fn require_sync(&self) -> ClientResult<()> {
        if !self.connection.can_edit() {
            return Err(ClientError::NotSynchronized);
        }
        Ok(())
    }

    /// Adds a combatant and publishes it immediately.
    pub fn add_monster(&mut self, entry: RosterEntry) -> ClientResult<()> {
        self.require_sync()?;
        self.roster.add(entry.clone());
        self.link.send(ClientEvent::AddMonster {
            session_id: self.session_id.clone(),
            monster: entry,
        })
    }

    /// Sets a combatant's HP triple locally and debounces the publish.
    pub fn set_hp(
        &mut self,
        monster_id: &str,
        current_hp: u32,
        max_hp: u32,
        temp_hp: u32,
        now: Instant,
    ) -> ClientResult<()> {
        self.require_sync()?;
        self.roster
            .mutate(monster_id, |entry| entry.set_hp(current_hp, max_hp, temp_hp))?;
        let entry = self
            .roster
            .get(monster_id)
            .ok_or_else(|| ClientError::UnknownEntity(monster_id.to_string()))?;
        self.debouncer.arm(
            FieldClass::Hp,
            Some(monster_id),
            ClientEvent::UpdateHp {
                session_id: self.session_id.clone(),
                monster_id: monster_id.to_string(),
                current_hp: entry.current_hp,
                max_hp: entry.max_hp,
                temp_hp: entry.temp_hp,
            },
            now,
        );
        Ok(())
    }

    /// Renames a combatant locally and debounces the publish.
    pub fn set_name(&mut self, monster_id: &str, name: &str, now: Instant) -> ClientResult<()> {
        self.require_sync()?;
        self.roster
            .mutate(monster_id, |entry| entry.name = name.to_string())?;
        self.debouncer.arm(
            FieldClass::Name,
            Some(monster_id),
            ClientEvent::UpdateName {
                session_id: self.session_id.clone(),
                monster_id: monster_id.to_string(),
                name: name.to_string(),
            },
            now,
        );
        Ok(())
    }

    /// Replaces a combatant's conditions and publishes immediately.
    pub fn set_conditions(&mut self, monster_id: &str, conditions: Vec<String>) -> ClientResult<()> {
        self.require_sync()?;
        self.roster
            .mutate(monster_id, |entry| entry.conditions = conditions.clone())?;
        self.link.send(ClientEvent::UpdateConditions {
            session_id: self.session_id.clone(),
            monster_id: monster_id.to_string(),
            conditions,
        })
    }

    /// Toggles a combatant's advisory lock and publishes immediately.
    pub fn set_locked(&mut self, monster_id: &str, is_locked: bool) -> ClientResult<()> {
        self.require_sync()?;
        self.roster
            .mutate(monster_id, |entry| entry.is_locked = is_locked)?;
        self.link.send(ClientEvent::UpdateLockStatus {
            session_id: self.session_id.clone(),
            monster_id: monster_id.to_string(),
            is_locked,
        })
    }

    /// Removes a combatant and publishes immediately.
    pub fn delete_monster(&mut self, monster_id: &str) -> ClientResult<()> {
        self.require_sync()?;
        if !self.roster.remove(monster_id) {
            return Err(ClientError::UnknownEntity(monster_id.to_string()));
        }
        self.debouncer.cancel(FieldClass::Hp, Some(monster_id));
        self.debouncer.cancel(FieldClass::Name, Some(monster_id));
        self.link.send(ClientEvent::DeleteMonster {
            session_id: self.session_id.clone(),
            monster_id: monster_id.to_string(),
        })
    }

    /// Deletes every unlocked combatant, the bulk reset. Publishes one
    /// batch event; locked entries survive.
    pub fn clear_unlocked(&mut self) -> ClientResult<()> {
        self.require_sync()?;
        let ids = self.roster.unlocked_ids();
        if ids.is_empty() {
            return Ok(());
        }
        for id in &ids {
            self.roster.remove(id);
            self.debouncer.cancel(FieldClass::Hp, Some(id));
            self.debouncer.cancel(FieldClass::Name, Some(id));
        }
        self.link.send(ClientEvent::BatchDeleteMonsters {
            session_id: self.session_id.clone(),
            monster_ids: ids,
        })
    }

    /// Replaces the roster order and publishes immediately.
    pub fn reorder_monsters(&mut self, order: Vec<String>) -> ClientResult<()> {
        self.require_sync()?;
        self.roster.reorder(order.clone());
        self.link.send(ClientEvent::ReorderMonsters {
            session_id: self.session_id.clone(),
            order,
        })
    }

    /// Adjusts a die count locally and debounces a whole-state publish.
    pub fn adjust_die_count(&mut self, die: &str, delta: i32, now: Instant) -> ClientResult<()> {
        self.require_sync()?;
        self.dice.adjust_count(die, delta);
        self.arm_dice_publish(now);
        Ok(())
    }

    /// Toggles advantage locally and debounces a whole-state publish.
    pub fn set_advantage(&mut self, enabled: bool, now: Instant) -> ClientResult<()> {
        self.require_sync()?;
        self.dice.set_advantage(enabled);
        self.arm_dice_publish(now);
        Ok(())
    }

    /// Toggles disadvantage locally and debounces a whole-state publish.
    pub fn set_disadvantage(&mut self, enabled: bool, now: Instant) -> ClientResult<()> {
        self.require_sync()?;
        self.dice.set_disadvantage(enabled);
        self.arm_dice_publish(now);
        Ok(())
    }

    fn arm_dice_publish(&mut self, now: Instant) {
        self.debouncer.arm(
            FieldClass::Dice,
            None,
            ClientEvent::UpdateDiceState {
                session_id: self.session_id.clone(),
                player_name: self.player_name.clone(),
                dice_state: self.dice.state().clone(),
            },
            now,
        );
    }

    /// Rolls the configured dice and publishes the record immediately.
    /// Returns `None` when nothing is selected.
    pub fn roll_dice<R: Rng>(
        &mut self,
        timestamp: u64,
        rng: &mut R,
    ) -> ClientResult<Option<RollRecord>> {
        self.require_sync()?;
        let player = self.player_name.clone();
        let Some(record) = self.dice.roll(&player, timestamp, rng) else {
            return Ok(None);
        };
        self.link.send(ClientEvent::RollDice {
            session_id: self.session_id.clone(),
            roll_data: record.clone(),
        })?;
        Ok(Some(record))
    }

    /// Clears the dice tray for everyone and publishes immediately.
    pub fn reset_dice(&mut self) -> ClientResult<()> {
        self.require_sync()?;
        self.dice.reset();
        self.link.send(ClientEvent::ResetDice {
            session_id: self.session_id.clone(),
            player_name: self.player_name.clone(),
        })
    }

    /// Starts dragging a piece; nothing is published until release.
    pub fn begin_drag(&mut self, piece_id: &str) -> ClientResult<()> {
        self.require_sync()?;
        self.battlefield.begin_drag(piece_id);
        Ok(())
    }

    /// Updates the dragged piece's local position.
    pub fn drag_to(&mut self, x: f64, y: f64) {
        self.battlefield.drag_to(x, y);
    }

    /// Releases the drag and publishes the final position immediately.
    pub fn end_drag(&mut self) -> ClientResult<()> {
        let Some((piece_id, x, y)) = self.battlefield.end_drag() else {
            return Ok(());
        };
        self.link.send(ClientEvent::MovePiece {
            session_id: self.session_id.clone(),
            piece_id,
            x,
            y,
        })
    }

    /// Nudges a piece without a drag, debounced per piece.
    pub fn move_piece(&mut self, piece_id: &str, x: f64, y: f64, now: Instant) -> ClientResult<()> {
        self.require_sync()?;
        self.battlefield.apply_piece_moved(piece_id, x, y);
        self.debouncer.arm(
            FieldClass::Position,
            Some(piece_id),
            ClientEvent::MovePiece {
                session_id: self.session_id.clone(),
                piece_id: piece_id.to_string(),
                x,
                y,
            },
            now,
        );
        Ok(())
    }

    /// Sets the zoom factor and publishes the clamped value immediately.
    pub fn set_scale(&mut self, scale: f64) -> ClientResult<()> {
        self.require_sync()?;
        let scale = self.battlefield.set_scale(scale);
        self.link.send(ClientEvent::UpdateScale {
            session_id: self.session_id.clone(),
            scale,
        })
    }

    /// Shows or hides the grid and publishes immediately.
    pub fn set_grid_visible(&mut self, visible: bool) -> ClientResult<()> {
        self.require_sync()?;
        self.battlefield.set_grid_visible(visible);
        self.link.send(ClientEvent::UpdateGridVisibility {
            session_id: self.session_id.clone(),
            is_visible: visible,
        })
    }

    /// Sets the piece size and publishes the clamped value immediately.
    pub fn set_piece_size(&mut self, size: u32) -> ClientResult<()> {
        self.require_sync()?;
        let size = self.battlefield.set_piece_size(size);
        self.link.send(ClientEvent::UpdatePieceSize {
            session_id: self.session_id.clone(),
            size,
        })
    }

    /// Publishes the full battlefield state, the explicit save.
    pub fn save_battlefield(&mut self) -> ClientResult<()> {
        self.require_sync()?;
        self.link.send(ClientEvent::UpdateBattlefieldState {
            session_id: self.session_id.clone(),
            state: self.battlefield.state().clone(),
        })
    }

    /// Sets the background image, choosing the direct or chunked path by
    /// size. Chunk sends are paced by the configured delay. Payloads over
    /// the hard limit fail without touching the wire.
    pub async fn set_background(&mut self, payload: &str) -> ClientResult<()> {
        self.require_sync()?;
        match self.battlefield.prepare_background(payload)? {
            BackgroundSend::Direct(image_url) => {
                self.battlefield.set_background(image_url.clone());
                self.link.send(ClientEvent::UpdateBackground {
                    session_id: self.session_id.clone(),
                    image_url,
                })
            }
            BackgroundSend::Chunked {
                transfer_id,
                chunks,
            } => {
                self.battlefield.set_background(payload.to_string());
                let total = chunks.len() as u32;
                self.link.send(ClientEvent::BackgroundTransferStart {
                    session_id: self.session_id.clone(),
                    transfer_id: transfer_id.clone(),
                    total_chunks: total,
                })?;
                for (index, chunk) in chunks.into_iter().enumerate() {
                    tokio::time::sleep(self.config.chunk_pacing).await;
                    self.link.send(ClientEvent::BackgroundTransferChunk {
                        session_id: self.session_id.clone(),
                        transfer_id: transfer_id.clone(),
                        chunk_index: index as u32,
                        chunk,
                        is_last_chunk: index as u32 == total - 1,
                    })?;
                }
                Ok(())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use battletable_protocol::{DiceState, RosterSnapshot};
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use std::time::Duration;

    fn synced_client() -> SessionClient<MockLink> {
        let mut client = SessionClient::new(
            ClientConfig::new().with_debounce_window(Duration::from_millis(100)),
            MockLink::new(),
        );
        client.connect("s1", "alice").unwrap();
        client.handle_server_event(ServerEvent::SessionUpdated { state: None });
        client.handle_server_event(ServerEvent::DiceStateUpdated {
            dice_state: DiceState::default(),
        });
        client.handle_server_event(ServerEvent::BattlefieldStateUpdated { state: None });
        client.link.clear();
        client
    }

    #[test]
    fn connect_sends_join_and_all_snapshot_requests() {
        let mut client = SessionClient::new(ClientConfig::default(), MockLink::new());
        client.connect("s1", "alice").unwrap();

        let sent = client.link.sent();
        assert_eq!(sent.len(), 5);
        assert!(matches!(sent[0], ClientEvent::JoinSession { .. }));
        assert!(matches!(sent[1], ClientEvent::RequestLatestState { .. }));
        assert!(matches!(sent[2], ClientEvent::RequestLatestDiceState { .. }));
        assert!(matches!(sent[3], ClientEvent::RequestLatestRollHistory { .. }));
        assert!(matches!(
            sent[4],
            ClientEvent::RequestLatestBattlefieldState { .. }
        ));
        assert_eq!(client.status(), ConnectionStatus::SessionJoined);
    }

    #[test]
    fn edits_rejected_until_synchronized() {
        let mut client = SessionClient::new(ClientConfig::default(), MockLink::new());
        client.connect("s1", "alice").unwrap();

        let result = client.add_monster(RosterEntry::new("m1", "Goblin", 7, false));
        assert!(matches!(result, Err(ClientError::NotSynchronized)));

        client.handle_server_event(ServerEvent::SessionUpdated { state: None });
        client.handle_server_event(ServerEvent::DiceStateUpdated {
            dice_state: DiceState::default(),
        });
        client.handle_server_event(ServerEvent::BattlefieldStateUpdated { state: None });
        assert_eq!(client.status(), ConnectionStatus::Synchronized);

        client
            .add_monster(RosterEntry::new("m1", "Goblin", 7, false))
            .unwrap();
        assert_eq!(client.roster().len(), 1);
    }

    #[test]
    fn connect_fails_when_link_is_down() {
        let link = MockLink::new();
        link.set_connected(false);
        let mut client = SessionClient::new(ClientConfig::default(), link);

        assert!(matches!(
            client.connect("s1", "alice"),
            Err(ClientError::NotConnected)
        ));
        assert_eq!(client.status(), ConnectionStatus::Disconnected);
    }

    #[test]
    fn hp_edits_debounce_to_a_single_event() {
        let mut client = synced_client();
        client
            .add_monster(RosterEntry::new("m1", "Goblin", 20, false))
            .unwrap();
        client.link.clear();

        let start = Instant::now();
        for hp in (14..=19).rev() {
            client.set_hp("m1", hp, 20, 0, start).unwrap();
        }
        // Optimistic state is immediate, the wire is quiet.
        assert_eq!(client.roster().get("m1").unwrap().current_hp, 14);
        assert!(client.link.sent().is_empty());

        let sent = client
            .flush_debounced(start + Duration::from_millis(101))
            .unwrap();
        assert_eq!(sent, 1);
        let events = client.link.sent();
        assert!(matches!(
            events.as_slice(),
            [ClientEvent::UpdateHp { current_hp: 14, .. }]
        ));
    }

    #[test]
    fn delete_cancels_pending_edits_for_the_entry() {
        let mut client = synced_client();
        client
            .add_monster(RosterEntry::new("m1", "Goblin", 20, false))
            .unwrap();

        let start = Instant::now();
        client.set_hp("m1", 3, 20, 0, start).unwrap();
        client.delete_monster("m1").unwrap();

        assert_eq!(
            client
                .flush_debounced(start + Duration::from_secs(1))
                .unwrap(),
            0
        );
    }

    #[test]
    fn clear_unlocked_spares_locked_entries() {
        let mut client = synced_client();
        client
            .add_monster(RosterEntry::new("m1", "Goblin", 7, false))
            .unwrap();
        client
            .add_monster(RosterEntry::new("m2", "Boss", 50, false))
            .unwrap();
        client.set_locked("m2", true).unwrap();
        client.link.clear();

        client.clear_unlocked().unwrap();
        assert!(client.roster().get("m1").is_none());
        assert!(client.roster().get("m2").is_some());

        let events = client.link.sent();
        let [ClientEvent::BatchDeleteMonsters { monster_ids, .. }] = events.as_slice() else {
            panic!("expected one batch delete");
        };
        assert_eq!(monster_ids, &["m1"]);
    }

    #[test]
    fn roll_publishes_the_computed_record() {
        let mut client = synced_client();
        let start = Instant::now();
        client.adjust_die_count("d20", 1, start).unwrap();

        let mut rng = StdRng::seed_from_u64(3);
        let record = client.roll_dice(1234, &mut rng).unwrap().unwrap();
        assert_eq!(record.player_name, "alice");
        assert_eq!(record.timestamp, 1234);

        let events = client.link.sent();
        assert!(events
            .iter()
            .any(|e| matches!(e, ClientEvent::RollDice { .. })));
        assert_eq!(client.dice().history().len(), 1);
    }

    #[test]
    fn drag_publishes_only_on_release() {
        let mut client = synced_client();
        client.handle_server_event(ServerEvent::PieceMoved {
            piece_id: "m1".into(),
            x: 0.0,
            y: 0.0,
        });

        client.begin_drag("m1").unwrap();
        client.drag_to(5.0, 5.0);
        client.drag_to(8.0, 2.0);
        assert!(client.link.sent().is_empty());

        client.end_drag().unwrap();
        let events = client.link.sent();
        let [ClientEvent::MovePiece { x, y, .. }] = events.as_slice() else {
            panic!("expected one move");
        };
        assert_eq!((*x, *y), (8.0, 2.0));
    }

    #[test]
    fn scale_publishes_the_clamped_value() {
        let mut client = synced_client();
        client.set_scale(7.5).unwrap();
        let events = client.link.sent();
        assert!(matches!(
            events.as_slice(),
            [ClientEvent::UpdateScale { scale, .. }] if *scale == 3.0
        ));
    }

    #[test]
    fn reconnect_requires_fresh_snapshots() {
        let mut client = synced_client();
        client.disconnect();
        assert!(matches!(
            client.set_scale(1.0),
            Err(ClientError::NotSynchronized)
        ));

        client.connect("s1", "alice").unwrap();
        assert_eq!(client.status(), ConnectionStatus::SessionJoined);
        client.handle_server_event(ServerEvent::SessionUpdated {
            state: Some(RosterSnapshot::default()),
        });
        client.handle_server_event(ServerEvent::DiceStateUpdated {
            dice_state: DiceState::default(),
        });
        client.handle_server_event(ServerEvent::BattlefieldStateUpdated { state: None });
        assert!(client.status().can_edit());
    }

    #[tokio::test]
    async fn oversized_background_never_touches_the_wire() {
        let mut client = synced_client();
        let payload = "x".repeat(5 * 1024 * 1024 + 1);
        assert!(client.set_background(&payload).await.is_err());
        assert!(client.link.sent().is_empty());
    }

    #[tokio::test]
    async fn large_background_goes_chunked() {
        let mut client = SessionClient::new(
            ClientConfig::new().with_chunk_pacing(Duration::from_millis(1)),
            MockLink::new(),
        );
        client.connect("s1", "alice").unwrap();
        client.handle_server_event(ServerEvent::SessionUpdated { state: None });
        client.handle_server_event(ServerEvent::DiceStateUpdated {
            dice_state: DiceState::default(),
        });
        client.handle_server_event(ServerEvent::BattlefieldStateUpdated { state: None });
        client.link.clear();

        let payload = "x".repeat(1024 * 1024 + 1);
        client.set_background(&payload).await.unwrap();

        let events = client.link.sent();
        assert!(matches!(
            events[0],
            ClientEvent::BackgroundTransferStart { total_chunks: 3, .. }
        ));
        assert_eq!(events.len(), 4);
        let ClientEvent::BackgroundTransferChunk { is_last_chunk, .. } = &events[3] else {
            panic!("expected a chunk");
        };
        assert!(is_last_chunk);
    }
}
