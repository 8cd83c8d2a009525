//! The relay: event validation, cache updates, fan-out, and direct replies.

use crate::config::RelayConfig;
use crate::error::RelayResult;
use crate::persist::{PersistQueue, PersistTask, PersistWorker};
use crate::rooms::{ClientId, RoomRegistry};
use crate::session::SessionState;
use battletable_protocol::{
    clamp_piece_size, clamp_scale, ChunkAssembler, ClientEvent, ServerEvent,
};
use battletable_store::SessionStore;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::mpsc::UnboundedSender;
use tracing::{debug, warn};

struct Inner {
    rooms: RoomRegistry,
    senders: HashMap<ClientId, UnboundedSender<ServerEvent>>,
    sessions: HashMap<String, SessionState>,
    assembler: ChunkAssembler,
    next_client: u64,
}

/// The session relay.
///
/// Clients register an outbound channel, join a session room, and send
/// [`ClientEvent`]s. The relay validates each event, applies it to the
/// session's write-through cache, queues a best-effort document write, and
/// fans the resulting [`ServerEvent`] out to every other room member.
/// Latest-state requests are answered directly to the requester, falling
/// back to the store on a cold cache.
///
/// The relay itself is transport-agnostic; a WebSocket (or in-process)
/// front end owns the sockets and calls [`handle_event`].
///
/// [`handle_event`]: Relay::handle_event
pub struct Relay {
    config: RelayConfig,
    store: Arc<dyn SessionStore>,
    queue: PersistQueue,
    inner: Mutex<Inner>,
}

impl Relay {
    /// Creates a relay plus the worker that drains its persistence queue.
    ///
    /// Callers either spawn `worker.run(store)` on a runtime or drain it
    /// manually in tests.
    pub fn new(config: RelayConfig, store: Arc<dyn SessionStore>) -> (Self, PersistWorker) {
        let (queue, worker) = PersistQueue::channel();
        let ttl = config.transfer_ttl;
        let relay = Self {
            config,
            store,
            queue,
            inner: Mutex::new(Inner {
                rooms: RoomRegistry::new(),
                senders: HashMap::new(),
                sessions: HashMap::new(),
                assembler: ChunkAssembler::with_ttl(ttl),
                next_client: 0,
            }),
        };
        (relay, worker)
    }

    /// Registers a connected client and its outbound channel.
    pub fn register(&self, sender: UnboundedSender<ServerEvent>) -> ClientId {
        let mut inner = self.inner.lock();
        inner.next_client += 1;
        let id = ClientId(inner.next_client);
        inner.senders.insert(id, sender);
        id
    }

    /// Removes a disconnected client from its room and drops its channel.
    pub fn disconnect(&self, client_id: ClientId) {
        let mut inner = self.inner.lock();
        inner.rooms.leave(client_id);
        inner.senders.remove(&client_id);
    }

    /// Number of clients currently in a session room.
    pub fn room_size(&self, session_id: &str) -> usize {
        self.inner.lock().rooms.room_size(session_id)
    }

    /// Processes one client event.
    ///
    /// Events with missing identifiers are logged and dropped without a
    /// reply. Store failures never block the cache or the broadcast;
    /// only chunked transfer violations surface as errors.
    pub fn handle_event(&self, origin: ClientId, event: ClientEvent) -> RelayResult<()> {
        if !event.is_well_formed() {
            warn!(%origin, "dropping malformed event");
            return Ok(());
        }
        let session_id = event.session_id().to_string();
        let mut inner = self.inner.lock();
        let inner = &mut *inner;

        match event {
            ClientEvent::JoinSession { player_name, .. } => {
                let Some(sender) = inner.senders.get(&origin).cloned() else {
                    warn!(%origin, "join from unregistered client");
                    return Ok(());
                };
                debug!(%origin, session_id, player_name, "join");
                inner.rooms.join(origin, &session_id, sender);
            }

            ClientEvent::AddMonster { mut monster, .. } => {
                monster.set_hp(monster.current_hp, monster.max_hp, monster.temp_hp);
                let state = self.session_mut(inner, &session_id);
                self.hydrate_roster(state, &session_id);
                state.upsert_monster(monster.clone());
                self.persist_roster(state, &session_id);
                inner.rooms.broadcast_except(
                    &session_id,
                    origin,
                    &ServerEvent::MonsterUpdated { monster },
                );
            }

            ClientEvent::UpdateHp {
                monster_id,
                current_hp,
                max_hp,
                temp_hp,
                ..
            } => {
                self.mutate_monster(inner, origin, &session_id, &monster_id, |entry| {
                    entry.set_hp(current_hp, max_hp, temp_hp);
                })?;
            }

            ClientEvent::UpdateName {
                monster_id, name, ..
            } => {
                self.mutate_monster(inner, origin, &session_id, &monster_id, |entry| {
                    entry.name = name;
                })?;
            }

            ClientEvent::UpdateConditions {
                monster_id,
                conditions,
                ..
            } => {
                self.mutate_monster(inner, origin, &session_id, &monster_id, |entry| {
                    entry.conditions = conditions;
                })?;
            }

            ClientEvent::UpdateLockStatus {
                monster_id,
                is_locked,
                ..
            } => {
                self.mutate_monster(inner, origin, &session_id, &monster_id, |entry| {
                    entry.is_locked = is_locked;
                })?;
            }

            ClientEvent::DeleteMonster { monster_id, .. } => {
                let state = self.session_mut(inner, &session_id);
                self.hydrate_roster(state, &session_id);
                if !state.remove_monster(&monster_id) {
                    warn!(session_id, monster_id, "delete for unknown entry");
                    return Ok(());
                }
                self.persist_roster(state, &session_id);
                inner.rooms.broadcast_except(
                    &session_id,
                    origin,
                    &ServerEvent::MonsterDeleted { monster_id },
                );
            }

            ClientEvent::BatchDeleteMonsters { monster_ids, .. } => {
                let state = self.session_mut(inner, &session_id);
                self.hydrate_roster(state, &session_id);
                let removed = state.remove_monsters(&monster_ids);
                if removed.is_empty() {
                    return Ok(());
                }
                self.persist_roster(state, &session_id);
                inner.rooms.broadcast_except(
                    &session_id,
                    origin,
                    &ServerEvent::MonstersBatchDeleted {
                        monster_ids: removed,
                    },
                );
            }

            ClientEvent::ReorderMonsters { order, .. } => {
                let state = self.session_mut(inner, &session_id);
                self.hydrate_roster(state, &session_id);
                state.reorder(order.clone());
                self.persist_roster(state, &session_id);
                inner.rooms.broadcast_except(
                    &session_id,
                    origin,
                    &ServerEvent::MonstersReordered { order },
                );
            }

            ClientEvent::UpdateDiceState {
                mut dice_state, ..
            } => {
                dice_state.normalize();
                let state = self.session_mut(inner, &session_id);
                state.dice = Some(dice_state.clone());
                self.persist_dice(state, &session_id);
                inner.rooms.broadcast_except(
                    &session_id,
                    origin,
                    &ServerEvent::DiceStateUpdated { dice_state },
                );
            }

            ClientEvent::RollDice { roll_data, .. } => {
                let state = self.session_mut(inner, &session_id);
                self.hydrate_dice(state, &session_id);
                state.record_roll(roll_data.clone());
                self.persist_dice(state, &session_id);
                inner.rooms.broadcast_except(
                    &session_id,
                    origin,
                    &ServerEvent::DiceRolled { roll_data },
                );
            }

            ClientEvent::ResetDice { .. } => {
                let state = self.session_mut(inner, &session_id);
                state.reset_dice();
                self.persist_dice(state, &session_id);
                inner
                    .rooms
                    .broadcast_except(&session_id, origin, &ServerEvent::DiceReset);
            }

            // Piece positions and view settings live in memory only;
            // durability comes from the explicit full-state save.
            ClientEvent::MovePiece { piece_id, x, y, .. } => {
                let state = self.session_mut(inner, &session_id);
                self.hydrate_battlefield(state, &session_id);
                state.battlefield_mut().move_piece(&piece_id, x, y);
                inner.rooms.broadcast_except(
                    &session_id,
                    origin,
                    &ServerEvent::PieceMoved { piece_id, x, y },
                );
            }

            ClientEvent::UpdateBackground { image_url, .. } => {
                self.apply_background(inner, origin, &session_id, image_url, false)?;
            }

            ClientEvent::UpdateScale { scale, .. } => {
                let scale = clamp_scale(scale);
                let state = self.session_mut(inner, &session_id);
                self.hydrate_battlefield(state, &session_id);
                state.battlefield_mut().scale = scale;
                inner.rooms.broadcast_except(
                    &session_id,
                    origin,
                    &ServerEvent::ScaleUpdated { scale },
                );
            }

            ClientEvent::UpdateGridVisibility { is_visible, .. } => {
                let state = self.session_mut(inner, &session_id);
                self.hydrate_battlefield(state, &session_id);
                state.battlefield_mut().is_grid_visible = is_visible;
                inner.rooms.broadcast_except(
                    &session_id,
                    origin,
                    &ServerEvent::GridVisibilityUpdated { is_visible },
                );
            }

            ClientEvent::UpdatePieceSize { size, .. } => {
                let size = clamp_piece_size(size);
                let state = self.session_mut(inner, &session_id);
                self.hydrate_battlefield(state, &session_id);
                state.battlefield_mut().piece_size = size;
                inner.rooms.broadcast_except(
                    &session_id,
                    origin,
                    &ServerEvent::PieceSizeUpdated { size },
                );
            }

            ClientEvent::UpdateBattlefieldState { mut state, .. } => {
                state.normalize();
                let session = self.session_mut(inner, &session_id);
                session.battlefield = Some(state.clone());
                self.persist_battlefield(session, &session_id);
                inner.rooms.broadcast_except(
                    &session_id,
                    origin,
                    &ServerEvent::BattlefieldStateUpdated { state: Some(state) },
                );
            }

            ClientEvent::BackgroundTransferStart {
                transfer_id,
                total_chunks,
                ..
            } => {
                inner.assembler.expire_stale();
                inner.assembler.begin(&transfer_id, total_chunks)?;
            }

            ClientEvent::BackgroundTransferChunk {
                transfer_id,
                chunk_index,
                chunk,
                is_last_chunk,
                ..
            } => {
                let completed =
                    inner
                        .assembler
                        .accept(&transfer_id, chunk_index, chunk, is_last_chunk)?;
                if let Some(image_url) = completed {
                    debug!(session_id, transfer_id, "background transfer complete");
                    self.apply_background(inner, origin, &session_id, image_url, true)?;
                }
            }

            ClientEvent::RequestLatestState { .. } => {
                let state = self.session_mut(inner, &session_id);
                self.hydrate_roster(state, &session_id);
                let snapshot = state.roster.clone();
                inner
                    .rooms
                    .send_to(origin, ServerEvent::SessionUpdated { state: snapshot });
            }

            ClientEvent::RequestLatestDiceState { .. } => {
                let state = self.session_mut(inner, &session_id);
                self.hydrate_dice(state, &session_id);
                let dice_state = state.dice.clone().unwrap_or_default();
                inner
                    .rooms
                    .send_to(origin, ServerEvent::DiceStateUpdated { dice_state });
            }

            ClientEvent::RequestLatestRollHistory { .. } => {
                let state = self.session_mut(inner, &session_id);
                self.hydrate_dice(state, &session_id);
                let history = state.history.to_vec();
                inner
                    .rooms
                    .send_to(origin, ServerEvent::RollHistorySync { history });
            }

            ClientEvent::RequestLatestBattlefieldState { .. } => {
                let state = self.session_mut(inner, &session_id);
                self.hydrate_battlefield(state, &session_id);
                let battlefield = state.battlefield.clone();
                inner.rooms.send_to(
                    origin,
                    ServerEvent::BattlefieldStateUpdated { state: battlefield },
                );
            }
        }
        Ok(())
    }

    fn session_mut<'a>(&self, inner: &'a mut Inner, session_id: &str) -> &'a mut SessionState {
        inner
            .sessions
            .entry(session_id.to_string())
            .or_insert_with(SessionState::new)
    }

    fn mutate_monster(
        &self,
        inner: &mut Inner,
        origin: ClientId,
        session_id: &str,
        monster_id: &str,
        mutate: impl FnOnce(&mut battletable_protocol::RosterEntry),
    ) -> RelayResult<()> {
        let state = self.session_mut(inner, session_id);
        self.hydrate_roster(state, session_id);
        let Some(entry) = state.roster_mut().monsters.get_mut(monster_id) else {
            warn!(session_id, monster_id, "update for unknown entry");
            return Ok(());
        };
        mutate(entry);
        let monster = entry.clone();
        self.persist_roster(state, session_id);
        inner
            .rooms
            .broadcast_except(session_id, origin, &ServerEvent::MonsterUpdated { monster });
        Ok(())
    }

    fn apply_background(
        &self,
        inner: &mut Inner,
        origin: ClientId,
        session_id: &str,
        image_url: String,
        from_transfer: bool,
    ) -> RelayResult<()> {
        let state = self.session_mut(inner, session_id);
        self.hydrate_battlefield(state, session_id);
        state.battlefield_mut().background_image = Some(image_url.clone());
        self.persist_battlefield(state, session_id);
        let event = if from_transfer {
            ServerEvent::BackgroundTransferComplete { image_url }
        } else {
            ServerEvent::BackgroundUpdated { image_url }
        };
        inner.rooms.broadcast_except(session_id, origin, &event);
        Ok(())
    }

    // A store that cannot serve a cache miss degrades to an empty cache;
    // the mutation and its broadcast must still go through.
    fn hydrate_roster(&self, state: &mut SessionState, session_id: &str) {
        if state.roster.is_none() {
            match self.store.load_roster(session_id) {
                Ok(Some(doc)) => state.roster = Some(doc.snapshot),
                Ok(None) => {}
                Err(err) => warn!(session_id, %err, "roster hydration failed"),
            }
        }
    }

    fn hydrate_dice(&self, state: &mut SessionState, session_id: &str) {
        if state.dice.is_none() {
            match self.store.load_dice(session_id) {
                Ok(Some(doc)) => {
                    let mut dice = doc.state;
                    dice.normalize();
                    state.dice = Some(dice);
                    state.history = battletable_protocol::RollHistory::from_records(doc.history);
                }
                Ok(None) => {}
                Err(err) => warn!(session_id, %err, "dice hydration failed"),
            }
        }
    }

    fn hydrate_battlefield(&self, state: &mut SessionState, session_id: &str) {
        if state.battlefield.is_none() {
            match self.store.load_battlefield(session_id) {
                Ok(Some(doc)) => {
                    let mut battlefield = doc.state;
                    battlefield.normalize();
                    state.battlefield = Some(battlefield);
                }
                Ok(None) => {}
                Err(err) => warn!(session_id, %err, "battlefield hydration failed"),
            }
        }
    }

    fn persist_roster(&self, state: &SessionState, session_id: &str) {
        if !self.config.persist {
            return;
        }
        if let Some(snapshot) = &state.roster {
            self.queue.enqueue(PersistTask::Roster {
                session_id: session_id.to_string(),
                snapshot: snapshot.clone(),
            });
        }
    }

    fn persist_dice(&self, state: &SessionState, session_id: &str) {
        if !self.config.persist {
            return;
        }
        self.queue.enqueue(PersistTask::Dice {
            session_id: session_id.to_string(),
            state: state.dice.clone().unwrap_or_default(),
            history: state.history.to_vec(),
        });
    }

    fn persist_battlefield(&self, state: &SessionState, session_id: &str) {
        if !self.config.persist {
            return;
        }
        if let Some(battlefield) = &state.battlefield {
            self.queue.enqueue(PersistTask::Battlefield {
                session_id: session_id.to_string(),
                state: battlefield.clone(),
            });
        }
    }
}
