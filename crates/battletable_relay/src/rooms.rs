//! Session rooms and event fan-out.

use battletable_protocol::ServerEvent;
use std::collections::HashMap;
use tokio::sync::mpsc::UnboundedSender;
use tracing::debug;

/// Opaque id for one connected client.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ClientId(pub u64);

impl std::fmt::Display for ClientId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "client-{}", self.0)
    }
}

struct Member {
    session_id: String,
    sender: UnboundedSender<ServerEvent>,
}

/// Tracks which clients belong to which session room.
///
/// A client is in at most one room; joining a second session leaves the
/// first. Sends go over unbounded channels, so a slow receiver never
/// blocks fan-out; a closed channel marks the member dead and the next
/// sweep drops it.
#[derive(Default)]
pub struct RoomRegistry {
    members: HashMap<ClientId, Member>,
    rooms: HashMap<String, Vec<ClientId>>,
}

impl RoomRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Puts a client into a session room, leaving any previous room.
    /// Rejoining the current room is a no-op.
    pub fn join(
        &mut self,
        client_id: ClientId,
        session_id: &str,
        sender: UnboundedSender<ServerEvent>,
    ) {
        if let Some(member) = self.members.get(&client_id) {
            if member.session_id == session_id {
                return;
            }
            self.leave(client_id);
        }
        self.members.insert(
            client_id,
            Member {
                session_id: session_id.to_string(),
                sender,
            },
        );
        self.rooms
            .entry(session_id.to_string())
            .or_default()
            .push(client_id);
        debug!(%client_id, session_id, "joined room");
    }

    /// Removes a client from its room, dropping the room when it empties.
    pub fn leave(&mut self, client_id: ClientId) {
        let Some(member) = self.members.remove(&client_id) else {
            return;
        };
        if let Some(ids) = self.rooms.get_mut(&member.session_id) {
            ids.retain(|id| *id != client_id);
            if ids.is_empty() {
                self.rooms.remove(&member.session_id);
            }
        }
        debug!(%client_id, session_id = %member.session_id, "left room");
    }

    /// The session a client has joined, if any.
    pub fn session_of(&self, client_id: ClientId) -> Option<&str> {
        self.members
            .get(&client_id)
            .map(|member| member.session_id.as_str())
    }

    /// Sends an event to every room member except the originator.
    /// Members whose channel has closed are dropped.
    pub fn broadcast_except(&mut self, session_id: &str, origin: ClientId, event: &ServerEvent) {
        let Some(ids) = self.rooms.get(session_id) else {
            return;
        };
        let mut dead = Vec::new();
        for id in ids {
            if *id == origin {
                continue;
            }
            let Some(member) = self.members.get(id) else {
                continue;
            };
            if member.sender.send(event.clone()).is_err() {
                dead.push(*id);
            }
        }
        for id in dead {
            self.leave(id);
        }
    }

    /// Sends an event to one client. Returns false when the client is
    /// gone or its channel has closed.
    pub fn send_to(&mut self, client_id: ClientId, event: ServerEvent) -> bool {
        let Some(member) = self.members.get(&client_id) else {
            return false;
        };
        if member.sender.send(event).is_err() {
            self.leave(client_id);
            return false;
        }
        true
    }

    /// Number of members in a room.
    pub fn room_size(&self, session_id: &str) -> usize {
        self.rooms.get(session_id).map_or(0, Vec::len)
    }
}
