//! Local battlefield state: drag lifecycle, snapshot application, and
//! background send-path selection.

use crate::error::ClientResult;
use crate::roster::RosterView;
use battletable_protocol::{
    new_transfer_id, split_payload, BattlefieldState, Piece, PieceKind, SendPath,
};
use tracing::debug;

/// How a background payload will travel, prepared client-side.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BackgroundSend {
    /// Small enough for a single update event.
    Direct(String),
    /// Split into a paced chunked transfer.
    Chunked {
        /// Transfer id for the start announcement and every chunk.
        transfer_id: String,
        /// The chunks, in send order.
        chunks: Vec<String>,
    },
}

/// The local copy of the battlefield.
///
/// A drag updates the local position on every frame but publishes nothing
/// until release; inbound moves for the dragged piece are ignored while
/// the drag is live, and whoever releases last wins. Snapshots are
/// authoritative for the piece set: stale local pieces are pruned and
/// missing ones materialized from the roster.
#[derive(Debug)]
pub struct BattlefieldView {
    state: BattlefieldState,
    epsilon: f64,
    dragging: Option<String>,
}

impl BattlefieldView {
    /// Creates an empty battlefield with the given snapshot epsilon.
    pub fn new(epsilon: f64) -> Self {
        Self {
            state: BattlefieldState::default(),
            epsilon,
            dragging: None,
        }
    }

    /// The current state.
    pub fn state(&self) -> &BattlefieldState {
        &self.state
    }

    /// The piece currently being dragged, if any.
    pub fn dragging(&self) -> Option<&str> {
        self.dragging.as_deref()
    }

    /// Starts dragging a piece.
    pub fn begin_drag(&mut self, piece_id: &str) {
        self.dragging = Some(piece_id.to_string());
    }

    /// Updates the dragged piece's local position. No-op when nothing is
    /// being dragged.
    pub fn drag_to(&mut self, x: f64, y: f64) {
        let Some(piece_id) = self.dragging.clone() else {
            return;
        };
        self.state.move_piece(&piece_id, x, y);
    }

    /// Ends the drag, returning the piece and final position to publish.
    pub fn end_drag(&mut self) -> Option<(String, f64, f64)> {
        let piece_id = self.dragging.take()?;
        let piece = self.state.pieces.get(&piece_id)?;
        Some((piece_id, piece.x, piece.y))
    }

    /// Sets the zoom factor locally, clamped, returning the applied value.
    pub fn set_scale(&mut self, scale: f64) -> f64 {
        self.state.set_scale(scale);
        self.state.scale
    }

    /// Sets the piece size locally, clamped, returning the applied value.
    pub fn set_piece_size(&mut self, size: u32) -> u32 {
        self.state.set_piece_size(size);
        self.state.piece_size
    }

    /// Shows or hides the grid locally.
    pub fn set_grid_visible(&mut self, visible: bool) {
        self.state.is_grid_visible = visible;
    }

    /// Sets the background locally.
    pub fn set_background(&mut self, image_url: String) {
        self.state.background_image = Some(image_url);
    }

    /// Picks the send path for a background payload: a direct event for
    /// small ones, a chunked transfer for large ones, an error above the
    /// hard limit.
    pub fn prepare_background(&self, payload: &str) -> ClientResult<BackgroundSend> {
        match SendPath::for_len(payload.len())? {
            SendPath::Direct => Ok(BackgroundSend::Direct(payload.to_string())),
            SendPath::Chunked => Ok(BackgroundSend::Chunked {
                transfer_id: new_transfer_id(),
                chunks: split_payload(payload),
            }),
        }
    }

    /// Applies an inbound piece move. Ignored while the same piece is
    /// being dragged locally.
    pub fn apply_piece_moved(&mut self, piece_id: &str, x: f64, y: f64) {
        if self.dragging.as_deref() == Some(piece_id) {
            debug!(piece_id, "ignoring remote move for dragged piece");
            return;
        }
        self.state.move_piece(piece_id, x, y);
    }

    /// Applies an inbound scale change.
    pub fn apply_scale(&mut self, scale: f64) {
        self.state.set_scale(scale);
    }

    /// Applies an inbound grid visibility change.
    pub fn apply_grid_visibility(&mut self, visible: bool) {
        self.state.is_grid_visible = visible;
    }

    /// Applies an inbound piece size change.
    pub fn apply_piece_size(&mut self, size: u32) {
        self.state.set_piece_size(size);
    }

    /// Applies an inbound background change.
    pub fn apply_background(&mut self, image_url: String) {
        self.state.background_image = Some(image_url);
    }

    /// Applies a full battlefield snapshot.
    ///
    /// View settings and the background replace wholesale. For pieces the
    /// snapshot is authoritative: local pieces it lacks are pruned (the
    /// dragged one excepted), unknown pieces are materialized from the
    /// roster entry when one exists (falling back to the snapshot's own
    /// attributes, then to 10/10 hit points), and existing pieces only
    /// take the snapshot position when it differs beyond the epsilon.
    /// Pieces that would materialize with an empty name are skipped.
    pub fn apply_snapshot(&mut self, mut incoming: BattlefieldState, roster: &RosterView) {
        incoming.normalize();
        self.state.scale = incoming.scale;
        self.state.is_grid_visible = incoming.is_grid_visible;
        self.state.piece_size = incoming.piece_size;
        if incoming.background_image.is_some() {
            self.state.background_image = incoming.background_image.clone();
        }

        let dragged = self.dragging.clone();
        self.state
            .pieces
            .retain(|id, _| incoming.pieces.contains_key(id) || Some(id) == dragged.as_ref());

        for (id, piece) in incoming.pieces {
            if Some(&id) == dragged.as_ref() {
                continue;
            }
            match self.state.pieces.get_mut(&id) {
                Some(existing) => {
                    if existing.moved_beyond_epsilon_with(piece.x, piece.y, self.epsilon) {
                        existing.x = piece.x;
                        existing.y = piece.y;
                    }
                    // Bare pieces from move events carry no attributes;
                    // never let them blank out known ones.
                    if !piece.name.is_empty() {
                        existing.name = piece.name;
                        existing.kind = piece.kind;
                    }
                    if piece.max_hp > 0 {
                        existing.current_hp = piece.current_hp;
                        existing.max_hp = piece.max_hp;
                    }
                }
                None => {
                    if let Some(materialized) = materialize(&id, &piece, roster) {
                        self.state.pieces.insert(id, materialized);
                    }
                }
            }
        }
    }
}

/// Builds a piece for an id first seen in a snapshot. Attribute priority
/// is the roster entry, then the snapshot piece, then 10/10 hit points.
/// Returns `None` when no non-empty name can be found.
fn materialize(id: &str, piece: &Piece, roster: &RosterView) -> Option<Piece> {
    let mut built = piece.clone();
    if let Some(entry) = roster.get(id) {
        built.name = entry.name.clone();
        built.kind = if entry.is_adventurer {
            PieceKind::Adventurer
        } else {
            PieceKind::Monster
        };
        built.current_hp = entry.current_hp;
        built.max_hp = entry.max_hp;
    } else if built.max_hp == 0 {
        built.current_hp = 10;
        built.max_hp = 10;
    }
    if built.name.is_empty() {
        debug!(id, "skipping nameless piece from snapshot");
        return None;
    }
    Some(built)
}

trait EpsilonExt {
    fn moved_beyond_epsilon_with(&self, x: f64, y: f64, epsilon: f64) -> bool;
}

impl EpsilonExt for Piece {
    fn moved_beyond_epsilon_with(&self, x: f64, y: f64, epsilon: f64) -> bool {
        (self.x - x).abs() > epsilon || (self.y - y).abs() > epsilon
    }
}
