//! Battlefield map state: background, view settings, and pieces.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Lower bound for the battlefield zoom factor.
pub const MIN_SCALE: f64 = 0.5;
/// Upper bound for the battlefield zoom factor.
pub const MAX_SCALE: f64 = 3.0;
/// Default battlefield zoom factor.
pub const DEFAULT_SCALE: f64 = 1.0;

/// Smallest allowed piece size in pixels.
pub const MIN_PIECE_SIZE: u32 = 20;
/// Largest allowed piece size in pixels.
pub const MAX_PIECE_SIZE: u32 = 80;
/// Default piece size in pixels.
pub const DEFAULT_PIECE_SIZE: u32 = 40;

/// Positional deltas at or below this are treated as floating-point noise
/// and not re-applied from snapshots.
pub const POSITION_EPSILON: f64 = 0.1;

/// Clamps a zoom factor to `[0.5, 3.0]`.
pub fn clamp_scale(scale: f64) -> f64 {
    scale.clamp(MIN_SCALE, MAX_SCALE)
}

/// Clamps a piece size to `[20, 80]`.
pub fn clamp_piece_size(size: u32) -> u32 {
    size.clamp(MIN_PIECE_SIZE, MAX_PIECE_SIZE)
}

/// Whether a battlefield piece projects an adventurer or a monster.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PieceKind {
    /// Player-controlled adventurer.
    Adventurer,
    /// Everything else.
    #[default]
    Monster,
}

/// The battlefield projection of a roster entry plus its free-form position.
///
/// A piece's identity is its key in [`BattlefieldState::pieces`], expected
/// to equal the corresponding roster entry id. Every field except the
/// position is best-effort: a piece created by a bare move event carries
/// only coordinates until a snapshot or roster entry fills in the rest.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Piece {
    /// Horizontal position in battlefield units.
    pub x: f64,
    /// Vertical position in battlefield units.
    pub y: f64,
    /// Display name; empty until known.
    #[serde(default)]
    pub name: String,
    /// Adventurer or monster.
    #[serde(default, rename = "type")]
    pub kind: PieceKind,
    /// Current hit points, mirrored from the roster.
    #[serde(default)]
    pub current_hp: u32,
    /// Maximum hit points, mirrored from the roster.
    #[serde(default)]
    pub max_hp: u32,
}

impl Piece {
    /// Creates a bare piece holding only a position.
    pub fn at(x: f64, y: f64) -> Self {
        Self {
            x,
            y,
            name: String::new(),
            kind: PieceKind::Monster,
            current_hp: 0,
            max_hp: 0,
        }
    }

    /// True when the positional delta to `(x, y)` exceeds the epsilon in
    /// either axis.
    pub fn moved_beyond_epsilon(&self, x: f64, y: f64) -> bool {
        (self.x - x).abs() > POSITION_EPSILON || (self.y - y).abs() > POSITION_EPSILON
    }
}

/// Full battlefield state for one session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BattlefieldState {
    /// Background image as a data URI or URL, if one is set.
    #[serde(default)]
    pub background_image: Option<String>,
    /// Zoom factor, within `[0.5, 3.0]`.
    pub scale: f64,
    /// Whether the grid overlay is drawn.
    pub is_grid_visible: bool,
    /// Piece size in pixels, within `[20, 80]`.
    pub piece_size: u32,
    /// Pieces keyed by roster entry id.
    #[serde(default)]
    pub pieces: BTreeMap<String, Piece>,
}

impl Default for BattlefieldState {
    fn default() -> Self {
        Self {
            background_image: None,
            scale: DEFAULT_SCALE,
            is_grid_visible: true,
            piece_size: DEFAULT_PIECE_SIZE,
            pieces: BTreeMap::new(),
        }
    }
}

impl BattlefieldState {
    /// Sets the zoom factor, clamped.
    pub fn set_scale(&mut self, scale: f64) {
        self.scale = clamp_scale(scale);
    }

    /// Sets the piece size, clamped.
    pub fn set_piece_size(&mut self, size: u32) {
        self.piece_size = clamp_piece_size(size);
    }

    /// Moves a piece, creating a bare one if the id is unknown.
    pub fn move_piece(&mut self, piece_id: &str, x: f64, y: f64) {
        let piece = self
            .pieces
            .entry(piece_id.to_string())
            .or_insert_with(|| Piece::at(x, y));
        piece.x = x;
        piece.y = y;
    }

    /// Re-establishes the clamping invariants on a state received off the
    /// wire.
    pub fn normalize(&mut self) {
        self.scale = clamp_scale(self.scale);
        self.piece_size = clamp_piece_size(self.piece_size);
    }
}
