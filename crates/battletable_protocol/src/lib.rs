//! # Battletable Protocol
//!
//! Wire model and session sync protocol types for battletable.
//!
//! This crate provides:
//! - Roster, dice, and battlefield entity types with their clamping rules
//! - `ClientEvent` / `ServerEvent`, the closed sets of session messages
//! - JSON codecs for every message
//! - The chunked transfer splitter and assembler for oversized payloads
//!
//! This is a pure protocol crate with no I/O operations. Every mutation
//! helper enforces the invariants the relay and the clients both rely on
//! (HP clamped to `[0, max]`, dice counts to `[0, 99]`, scale to
//! `[0.5, 3.0]`, piece size to `[20, 80]`), so the two sides cannot
//! drift on what a legal value is.

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod battlefield;
mod chunk;
mod dice;
mod error;
mod events;
mod roster;

pub use battlefield::{
    clamp_piece_size, clamp_scale, BattlefieldState, Piece, PieceKind, DEFAULT_PIECE_SIZE,
    DEFAULT_SCALE, MAX_PIECE_SIZE, MAX_SCALE, MIN_PIECE_SIZE, MIN_SCALE, POSITION_EPSILON,
};
pub use chunk::{
    new_transfer_id, split_payload, ChunkAssembler, SendPath, CHUNK_PACING, CHUNK_SIZE,
    DIRECT_SEND_LIMIT, MAX_BACKGROUND_BYTES, MAX_TRANSFER_CHUNKS, TRANSFER_TTL,
};
pub use dice::{
    die_sides, DiceState, DieGroup, DieRoll, RollHistory, RollRecord, MAX_DIE_COUNT,
    MAX_ROLL_HISTORY,
};
pub use error::{ProtocolError, ProtocolResult};
pub use events::{ClientEvent, ServerEvent};
pub use roster::{RosterEntry, RosterSnapshot};
