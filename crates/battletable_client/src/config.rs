//! Client configuration.

use battletable_protocol::{CHUNK_PACING, POSITION_EPSILON};
use std::time::Duration;

/// Configuration for the session client.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Trailing-edge debounce window for rapid field edits.
    pub debounce_window: Duration,
    /// Positional deltas at or below this are ignored when applying
    /// battlefield snapshots.
    pub position_epsilon: f64,
    /// Delay between consecutive chunk sends of a background transfer.
    pub chunk_pacing: Duration,
}

impl ClientConfig {
    /// Creates the default configuration.
    pub fn new() -> Self {
        Self {
            debounce_window: Duration::from_millis(400),
            position_epsilon: POSITION_EPSILON,
            chunk_pacing: CHUNK_PACING,
        }
    }

    /// Sets the debounce window.
    pub fn with_debounce_window(mut self, window: Duration) -> Self {
        self.debounce_window = window;
        self
    }

    /// Sets the snapshot position epsilon.
    pub fn with_position_epsilon(mut self, epsilon: f64) -> Self {
        self.position_epsilon = epsilon;
        self
    }

    /// Sets the chunk pacing delay.
    pub fn with_chunk_pacing(mut self, pacing: Duration) -> Self {
        self.chunk_pacing = pacing;
        self
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self::new()
    }
}
