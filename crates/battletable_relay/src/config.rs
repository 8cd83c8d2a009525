//! Relay configuration.

use battletable_protocol::TRANSFER_TTL;
use std::time::Duration;

/// Configuration for the relay.
#[derive(Debug, Clone)]
pub struct RelayConfig {
    /// How long a partial chunked transfer is retained before discard.
    pub transfer_ttl: Duration,
    /// Whether mutations are queued for persistence. Disabled in tests
    /// that only exercise fan-out.
    pub persist: bool,
}

impl RelayConfig {
    /// Creates the default configuration.
    pub fn new() -> Self {
        Self {
            transfer_ttl: TRANSFER_TTL,
            persist: true,
        }
    }

    /// Sets the partial-transfer time-to-live.
    pub fn with_transfer_ttl(mut self, ttl: Duration) -> Self {
        self.transfer_ttl = ttl;
        self
    }

    /// Enables or disables persistence.
    pub fn with_persist(mut self, persist: bool) -> Self {
        self.persist = persist;
        self
    }
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self::new()
    }
}
