//! Connection state machine.

/// The client's position in the connect-and-sync sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionStatus {
    /// No link to the relay.
    Disconnected,
    /// Link establishment in progress.
    Connecting,
    /// Link up, session not joined yet.
    Connected,
    /// Join sent; waiting for the initial topic snapshots.
    SessionJoined,
    /// All topic snapshots arrived; edits are allowed.
    Synchronized,
}

impl ConnectionStatus {
    /// Whether local edits may be published in this state.
    pub fn can_edit(&self) -> bool {
        matches!(self, ConnectionStatus::Synchronized)
    }
}

/// Tracks the connection status and which topic snapshots have arrived.
///
/// `Synchronized` is reached once the roster, dice, and battlefield
/// snapshots have all been seen after a join. A reconnect resets the
/// arrival flags and the sequence starts over.
#[derive(Debug)]
pub struct ConnectionTracker {
    status: ConnectionStatus,
    roster_seen: bool,
    dice_seen: bool,
    battlefield_seen: bool,
}

impl ConnectionTracker {
    /// Creates a tracker in the disconnected state.
    pub fn new() -> Self {
        Self {
            status: ConnectionStatus::Disconnected,
            roster_seen: false,
            dice_seen: false,
            battlefield_seen: false,
        }
    }

    /// Current status.
    pub fn status(&self) -> ConnectionStatus {
        self.status
    }

    /// Whether local edits may be published.
    pub fn can_edit(&self) -> bool {
        self.status.can_edit()
    }

    /// Link establishment started.
    pub fn connecting(&mut self) {
        self.status = ConnectionStatus::Connecting;
    }

    /// Link is up.
    pub fn connected(&mut self) {
        self.status = ConnectionStatus::Connected;
    }

    /// Join was sent; snapshot arrivals start counting from zero.
    pub fn session_joined(&mut self) {
        self.status = ConnectionStatus::SessionJoined;
        self.roster_seen = false;
        self.dice_seen = false;
        self.battlefield_seen = false;
    }

    /// The link dropped; everything resets.
    pub fn disconnected(&mut self) {
        self.status = ConnectionStatus::Disconnected;
        self.roster_seen = false;
        self.dice_seen = false;
        self.battlefield_seen = false;
    }

    /// Records the roster snapshot arrival.
    pub fn mark_roster(&mut self) {
        self.roster_seen = true;
        self.advance();
    }

    /// Records the dice snapshot arrival.
    pub fn mark_dice(&mut self) {
        self.dice_seen = true;
        self.advance();
    }

    /// Records the battlefield snapshot arrival.
    pub fn mark_battlefield(&mut self) {
        self.battlefield_seen = true;
        self.advance();
    }

    fn advance(&mut self) {
        if self.status == ConnectionStatus::SessionJoined
            && self.roster_seen
            && self.dice_seen
            && self.battlefield_seen
        {
            self.status = ConnectionStatus::Synchronized;
        }
    }
}

impl Default for ConnectionTracker {
    fn default() -> Self {
        Self::new()
    }
}
