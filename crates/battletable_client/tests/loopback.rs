//! End-to-end tests wiring two session clients to a relay in-process.

use battletable_client::{
    ClientConfig, ClientError, ClientResult, ConnectionStatus, RelayLink, SessionClient,
};
use battletable_protocol::{ClientEvent, RosterEntry, ServerEvent};
use battletable_relay::{ClientId, Relay, RelayConfig};
use battletable_store::MemoryStore;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::mpsc::UnboundedReceiver;

/// A link that feeds events straight into an in-process relay.
struct LoopbackLink {
    relay: Arc<Relay>,
    id: ClientId,
}

impl RelayLink for LoopbackLink {
    fn send(&self, event: ClientEvent) -> ClientResult<()> {
        self.relay
            .handle_event(self.id, event)
            .map_err(|err| ClientError::Link(err.to_string()))
    }

    fn is_connected(&self) -> bool {
        true
    }
}

struct Party {
    client: SessionClient<LoopbackLink>,
    rx: UnboundedReceiver<ServerEvent>,
}

impl Party {
    fn join(relay: &Arc<Relay>, session: &str, name: &str) -> Self {
        let (tx, rx) = tokio::sync::mpsc::unbounded_channel();
        let id = relay.register(tx);
        let link = LoopbackLink {
            relay: Arc::clone(relay),
            id,
        };
        let mut client = SessionClient::new(
            ClientConfig::new().with_debounce_window(Duration::from_millis(50)),
            link,
        );
        client.connect(session, name).unwrap();
        let mut party = Self { client, rx };
        party.pump();
        party
    }

    /// Applies every event the relay has delivered so far.
    fn pump(&mut self) {
        while let Ok(event) = self.rx.try_recv() {
            self.client.handle_server_event(event);
        }
    }
}

fn relay() -> Arc<Relay> {
    let (relay, _worker) = Relay::new(RelayConfig::default(), Arc::new(MemoryStore::new()));
    Arc::new(relay)
}

#[test]
fn both_clients_synchronize_on_join() {
    let relay = relay();
    let alice = Party::join(&relay, "s1", "alice");
    let bob = Party::join(&relay, "s1", "bob");

    assert_eq!(alice.client.status(), ConnectionStatus::Synchronized);
    assert_eq!(bob.client.status(), ConnectionStatus::Synchronized);
}

#[test]
fn roster_edits_fan_out_without_echo() {
    let relay = relay();
    let mut alice = Party::join(&relay, "s1", "alice");
    let mut bob = Party::join(&relay, "s1", "bob");

    alice
        .client
        .add_monster(RosterEntry::new("m1", "Goblin", 20, false))
        .unwrap();
    let start = Instant::now();
    alice.client.set_hp("m1", 12, 20, 0, start).unwrap();
    alice
        .client
        .flush_debounced(start + Duration::from_millis(51))
        .unwrap();

    bob.pump();
    assert_eq!(bob.client.roster().get("m1").unwrap().current_hp, 12);

    // The relay never echoes back to the originator; alice's state is
    // her own optimistic copy, applied exactly once.
    alice.pump();
    assert_eq!(alice.client.roster().len(), 1);
    assert_eq!(alice.client.roster().get("m1").unwrap().current_hp, 12);
}

#[test]
fn sessions_are_isolated() {
    let relay = relay();
    let mut alice = Party::join(&relay, "s1", "alice");
    let mut carol = Party::join(&relay, "s2", "carol");

    alice
        .client
        .add_monster(RosterEntry::new("m1", "Goblin", 7, false))
        .unwrap();
    carol.pump();
    assert!(carol.client.roster().is_empty());
}

#[test]
fn late_joiner_receives_the_current_state() {
    let relay = relay();
    let mut alice = Party::join(&relay, "s1", "alice");
    alice
        .client
        .add_monster(RosterEntry::new("m1", "Goblin", 7, false))
        .unwrap();
    alice.client.set_scale(2.0).unwrap();

    let bob = Party::join(&relay, "s1", "bob");
    assert_eq!(bob.client.status(), ConnectionStatus::Synchronized);
    assert!(bob.client.roster().get("m1").is_some());
    assert_eq!(bob.client.battlefield().state().scale, 2.0);
}

#[test]
fn piece_moves_converge_to_the_last_release() {
    let relay = relay();
    let mut alice = Party::join(&relay, "s1", "alice");
    let mut bob = Party::join(&relay, "s1", "bob");

    alice.client.begin_drag("m1").unwrap();
    alice.client.drag_to(10.0, 10.0);
    alice.client.end_drag().unwrap();
    bob.pump();

    bob.client.begin_drag("m1").unwrap();
    bob.client.drag_to(30.0, 5.0);
    bob.client.end_drag().unwrap();
    alice.pump();

    assert_eq!(alice.client.battlefield().state().pieces["m1"].x, 30.0);
    assert_eq!(bob.client.battlefield().state().pieces["m1"].x, 30.0);
}

#[test]
fn reconnect_resynchronizes_from_snapshots() {
    let relay = relay();
    let mut alice = Party::join(&relay, "s1", "alice");
    alice
        .client
        .add_monster(RosterEntry::new("m1", "Goblin", 7, false))
        .unwrap();

    let mut bob = Party::join(&relay, "s1", "bob");
    bob.client.disconnect();
    assert!(!bob.client.status().can_edit());

    // Meanwhile the session moves on.
    alice.client.delete_monster("m1").unwrap();
    alice
        .client
        .add_monster(RosterEntry::new("m2", "Orc", 15, false))
        .unwrap();

    bob.client.connect("s1", "bob").unwrap();
    bob.pump();
    assert_eq!(bob.client.status(), ConnectionStatus::Synchronized);
    assert!(bob.client.roster().get("m1").is_none());
    assert!(bob.client.roster().get("m2").is_some());
}

#[test]
fn dice_rolls_replicate_with_history() {
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    let relay = relay();
    let mut alice = Party::join(&relay, "s1", "alice");
    let mut bob = Party::join(&relay, "s1", "bob");

    let start = Instant::now();
    alice.client.adjust_die_count("d20", 2, start).unwrap();
    alice
        .client
        .flush_debounced(start + Duration::from_millis(51))
        .unwrap();
    let mut rng = StdRng::seed_from_u64(11);
    let record = alice.client.roll_dice(1000, &mut rng).unwrap().unwrap();

    bob.pump();
    assert_eq!(bob.client.dice().state().dice["d20"], 2);
    assert_eq!(bob.client.dice().history().len(), 1);
    assert_eq!(
        bob.client.dice().history().iter().next().unwrap().rolls,
        record.rolls
    );

    // A third participant joining later pulls the same history.
    let carol = Party::join(&relay, "s1", "carol");
    assert_eq!(carol.client.dice().history().len(), 1);
}
