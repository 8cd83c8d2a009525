//! Trailing-edge debouncing of rapid local edits.
//!
//! Spamming the HP stepper or dragging a name field would otherwise flood
//! the relay with one event per keystroke. Each (field class, entity)
//! pair holds at most one pending event; re-arming replaces the payload
//! and pushes the deadline out, so only the final value of a burst is
//! published once the window elapses.

use battletable_protocol::ClientEvent;
use std::collections::HashMap;
use std::time::{Duration, Instant};

/// The kinds of fields that debounce independently.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FieldClass {
    /// Hit point triple edits.
    Hp,
    /// Name edits.
    Name,
    /// Piece position updates.
    Position,
    /// Dice configuration changes.
    Dice,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
struct Key {
    class: FieldClass,
    entity: Option<u64>,
}

struct Pending {
    deadline: Instant,
    event: ClientEvent,
}

/// Poll-driven debouncer for outbound events.
///
/// Callers arm a slot on every local edit and poll for due events from
/// their tick; there is no internal timer, which keeps the debouncer
/// deterministic under test.
pub struct Debouncer {
    window: Duration,
    entity_keys: HashMap<String, u64>,
    next_entity: u64,
    pending: HashMap<Key, Pending>,
}

impl Debouncer {
    /// Creates a debouncer with the given trailing-edge window.
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            entity_keys: HashMap::new(),
            next_entity: 0,
            pending: HashMap::new(),
        }
    }

    fn key(&mut self, class: FieldClass, entity: Option<&str>) -> Key {
        let entity = entity.map(|id| {
            if let Some(key) = self.entity_keys.get(id) {
                *key
            } else {
                self.next_entity += 1;
                let key = self.next_entity;
                self.entity_keys.insert(id.to_string(), key);
                key
            }
        });
        Key { class, entity }
    }

    /// Arms (or re-arms) a slot with the latest event for that field.
    /// The previous pending event, if any, is replaced and its deadline
    /// pushed out to `now + window`.
    pub fn arm(&mut self, class: FieldClass, entity: Option<&str>, event: ClientEvent, now: Instant) {
        let key = self.key(class, entity);
        self.pending.insert(
            key,
            Pending {
                deadline: now + self.window,
                event,
            },
        );
    }

    /// Cancels a pending slot without publishing it.
    pub fn cancel(&mut self, class: FieldClass, entity: Option<&str>) {
        let key = self.key(class, entity);
        self.pending.remove(&key);
    }

    /// Drains every event whose window has elapsed at `now`.
    pub fn ready(&mut self, now: Instant) -> Vec<ClientEvent> {
        let due: Vec<Key> = self
            .pending
            .iter()
            .filter(|(_, pending)| pending.deadline <= now)
            .map(|(key, _)| *key)
            .collect();
        due.into_iter()
            .filter_map(|key| self.pending.remove(&key))
            .map(|pending| pending.event)
            .collect()
    }

    /// Drains every pending event regardless of deadline, for shutdown
    /// and disconnect flushes.
    pub fn flush(&mut self) -> Vec<ClientEvent> {
        self.pending.drain().map(|(_, p)| p.event).collect()
    }

    /// Number of armed slots.
    pub fn pending(&self) -> usize {
        self.pending.len()
    }
}
