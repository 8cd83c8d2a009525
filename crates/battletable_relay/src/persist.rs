//! Write-behind persistence queue.
//!
//! Mutations enqueue a whole-document write and return immediately; a
//! worker drains the queue against the [`SessionStore`]. Failures are
//! logged and dropped; the live caches remain correct and a later write
//! for the same session replaces the lost one.

use battletable_protocol::{BattlefieldState, DiceState, RollRecord, RosterSnapshot};
use battletable_store::{
    BattlefieldDocument, DiceDocument, RosterDocument, SessionStore, StoreResult,
};
use std::sync::Arc;
use tokio::sync::mpsc::{unbounded_channel, UnboundedReceiver, UnboundedSender};
use tracing::warn;

/// One queued document write.
#[derive(Debug, Clone)]
pub enum PersistTask {
    /// Replace the roster document for a session.
    Roster {
        /// Owning session.
        session_id: String,
        /// The snapshot to persist.
        snapshot: RosterSnapshot,
    },
    /// Replace the dice document for a session.
    Dice {
        /// Owning session.
        session_id: String,
        /// The configuration to persist.
        state: DiceState,
        /// The retained history, oldest first.
        history: Vec<RollRecord>,
    },
    /// Replace the battlefield document for a session.
    Battlefield {
        /// Owning session.
        session_id: String,
        /// The state to persist.
        state: BattlefieldState,
    },
}

fn apply(store: &dyn SessionStore, task: PersistTask) -> StoreResult<()> {
    match task {
        PersistTask::Roster {
            session_id,
            snapshot,
        } => store.save_roster(&RosterDocument::new(session_id, snapshot)),
        PersistTask::Dice {
            session_id,
            state,
            history,
        } => store.save_dice(&DiceDocument::new(session_id, state, history)),
        PersistTask::Battlefield { session_id, state } => {
            store.save_battlefield(&BattlefieldDocument::new(session_id, state))
        }
    }
}

/// Sending half of the persistence queue.
#[derive(Clone)]
pub struct PersistQueue {
    tx: UnboundedSender<PersistTask>,
}

impl PersistQueue {
    /// Creates a queue with a manual receiver, for tests that drain
    /// synchronously.
    pub fn channel() -> (Self, PersistWorker) {
        let (tx, rx) = unbounded_channel();
        (Self { tx }, PersistWorker { rx })
    }

    /// Creates a queue whose worker runs on the current tokio runtime.
    pub fn spawn(store: Arc<dyn SessionStore>) -> Self {
        let (queue, mut worker) = Self::channel();
        tokio::spawn(async move {
            worker.run(store).await;
        });
        queue
    }

    /// Enqueues a document write. A closed queue drops the task; the
    /// caches already hold the state, so nothing else is lost.
    pub fn enqueue(&self, task: PersistTask) {
        if self.tx.send(task).is_err() {
            warn!("persistence queue closed, dropping write");
        }
    }
}

/// Receiving half of the persistence queue.
pub struct PersistWorker {
    rx: UnboundedReceiver<PersistTask>,
}

impl PersistWorker {
    /// Drains the queue until every sender is dropped.
    pub async fn run(&mut self, store: Arc<dyn SessionStore>) {
        while let Some(task) = self.rx.recv().await {
            if let Err(err) = apply(&*store, task) {
                warn!(%err, "session document write failed");
            }
        }
    }

    /// Applies every task currently queued, returning how many were
    /// attempted. Failed writes are logged and dropped, like in `run`.
    pub fn drain(&mut self, store: &dyn SessionStore) -> usize {
        let mut drained = 0;
        while let Ok(task) = self.rx.try_recv() {
            drained += 1;
            if let Err(err) = apply(store, task) {
                warn!(%err, "session document write failed");
            }
        }
        drained
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use battletable_store::{FailingStore, MemoryStore};

    #[test]
    fn drain_applies_queued_writes() {
        let store = MemoryStore::new();
        let (queue, mut worker) = PersistQueue::channel();

        queue.enqueue(PersistTask::Roster {
            session_id: "s1".into(),
            snapshot: RosterSnapshot::default(),
        });
        queue.enqueue(PersistTask::Battlefield {
            session_id: "s1".into(),
            state: BattlefieldState::default(),
        });

        assert_eq!(worker.drain(&store), 2);
        assert!(store.load_roster("s1").unwrap().is_some());
        assert!(store.load_battlefield("s1").unwrap().is_some());
    }

    #[test]
    fn later_write_replaces_earlier_one() {
        let store = MemoryStore::new();
        let (queue, mut worker) = PersistQueue::channel();

        let mut dice = DiceState::default();
        queue.enqueue(PersistTask::Dice {
            session_id: "s1".into(),
            state: dice.clone(),
            history: Vec::new(),
        });
        dice.set_count("d6", 4);
        queue.enqueue(PersistTask::Dice {
            session_id: "s1".into(),
            state: dice,
            history: Vec::new(),
        });

        worker.drain(&store);
        let doc = store.load_dice("s1").unwrap().unwrap();
        assert_eq!(doc.state.dice["d6"], 4);
    }

    #[test]
    fn failed_writes_are_dropped_not_retried() {
        let store = FailingStore::new();
        store.set_failing(true);
        let (queue, mut worker) = PersistQueue::channel();

        queue.enqueue(PersistTask::Roster {
            session_id: "s1".into(),
            snapshot: RosterSnapshot::default(),
        });
        assert_eq!(worker.drain(&store), 1);
        assert_eq!(store.write_count(), 0);

        // Healing the store does not resurrect the lost write.
        store.set_failing(false);
        assert_eq!(worker.drain(&store), 0);
        assert!(store.load_roster("s1").unwrap().is_none());
    }
}
