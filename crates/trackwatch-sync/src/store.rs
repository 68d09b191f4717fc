//! Snapshot store
//!
//! Holds the last committed [`Snapshot`] behind an `Arc` inside a
//! `tokio::sync::watch` channel. A commit is a single pointer swap, so any
//! reader holding an `Arc<Snapshot>` always sees a complete snapshot, and
//! subscribers are woken once per commit.

use std::sync::Arc;

use tokio::sync::watch;
use tracing::debug;

use trackwatch_core::domain::Snapshot;

/// Single-writer holder of the current snapshot
#[derive(Debug)]
pub struct SnapshotStore {
    tx: watch::Sender<Arc<Snapshot>>,
}

impl SnapshotStore {
    /// Creates a store holding the empty sentinel
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(Arc::new(Snapshot::empty()));
        Self { tx }
    }

    /// Returns the last committed snapshot, or the empty sentinel
    pub fn current(&self) -> Arc<Snapshot> {
        self.tx.borrow().clone()
    }

    /// Replaces the current snapshot and returns the one it replaced
    pub fn commit(&self, next: Snapshot) -> Arc<Snapshot> {
        let trackings = next.trackings.len();
        let previous = self.tx.send_replace(Arc::new(next));
        debug!(trackings, "Snapshot committed");
        previous
    }

    /// Returns a receiver that observes every commit
    pub fn subscribe(&self) -> watch::Receiver<Arc<Snapshot>> {
        self.tx.subscribe()
    }
}

impl Default for SnapshotStore {
    fn default() -> Self {
        Self::new()
    }
}
