//! Fan-out of snapshots to registered observers.
//!
//! Every snapshot goes to every observer, in registration order, in the
//! order it was emitted. Channel observers apply backpressure: `emit` does
//! not return until each bounded channel has accepted the snapshot. Latest
//! observers only ever hold the most recent snapshot, which suits displays
//! that redraw from current state.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use nr_core::Snapshot;
use tokio::sync::{mpsc, watch};

/// A destination for snapshots.
#[derive(Debug, Clone)]
pub enum Observer {
    /// Bounded, ordered delivery of every snapshot.
    Channel(mpsc::Sender<Snapshot>),
    /// Only the latest snapshot is kept.
    Latest(watch::Sender<Option<Snapshot>>),
}

impl Observer {
    /// Creates a channel observer holding at most `capacity` undelivered snapshots.
    pub fn channel(capacity: usize) -> (Self, mpsc::Receiver<Snapshot>) {
        let (tx, rx) = mpsc::channel(capacity);
        (Self::Channel(tx), rx)
    }

    /// Creates a latest-value observer.
    pub fn latest() -> (Self, watch::Receiver<Option<Snapshot>>) {
        let (tx, rx) = watch::channel(None);
        (Self::Latest(tx), rx)
    }

    /// Delivers one snapshot. Returns `false` if the receiving side is gone.
    async fn deliver(&self, snapshot: &Snapshot) -> bool {
        match self {
            Self::Channel(tx) => tx.send(snapshot.clone()).await.is_ok(),
            Self::Latest(tx) => tx.send(Some(snapshot.clone())).is_ok(),
        }
    }
}

/// Handle returned by [`SnapshotEmitter::register`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ObserverId(u64);

#[derive(Debug, Default)]
struct Registry {
    next_id: u64,
    observers: Vec<(ObserverId, Observer)>,
}

/// Shared handle to the observer list.
///
/// Clones refer to the same list, so observers can be added or removed from
/// any thread while a pipeline is emitting.
#[derive(Debug, Clone, Default)]
pub struct SnapshotEmitter {
    registry: Arc<Mutex<Registry>>,
}

impl SnapshotEmitter {
    pub fn new() -> Self {
        Self::default()
    }

    fn registry(&self) -> MutexGuard<'_, Registry> {
        self.registry.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn register(&self, observer: Observer) -> ObserverId {
        let mut registry = self.registry();
        let id = ObserverId(registry.next_id);
        registry.next_id += 1;
        registry.observers.push((id, observer));
        id
    }

    /// Removes an observer. Returns `false` if it was not registered.
    pub fn unregister(&self, id: ObserverId) -> bool {
        let mut registry = self.registry();
        let before = registry.observers.len();
        registry.observers.retain(|(existing, _)| *existing != id);
        registry.observers.len() != before
    }

    pub fn len(&self) -> usize {
        self.registry().observers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Sends `snapshot` to every observer, waiting on full channels.
    ///
    /// Observers whose receiver has been dropped are unregistered.
    pub async fn emit(&self, snapshot: &Snapshot) {
        let observers = self.registry().observers.clone();

        for (id, observer) in observers {
            if !observer.deliver(snapshot).await {
                tracing::debug!(?id, "observer closed; unregistering");
                self.unregister(id);
            }
        }
    }
}
