use crate::state::door::{DoorLocation, DoorState, DoorTransition, Snapshot};
use chrono::Utc;
use std::sync::{Mutex, MutexGuard, PoisonError};
use tracing::debug;

type StateCallback = Box<dyn Fn(&Snapshot) + Send>;
type ConnectivityCallback = Box<dyn Fn(bool) + Send>;

/// Token returned by the subscribe calls, used to unsubscribe
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Subscription(u64);

struct Inner {
    snapshot: Snapshot,
    connected: bool,
    next_subscription: u64,
    state_subscribers: Vec<(Subscription, StateCallback)>,
    connectivity_subscribers: Vec<(Subscription, ConnectivityCallback)>,
}

impl Inner {
    fn next_subscription(&mut self) -> Subscription {
        self.next_subscription += 1;
        Subscription(self.next_subscription)
    }

    fn emit_snapshot(&self) {
        for (_, callback) in &self.state_subscribers {
            callback(&self.snapshot);
        }
    }

    fn emit_connected(&self) {
        for (_, callback) in &self.connectivity_subscribers {
            callback(self.connected);
        }
    }
}

/// Latest door snapshot and connectivity flag, with change notification.
///
/// Sole owner of both values. Callbacks are invoked synchronously, in
/// subscription order, while the store lock is held: subscribers see
/// snapshots in exactly the order updates were applied. A callback must not
/// call back into the store.
pub struct StateStore {
    inner: Mutex<Inner>,
}

impl StateStore {
    /// Create a store with every door `Unknown` and the flag cleared
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(Inner {
                snapshot: Snapshot::uniform(DoorState::Unknown, Utc::now()),
                connected: false,
                next_subscription: 0,
                state_subscribers: Vec::new(),
                connectivity_subscribers: Vec::new(),
            }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        // A panicking subscriber must not wedge the store
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Replace the transition for one door and emit the new snapshot
    pub fn update(&self, location: DoorLocation, state: DoorState) -> DoorTransition {
        let mut inner = self.lock();
        let transition = DoorTransition::new(state, Utc::now());
        inner.snapshot.set(location, transition);
        debug!(door = ?location, state = state.label(), "Door transition");
        inner.emit_snapshot();

        transition
    }

    /// Replace every door's transition in a single emission
    pub fn reset_all(&self, state: DoorState) {
        let mut inner = self.lock();
        inner.snapshot = Snapshot::uniform(state, Utc::now());
        debug!(state = state.label(), "All doors reset");
        inner.emit_snapshot();
    }

    /// Update the connectivity flag and notify connectivity subscribers
    pub fn set_connected(&self, connected: bool) {
        let mut inner = self.lock();
        inner.connected = connected;
        inner.emit_connected();
    }

    /// Current snapshot
    pub fn snapshot(&self) -> Snapshot {
        self.lock().snapshot.clone()
    }

    pub fn is_connected(&self) -> bool {
        self.lock().connected
    }

    /// Subscribe to snapshots. The current snapshot is delivered immediately.
    pub fn subscribe_state<F>(&self, callback: F) -> Subscription
    where
        F: Fn(&Snapshot) + Send + 'static,
    {
        let mut inner = self.lock();
        let subscription = inner.next_subscription();
        callback(&inner.snapshot);
        inner
            .state_subscribers
            .push((subscription, Box::new(callback)));
        subscription
    }

    /// Subscribe to the connectivity flag. The current value is delivered immediately.
    pub fn subscribe_connectivity<F>(&self, callback: F) -> Subscription
    where
        F: Fn(bool) + Send + 'static,
    {
        let mut inner = self.lock();
        let subscription = inner.next_subscription();
        callback(inner.connected);
        inner
            .connectivity_subscribers
            .push((subscription, Box::new(callback)));
        subscription
    }

    /// Remove a subscriber. Returns false if it was already gone.
    pub fn unsubscribe(&self, subscription: Subscription) -> bool {
        let mut inner = self.lock();
        let before = inner.state_subscribers.len() + inner.connectivity_subscribers.len();
        inner.state_subscribers.retain(|(s, _)| *s != subscription);
        inner
            .connectivity_subscribers
            .retain(|(s, _)| *s != subscription);
        before != inner.state_subscribers.len() + inner.connectivity_subscribers.len()
    }
}

impl Default for StateStore {
    fn default() -> Self {
        Self::new()
    }
}
