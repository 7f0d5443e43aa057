//! Notification Channel
//!
//! A `ChangeSignal` is owned by an exposed object and emitted whenever one of
//! its properties changes. Listeners are explicit subscriptions: dropping the
//! returned [`Subscription`] disconnects the listener.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

type Slot = Arc<dyn Fn() + Send + Sync>;

#[derive(Default)]
struct SignalInner {
    next_id: AtomicU64,
    slots: Mutex<Vec<(u64, Slot)>>,
}

impl SignalInner {
    fn slots(&self) -> MutexGuard<'_, Vec<(u64, Slot)>> {
        self.slots.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Cheaply clonable handle; clones share the same listener list.
#[derive(Clone, Default)]
pub struct ChangeSignal {
    inner: Arc<SignalInner>,
}

impl ChangeSignal {
    pub fn new() -> Self {
        Self::default()
    }

    /// Attach a listener; it stays connected while the subscription lives.
    pub fn connect<F>(&self, slot: F) -> Subscription
    where
        F: Fn() + Send + Sync + 'static,
    {
        let id = self.inner.next_id.fetch_add(1, Ordering::Relaxed);
        self.inner.slots().push((id, Arc::new(slot)));
        Subscription {
            signal: Arc::downgrade(&self.inner),
            id,
        }
    }

    /// Call every connected listener.
    ///
    /// The listener list is snapshotted first, so listeners may emit again,
    /// connect or disconnect without deadlocking.
    pub fn emit(&self) {
        let slots: Vec<Slot> = self
            .inner
            .slots()
            .iter()
            .map(|(_, slot)| Arc::clone(slot))
            .collect();
        for slot in slots {
            slot();
        }
    }

    pub fn listener_count(&self) -> usize {
        self.inner.slots().len()
    }
}

impl fmt::Debug for ChangeSignal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChangeSignal")
            .field("listeners", &self.listener_count())
            .finish()
    }
}

/// Connection of one listener to a [`ChangeSignal`]
#[must_use = "dropping a Subscription disconnects the listener"]
pub struct Subscription {
    signal: Weak<SignalInner>,
    id: u64,
}

impl Subscription {
    pub fn disconnect(self) {}
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(inner) = self.signal.upgrade() {
            inner.slots().retain(|(id, _)| *id != self.id);
        }
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription").field("id", &self.id).finish()
    }
}
