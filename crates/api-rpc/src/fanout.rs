//! Notification Fan-out
//!
//! [`ClientSet`] is the broadcast set of connected JSON-RPC clients. Each
//! client owns an unbounded outbound queue drained by its connection's writer
//! task, so pushing a frame never waits on a slow peer.
//!
//! [`NotificationFanout`] is attached to the registry as a [`ChangeListener`]
//! and turns every property change into one notification per client.

use crate::types::{encode, RpcNotification};
use propbridge_core::{ChangeListener, PropertyChange};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::mpsc;
use tracing::debug;

pub type ClientId = u64;

#[derive(Default)]
struct ClientSetInner {
    next_id: AtomicU64,
    clients: Mutex<HashMap<ClientId, mpsc::UnboundedSender<String>>>,
}

/// Shared handle; clones see the same set
#[derive(Clone, Default)]
pub struct ClientSet {
    inner: Arc<ClientSetInner>,
}

impl ClientSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a client; the receiver yields every frame queued for it.
    pub fn connect(&self) -> (ClientId, mpsc::UnboundedReceiver<String>) {
        let id = self.inner.next_id.fetch_add(1, Ordering::Relaxed) + 1;
        let (tx, rx) = mpsc::unbounded_channel();
        self.clients().insert(id, tx);
        (id, rx)
    }

    /// Remove a client; its receiver ends once queued frames are drained.
    pub fn disconnect(&self, id: ClientId) -> bool {
        self.clients().remove(&id).is_some()
    }

    /// Queue a frame for one client; false if it is gone.
    pub fn send(&self, id: ClientId, frame: String) -> bool {
        let mut clients = self.clients();
        let delivered = clients
            .get(&id)
            .is_some_and(|tx| tx.send(frame).is_ok());
        if !delivered {
            clients.remove(&id);
        }
        delivered
    }

    /// Queue a frame for every client and return how many accepted it.
    ///
    /// Clients whose queue has closed are dropped from the set.
    pub fn broadcast(&self, frame: &str) -> usize {
        let mut clients = self.clients();
        let before = clients.len();
        clients.retain(|_, tx| tx.send(frame.to_string()).is_ok());
        let dropped = before - clients.len();
        if dropped > 0 {
            debug!(dropped, "Removed closed JSON-RPC clients during broadcast");
        }
        clients.len()
    }

    /// Drop every client, ending all writer tasks.
    pub fn close_all(&self) {
        self.clients().clear();
    }

    pub fn len(&self) -> usize {
        self.clients().len()
    }

    pub fn is_empty(&self) -> bool {
        self.clients().is_empty()
    }

    fn clients(&self) -> MutexGuard<'_, HashMap<ClientId, mpsc::UnboundedSender<String>>> {
        self.inner
            .clients
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

/// Broadcasts `{jsonrpc, method: "Class.property", params: value}` to every client
pub struct NotificationFanout {
    clients: ClientSet,
}

impl NotificationFanout {
    pub fn new(clients: ClientSet) -> Self {
        Self { clients }
    }
}

impl ChangeListener for NotificationFanout {
    fn property_changed(&self, change: &PropertyChange) {
        let params = change.value.to_json();
        // No JSON form (non-finite float): nothing to send
        if params.is_null() {
            debug!(method = %change.method(), "Skipping notification without a value");
            return;
        }

        let frame = encode(&RpcNotification::new(change.method(), params));
        let recipients = self.clients.broadcast(&frame);
        debug!(method = %change.method(), recipients, "Notification broadcast");
    }
}
