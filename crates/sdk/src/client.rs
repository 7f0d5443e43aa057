//! PropBridge Client Implementation

use crate::error::{Result, SdkError};
use crate::types::{Incoming, Notification, Request};
use futures::{SinkExt, StreamExt};
use propbridge_core::DynamicValue;
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::sync::{broadcast, mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::Message;

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);
const NOTIFICATION_BUFFER: usize = 256;

type Reply = oneshot::Sender<Result<Value>>;

fn closed_error() -> SdkError {
    SdkError::Connection("connection closed".to_string())
}

#[derive(Default)]
struct PendingState {
    replies: BTreeMap<i64, Reply>,
    closed: bool,
}

/// Requests awaiting a reply, keyed by id (ordered, oldest first)
#[derive(Default, Clone)]
pub(crate) struct Pending {
    inner: Arc<Mutex<PendingState>>,
}

impl Pending {
    fn lock(&self) -> MutexGuard<'_, PendingState> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// False once the connection has closed; `reply` is dropped then.
    fn insert(&self, id: i64, reply: Reply) -> bool {
        let mut state = self.lock();
        if state.closed {
            return false;
        }
        state.replies.insert(id, reply);
        true
    }

    fn remove(&self, id: i64) -> Option<Reply> {
        self.lock().replies.remove(&id)
    }

    fn oldest(&self) -> Option<Reply> {
        self.lock().replies.pop_first().map(|(_, reply)| reply)
    }

    /// Fail every waiting request and refuse new ones
    fn close(&self, error: SdkError) {
        let replies = {
            let mut state = self.lock();
            state.closed = true;
            std::mem::take(&mut state.replies)
        };
        for (_, reply) in replies {
            let _ = reply.send(Err(error.clone()));
        }
    }

    #[cfg(test)]
    fn len(&self) -> usize {
        self.lock().replies.len()
    }
}

/// Positional params for a write: always `[value]`, so list values are not
/// taken for the argument list itself
fn set_params(value: DynamicValue) -> Value {
    Value::Array(vec![value.to_json()])
}

/// Route one server frame to its waiting request or to the notification stream
pub(crate) fn route(text: &str, pending: &Pending, notifications: &broadcast::Sender<Notification>) {
    let Ok(incoming) = serde_json::from_str::<Incoming>(text) else {
        return;
    };

    if let Some(error) = incoming.error {
        // Errors without an id answer the oldest request (replies are in order)
        let reply = match incoming.id {
            Some(id) => pending.remove(id),
            None => pending.oldest(),
        };
        if let Some(reply) = reply {
            let _ = reply.send(Err(SdkError::Rpc {
                code: error.code,
                message: error.message,
            }));
        }
        return;
    }

    match (incoming.id, incoming.method) {
        (Some(id), _) => {
            if let Some(reply) = pending.remove(id) {
                let _ = reply.send(Ok(incoming.result.unwrap_or(Value::Null)));
            }
        }
        (None, Some(method)) => {
            // No subscribers is fine
            let _ = notifications.send(Notification {
                method,
                params: incoming.params.unwrap_or(Value::Null),
            });
        }
        (None, None) => {}
    }
}

/// PropBridge JSON-RPC Client
///
/// One WebSocket connection; requests may be issued concurrently and
/// notifications are delivered to every [`notifications`](Self::notifications)
/// receiver.
///
/// # Example
///
/// ```no_run
/// use propbridge_sdk::PropBridgeClient;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let client = PropBridgeClient::connect("ws://127.0.0.1:45679").await?;
/// let mut changes = client.notifications();
///
/// client.set("Counter.value", 7).await?;
/// println!("value = {}", client.get("Counter.value").await?);
///
/// let change = changes.recv().await?;
/// println!("{} -> {}", change.method, change.params);
/// # Ok(())
/// # }
/// ```
pub struct PropBridgeClient {
    outbound: mpsc::UnboundedSender<Message>,
    pending: Pending,
    notifications: broadcast::Sender<Notification>,
    next_id: AtomicI64,
    timeout: Duration,
    reader: JoinHandle<()>,
    writer: JoinHandle<()>,
}

impl PropBridgeClient {
    /// Connect to a PropBridge JSON-RPC endpoint
    ///
    /// # Arguments
    ///
    /// * `url` - WebSocket URL (e.g., `ws://127.0.0.1:45679`)
    pub async fn connect(url: impl AsRef<str>) -> Result<Self> {
        let (socket, _) = tokio_tungstenite::connect_async(url.as_ref()).await?;
        let (mut sink, mut source) = socket.split();

        let (outbound, mut outbound_rx) = mpsc::unbounded_channel::<Message>();
        let writer = tokio::spawn(async move {
            while let Some(message) = outbound_rx.recv().await {
                if sink.send(message).await.is_err() {
                    break;
                }
            }
            let _ = sink.close().await;
        });

        let pending = Pending::default();
        let (notifications, _) = broadcast::channel(NOTIFICATION_BUFFER);
        let reader = {
            let pending = pending.clone();
            let notifications = notifications.clone();
            tokio::spawn(async move {
                while let Some(frame) = source.next().await {
                    match frame {
                        Ok(Message::Text(text)) => route(&text, &pending, &notifications),
                        Ok(Message::Close(_)) | Err(_) => break,
                        Ok(_) => {}
                    }
                }
                pending.close(closed_error());
            })
        };

        Ok(Self {
            outbound,
            pending,
            notifications,
            next_id: AtomicI64::new(1),
            timeout: DEFAULT_TIMEOUT,
            reader,
            writer,
        })
    }

    /// Per-request reply timeout (default 30s)
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Raw JSON-RPC call; `None` params reads, `Some` writes.
    pub async fn call(&self, method: &str, params: Option<Value>) -> Result<Value> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let text = serde_json::to_string(&Request {
            jsonrpc: "2.0",
            id,
            method,
            params,
        })?;

        let (reply_tx, reply_rx) = oneshot::channel();
        if !self.pending.insert(id, reply_tx) {
            return Err(closed_error());
        }
        if self.outbound.send(Message::Text(text)).is_err() {
            self.pending.remove(id);
            return Err(closed_error());
        }

        match tokio::time::timeout(self.timeout, reply_rx).await {
            Ok(Ok(result)) => result,
            Ok(Err(_)) => Err(closed_error()),
            Err(_) => {
                self.pending.remove(id);
                Err(SdkError::Timeout(self.timeout))
            }
        }
    }

    /// Read `Class.property`
    pub async fn get(&self, method: &str) -> Result<DynamicValue> {
        let result = self.call(method, None).await?;
        DynamicValue::from_json(&result)
            .ok_or_else(|| SdkError::Protocol(format!("{} has no value: {}", method, result)))
    }

    /// Write `Class.property`
    pub async fn set(&self, method: &str, value: impl Into<DynamicValue>) -> Result<()> {
        let result = self.call(method, Some(set_params(value.into()))).await?;
        match result.as_str() {
            Some("OK") => Ok(()),
            _ => Err(SdkError::Protocol(format!("unexpected set result: {}", result))),
        }
    }

    /// Subscribe to property change notifications
    pub fn notifications(&self) -> broadcast::Receiver<Notification> {
        self.notifications.subscribe()
    }

    /// Close the connection and wait for the background tasks
    pub async fn close(self) {
        let Self {
            outbound,
            reader,
            writer,
            ..
        } = self;
        drop(outbound);
        let _ = writer.await;
        // The reader ends once the server acknowledges the close
        let _ = tokio::time::timeout(Duration::from_secs(2), reader).await;
    }
}
