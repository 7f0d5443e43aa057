//! JSON-RPC Server
//!
//! WebSocket listener over TCP. Each connection has a reader loop that
//! dispatches text frames and a writer task that drains the client's outbound
//! queue; replies and notifications share that queue, so a client sees them
//! in the order they were produced.

use crate::dispatcher::RpcDispatcher;
use crate::error::{Result, RpcServerError};
use crate::fanout::{ClientSet, NotificationFanout};
use crate::LISTENER_TARGET;
use futures::{SinkExt, StreamExt};
use propbridge_core::{ChangeListener, PropertyRegistry, ShutdownToken};
use std::io;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::{TcpListener, TcpStream};
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::Message;
use tracing::{debug, info, warn};

const DEFAULT_RPC_HOST: &str = "127.0.0.1";
const DEFAULT_RPC_PORT: u16 = 45679;

const ERROR_BACKOFF: Duration = Duration::from_millis(150);

/// RPC Server Configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RpcServerConfig {
    pub host: String,
    /// `0` binds an ephemeral port
    pub port: u16,
}

impl Default for RpcServerConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_RPC_HOST.to_string(),
            port: DEFAULT_RPC_PORT,
        }
    }
}

/// RPC Server
pub struct RpcServer {
    config: RpcServerConfig,
    registry: PropertyRegistry,
    dispatcher: Arc<RpcDispatcher>,
    clients: ClientSet,
}

impl RpcServer {
    pub fn new(config: RpcServerConfig, registry: PropertyRegistry) -> Self {
        Self {
            config,
            dispatcher: Arc::new(RpcDispatcher::new(registry.clone())),
            registry,
            clients: ClientSet::new(),
        }
    }

    pub fn clients(&self) -> ClientSet {
        self.clients.clone()
    }

    /// Bind and start accepting; runs until `shutdown` fires.
    ///
    /// The notification fan-out is attached to the registry while the
    /// accept loop runs and detached when it stops.
    pub async fn start(self, shutdown: ShutdownToken) -> Result<RpcServerHandle> {
        let addr = format!("{}:{}", self.config.host, self.config.port);
        let listener = TcpListener::bind(&addr)
            .await
            .map_err(|source| RpcServerError::Bind {
                addr: addr.clone(),
                source,
            })?;
        let local_addr = listener.local_addr()?;

        info!(
            target: LISTENER_TARGET,
            address = %local_addr,
            "JSON-RPC listener active"
        );

        let fanout: Arc<dyn ChangeListener> =
            Arc::new(NotificationFanout::new(self.clients.clone()));
        self.registry.add_listener(Arc::clone(&fanout));

        let registry = self.registry;
        let clients = self.clients.clone();
        let dispatcher = self.dispatcher;
        let task = tokio::spawn(async move {
            run_accept_loop(listener, dispatcher, clients, shutdown).await;
            registry.remove_listener(&fanout);
        });

        Ok(RpcServerHandle {
            local_addr,
            clients: self.clients,
            task,
        })
    }
}

/// Handle to the running accept loop
pub struct RpcServerHandle {
    local_addr: SocketAddr,
    clients: ClientSet,
    task: JoinHandle<()>,
}

impl RpcServerHandle {
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Number of currently connected clients
    pub fn client_count(&self) -> usize {
        self.clients.len()
    }

    /// Wait for the accept loop to exit after shutdown
    pub async fn stopped(self) {
        if let Err(error) = self.task.await {
            warn!(target: LISTENER_TARGET, error = %error, "JSON-RPC accept loop ended abnormally");
        }
    }
}

async fn run_accept_loop(
    listener: TcpListener,
    dispatcher: Arc<RpcDispatcher>,
    clients: ClientSet,
    mut shutdown: ShutdownToken,
) {
    let mut last_error = None::<io::ErrorKind>;
    loop {
        tokio::select! {
            _ = shutdown.wait() => break,
            accepted = listener.accept() => match accepted {
                Ok((stream, peer)) => {
                    last_error = None;
                    tokio::spawn(serve_connection(
                        stream,
                        peer,
                        Arc::clone(&dispatcher),
                        clients.clone(),
                        shutdown.clone(),
                    ));
                }
                Err(error) => {
                    let kind = error.kind();
                    if last_error != Some(kind) {
                        warn!(target: LISTENER_TARGET, error = %error, "JSON-RPC accept error");
                    }
                    last_error = Some(kind);
                    tokio::time::sleep(ERROR_BACKOFF).await;
                }
            },
        }
    }
    clients.close_all();
    info!(target: LISTENER_TARGET, "JSON-RPC listener stopped");
}

async fn serve_connection(
    stream: TcpStream,
    peer: SocketAddr,
    dispatcher: Arc<RpcDispatcher>,
    clients: ClientSet,
    mut shutdown: ShutdownToken,
) {
    let socket = match tokio_tungstenite::accept_async(stream).await {
        Ok(socket) => socket,
        Err(error) => {
            debug!(target: LISTENER_TARGET, peer = %peer, error = %error, "WebSocket handshake failed");
            return;
        }
    };
    let (mut sink, mut source) = socket.split();
    let (id, mut outbound) = clients.connect();
    info!(target: LISTENER_TARGET, client = id, peer = %peer, "JSON-RPC client connected");

    let writer = tokio::spawn(async move {
        while let Some(frame) = outbound.recv().await {
            if sink.send(Message::Text(frame)).await.is_err() {
                break;
            }
        }
        let _ = sink.close().await;
    });

    loop {
        tokio::select! {
            _ = shutdown.wait() => break,
            frame = source.next() => match frame {
                Some(Ok(Message::Text(text))) => {
                    let reply = dispatcher.handle_message(&text);
                    if !clients.send(id, reply) {
                        break;
                    }
                }
                Some(Ok(Message::Binary(data))) => {
                    debug!(target: LISTENER_TARGET, client = id, bytes = data.len(), "Ignoring binary frame");
                }
                Some(Ok(Message::Close(_))) | None => break,
                // Ping/pong is answered by the transport
                Some(Ok(_)) => {}
                Some(Err(error)) => {
                    debug!(target: LISTENER_TARGET, client = id, error = %error, "JSON-RPC transport error");
                    break;
                }
            },
        }
    }

    // Removed before anything else is written to it
    clients.disconnect(id);
    if writer.await.is_err() {
        debug!(target: LISTENER_TARGET, client = id, "JSON-RPC writer task aborted");
    }
    info!(target: LISTENER_TARGET, client = id, peer = %peer, "JSON-RPC client disconnected");
}
