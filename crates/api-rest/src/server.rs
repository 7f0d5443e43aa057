//! REST Server
//!
//! Accept loop over TCP. Each connection runs on its own task: read until the
//! request is complete (bounded), dispatch, then write, flush and close.

use crate::dispatcher::RestDispatcher;
use crate::error::{RestServerError, Result};
use crate::http::{parse_request, ParseStatus, ParsedRequest};
use crate::response::RestResponse;
use crate::LISTENER_TARGET;
use propbridge_core::port::TimeProvider;
use propbridge_core::{PropertyRegistry, ShutdownToken};
use std::io;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

const DEFAULT_REST_HOST: &str = "127.0.0.1";
const DEFAULT_REST_PORT: u16 = 45678;

/// Largest request accepted; anything longer is answered with 400
pub const MAX_REQUEST_BYTES: usize = 64 * 1024;

const READ_CHUNK: usize = 4096;
const ERROR_BACKOFF: Duration = Duration::from_millis(150);

/// REST Server Configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RestServerConfig {
    pub host: String,
    /// `0` binds an ephemeral port
    pub port: u16,
}

impl Default for RestServerConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_REST_HOST.to_string(),
            port: DEFAULT_REST_PORT,
        }
    }
}

/// REST Server
pub struct RestServer {
    config: RestServerConfig,
    dispatcher: Arc<RestDispatcher>,
    time_provider: Arc<dyn TimeProvider>,
}

impl RestServer {
    pub fn new(
        config: RestServerConfig,
        registry: PropertyRegistry,
        time_provider: Arc<dyn TimeProvider>,
    ) -> Self {
        Self {
            config,
            dispatcher: Arc::new(RestDispatcher::new(registry)),
            time_provider,
        }
    }

    /// Bind and start accepting; runs until `shutdown` fires
    pub async fn start(self, shutdown: ShutdownToken) -> Result<RestServerHandle> {
        let addr = format!("{}:{}", self.config.host, self.config.port);
        let listener = TcpListener::bind(&addr)
            .await
            .map_err(|source| RestServerError::Bind {
                addr: addr.clone(),
                source,
            })?;
        let local_addr = listener.local_addr()?;

        info!(
            target: LISTENER_TARGET,
            address = %local_addr,
            "REST listener active"
        );

        let task = tokio::spawn(run_accept_loop(
            listener,
            self.dispatcher,
            self.time_provider,
            shutdown,
        ));

        Ok(RestServerHandle { local_addr, task })
    }
}

/// Handle to the running accept loop
pub struct RestServerHandle {
    local_addr: SocketAddr,
    task: JoinHandle<()>,
}

impl RestServerHandle {
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Wait for the accept loop to exit after shutdown
    pub async fn stopped(self) {
        if let Err(error) = self.task.await {
            warn!(target: LISTENER_TARGET, error = %error, "REST accept loop ended abnormally");
        }
    }
}

async fn run_accept_loop(
    listener: TcpListener,
    dispatcher: Arc<RestDispatcher>,
    time_provider: Arc<dyn TimeProvider>,
    mut shutdown: ShutdownToken,
) {
    let mut last_error = None::<io::ErrorKind>;
    loop {
        tokio::select! {
            _ = shutdown.wait() => break,
            accepted = listener.accept() => match accepted {
                Ok((stream, peer)) => {
                    last_error = None;
                    let dispatcher = Arc::clone(&dispatcher);
                    let time_provider = Arc::clone(&time_provider);
                    tokio::spawn(async move {
                        debug!(target: LISTENER_TARGET, peer = %peer, "REST connection accepted");
                        if let Err(error) =
                            serve_connection(stream, &dispatcher, time_provider.as_ref()).await
                        {
                            debug!(target: LISTENER_TARGET, peer = %peer, error = %error, "REST connection error");
                        }
                    });
                }
                Err(error) => {
                    let kind = error.kind();
                    if last_error != Some(kind) {
                        warn!(target: LISTENER_TARGET, error = %error, "REST accept error");
                    }
                    last_error = Some(kind);
                    tokio::time::sleep(ERROR_BACKOFF).await;
                }
            },
        }
    }
    info!(target: LISTENER_TARGET, "REST listener stopped");
}

/// One request, one response, then close.
pub(crate) async fn serve_connection<S>(
    mut stream: S,
    dispatcher: &RestDispatcher,
    time_provider: &dyn TimeProvider,
) -> io::Result<()>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let response = match read_request(&mut stream).await? {
        RequestRead::Complete(request) => dispatcher.handle(&request),
        RequestRead::Rejected => RestResponse::bad_request(),
        RequestRead::Closed => return Ok(()),
    };

    stream
        .write_all(&response.render(time_provider.now_millis()))
        .await?;
    stream.flush().await?;
    stream.shutdown().await
}

enum RequestRead {
    Complete(ParsedRequest),
    /// Malformed, truncated or over the size limit
    Rejected,
    /// Peer closed before sending anything
    Closed,
}

async fn read_request<S>(stream: &mut S) -> io::Result<RequestRead>
where
    S: AsyncRead + Unpin,
{
    let mut buf = Vec::with_capacity(READ_CHUNK);
    let mut chunk = [0u8; READ_CHUNK];

    loop {
        let n = stream.read(&mut chunk).await?;
        if n == 0 {
            return Ok(if buf.is_empty() {
                RequestRead::Closed
            } else {
                RequestRead::Rejected
            });
        }
        buf.extend_from_slice(&chunk[..n]);

        match parse_request(&buf) {
            Ok(ParseStatus::Complete(request)) => return Ok(RequestRead::Complete(request)),
            Ok(ParseStatus::Incomplete) if buf.len() < MAX_REQUEST_BYTES => continue,
            Ok(ParseStatus::Incomplete) => {
                warn!(target: LISTENER_TARGET, bytes = buf.len(), "REST request too large");
                return Ok(RequestRead::Rejected);
            }
            Err(error) => {
                debug!(target: LISTENER_TARGET, error = %error, "Unparseable HTTP request");
                return Ok(RequestRead::Rejected);
            }
        }
    }
}
