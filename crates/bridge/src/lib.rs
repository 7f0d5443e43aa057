//! PropBridge
//!
//! Composition root: one shared [`PropertyRegistry`] served by the REST
//! adapter and the JSON-RPC/WebSocket adapter. Objects registered on the
//! bridge are visible through both, and a write through either one notifies
//! every JSON-RPC client.
//!
//! ```no_run
//! use propbridge::{Bridge, BridgeConfig};
//! use propbridge_core::port::exposed::mocks::Counter;
//! use std::sync::Arc;
//!
//! # async fn run() -> anyhow::Result<()> {
//! propbridge::logging::init_logging();
//! let bridge = Bridge::start(BridgeConfig::from_env()).await?;
//! let counter = Arc::new(Counter::default());
//! bridge.register(&counter);
//! tokio::signal::ctrl_c().await?;
//! bridge.shutdown().await;
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod logging;

pub use config::BridgeConfig;
pub use propbridge_api_rest as rest;
pub use propbridge_api_rpc as rpc;
pub use propbridge_core::{
    ChangeSignal, ClassTable, DynamicValue, Exposed, Notify, PropertyRegistry, Registration,
};

use anyhow::{Context, Result};
use propbridge_api_rest::{RestServer, RestServerHandle};
use propbridge_api_rpc::{RpcServer, RpcServerHandle};
use propbridge_core::port::{SystemTimeProvider, TimeProvider};
use propbridge_core::{shutdown_channel, ShutdownSignal};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

const VERSION: &str = env!("CARGO_PKG_VERSION");
const SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(5);

/// Running bridge; dropping it without [`shutdown`](Bridge::shutdown) leaves
/// the listeners running until the runtime stops.
pub struct Bridge {
    registry: PropertyRegistry,
    rest: Option<RestServerHandle>,
    rpc: Option<RpcServerHandle>,
    shutdown: ShutdownSignal,
}

impl Bridge {
    pub async fn start(config: BridgeConfig) -> Result<Self> {
        Self::start_with(config, PropertyRegistry::new(), Arc::new(SystemTimeProvider)).await
    }

    /// Start on an existing registry (objects already registered stay exposed)
    pub async fn start_with(
        config: BridgeConfig,
        registry: PropertyRegistry,
        time_provider: Arc<dyn TimeProvider>,
    ) -> Result<Self> {
        info!("PropBridge v{} starting...", VERSION);
        let (shutdown, token) = shutdown_channel();

        let rest = match config.rest {
            Some(rest_config) => Some(
                RestServer::new(rest_config, registry.clone(), time_provider)
                    .start(token.clone())
                    .await
                    .context("REST server start failed")?,
            ),
            None => {
                info!("REST adapter disabled");
                None
            }
        };

        let rpc = match config.rpc {
            Some(rpc_config) => {
                let started = RpcServer::new(rpc_config, registry.clone())
                    .start(token)
                    .await;
                match started {
                    Ok(handle) => Some(handle),
                    Err(error) => {
                        // Do not leave the REST listener behind
                        shutdown.shutdown();
                        return Err(error).context("JSON-RPC server start failed");
                    }
                }
            }
            None => {
                info!("JSON-RPC adapter disabled");
                None
            }
        };

        info!(
            rest = ?rest.as_ref().map(RestServerHandle::local_addr),
            rpc = ?rpc.as_ref().map(RpcServerHandle::local_addr),
            "PropBridge ready"
        );

        Ok(Self {
            registry,
            rest,
            rpc,
            shutdown,
        })
    }

    /// Expose `object` through both adapters (last registration per class wins)
    pub fn register<T: Exposed>(&self, object: &Arc<T>) -> Registration {
        self.registry.register(object)
    }

    pub fn registry(&self) -> &PropertyRegistry {
        &self.registry
    }

    pub fn rest_addr(&self) -> Option<SocketAddr> {
        self.rest.as_ref().map(RestServerHandle::local_addr)
    }

    pub fn rpc_addr(&self) -> Option<SocketAddr> {
        self.rpc.as_ref().map(RpcServerHandle::local_addr)
    }

    /// Connected JSON-RPC clients
    pub fn client_count(&self) -> usize {
        self.rpc.as_ref().map_or(0, RpcServerHandle::client_count)
    }

    /// Stop both listeners and disconnect every JSON-RPC client
    pub async fn shutdown(self) {
        info!("Shutdown requested. Stopping adapters...");
        self.shutdown.shutdown();

        let stopped = async {
            if let Some(rest) = self.rest {
                rest.stopped().await;
            }
            if let Some(rpc) = self.rpc {
                rpc.stopped().await;
            }
        };
        if tokio::time::timeout(SHUTDOWN_TIMEOUT, stopped).await.is_err() {
            warn!("Adapters did not stop within {:?}", SHUTDOWN_TIMEOUT);
        }

        info!("Shutdown complete.");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use propbridge_core::port::exposed::mocks::Counter;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpStream;

    async fn rest_get(addr: SocketAddr, path: &str) -> String {
        let mut stream = TcpStream::connect(addr).await.unwrap();
        stream
            .write_all(format!("GET {} HTTP/1.1\r\n\r\n", path).as_bytes())
            .await
            .unwrap();
        let mut response = String::new();
        stream.read_to_string(&mut response).await.unwrap();
        response
    }

    #[tokio::test]
    async fn test_register_after_start_is_served() {
        let bridge = Bridge::start(BridgeConfig::ephemeral()).await.unwrap();
        let counter = Arc::new(Counter::new(5));

        let registration = bridge.register(&counter);
        assert_eq!(registration.class_id, "Counter");

        let response = rest_get(bridge.rest_addr().unwrap(), "/Counter/value").await;
        assert!(response.ends_with("\r\n\r\n5"));
        assert_eq!(bridge.client_count(), 0);

        bridge.shutdown().await;
    }

    #[tokio::test]
    async fn test_restart_on_shared_registry() {
        let registry = PropertyRegistry::new();
        let counter = Arc::new(Counter::new(5));
        registry.register(&counter);

        for _ in 0..2 {
            let bridge = Bridge::start_with(
                BridgeConfig::ephemeral(),
                registry.clone(),
                Arc::new(SystemTimeProvider),
            )
            .await
            .unwrap();
            assert_eq!(registry.listener_count(), 1);

            let response = rest_get(bridge.rest_addr().unwrap(), "/Counter/value").await;
            assert!(response.ends_with("\r\n\r\n5"));

            bridge.shutdown().await;
            assert_eq!(registry.listener_count(), 0);
        }
    }

    #[tokio::test]
    async fn test_disabled_adapters() {
        let config = BridgeConfig {
            rest: None,
            ..BridgeConfig::ephemeral()
        };
        let bridge = Bridge::start(config).await.unwrap();

        assert!(bridge.rest_addr().is_none());
        assert!(bridge.rpc_addr().is_some());

        bridge.shutdown().await;
    }

    #[tokio::test]
    async fn test_bind_conflict_is_reported() {
        let first = Bridge::start(BridgeConfig::ephemeral()).await.unwrap();
        let taken = first.rpc_addr().unwrap();

        let config = BridgeConfig {
            rpc: Some(rpc::RpcServerConfig {
                host: taken.ip().to_string(),
                port: taken.port(),
            }),
            ..BridgeConfig::ephemeral()
        };
        let error = Bridge::start(config).await.err().unwrap();
        assert!(error.to_string().contains("JSON-RPC server start failed"));

        first.shutdown().await;
    }
}
