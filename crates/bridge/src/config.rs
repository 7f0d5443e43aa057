//! Bridge configuration
//!
//! Both adapters are enabled by default on their standard ports.
//!
//! | Variable                  | Effect                          |
//! |---------------------------|---------------------------------|
//! | `PROPBRIDGE_REST_HOST`    | REST bind host                  |
//! | `PROPBRIDGE_REST_PORT`    | REST bind port (`0` = any)      |
//! | `PROPBRIDGE_RPC_HOST`     | JSON-RPC bind host              |
//! | `PROPBRIDGE_RPC_PORT`     | JSON-RPC bind port (`0` = any)  |
//! | `PROPBRIDGE_DISABLE_REST` | `1`/`true` turns REST off       |
//! | `PROPBRIDGE_DISABLE_RPC`  | `1`/`true` turns JSON-RPC off   |

use propbridge_api_rest::RestServerConfig;
use propbridge_api_rpc::RpcServerConfig;
use tracing::warn;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BridgeConfig {
    /// `None` disables the REST adapter
    pub rest: Option<RestServerConfig>,
    /// `None` disables the JSON-RPC adapter
    pub rpc: Option<RpcServerConfig>,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            rest: Some(RestServerConfig::default()),
            rpc: Some(RpcServerConfig::default()),
        }
    }
}

impl BridgeConfig {
    /// Both adapters on ephemeral localhost ports
    pub fn ephemeral() -> Self {
        Self {
            rest: Some(RestServerConfig {
                port: 0,
                ..Default::default()
            }),
            rpc: Some(RpcServerConfig {
                port: 0,
                ..Default::default()
            }),
        }
    }

    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from any key lookup; unset keys keep their defaults.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let rest = if flag(&lookup, "PROPBRIDGE_DISABLE_REST") {
            None
        } else {
            let defaults = RestServerConfig::default();
            Some(RestServerConfig {
                host: lookup("PROPBRIDGE_REST_HOST").unwrap_or(defaults.host),
                port: port(&lookup, "PROPBRIDGE_REST_PORT", defaults.port),
            })
        };

        let rpc = if flag(&lookup, "PROPBRIDGE_DISABLE_RPC") {
            None
        } else {
            let defaults = RpcServerConfig::default();
            Some(RpcServerConfig {
                host: lookup("PROPBRIDGE_RPC_HOST").unwrap_or(defaults.host),
                port: port(&lookup, "PROPBRIDGE_RPC_PORT", defaults.port),
            })
        };

        Self { rest, rpc }
    }
}

fn flag<F: Fn(&str) -> Option<String>>(lookup: &F, key: &str) -> bool {
    lookup(key).is_some_and(|value| {
        matches!(
            value.trim().to_ascii_lowercase().as_str(),
            "1" | "true" | "yes"
        )
    })
}

fn port<F: Fn(&str) -> Option<String>>(lookup: &F, key: &str, default: u16) -> u16 {
    match lookup(key) {
        Some(value) => value.trim().parse().unwrap_or_else(|_| {
            warn!(key, value = %value, default, "Invalid port; using default");
            default
        }),
        None => default,
    }
}
