//! JSON-RPC API Layer
//!
//! JSON-RPC 2.0 over WebSocket. `method` is `Class.property`; a request
//! without `params` reads the property, a request with `params` writes it.
//! Every readable property change is pushed to all connected clients as a
//! notification.

pub mod dispatcher;
pub mod error;
pub mod fanout;
pub mod server;
pub mod types;

pub use dispatcher::RpcDispatcher;
pub use error::{JsonRpcErrorCode, RpcServerError};
pub use fanout::{ClientId, ClientSet, NotificationFanout};
pub use server::{RpcServer, RpcServerConfig, RpcServerHandle};

/// Tracing target for listener and connection events
pub const LISTENER_TARGET: &str = "propbridge::rpc";
