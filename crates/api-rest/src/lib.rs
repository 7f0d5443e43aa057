//! REST API Layer
//!
//! Minimal synchronous HTTP/REST interface over the property registry:
//! `GET /{class}/{property}` reads, `PUT /{class}/{property}` writes the
//! plain-text body. One request per connection, `Connection: close`.

pub mod dispatcher;
pub mod error;
pub mod http;
pub mod response;
pub mod server;

pub use dispatcher::RestDispatcher;
pub use error::RestServerError;
pub use response::{RestResponse, StatusCode};
pub use server::{RestServer, RestServerConfig, RestServerHandle};

/// Tracing target for listener and connection events
pub const LISTENER_TARGET: &str = "propbridge::rest";
