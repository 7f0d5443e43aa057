//! PropBridge SDK - Rust Client Library
//!
//! Client for the PropBridge JSON-RPC/WebSocket adapter: read and write
//! exposed properties and receive change notifications.
//!
//! # Example
//!
//! ```no_run
//! use propbridge_sdk::PropBridgeClient;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let client = PropBridgeClient::connect("ws://127.0.0.1:45679").await?;
//!
//!     client.set("Counter.value", 7).await?;
//!     let value = client.get("Counter.value").await?;
//!     println!("Counter.value = {}", value);
//!
//!     client.close().await;
//!     Ok(())
//! }
//! ```

mod client;
mod error;
mod types;

pub use client::PropBridgeClient;
pub use error::{Result, SdkError};
pub use propbridge_core::DynamicValue;
pub use types::Notification;
