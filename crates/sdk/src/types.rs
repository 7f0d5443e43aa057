//! SDK Message Types
//!
//! Mirrors the JSON-RPC messages of the api-rpc crate.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Outgoing request
#[derive(Debug, Clone, Serialize)]
pub struct Request<'a> {
    pub jsonrpc: &'static str,
    pub id: i64,
    pub method: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub params: Option<Value>,
}

/// Server-pushed property change
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Notification {
    /// `Class.property`
    pub method: String,
    pub params: Value,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct ErrorObject {
    pub code: i32,
    pub message: String,
}

/// Any frame the server sends
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct Incoming {
    #[serde(default)]
    pub id: Option<i64>,
    #[serde(default)]
    pub method: Option<String>,
    #[serde(default)]
    pub params: Option<Value>,
    #[serde(default)]
    pub result: Option<Value>,
    #[serde(default)]
    pub error: Option<ErrorObject>,
}
