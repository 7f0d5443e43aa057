//! RPC Wire Types
//!
//! Outgoing JSON-RPC 2.0 messages. Incoming requests are inspected as raw
//! `serde_json::Value`s so that each malformed field maps to its own error.

use crate::error::JsonRpcErrorCode;
use serde::Serialize;
use serde_json::Value;
use tracing::error;

pub const JSONRPC_VERSION: &str = "2.0";

/// Literal `"OK"` result of a successful set
pub const SET_OK: &str = "OK";

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RpcResponse {
    pub jsonrpc: &'static str,
    pub id: i64,
    pub result: Value,
}

impl RpcResponse {
    pub fn new(id: i64, result: Value) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION,
            id,
            result,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RpcErrorObject {
    pub code: i32,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RpcErrorResponse {
    pub jsonrpc: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    pub error: RpcErrorObject,
}

impl RpcErrorResponse {
    /// `id` is only echoed when it was recovered and is positive
    pub fn new(code: JsonRpcErrorCode, id: Option<i64>) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION,
            id: id.filter(|id| *id > 0),
            error: RpcErrorObject {
                code: code.code(),
                message: code.message().to_string(),
            },
        }
    }
}

/// Server-initiated change notification (no `id`)
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RpcNotification {
    pub jsonrpc: &'static str,
    pub method: String,
    pub params: Value,
}

impl RpcNotification {
    pub fn new(method: impl Into<String>, params: Value) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION,
            method: method.into(),
            params,
        }
    }
}

/// Serialize an outgoing message to its text frame
pub fn encode<T: Serialize>(message: &T) -> String {
    serde_json::to_string(message).unwrap_or_else(|err| {
        error!(error = %err, "Failed to serialize JSON-RPC message");
        format!(
            r#"{{"jsonrpc":"2.0","error":{{"code":{},"message":"{}"}}}}"#,
            JsonRpcErrorCode::InternalError.code(),
            JsonRpcErrorCode::InternalError.message()
        )
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_error_response_omits_non_positive_id() {
        let missing = RpcErrorResponse::new(JsonRpcErrorCode::InvalidRequest, None);
        let zero = RpcErrorResponse::new(JsonRpcErrorCode::InvalidRequest, Some(0));
        let negative = RpcErrorResponse::new(JsonRpcErrorCode::InvalidRequest, Some(-4));

        for response in [missing, zero, negative] {
            let value: Value = serde_json::from_str(&encode(&response)).unwrap();
            assert!(value.get("id").is_none());
            assert_eq!(value["error"]["code"], json!(-32600));
        }
    }

    #[test]
    fn test_response_field_layout() {
        assert_eq!(
            encode(&RpcResponse::new(1, json!(7))),
            r#"{"jsonrpc":"2.0","id":1,"result":7}"#
        );
        assert_eq!(
            encode(&RpcNotification::new("Counter.value", json!(7))),
            r#"{"jsonrpc":"2.0","method":"Counter.value","params":7}"#
        );
    }
}
