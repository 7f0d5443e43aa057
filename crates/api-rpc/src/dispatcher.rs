//! JSON-RPC Dispatcher
//!
//! One request in, one response out. Validation order:
//! JSON syntax, envelope (`jsonrpc`, `id`, `method`), method resolution,
//! then `params` shape. An error carries the request id only once the id has
//! been recovered, and only when it is positive.

use crate::error::JsonRpcErrorCode;
use crate::types::{encode, RpcErrorResponse, RpcResponse, JSONRPC_VERSION, SET_OK};
use propbridge_core::{BoundProperty, DynamicValue, PropertyError, PropertyRegistry};
use serde_json::{Map, Value};
use tracing::debug;

type Outcome = std::result::Result<RpcResponse, RpcErrorResponse>;

#[derive(Debug, Clone)]
pub struct RpcDispatcher {
    registry: PropertyRegistry,
}

impl RpcDispatcher {
    pub fn new(registry: PropertyRegistry) -> Self {
        Self { registry }
    }

    /// Handle one text message and return the serialized reply
    pub fn handle_message(&self, text: &str) -> String {
        match self.process(text) {
            Ok(response) => encode(&response),
            Err(error) => {
                debug!(code = error.error.code, id = ?error.id, "JSON-RPC request failed");
                encode(&error)
            }
        }
    }

    /// Same as [`handle_message`](Self::handle_message), before serialization
    pub fn process(&self, text: &str) -> Outcome {
        let request = match serde_json::from_str::<Value>(text) {
            Ok(Value::Object(request)) => request,
            Ok(_) | Err(_) => return Err(fail(JsonRpcErrorCode::ParseError, None)),
        };

        let Request { id, method, params } = Request::from_object(&request)?;

        let Some((class_id, property)) = split_method(method) else {
            return Err(fail(JsonRpcErrorCode::MethodNotFound, Some(id)));
        };
        let bound = self
            .registry
            .lookup(class_id, property)
            .map_err(|error| error_for(&error, id))?;

        match params {
            Params::Get => self.get(&bound, id),
            Params::Set(value) => self.set(&bound, value, id),
            Params::Invalid => Err(fail(JsonRpcErrorCode::InvalidParams, Some(id))),
        }
    }

    fn get(&self, bound: &BoundProperty, id: i64) -> Outcome {
        // Reading a non-readable property is "not available"
        if !bound.descriptor().is_readable() {
            return Err(fail(JsonRpcErrorCode::MethodNotFound, Some(id)));
        }
        let value = self
            .registry
            .read(bound)
            .map_err(|error| error_for(&error, id))?;
        debug!(method = %bound.method(), "JSON-RPC get");
        Ok(RpcResponse::new(id, value.to_json()))
    }

    fn set(&self, bound: &BoundProperty, value: DynamicValue, id: i64) -> Outcome {
        // Silent no-op: the mutator is never invoked
        if !bound.descriptor().is_writable() {
            return Ok(RpcResponse::new(id, Value::from(SET_OK)));
        }
        self.registry
            .write(bound, value)
            .map_err(|error| error_for(&error, id))?;
        debug!(method = %bound.method(), "JSON-RPC set");
        Ok(RpcResponse::new(id, Value::from(SET_OK)))
    }
}

struct Request<'a> {
    id: i64,
    method: &'a str,
    params: Params,
}

enum Params {
    Get,
    Set(DynamicValue),
    Invalid,
}

impl<'a> Request<'a> {
    fn from_object(request: &'a Map<String, Value>) -> std::result::Result<Self, RpcErrorResponse> {
        let invalid = || fail(JsonRpcErrorCode::InvalidRequest, None);

        let (Some(jsonrpc), Some(id), Some(method)) = (
            request.get("jsonrpc"),
            request.get("id"),
            request.get("method"),
        ) else {
            return Err(invalid());
        };

        if jsonrpc.as_str() != Some(JSONRPC_VERSION) {
            return Err(invalid());
        }
        let id = id.as_i64().ok_or_else(invalid)?;
        let method = method.as_str().ok_or_else(invalid)?;

        Ok(Self {
            id,
            method,
            params: Params::from_value(request.get("params")),
        })
    }
}

impl Params {
    fn from_value(params: Option<&Value>) -> Self {
        match params {
            None | Some(Value::Null) => Params::Get,
            Some(Value::Array(items)) => match items.as_slice() {
                [] => Params::Get,
                [single] => Self::scalar(single),
                _ => Params::Invalid,
            },
            Some(value) => Self::scalar(value),
        }
    }

    fn scalar(value: &Value) -> Self {
        DynamicValue::from_json(value).map_or(Params::Invalid, Params::Set)
    }
}

/// `Class.property`: exactly two dot-separated segments
fn split_method(method: &str) -> Option<(&str, &str)> {
    let mut segments = method.split('.');
    match (segments.next(), segments.next(), segments.next()) {
        (Some(class_id), Some(property), None) => Some((class_id, property)),
        _ => None,
    }
}

fn fail(code: JsonRpcErrorCode, id: Option<i64>) -> RpcErrorResponse {
    RpcErrorResponse::new(code, id)
}

fn error_for(error: &PropertyError, id: i64) -> RpcErrorResponse {
    let code = match error {
        PropertyError::WriteRejected { .. } => JsonRpcErrorCode::InternalError,
        _ => JsonRpcErrorCode::MethodNotFound,
    };
    debug!(error = %error, "Registry rejected JSON-RPC request");
    fail(code, Some(id))
}

#[cfg(test)]
#[path = "dispatcher_test.rs"]
mod tests;
