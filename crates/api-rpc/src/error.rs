//! RPC Error Types
//!
//! Wire-level JSON-RPC 2.0 error codes, plus the server's own startup errors.

use std::io;
use thiserror::Error;

/// JSON-RPC 2.0 error codes
pub mod code {
    pub const PARSE_ERROR: i32 = -32700;
    pub const INVALID_REQUEST: i32 = -32600;
    pub const METHOD_NOT_FOUND: i32 = -32601;
    pub const INVALID_PARAMS: i32 = -32602;
    pub const INTERNAL_ERROR: i32 = -32603;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JsonRpcErrorCode {
    ParseError,
    InvalidRequest,
    MethodNotFound,
    InvalidParams,
    InternalError,
}

impl JsonRpcErrorCode {
    pub fn code(self) -> i32 {
        match self {
            JsonRpcErrorCode::ParseError => code::PARSE_ERROR,
            JsonRpcErrorCode::InvalidRequest => code::INVALID_REQUEST,
            JsonRpcErrorCode::MethodNotFound => code::METHOD_NOT_FOUND,
            JsonRpcErrorCode::InvalidParams => code::INVALID_PARAMS,
            JsonRpcErrorCode::InternalError => code::INTERNAL_ERROR,
        }
    }

    pub fn message(self) -> &'static str {
        match self {
            JsonRpcErrorCode::ParseError => "Invalid JSON was received by the server.",
            JsonRpcErrorCode::InvalidRequest => "The JSON sent is not a valid Request object.",
            JsonRpcErrorCode::MethodNotFound => "The method does not exist / is not available.",
            JsonRpcErrorCode::InvalidParams => "Invalid method parameter(s).",
            JsonRpcErrorCode::InternalError => "Internal JSON-RPC error.",
        }
    }
}

/// Errors starting the JSON-RPC server
#[derive(Error, Debug)]
pub enum RpcServerError {
    #[error("Failed to bind JSON-RPC listener on {addr}: {source}")]
    Bind {
        addr: String,
        #[source]
        source: io::Error,
    },

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

pub type Result<T> = std::result::Result<T, RpcServerError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_codes_match_json_rpc() {
        assert_eq!(JsonRpcErrorCode::ParseError.code(), -32700);
        assert_eq!(JsonRpcErrorCode::InvalidRequest.code(), -32600);
        assert_eq!(JsonRpcErrorCode::MethodNotFound.code(), -32601);
        assert_eq!(JsonRpcErrorCode::InvalidParams.code(), -32602);
        assert_eq!(JsonRpcErrorCode::InternalError.code(), -32603);
    }
}
