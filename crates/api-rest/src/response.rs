// REST Response - status taxonomy and wire rendering

use chrono::{DateTime, Utc};

/// Value of the `Server` header
pub const SERVER_NAME: &str = concat!("PropBridge/", env!("CARGO_PKG_VERSION"));

pub const CONTENT_TYPE: &str = "text/plain;charset=UTF-8";

pub const BODY_OK: &str = "OK";
pub const BODY_BAD_REQUEST: &str = "Bad request";
pub const BODY_NOT_FOUND: &str = "Not found";
pub const BODY_METHOD_NOT_ALLOWED: &str = "Method not allowed";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusCode {
    Ok,
    BadRequest,
    NotFound,
    MethodNotAllowed,
}

impl StatusCode {
    pub fn as_u16(self) -> u16 {
        match self {
            StatusCode::Ok => 200,
            StatusCode::BadRequest => 400,
            StatusCode::NotFound => 404,
            StatusCode::MethodNotAllowed => 405,
        }
    }

    pub fn reason(self) -> &'static str {
        match self {
            StatusCode::Ok => "OK",
            StatusCode::BadRequest => "Bad Request",
            StatusCode::NotFound => "Not Found",
            StatusCode::MethodNotAllowed => "Method Not Allowed",
        }
    }
}

/// Plain-text response; always sent with `Connection: close`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RestResponse {
    pub status: StatusCode,
    pub body: String,
}

impl RestResponse {
    pub fn ok(body: impl Into<String>) -> Self {
        Self {
            status: StatusCode::Ok,
            body: body.into(),
        }
    }

    pub fn bad_request() -> Self {
        Self {
            status: StatusCode::BadRequest,
            body: BODY_BAD_REQUEST.to_string(),
        }
    }

    pub fn not_found() -> Self {
        Self {
            status: StatusCode::NotFound,
            body: BODY_NOT_FOUND.to_string(),
        }
    }

    pub fn method_not_allowed() -> Self {
        Self {
            status: StatusCode::MethodNotAllowed,
            body: BODY_METHOD_NOT_ALLOWED.to_string(),
        }
    }

    /// Render the full HTTP/1.1 message. `Content-Length` counts bytes.
    pub fn render(&self, now_millis: i64) -> Vec<u8> {
        let head = format!(
            "HTTP/1.1 {} {}\r\n\
             Server: {}\r\n\
             Date: {}\r\n\
             Connection: close\r\n\
             content-type: {}\r\n\
             Content-Length: {}\r\n\r\n",
            self.status.as_u16(),
            self.status.reason(),
            SERVER_NAME,
            http_date(now_millis),
            CONTENT_TYPE,
            self.body.len(),
        );

        let mut bytes = head.into_bytes();
        bytes.extend_from_slice(self.body.as_bytes());
        bytes
    }
}

/// RFC 1123 date, e.g. `Sun, 06 Nov 1994 08:49:37 GMT`
pub fn http_date(now_millis: i64) -> String {
    DateTime::<Utc>::from_timestamp_millis(now_millis)
        .unwrap_or_default()
        .format("%a, %d %b %Y %H:%M:%S GMT")
        .to_string()
}
