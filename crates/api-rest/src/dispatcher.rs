//! REST Dispatcher
//!
//! Resolves `/{class}/{property}` against the registry and performs the read
//! or write. Every outcome is a [`RestResponse`]; malformed input never
//! escapes as an error.
//!
//! Two behaviours are kept for client compatibility:
//! - `GET` on a property that is not readable answers `200` with an empty
//!   body, so an empty body does not prove the value is empty.
//! - a successful `PUT` to a property with a notification channel fires the
//!   channel afterwards, whether or not the value changed.

use crate::http::{parse_request, ParseStatus, ParsedRequest};
use crate::response::{RestResponse, BODY_OK};
use propbridge_core::{BoundProperty, DynamicValue, PropertyError, PropertyRegistry};
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RestMethod {
    Get,
    Put,
}

impl RestMethod {
    fn parse(method: &str) -> Option<Self> {
        if method.eq_ignore_ascii_case("GET") {
            Some(RestMethod::Get)
        } else if method.eq_ignore_ascii_case("PUT") {
            Some(RestMethod::Put)
        } else {
            None
        }
    }
}

#[derive(Debug, Clone)]
pub struct RestDispatcher {
    registry: PropertyRegistry,
}

impl RestDispatcher {
    pub fn new(registry: PropertyRegistry) -> Self {
        Self { registry }
    }

    /// Handle one raw request buffer, assumed to hold the whole request
    pub fn dispatch(&self, raw: &[u8]) -> RestResponse {
        match parse_request(raw) {
            Ok(ParseStatus::Complete(request)) => self.handle(&request),
            Ok(ParseStatus::Incomplete) => {
                debug!(bytes = raw.len(), "Truncated HTTP request");
                RestResponse::bad_request()
            }
            Err(error) => {
                debug!(error = %error, "Unparseable HTTP request");
                RestResponse::bad_request()
            }
        }
    }

    pub fn handle(&self, request: &ParsedRequest) -> RestResponse {
        let Some(method) = RestMethod::parse(&request.method) else {
            return RestResponse::method_not_allowed();
        };

        let Some((class_id, property)) = split_path(&request.path) else {
            return RestResponse::not_found();
        };

        let bound = match self.registry.lookup(class_id, property) {
            Ok(bound) => bound,
            Err(error) => {
                debug!(error = %error, path = %request.path, "REST lookup failed");
                return RestResponse::not_found();
            }
        };

        let response = match method {
            RestMethod::Get => self.get(&bound),
            RestMethod::Put => self.put(&bound, &request.body),
        };
        debug!(
            method = ?method,
            property = %bound.method(),
            status = response.status.as_u16(),
            "REST request dispatched"
        );
        response
    }

    fn get(&self, bound: &BoundProperty) -> RestResponse {
        if !bound.descriptor().is_readable() {
            return RestResponse::ok(String::new());
        }
        match self.registry.read(bound) {
            Ok(value) => RestResponse::ok(value.to_text()),
            Err(error) => error_response(&error),
        }
    }

    fn put(&self, bound: &BoundProperty, body: &[u8]) -> RestResponse {
        // Silent no-op: the mutator is never invoked
        if !bound.descriptor().is_writable() {
            return RestResponse::ok(BODY_OK);
        }

        let Ok(text) = std::str::from_utf8(body) else {
            return RestResponse::bad_request();
        };

        if let Err(error) = self.registry.write(bound, DynamicValue::from(text)) {
            return error_response(&error);
        }
        self.registry.notify(bound);
        RestResponse::ok(BODY_OK)
    }
}

fn error_response(error: &PropertyError) -> RestResponse {
    match error {
        PropertyError::WriteRejected { .. } => RestResponse::bad_request(),
        PropertyError::NotReadable { .. } => RestResponse::ok(String::new()),
        PropertyError::NotWritable { .. } => RestResponse::ok(BODY_OK),
        _ => RestResponse::not_found(),
    }
}

/// First two non-empty path segments, query string ignored
fn split_path(path: &str) -> Option<(&str, &str)> {
    let path = path.split_once('?').map_or(path, |(path, _)| path);
    let mut segments = path.split('/').filter(|segment| !segment.is_empty());
    Some((segments.next()?, segments.next()?))
}

#[cfg(test)]
#[path = "dispatcher_test.rs"]
mod tests;
