//! HTTP request tokenizer
//!
//! Thin wrapper around `httparse`: method, path and the body that follows the
//! header block. A request counts as complete once the header block has ended
//! and, when `Content-Length` is present, that many body bytes have arrived.

use thiserror::Error;

/// Header slots offered to the tokenizer; more headers is a parse error
pub const MAX_HEADERS: usize = 100;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedRequest {
    pub method: String,
    pub path: String,
    pub body: Vec<u8>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParseStatus {
    Complete(ParsedRequest),
    /// More bytes are needed
    Incomplete,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum HttpParseError {
    #[error("Malformed request: {0}")]
    Malformed(#[from] httparse::Error),

    #[error("Invalid Content-Length header")]
    InvalidContentLength,
}

pub fn parse_request(buf: &[u8]) -> Result<ParseStatus, HttpParseError> {
    let mut headers = [httparse::EMPTY_HEADER; MAX_HEADERS];
    let mut request = httparse::Request::new(&mut headers);

    let header_len = match request.parse(buf)? {
        httparse::Status::Complete(len) => len,
        httparse::Status::Partial => return Ok(ParseStatus::Incomplete),
    };

    // A complete parse always carries the request line
    let (Some(method), Some(path)) = (request.method, request.path) else {
        return Ok(ParseStatus::Incomplete);
    };

    let body = &buf[header_len..];
    let body = match content_length(request.headers)? {
        Some(len) if body.len() < len => return Ok(ParseStatus::Incomplete),
        Some(len) => &body[..len],
        None => body,
    };

    Ok(ParseStatus::Complete(ParsedRequest {
        method: method.to_string(),
        path: path.to_string(),
        body: body.to_vec(),
    }))
}

fn content_length(headers: &[httparse::Header<'_>]) -> Result<Option<usize>, HttpParseError> {
    let Some(header) = headers
        .iter()
        .find(|header| header.name.eq_ignore_ascii_case("content-length"))
    else {
        return Ok(None);
    };

    std::str::from_utf8(header.value)
        .ok()
        .and_then(|value| value.trim().parse::<usize>().ok())
        .map(Some)
        .ok_or(HttpParseError::InvalidContentLength)
}
