use bytes::Bytes;

use crate::http::header::HeaderMap;

/// A fully received request, detached from the parser that produced it.
///
/// Built by [`RequestParser::into_request`](super::parser::RequestParser::into_request).
#[derive(Debug, Clone)]
pub struct Request {
    /// Request method as sent, e.g. `POST`.
    pub method: String,
    /// Request target, e.g. `/search?q=rust`.
    pub path: String,
    /// Protocol version token, if the request line had one.
    pub version: Option<String>,
    /// Headers keyed by lowercased name, as raw bytes.
    pub headers: HeaderMap,
    /// Exactly `content-length` bytes when one was declared.
    pub body: Bytes,
}

impl Request {
    /// Retrieves a header value by name, ignoring ASCII case. Values that
    /// are not UTF-8 are only reachable through [`Self::header_bytes`].
    pub fn header(&self, key: &str) -> Option<&str> {
        self.header_bytes(key)
            .and_then(|v| std::str::from_utf8(v).ok())
    }

    pub fn header_bytes(&self, key: &str) -> Option<&[u8]> {
        self.headers
            .get(key.to_ascii_lowercase().as_bytes())
            .map(Vec::as_slice)
    }

    /// Body length in bytes.
    pub fn content_length(&self) -> usize {
        self.body.len()
    }
}
