//! Streaming request parser.
//!
//! Wraps a [`HeaderParser`] and, once the header block is in, waits for as
//! many body bytes as `content-length` announces.
//!
//! ```text
//!   AwaitingHeaders ──terminator──▶ AwaitingBody ──enough bytes──▶ Complete
//!          └────────────terminator + enough bytes──────────────────────┘
//! ```
//!
//! One parser serves exactly one request; there is no reset. A rejected
//! request (strict policy, header cap) stays rejected: every later chunk gets
//! the same error back and the parser never reaches `Complete`.

use crate::error::ParseError;
use crate::http::header::{HeaderMap, HeaderParser};
use crate::http::policy::ParserOptions;
use crate::http::request::Request;

const CONTENT_LENGTH: &str = "content-length";
const DEFAULT_METHOD: &str = "GET";
const DEFAULT_PATH: &str = "/";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParseState {
    AwaitingHeaders,
    AwaitingBody,
    Complete,
}

#[derive(Debug, Default)]
pub struct RequestParser {
    header_parser: HeaderParser,
    options: ParserOptions,
    /// `None` until headers finish or when no `content-length` was sent.
    content_length: Option<usize>,
    finished: bool,
    failed: Option<ParseError>,
}

impl RequestParser {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_options(options: ParserOptions) -> Self {
        Self {
            header_parser: HeaderParser::new(options),
            options,
            ..Self::default()
        }
    }

    /// Feeds one chunk read from the peer.
    ///
    /// Chunk boundaries may fall anywhere. With a `content-length`, bytes
    /// beyond the announced length are dropped. Without one the request is
    /// complete as soon as the header block is, and the body is open-ended:
    /// whatever follows the terminator, including later chunks, is kept.
    pub fn push_chunk(&mut self, chunk: &[u8]) -> Result<(), ParseError> {
        if let Some(err) = &self.failed {
            return Err(err.clone());
        }

        let result = self.advance(chunk);
        if let Err(err) = &result {
            self.failed = Some(err.clone());
        }
        result
    }

    fn advance(&mut self, chunk: &[u8]) -> Result<(), ParseError> {
        if self.finished {
            if self.content_length.is_none() {
                self.header_parser.extra_body_mut().extend_from_slice(chunk);
            }
            return Ok(());
        }

        if self.header_parser.header_finished() {
            self.header_parser.extra_body_mut().extend_from_slice(chunk);
        } else {
            self.header_parser.push_chunk(chunk)?;
            if !self.header_parser.header_finished() {
                return Ok(());
            }
            self.content_length = self.extract_content_length()?;
        }

        self.check_body_complete();
        Ok(())
    }

    fn extract_content_length(&self) -> Result<Option<usize>, ParseError> {
        let Some(raw) = self.header_parser.header_bytes(CONTENT_LENGTH) else {
            return Ok(None);
        };

        let parsed = std::str::from_utf8(raw)
            .ok()
            .and_then(|v| v.trim().parse::<usize>().ok());

        match parsed {
            Some(len) => Ok(Some(len)),
            None => {
                let value = String::from_utf8_lossy(raw);
                if self.options.policy.is_strict() {
                    return Err(ParseError::InvalidContentLength(value.into_owned()));
                }
                tracing::debug!(%value, "unparsable content-length, assuming empty body");
                Ok(Some(0))
            }
        }
    }

    fn check_body_complete(&mut self) {
        let Some(expected) = self.content_length else {
            self.finished = true;
            return;
        };

        let body = self.header_parser.extra_body_mut();
        if body.len() >= expected {
            body.truncate(expected);
            self.finished = true;
        }
    }

    pub fn state(&self) -> ParseState {
        if self.finished {
            ParseState::Complete
        } else if self.header_parser.header_finished() {
            ParseState::AwaitingBody
        } else {
            ParseState::AwaitingHeaders
        }
    }

    pub fn request_finished(&self) -> bool {
        self.finished
    }

    pub fn header_finished(&self) -> bool {
        self.header_parser.header_finished()
    }

    /// The error that rejected this request, if any.
    pub fn error(&self) -> Option<&ParseError> {
        self.failed.as_ref()
    }

    /// Body length the request is waiting for: the announced
    /// `content-length`, or zero when there is none (or it did not parse).
    pub fn content_length(&self) -> usize {
        self.content_length.unwrap_or(0)
    }

    /// The parsed `content-length`, if the request carried one.
    pub fn declared_length(&self) -> Option<usize> {
        self.content_length
    }

    /// Text before the first space of the request line, or `GET` if the line
    /// has no space.
    pub fn method(&self) -> &str {
        self.request_line_tokens().0.unwrap_or(DEFAULT_METHOD)
    }

    /// The request target, i.e. the token after the method.
    ///
    /// With a single space the remainder of the line is returned; with no
    /// space at all, `/`.
    pub fn url(&self) -> &str {
        self.request_line_tokens().1.unwrap_or(DEFAULT_PATH)
    }

    /// Protocol version token, if the request line carries one.
    pub fn version(&self) -> Option<&str> {
        self.request_line_tokens().2
    }

    fn request_line_tokens(&self) -> (Option<&str>, Option<&str>, Option<&str>) {
        let line = self.header_parser.request_line();
        let Some((method, rest)) = line.split_once(' ') else {
            return (None, None, None);
        };
        match rest.split_once(' ') {
            Some((path, version)) => (Some(method), Some(path), Some(version)),
            None => (Some(method), Some(rest), None),
        }
    }

    pub fn request_line(&self) -> &str {
        self.header_parser.request_line()
    }

    /// Body bytes received so far; exactly the declared length once
    /// complete.
    pub fn body(&self) -> &[u8] {
        self.header_parser.extra_body()
    }

    pub fn headers(&self) -> &HeaderMap {
        self.header_parser.headers()
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.header_parser.header(name)
    }

    pub fn header_bytes(&self, name: &str) -> Option<&[u8]> {
        self.header_parser.header_bytes(name)
    }

    pub fn headers_raw(&self) -> &[u8] {
        self.header_parser.headers_raw()
    }

    /// Converts a finished parser into an owned [`Request`].
    pub fn into_request(mut self) -> Option<Request> {
        if !self.finished {
            return None;
        }
        let method = self.method().to_string();
        let path = self.url().to_string();
        let version = self.version().map(str::to_string);
        let body = self.header_parser.take_extra_body().freeze();
        let headers = std::mem::take(self.header_parser.headers_mut());

        Some(Request {
            method,
            path,
            version,
            headers,
            body,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_simple_get() {
        let mut parser = RequestParser::new();
        parser
            .push_chunk(b"GET / HTTP/1.1\r\nHost: example.com\r\n\r\n")
            .unwrap();

        assert_eq!(parser.state(), ParseState::Complete);
        assert_eq!(parser.url(), "/");
        assert_eq!(parser.header("Host"), Some("example.com"));
    }

    #[test]
    fn waits_for_body() {
        let mut parser = RequestParser::new();
        parser
            .push_chunk(b"POST /api HTTP/1.1\r\nContent-Length: 4\r\n\r\nab")
            .unwrap();
        assert_eq!(parser.state(), ParseState::AwaitingBody);

        parser.push_chunk(b"cd").unwrap();
        assert_eq!(parser.state(), ParseState::Complete);
        assert_eq!(parser.body(), b"abcd");
    }

    #[test]
    fn rejection_sticks() {
        let mut parser = RequestParser::with_options(ParserOptions::strict());
        let err = parser.push_chunk(b"GET / HTTP/1.1\r\nBad\r\n\r\n").unwrap_err();

        assert_eq!(parser.push_chunk(b"more"), Err(err.clone()));
        assert_eq!(parser.error(), Some(&err));
        assert!(!parser.request_finished());
    }
}
