//! Incremental parsing of the HTTP/1.1 header block.
//!
//! [`HeaderParser`] is fed raw chunks exactly as they come off the socket. It
//! buffers them until the `\r\n\r\n` terminator shows up, which may be split
//! across any number of chunks. Bytes that arrive after the terminator in the
//! same chunk are kept as the start of the body.
//!
//! Header names and values are stored as the bytes that came off the wire.
//! Only the request line is decoded, lossily, for the `&str` accessors.

use std::collections::HashMap;

use bytes::BytesMut;

use crate::error::ParseError;
use crate::http::policy::ParserOptions;

pub(crate) const TERMINATOR: &[u8] = b"\r\n\r\n";
const LINE_END: &[u8] = b"\r\n";
const HEADER_DELIMITER: &[u8] = b": ";

/// Header names are ASCII-lowercased; values are kept verbatim. Neither has
/// to be valid UTF-8.
pub type HeaderMap = HashMap<Vec<u8>, Vec<u8>>;

#[derive(Debug, Default)]
pub struct HeaderParser {
    options: ParserOptions,
    /// Header bytes seen so far. Once finished, holds exactly the header
    /// block with the terminator cut off.
    raw: BytesMut,
    request_line: String,
    headers: HeaderMap,
    /// Bytes that followed the terminator.
    extra_body: BytesMut,
    finished: bool,
}

impl HeaderParser {
    pub fn new(options: ParserOptions) -> Self {
        Self {
            options,
            ..Self::default()
        }
    }

    /// Appends a chunk and checks for the end of the header block.
    ///
    /// Does nothing once the header block is complete. Only fails under a
    /// strict policy or when `max_header_size` is exceeded.
    pub fn push_chunk(&mut self, chunk: &[u8]) -> Result<(), ParseError> {
        if self.finished {
            return Ok(());
        }

        // The terminator may straddle the previous chunk and this one.
        let search_from = self.raw.len().saturating_sub(TERMINATOR.len() - 1);
        self.raw.extend_from_slice(chunk);

        match find_terminator(&self.raw[search_from..]) {
            Some(offset) => {
                let header_len = search_from + offset;
                self.check_size(header_len)?;

                self.finished = true;
                self.extra_body = self.raw.split_off(header_len + TERMINATOR.len());
                self.raw.truncate(header_len);
                self.extract_headers()
            }
            None => self.check_size(self.raw.len()),
        }
    }

    fn check_size(&self, len: usize) -> Result<(), ParseError> {
        match self.options.max_header_size {
            Some(limit) if len > limit => Err(ParseError::HeaderTooLarge { limit }),
            _ => Ok(()),
        }
    }

    fn extract_headers(&mut self) -> Result<(), ParseError> {
        let mut lines = split_lines(&self.raw);

        let request_line = lines.next().unwrap_or_default();
        self.request_line = String::from_utf8_lossy(request_line).into_owned();

        for line in lines {
            match split_once(line, HEADER_DELIMITER) {
                Some((key, value)) => {
                    self.headers.insert(key.to_ascii_lowercase(), value.to_vec());
                }
                None if self.options.policy.is_strict() => {
                    return Err(ParseError::InvalidHeader(
                        String::from_utf8_lossy(line).into_owned(),
                    ));
                }
                None => {
                    tracing::trace!(
                        line = %String::from_utf8_lossy(line),
                        "skipping header line without delimiter"
                    );
                }
            }
        }

        Ok(())
    }

    pub fn header_finished(&self) -> bool {
        self.finished
    }

    /// First line of the header block, without its line terminator.
    /// Empty until the header block is complete.
    pub fn request_line(&self) -> &str {
        &self.request_line
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    pub(crate) fn headers_mut(&mut self) -> &mut HeaderMap {
        &mut self.headers
    }

    /// Looks up a header regardless of the casing used on the wire.
    ///
    /// `None` also when the value is not valid UTF-8; use
    /// [`header_bytes`](Self::header_bytes) for the raw value.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.header_bytes(name)
            .and_then(|v| std::str::from_utf8(v).ok())
    }

    pub fn header_bytes(&self, name: &str) -> Option<&[u8]> {
        self.headers
            .get(name.to_ascii_lowercase().as_bytes())
            .map(Vec::as_slice)
    }

    /// The accumulated header bytes. Once finished this is the header block
    /// without its terminator.
    pub fn headers_raw(&self) -> &[u8] {
        &self.raw
    }

    pub fn extra_body(&self) -> &[u8] {
        &self.extra_body
    }

    pub(crate) fn extra_body_mut(&mut self) -> &mut BytesMut {
        &mut self.extra_body
    }

    pub fn take_extra_body(&mut self) -> BytesMut {
        std::mem::take(&mut self.extra_body)
    }
}

pub(crate) fn find_terminator(buf: &[u8]) -> Option<usize> {
    find(buf, TERMINATOR)
}

fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack.windows(needle.len()).position(|w| w == needle)
}

fn split_once<'a>(buf: &'a [u8], delimiter: &[u8]) -> Option<(&'a [u8], &'a [u8])> {
    let at = find(buf, delimiter)?;
    Some((&buf[..at], &buf[at + delimiter.len()..]))
}

/// Splits on `\r\n` the way `str::split` would: an empty block yields one
/// empty line.
fn split_lines(block: &[u8]) -> impl Iterator<Item = &[u8]> {
    let mut rest = Some(block);
    std::iter::from_fn(move || {
        let current = rest?;
        match split_once(current, LINE_END) {
            Some((line, tail)) => {
                rest = Some(tail);
                Some(line)
            }
            None => {
                rest = None;
                Some(current)
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn terminator_split_across_chunks() {
        let mut parser = HeaderParser::default();
        parser.push_chunk(b"GET / HTTP/1.1\r\nHost: x\r").unwrap();
        assert!(!parser.header_finished());
        parser.push_chunk(b"\n\r").unwrap();
        assert!(!parser.header_finished());
        parser.push_chunk(b"\nbody").unwrap();

        assert!(parser.header_finished());
        assert_eq!(parser.headers_raw(), b"GET / HTTP/1.1\r\nHost: x");
        assert_eq!(parser.extra_body(), b"body");
    }

    #[test]
    fn chunks_after_finish_are_ignored() {
        let mut parser = HeaderParser::default();
        parser.push_chunk(b"GET / HTTP/1.1\r\n\r\n").unwrap();
        parser.push_chunk(b"Late: header\r\n\r\n").unwrap();

        assert!(parser.headers().is_empty());
        assert!(parser.extra_body().is_empty());
    }

    #[test]
    fn header_cap_applies_before_terminator() {
        let mut parser = HeaderParser::new(ParserOptions::default().with_max_header_size(8));
        let err = parser.push_chunk(b"GET /long/path HTTP/1.1").unwrap_err();
        assert_eq!(err, ParseError::HeaderTooLarge { limit: 8 });
    }

    #[test]
    fn split_lines_matches_str_split() {
        let lines: Vec<&[u8]> = split_lines(b"a\r\nb: c\r\n").collect();
        assert_eq!(lines, vec![&b"a"[..], b"b: c", b""]);
        assert_eq!(split_lines(b"").count(), 1);
    }

    #[test]
    fn find_terminator_positions() {
        assert_eq!(find_terminator(b"ab\r\n\r\ncd"), Some(2));
        assert_eq!(find_terminator(b"\r\n\r"), None);
    }
}
