//! Error types.
//!
//! Failures fall into three groups:
//!
//! - [`StartupError`]: resolving, creating, binding or listening failed. These
//!   abort the process.
//! - [`ConnectionError`]: something went wrong on one accepted connection.
//!   Only that connection is affected; the accept loop keeps running.
//! - [`ParseError`]: the request parser rejected input. Only produced when the
//!   parser runs with a strict policy or a header size cap.

use std::io;
use std::net::SocketAddr;

use thiserror::Error;

/// Fatal errors raised while bringing the server up.
#[derive(Debug, Error)]
pub enum StartupError {
    /// Name resolution failed.
    #[error("failed to resolve {host}:{service}: {source}")]
    Resolve {
        host: String,
        service: String,
        #[source]
        source: io::Error,
    },

    /// Resolution succeeded but produced no candidates.
    #[error("no addresses found for {host}:{service}")]
    NoAddresses { host: String, service: String },

    /// The service is neither a port number nor a known service name.
    #[error("unknown service {0:?}")]
    InvalidService(String),

    /// Creating the socket failed.
    #[error("failed to create socket for {addr}: {source}")]
    Socket {
        addr: SocketAddr,
        #[source]
        source: io::Error,
    },

    /// Binding the socket failed.
    #[error("failed to bind {addr}: {source}")]
    Bind {
        addr: SocketAddr,
        #[source]
        source: io::Error,
    },

    /// Switching the socket to listening mode failed.
    #[error("failed to listen on {addr}: {source}")]
    Listen {
        addr: SocketAddr,
        #[source]
        source: io::Error,
    },

    /// The configuration is unusable.
    #[error("invalid configuration: {0}")]
    Config(String),
}

/// Errors that end a single connection.
#[derive(Debug, Error)]
pub enum ConnectionError {
    #[error("read failed: {0}")]
    Read(#[source] io::Error),

    #[error("write failed: {0}")]
    Write(#[source] io::Error),

    /// The peer closed its side before a complete request arrived.
    #[error("peer closed connection after {received} bytes, request incomplete")]
    Truncated { received: usize },

    /// The peer stopped accepting bytes in the middle of the response.
    #[error("peer stopped accepting data after {written} of {total} response bytes")]
    PeerClosedWrite { written: usize, total: usize },

    #[error("read timed out")]
    ReadTimeout,

    #[error("write timed out")]
    WriteTimeout,

    #[error("rejected request: {0}")]
    Parse(#[from] ParseError),
}

impl ConnectionError {
    /// Whether the failure was caused by the remote side rather than by us.
    pub fn is_peer_fault(&self) -> bool {
        matches!(
            self,
            ConnectionError::Truncated { .. }
                | ConnectionError::PeerClosedWrite { .. }
                | ConnectionError::ReadTimeout
                | ConnectionError::WriteTimeout
                | ConnectionError::Parse(_)
        )
    }
}

/// Errors raised by the request parser under a non-lenient configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    /// A header line has no `": "` delimiter.
    #[error("malformed header line {0:?}")]
    InvalidHeader(String),

    /// `content-length` is present but is not a non-negative integer.
    #[error("invalid content-length {0:?}")]
    InvalidContentLength(String),

    /// The header block grew past the configured cap without a terminator.
    #[error("header block exceeds {limit} bytes")]
    HeaderTooLarge { limit: usize },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn peer_faults_are_classified() {
        assert!(ConnectionError::Truncated { received: 3 }.is_peer_fault());
        assert!(ConnectionError::ReadTimeout.is_peer_fault());
        assert!(
            ConnectionError::Parse(ParseError::HeaderTooLarge { limit: 8 }).is_peer_fault()
        );
        assert!(!ConnectionError::Read(io::Error::other("boom")).is_peer_fault());
    }

    #[test]
    fn parse_error_converts_into_connection_error() {
        let err: ConnectionError = ParseError::InvalidContentLength("abc".into()).into();
        assert_eq!(err.to_string(), "rejected request: invalid content-length \"abc\"");
    }
}
