//! pushparse - a minimal HTTP/1.1 echo server built around a streaming
//! request parser.
//!
//! Requests are parsed chunk by chunk as they arrive, so a read may split the
//! request line, the header block or the body at any byte.

pub mod config;
pub mod error;
pub mod http;
pub mod net;
pub mod server;
