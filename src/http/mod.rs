//! HTTP/1.1 request handling.
//!
//! # Architecture
//!
//! - **`header`**: accumulates raw chunks until the header block is complete
//! - **`parser`**: wraps the header parser and waits for the body
//! - **`policy`**: lenient vs. strict treatment of malformed input
//! - **`connection`**: reads, parses, answers and closes one connection
//! - **`request`**: owned view of a finished request
//! - **`response`**: response representation with builder pattern
//! - **`writer`**: serializes a response and writes it out
//!
//! # Connection State Machine
//!
//! ```text
//!        ┌─────────────┐
//!        │   Reading   │ ← feed chunks to the parser
//!        └──────┬──────┘
//!               │ request complete (or rejected under strict policy)
//!               ▼
//!        ┌──────────────────┐
//!        │    Writing       │ ← echo response (or 400)
//!        └──────┬───────────┘
//!               │ response sent
//!               ▼
//!        ┌──────────────────┐
//!        │     Closed       │ ← stream shut down
//!        └──────────────────┘
//! ```
//!
//! A peer that hangs up while in `Reading` ends the connection with
//! [`ConnectionError::Truncated`](crate::error::ConnectionError::Truncated).
//!
//! # Example
//!
//! ```ignore
//! use pushparse::http::connection::{Connection, ConnectionSettings};
//! use tokio::net::TcpListener;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let listener = TcpListener::bind("127.0.0.1:8080").await?;
//!
//!     loop {
//!         let (socket, _addr) = listener.accept().await?;
//!         tokio::spawn(async move {
//!             let conn = Connection::new(socket, ConnectionSettings::default());
//!             if let Err(e) = conn.run().await {
//!                 eprintln!("Connection error: {}", e);
//!             }
//!         });
//!     }
//! }
//! ```

pub mod connection;
pub mod header;
pub mod parser;
pub mod policy;
pub mod request;
pub mod response;
pub mod writer;
