use std::sync::Arc;
use std::time::Duration;

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::time::timeout;

use crate::config::Config;
use crate::error::{ConnectionError, ParseError};
use crate::http::parser::RequestParser;
use crate::http::policy::ParserOptions;
use crate::http::request::Request;
use crate::http::response::Response;
use crate::http::writer::ResponseWriter;

/// Per-connection knobs, cloned into every connection task.
#[derive(Debug, Clone)]
pub struct ConnectionSettings {
    pub read_buffer_size: usize,
    pub read_timeout: Duration,
    pub write_timeout: Duration,
    pub server_name: Arc<str>,
    pub parser_options: ParserOptions,
}

impl ConnectionSettings {
    pub fn from_config(cfg: &Config) -> Self {
        Self {
            read_buffer_size: cfg.read_buffer_size,
            read_timeout: cfg.read_timeout(),
            write_timeout: cfg.write_timeout(),
            server_name: Arc::from(cfg.server_name.as_str()),
            parser_options: cfg.parser_options(),
        }
    }
}

impl Default for ConnectionSettings {
    fn default() -> Self {
        Self::from_config(&Config::default())
    }
}

/// What a connection did, for logging once it is over.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConnectionSummary {
    pub method: String,
    pub path: String,
    pub body_len: usize,
    pub bytes_read: usize,
    pub bytes_written: usize,
}

pub enum ConnectionState {
    Reading,
    /// The optional error is a rejected request; it is reported after the
    /// 400 has been written.
    Writing(ResponseWriter, Option<ParseError>),
    Closed,
}

/// Drives one accepted connection: read one request, answer it, close.
pub struct Connection<S> {
    stream: S,
    parser: RequestParser,
    buffer: Vec<u8>,
    state: ConnectionState,
    settings: ConnectionSettings,
    bytes_read: usize,
    summary: Option<ConnectionSummary>,
}

impl<S> Connection<S>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    pub fn new(stream: S, settings: ConnectionSettings) -> Self {
        Self {
            stream,
            parser: RequestParser::with_options(settings.parser_options),
            buffer: vec![0u8; settings.read_buffer_size.max(1)],
            state: ConnectionState::Reading,
            settings,
            bytes_read: 0,
            summary: None,
        }
    }

    /// Runs the connection to the end and closes the stream, whatever the
    /// outcome.
    pub async fn run(mut self) -> Result<ConnectionSummary, ConnectionError> {
        let result = self.drive().await;

        if let Err(e) = self.stream.shutdown().await {
            tracing::debug!(error = %e, "shutdown after response failed");
        }

        result
    }

    async fn drive(&mut self) -> Result<ConnectionSummary, ConnectionError> {
        loop {
            match &mut self.state {
                ConnectionState::Reading => {
                    let (response, rejected) = match self.read_request().await {
                        Ok(request) => (self.respond(&request), None),
                        Err(ConnectionError::Parse(e)) => {
                            (Response::bad_request(&self.settings.server_name), Some(e))
                        }
                        Err(e) => return Err(e),
                    };

                    let writer = ResponseWriter::new(&response);
                    tracing::debug!(
                        status = response.status.as_u16(),
                        body_len = response.body.len(),
                        total = writer.total(),
                        "response ready"
                    );
                    self.state = ConnectionState::Writing(writer, rejected);
                }

                ConnectionState::Writing(writer, rejected) => {
                    timeout(
                        self.settings.write_timeout,
                        writer.write_to_stream(&mut self.stream),
                    )
                    .await
                    .map_err(|_| ConnectionError::WriteTimeout)??;
                    tracing::debug!(bytes_written = writer.written(), "response written");

                    if let Some(e) = rejected.take() {
                        return Err(ConnectionError::Parse(e));
                    }
                    if let Some(summary) = self.summary.as_mut() {
                        summary.bytes_written = writer.written();
                    }
                    self.state = ConnectionState::Closed;
                }

                ConnectionState::Closed => break,
            }
        }

        Ok(self.summary.take().unwrap_or_default())
    }

    /// Reads chunks into the fixed buffer until the parser has a full request.
    pub async fn read_request(&mut self) -> Result<Request, ConnectionError> {
        while !self.parser.request_finished() {
            let n = timeout(self.settings.read_timeout, self.stream.read(&mut self.buffer))
                .await
                .map_err(|_| ConnectionError::ReadTimeout)?
                .map_err(ConnectionError::Read)?;

            if n == 0 {
                return Err(ConnectionError::Truncated {
                    received: self.bytes_read,
                });
            }

            self.bytes_read += n;
            self.parser.push_chunk(&self.buffer[..n])?;

            tracing::trace!(
                read = n,
                total = self.bytes_read,
                state = ?self.parser.state(),
                "chunk parsed"
            );
        }

        let parser = std::mem::take(&mut self.parser);
        tracing::debug!(
            method = parser.method(),
            path = parser.url(),
            headers = %String::from_utf8_lossy(parser.headers_raw()),
            body_len = parser.body().len(),
            bytes_read = self.bytes_read,
            "request received"
        );
        tracing::trace!(body = %String::from_utf8_lossy(parser.body()), "request body");

        // `request_finished` was checked by the loop above.
        parser.into_request().ok_or(ConnectionError::Truncated {
            received: self.bytes_read,
        })
    }

    fn respond(&mut self, request: &Request) -> Response {
        self.summary = Some(ConnectionSummary {
            method: request.method.clone(),
            path: request.path.clone(),
            body_len: request.body.len(),
            bytes_read: self.bytes_read,
            bytes_written: 0,
        });

        Response::echo(&self.settings.server_name, request.body.to_vec())
    }
}
