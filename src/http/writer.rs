use tokio::io::{AsyncWrite, AsyncWriteExt};

use crate::error::ConnectionError;
use crate::http::response::Response;

const HTTP_VERSION: &str = "HTTP/1.1";

pub fn serialize_response(resp: &Response) -> Vec<u8> {
    let mut buf = Vec::with_capacity(128 + resp.body.len());

    // Status line
    let status_line = format!(
        "{} {} {}\r\n",
        HTTP_VERSION,
        resp.status.as_u16(),
        resp.status.reason_phrase()
    );
    buf.extend_from_slice(status_line.as_bytes());

    for (k, v) in &resp.headers {
        buf.extend_from_slice(k.as_bytes());
        buf.extend_from_slice(b": ");
        buf.extend_from_slice(v.as_bytes());
        buf.extend_from_slice(b"\r\n");
    }

    // Header/body separator
    buf.extend_from_slice(b"\r\n");

    buf.extend_from_slice(&resp.body);

    buf
}

/// Serialized response plus how much of it has reached the peer.
pub struct ResponseWriter {
    buffer: Vec<u8>,
    written: usize,
}

impl ResponseWriter {
    pub fn new(response: &Response) -> Self {
        Self {
            buffer: serialize_response(response),
            written: 0,
        }
    }

    pub fn written(&self) -> usize {
        self.written
    }

    /// Size of the serialized response.
    pub fn total(&self) -> usize {
        self.buffer.len()
    }

    pub fn is_done(&self) -> bool {
        self.written == self.buffer.len()
    }

    /// Writes the remaining bytes, looping over partial writes.
    pub async fn write_to_stream<W>(&mut self, stream: &mut W) -> Result<(), ConnectionError>
    where
        W: AsyncWrite + Unpin,
    {
        while self.written < self.buffer.len() {
            let n = stream
                .write(&self.buffer[self.written..])
                .await
                .map_err(ConnectionError::Write)?;

            if n == 0 {
                return Err(ConnectionError::PeerClosedWrite {
                    written: self.written,
                    total: self.buffer.len(),
                });
            }

            self.written += n;
        }

        stream.flush().await.map_err(ConnectionError::Write)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn echo_wire_format() {
        let wire = serialize_response(&Response::echo("pushparse", b"hello".to_vec()));
        assert_eq!(
            wire,
            b"HTTP/1.1 200 OK\r\nServer: pushparse\r\nConnection: close\r\nContent-length: 5\r\n\r\nhello"
                .to_vec()
        );
    }

    #[tokio::test]
    async fn partial_writes_are_retried() {
        // A tiny duplex buffer forces the writer through many short writes.
        let (mut client, mut server) = tokio::io::duplex(4);
        let response = Response::echo("s", vec![b'x'; 64]);
        let mut writer = ResponseWriter::new(&response);
        let expected = writer.total();

        let reader = tokio::spawn(async move {
            let mut out = Vec::new();
            tokio::io::AsyncReadExt::read_to_end(&mut client, &mut out)
                .await
                .unwrap();
            out
        });

        assert!(!writer.is_done());
        writer.write_to_stream(&mut server).await.unwrap();
        assert!(writer.is_done());
        assert_eq!(writer.written(), expected);
        drop(server);

        let received = reader.await.unwrap();
        assert_eq!(received.len(), expected);
        assert!(received.ends_with(&[b'x'; 64]));
    }
}
