use tokio::net::TcpListener;

use crate::error::StartupError;
use crate::net::resolver::ResolvedAddrs;

/// Binds and listens on the first candidate that accepts it.
///
/// Candidates are tried in resolver order. If all fail, the last error is
/// returned.
pub fn bind_listener(addrs: &ResolvedAddrs, backlog: u32) -> Result<TcpListener, StartupError> {
    let mut last_err = None;

    for entry in addrs {
        let addr = entry.address();
        let attempt = entry.create_socket_and_bind().and_then(|socket| {
            socket
                .listen(backlog)
                .map_err(|source| StartupError::Listen { addr, source })
        });

        match attempt {
            Ok(listener) => {
                tracing::info!(address = %addr, backlog, "listening");
                return Ok(listener);
            }
            Err(e) => {
                tracing::warn!(address = %addr, error = %e, "candidate address failed");
                last_err = Some(e);
            }
        }
    }

    Err(last_err.unwrap_or_else(|| StartupError::Config("no candidate addresses".into())))
}
