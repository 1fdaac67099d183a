use std::future::Future;
use std::io;
use std::net::SocketAddr;
use std::time::Duration;

use tokio::net::{TcpListener, TcpStream};
use tracing::{Instrument, info};

use crate::config::Config;
use crate::error::StartupError;
use crate::http::connection::{Connection, ConnectionSettings};
use crate::net::resolver::AddressResolver;
use crate::net::socket::bind_listener;
use crate::server::supervisor::ConnectionSupervisor;

/// Pause after a failed accept so a persistent error (e.g. out of file
/// descriptors) does not spin the loop.
const ACCEPT_ERROR_BACKOFF: Duration = Duration::from_millis(100);

/// A bound listening socket plus everything needed to serve it.
pub struct Server {
    listener: TcpListener,
    settings: ConnectionSettings,
    supervisor: ConnectionSupervisor,
}

impl Server {
    /// Resolves the configured address and binds it. Every error here is
    /// fatal.
    pub async fn bind(cfg: &Config) -> Result<Self, StartupError> {
        cfg.validate()?;

        let addrs = AddressResolver::resolve(&cfg.host, &cfg.service).await?;
        let listener = bind_listener(&addrs, cfg.backlog)?;

        Ok(Self {
            listener,
            settings: ConnectionSettings::from_config(cfg),
            supervisor: ConnectionSupervisor::new(cfg.max_connections),
        })
    }

    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    /// Serves forever.
    pub async fn run(self) {
        self.run_until(std::future::pending()).await
    }

    /// Accepts connections until `shutdown` resolves, then waits for the
    /// connections already in flight.
    pub async fn run_until<F>(self, shutdown: F)
    where
        F: Future<Output = ()>,
    {
        let Self {
            listener,
            settings,
            mut supervisor,
        } = self;
        tokio::pin!(shutdown);

        let mut next_id: u64 = 0;
        tracing::debug!(
            max_connections = supervisor.max_connections(),
            "accepting connections"
        );

        loop {
            let permit = tokio::select! {
                _ = &mut shutdown => break,
                permit = supervisor.acquire() => permit,
            };

            let accepted = loop {
                tokio::select! {
                    _ = &mut shutdown => break None,
                    res = listener.accept() => break Some(res),
                    _ = supervisor.join_next() => {}
                }
            };

            let (stream, peer) = match accepted {
                None => break,
                Some(Ok(pair)) => pair,
                Some(Err(e)) => {
                    tracing::error!(error = %e, "accept failed");
                    tokio::time::sleep(ACCEPT_ERROR_BACKOFF).await;
                    continue;
                }
            };

            next_id += 1;
            supervisor.reap();
            tracing::debug!(
                peer = %peer,
                active = supervisor.active(),
                available = supervisor.available_slots(),
                max = supervisor.max_connections(),
                "accepted connection"
            );

            let span = tracing::info_span!("conn", id = next_id, peer = %peer);
            supervisor.spawn(
                permit,
                serve_connection(stream, peer, settings.clone()).instrument(span),
            );
        }

        drop(listener);
        info!("listener closed");
        supervisor.shutdown().await;
    }
}

async fn serve_connection(stream: TcpStream, peer: SocketAddr, settings: ConnectionSettings) {
    match Connection::new(stream, settings).run().await {
        Ok(summary) => {
            info!(
                method = %summary.method,
                path = %summary.path,
                body_len = summary.body_len,
                bytes_read = summary.bytes_read,
                bytes_written = summary.bytes_written,
                "request served"
            );
        }
        Err(e) if e.is_peer_fault() => {
            tracing::warn!(peer = %peer, error = %e, "connection ended early");
        }
        Err(e) => {
            tracing::error!(peer = %peer, error = %e, "connection error");
        }
    }
}
