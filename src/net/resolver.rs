//! Host/service resolution.
//!
//! Turns a `(host, service)` pair into the candidate socket addresses the
//! listener may bind. Resolution failures are fatal at startup.

use std::net::SocketAddr;

use tokio::net::TcpSocket;

use crate::error::StartupError;

/// Well-known TCP service names accepted in place of a port number.
///
/// `lookup_host` only takes numeric ports, so names outside this table are
/// rejected rather than looked up in the system services database.
const KNOWN_SERVICES: &[(&str, u16)] = &[
    ("ftp", 21),
    ("ssh", 22),
    ("telnet", 23),
    ("smtp", 25),
    ("domain", 53),
    ("http", 80),
    ("www", 80),
    ("pop3", 110),
    ("imap", 143),
    ("https", 443),
    ("submission", 587),
    ("imaps", 993),
    ("pop3s", 995),
    ("mysql", 3306),
    ("postgresql", 5432),
    ("redis", 6379),
    ("http-alt", 8080),
];

pub struct AddressResolver;

impl AddressResolver {
    pub async fn resolve(host: &str, service: &str) -> Result<ResolvedAddrs, StartupError> {
        let port = service_port(service)?;

        let addrs: Vec<SocketAddr> = tokio::net::lookup_host((host, port))
            .await
            .map_err(|source| StartupError::Resolve {
                host: host.to_string(),
                service: service.to_string(),
                source,
            })?
            .collect();

        if addrs.is_empty() {
            return Err(StartupError::NoAddresses {
                host: host.to_string(),
                service: service.to_string(),
            });
        }

        tracing::debug!(host, service, candidates = addrs.len(), "resolved listen address");

        Ok(ResolvedAddrs { addrs })
    }
}

/// Maps a service string to a port: a decimal number or a known name.
pub fn service_port(service: &str) -> Result<u16, StartupError> {
    if let Ok(port) = service.parse::<u16>() {
        return Ok(port);
    }

    KNOWN_SERVICES
        .iter()
        .find(|(name, _)| name.eq_ignore_ascii_case(service))
        .map(|(_, port)| *port)
        .ok_or_else(|| StartupError::InvalidService(service.to_string()))
}

/// Candidate addresses, in the order the resolver returned them.
#[derive(Debug, Clone)]
pub struct ResolvedAddrs {
    addrs: Vec<SocketAddr>,
}

impl ResolvedAddrs {
    pub fn iter(&self) -> impl Iterator<Item = AddressEntry> + '_ {
        self.addrs.iter().copied().map(AddressEntry::new)
    }

    pub fn first_entry(&self) -> Option<AddressEntry> {
        self.addrs.first().copied().map(AddressEntry::new)
    }

    pub fn len(&self) -> usize {
        self.addrs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.addrs.is_empty()
    }
}

impl From<Vec<SocketAddr>> for ResolvedAddrs {
    fn from(addrs: Vec<SocketAddr>) -> Self {
        Self { addrs }
    }
}

impl<'a> IntoIterator for &'a ResolvedAddrs {
    type Item = AddressEntry;
    type IntoIter = std::iter::Map<
        std::iter::Copied<std::slice::Iter<'a, SocketAddr>>,
        fn(SocketAddr) -> AddressEntry,
    >;

    fn into_iter(self) -> Self::IntoIter {
        self.addrs
            .iter()
            .copied()
            .map(AddressEntry::new as fn(SocketAddr) -> AddressEntry)
    }
}

/// One resolved candidate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AddressEntry {
    addr: SocketAddr,
}

impl AddressEntry {
    pub fn new(addr: SocketAddr) -> Self {
        Self { addr }
    }

    pub fn address(&self) -> SocketAddr {
        self.addr
    }

    /// Creates an unbound TCP socket of the entry's address family.
    pub fn create_socket(&self) -> Result<TcpSocket, StartupError> {
        let socket = match self.addr {
            SocketAddr::V4(_) => TcpSocket::new_v4(),
            SocketAddr::V6(_) => TcpSocket::new_v6(),
        };
        socket.map_err(|source| StartupError::Socket {
            addr: self.addr,
            source,
        })
    }

    pub fn create_socket_and_bind(&self) -> Result<TcpSocket, StartupError> {
        let socket = self.create_socket()?;

        #[cfg(unix)]
        socket
            .set_reuseaddr(true)
            .map_err(|source| StartupError::Socket {
                addr: self.addr,
                source,
            })?;

        socket.bind(self.addr).map_err(|source| StartupError::Bind {
            addr: self.addr,
            source,
        })?;
        Ok(socket)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn numeric_and_named_services() {
        assert_eq!(service_port("6688").unwrap(), 6688);
        assert_eq!(service_port("http").unwrap(), 80);
        assert_eq!(service_port("HTTPS").unwrap(), 443);
        assert_eq!(service_port("http-alt").unwrap(), 8080);
        assert_eq!(service_port("ssh").unwrap(), 22);
        assert_eq!(service_port("postgresql").unwrap(), 5432);
        assert!(matches!(
            service_port("gopher"),
            Err(StartupError::InvalidService(_))
        ));
    }

    #[test]
    fn entries_keep_resolver_order() {
        let resolved = ResolvedAddrs::from(vec![
            "127.0.0.1:1".parse().unwrap(),
            "[::1]:2".parse().unwrap(),
        ]);
        let ports: Vec<u16> = resolved.iter().map(|e| e.address().port()).collect();
        assert_eq!(ports, vec![1, 2]);
        assert_eq!(resolved.first_entry().unwrap().address().port(), 1);

        let looped: Vec<AddressEntry> = (&resolved).into_iter().collect();
        assert_eq!(looped, resolved.iter().collect::<Vec<_>>());
    }
}
