//! UDP rendezvous between clients and relays.
//!
//! A client broadcasts `HELLO` to a port and waits a bounded time for a
//! single `SERVER-ANSWER`. A relay answers every `HELLO` it receives on its
//! discovery port. Finding no relay is an ordinary outcome, reported as
//! `Ok(None)`, after which the caller typically hosts a relay itself.

use std::io;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::time::Duration;

use tokio::net::UdpSocket;
use tokio::sync::watch;
use tracing::{debug, info, warn};

use super::error::{TransportError, TransportResult, is_disconnect};
use crate::core::ControlToken;
use crate::core::constants::{DEFAULT_RELAY_PORT, DISCOVERY_BUFFER_SIZE, DISCOVERY_TIMEOUT};

/// Async UDP socket wrapper for discovery datagrams.
#[derive(Debug)]
pub struct DiscoverySocket {
    /// The underlying UDP socket.
    socket: UdpSocket,
    /// Receive buffer.
    recv_buffer: Vec<u8>,
}

impl DiscoverySocket {
    /// Create a discovery socket bound to the given address.
    pub async fn bind(addr: SocketAddr) -> io::Result<Self> {
        let socket = UdpSocket::bind(addr).await?;
        Ok(Self::from_socket(socket))
    }

    /// Create a discovery socket from an existing UDP socket.
    pub fn from_socket(socket: UdpSocket) -> Self {
        Self {
            socket,
            recv_buffer: vec![0u8; DISCOVERY_BUFFER_SIZE],
        }
    }

    /// Get the local address.
    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.socket.local_addr()
    }

    /// Allow sending to broadcast addresses.
    pub fn set_broadcast(&self, on: bool) -> io::Result<()> {
        self.socket.set_broadcast(on)
    }

    /// Send a datagram to a specific address.
    pub async fn send_to(&self, data: &[u8], addr: SocketAddr) -> io::Result<usize> {
        self.socket.send_to(data, addr).await
    }

    /// Receive a datagram and return the sender's address.
    pub async fn recv_from(&mut self) -> io::Result<(&[u8], SocketAddr)> {
        let (len, addr) = self.socket.recv_from(&mut self.recv_buffer).await?;
        Ok((&self.recv_buffer[..len], addr))
    }
}

/// Client-side discovery settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiscoveryConfig {
    /// Where `HELLO` is sent; the limited broadcast address by default.
    pub target: IpAddr,

    /// Relay discovery port.
    pub port: u16,

    /// How long to wait for the reply.
    pub timeout: Duration,
}

impl Default for DiscoveryConfig {
    fn default() -> Self {
        Self {
            target: IpAddr::V4(Ipv4Addr::BROADCAST),
            port: DEFAULT_RELAY_PORT,
            timeout: DISCOVERY_TIMEOUT,
        }
    }
}

impl DiscoveryConfig {
    /// Broadcast discovery on `port` with the default timeout.
    pub fn new(port: u16) -> Self {
        Self {
            port,
            ..Self::default()
        }
    }

    /// Send `HELLO` to a specific address instead of broadcasting.
    pub fn target(mut self, target: IpAddr) -> Self {
        self.target = target;
        self
    }

    /// Set the reply timeout.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

/// Look for a relay. Returns the address that answered, or `None` if no
/// valid answer arrived in time.
pub async fn discover(config: &DiscoveryConfig) -> TransportResult<Option<SocketAddr>> {
    let bind_ip: IpAddr = match config.target {
        IpAddr::V4(_) => Ipv4Addr::UNSPECIFIED.into(),
        IpAddr::V6(_) => std::net::Ipv6Addr::UNSPECIFIED.into(),
    };
    let mut socket = DiscoverySocket::bind(SocketAddr::new(bind_ip, 0)).await?;
    socket.set_broadcast(true)?;

    let target = SocketAddr::new(config.target, config.port);
    socket
        .send_to(ControlToken::Hello.as_bytes(), target)
        .await?;
    debug!(%target, "discovery request sent");

    let reply = match tokio::time::timeout(config.timeout, socket.recv_from()).await {
        Ok(Ok((data, from))) => Some((data == ControlToken::ServerAnswer.as_bytes(), from)),
        Ok(Err(e)) if is_disconnect(&e) => None,
        Ok(Err(e)) => return Err(TransportError::Io(e)),
        Err(_) => {
            debug!(timeout = ?config.timeout, "no relay answered");
            None
        }
    };

    match reply {
        Some((true, from)) => {
            info!(relay = %from, "relay discovered");
            Ok(Some(from))
        }
        Some((false, from)) => {
            debug!(%from, "ignoring malformed discovery reply");
            Ok(None)
        }
        None => Ok(None),
    }
}

/// Relay-side discovery loop.
#[derive(Debug)]
pub struct DiscoveryResponder {
    socket: DiscoverySocket,
}

impl DiscoveryResponder {
    /// Bind the discovery port.
    pub async fn bind(addr: SocketAddr) -> io::Result<Self> {
        Ok(Self {
            socket: DiscoverySocket::bind(addr).await?,
        })
    }

    /// Get the local address.
    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.socket.local_addr()
    }

    /// Answer `HELLO` datagrams until `shutdown` flips to `true` or its
    /// sender is dropped. Other datagrams are ignored.
    pub async fn run(mut self, mut shutdown: watch::Receiver<bool>) -> TransportResult<()> {
        loop {
            let received = tokio::select! {
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                    continue;
                }
                received = self.socket.recv_from() => received,
            };

            let (is_hello, from) = match received {
                Ok((data, from)) => (data == ControlToken::Hello.as_bytes(), from),
                // ICMP unreachable from an earlier reply surfaces here on some platforms.
                Err(e) if is_disconnect(&e) => continue,
                Err(e) => return Err(TransportError::Io(e)),
            };

            if !is_hello {
                debug!(%from, "ignoring non-discovery datagram");
                continue;
            }

            match self
                .socket
                .send_to(ControlToken::ServerAnswer.as_bytes(), from)
                .await
            {
                Ok(_) => debug!(%from, "answered discovery request"),
                Err(e) => warn!(%from, error = %e, "failed to answer discovery request"),
            }
        }
        debug!("discovery responder stopped");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn loopback() -> SocketAddr {
        "127.0.0.1:0".parse().unwrap()
    }

    #[tokio::test]
    async fn test_discover_finds_responder() {
        let responder = DiscoveryResponder::bind(loopback()).await.unwrap();
        let addr = responder.local_addr().unwrap();
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let task = tokio::spawn(responder.run(shutdown_rx));

        let config = DiscoveryConfig::new(addr.port())
            .target(addr.ip())
            .timeout(Duration::from_secs(2));
        let found = discover(&config).await.unwrap();
        assert_eq!(found, Some(addr));

        shutdown_tx.send(true).unwrap();
        task.await.unwrap().unwrap();
    }

    #[tokio::test]
    async fn test_discover_times_out_without_relay() {
        // Bound but silent socket: nothing ever answers.
        let silent = DiscoverySocket::bind(loopback()).await.unwrap();
        let addr = silent.local_addr().unwrap();

        let config = DiscoveryConfig::new(addr.port())
            .target(addr.ip())
            .timeout(Duration::from_millis(200));
        assert_eq!(discover(&config).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_responder_ignores_other_datagrams() {
        let responder = DiscoveryResponder::bind(loopback()).await.unwrap();
        let addr = responder.local_addr().unwrap();
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let task = tokio::spawn(responder.run(shutdown_rx));

        let mut stranger = DiscoverySocket::bind(loopback()).await.unwrap();
        stranger.send_to(b"PING", addr).await.unwrap();
        stranger
            .send_to(ControlToken::Hello.as_bytes(), addr)
            .await
            .unwrap();

        let (data, from) = tokio::time::timeout(Duration::from_secs(2), stranger.recv_from())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(data, ControlToken::ServerAnswer.as_bytes());
        assert_eq!(from, addr);

        drop(shutdown_tx);
        task.await.unwrap().unwrap();
    }

    #[test]
    fn test_default_config() {
        let config = DiscoveryConfig::default();
        assert_eq!(config.target, IpAddr::V4(Ipv4Addr::BROADCAST));
        assert_eq!(config.timeout, Duration::from_secs(5));
    }
}
