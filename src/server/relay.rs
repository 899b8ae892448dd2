//! Relay: accepts connections, pairs them, and runs one session per pair.
//!
//! The relay is an explicit object owned by its caller. [`Relay::bind`]
//! opens both sockets, [`Relay::run`] serves until the shutdown signal, and
//! [`Relay::spawn`] does the same on a background task behind a
//! [`RelayHandle`].

use std::io;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};

use thiserror::Error;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::watch;
use tokio::task::{JoinHandle, JoinSet};
use tokio::time::timeout;
use tracing::{debug, info, warn};

use super::session::{RelaySession, SessionReport};
use super::slots::{Admission, PairingSlots, SlotPolicy};
use crate::core::constants::{
    DEFAULT_MAX_MESSAGE_SIZE, DEFAULT_RELAY_PORT, HANGUP_CHECK_TIMEOUT,
};
use crate::protocol::ProtocolResult;
use crate::transport::{DiscoveryResponder, FramedConnection};

/// Errors that can occur in the relay.
#[derive(Debug, Error)]
pub enum RelayError {
    /// Failed to bind a listening socket.
    #[error("bind failed on {addr}: {source}")]
    BindFailed {
        /// Address that could not be bound.
        addr: SocketAddr,
        /// Underlying socket error.
        source: io::Error,
    },

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// The background relay task panicked or was cancelled.
    #[error("relay task failed: {0}")]
    TaskFailed(String),
}

/// Relay configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelayConfig {
    /// Address both sockets bind to.
    pub bind_ip: IpAddr,

    /// TCP port for player connections.
    pub tcp_port: u16,

    /// UDP port answering discovery requests.
    pub discovery_port: u16,

    /// Whether the slots reopen after a session.
    pub slot_policy: SlotPolicy,

    /// Largest payload accepted from a peer.
    pub max_message_size: usize,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            bind_ip: IpAddr::V4(Ipv4Addr::UNSPECIFIED),
            tcp_port: DEFAULT_RELAY_PORT,
            discovery_port: DEFAULT_RELAY_PORT,
            slot_policy: SlotPolicy::SingleSession,
            max_message_size: DEFAULT_MAX_MESSAGE_SIZE,
        }
    }
}

impl RelayConfig {
    fn tcp_addr(&self) -> SocketAddr {
        SocketAddr::new(self.bind_ip, self.tcp_port)
    }

    fn discovery_addr(&self) -> SocketAddr {
        SocketAddr::new(self.bind_ip, self.discovery_port)
    }
}

/// Builder for a [`RelayConfig`].
#[derive(Debug)]
pub struct RelayBuilder {
    config: RelayConfig,
}

impl RelayBuilder {
    /// Create a new relay builder.
    pub fn new() -> Self {
        Self {
            config: RelayConfig::default(),
        }
    }

    /// Set the bind address.
    pub fn bind_ip(mut self, ip: IpAddr) -> Self {
        self.config.bind_ip = ip;
        self
    }

    /// Use the same port for TCP and discovery.
    pub fn port(mut self, port: u16) -> Self {
        self.config.tcp_port = port;
        self.config.discovery_port = port;
        self
    }

    /// Set the TCP port.
    pub fn tcp_port(mut self, port: u16) -> Self {
        self.config.tcp_port = port;
        self
    }

    /// Set the discovery port.
    pub fn discovery_port(mut self, port: u16) -> Self {
        self.config.discovery_port = port;
        self
    }

    /// Set the slot release policy.
    pub fn slot_policy(mut self, policy: SlotPolicy) -> Self {
        self.config.slot_policy = policy;
        self
    }

    /// Set the maximum accepted payload size.
    pub fn max_message_size(mut self, max: usize) -> Self {
        self.config.max_message_size = max;
        self
    }

    /// Build the relay configuration.
    pub fn build(self) -> RelayConfig {
        self.config
    }
}

impl Default for RelayBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// A bound relay, ready to serve.
#[derive(Debug)]
pub struct Relay {
    config: RelayConfig,
    listener: TcpListener,
    discovery: DiscoveryResponder,
    local_addr: SocketAddr,
    discovery_addr: SocketAddr,
}

impl Relay {
    /// Bind the TCP listener and the discovery socket.
    pub async fn bind(config: RelayConfig) -> Result<Self, RelayError> {
        let tcp_addr = config.tcp_addr();
        let listener = TcpListener::bind(tcp_addr)
            .await
            .map_err(|source| RelayError::BindFailed {
                addr: tcp_addr,
                source,
            })?;

        let udp_addr = config.discovery_addr();
        let discovery = DiscoveryResponder::bind(udp_addr)
            .await
            .map_err(|source| RelayError::BindFailed {
                addr: udp_addr,
                source,
            })?;

        let local_addr = listener.local_addr()?;
        let discovery_addr = discovery.local_addr()?;
        info!(tcp = %local_addr, udp = %discovery_addr, policy = ?config.slot_policy, "relay listening");

        Ok(Self {
            config,
            listener,
            discovery,
            local_addr,
            discovery_addr,
        })
    }

    /// Address of the TCP listener.
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Address of the discovery socket.
    pub fn discovery_addr(&self) -> SocketAddr {
        self.discovery_addr
    }

    /// Get the relay configuration.
    pub fn config(&self) -> &RelayConfig {
        &self.config
    }

    /// Serve until `shutdown` flips to `true` or its sender is dropped.
    ///
    /// Sessions still running at shutdown are aborted.
    pub async fn run(self, mut shutdown: watch::Receiver<bool>) -> Result<(), RelayError> {
        let Relay {
            config,
            listener,
            discovery,
            ..
        } = self;

        let discovery_task = tokio::spawn(discovery.run(shutdown.clone()));
        let mut slots: PairingSlots<TcpStream> = PairingSlots::new(config.slot_policy);
        let mut sessions: JoinSet<ProtocolResult<SessionReport>> = JoinSet::new();

        loop {
            tokio::select! {
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                }

                Some(joined) = sessions.join_next() => {
                    if let Err(e) = joined {
                        warn!(error = %e, "session task failed");
                    }
                    if slots.release() {
                        info!("slots released, waiting for a new pair");
                    } else {
                        info!("session over, no further pairs will be admitted");
                    }
                }

                accepted = listener.accept() => {
                    let (stream, peer_addr) = match accepted {
                        Ok(accepted) => accepted,
                        Err(e) => {
                            warn!(error = %e, "accept failed");
                            continue;
                        }
                    };

                    let gone = match slots.waiting() {
                        Some(waiting) => has_hung_up(waiting).await,
                        None => false,
                    };
                    if gone {
                        slots.evict_waiting();
                        info!("waiting peer-1 left before pairing, slot reopened");
                    }

                    match slots.admit(stream) {
                        Admission::Waiting => {
                            info!(%peer_addr, "peer-1 connected, waiting for opponent");
                        }
                        Admission::Paired(first, second) => {
                            info!(%peer_addr, "peer-2 connected, starting session");
                            let max = config.max_message_size;
                            let session = RelaySession::new(
                                FramedConnection::new(first).with_max_payload(max),
                                FramedConnection::new(second).with_max_payload(max),
                            );
                            // The session logs its own outcome.
                            sessions.spawn(session.run());
                        }
                        Admission::Rejected(stream) => {
                            info!(%peer_addr, "slots taken, rejecting connection");
                            drop(stream);
                        }
                    }
                }
            }
        }

        info!(sessions = slots.sessions_started(), "relay shutting down");
        sessions.shutdown().await;

        match discovery_task.await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => warn!(error = %e, "discovery responder failed"),
            Err(e) => return Err(RelayError::TaskFailed(e.to_string())),
        }
        debug!("relay stopped");
        Ok(())
    }

    /// Run on a background task.
    pub fn spawn(self) -> RelayHandle {
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let local_addr = self.local_addr;
        let discovery_addr = self.discovery_addr;
        let task = tokio::spawn(self.run(shutdown_rx));
        RelayHandle {
            local_addr,
            discovery_addr,
            shutdown_tx,
            task,
        }
    }
}

/// Check whether a waiting peer closed its end.
///
/// Only a peer with nothing left unread can be seen leaving; one that sent
/// its name first still looks connected.
async fn has_hung_up(stream: &TcpStream) -> bool {
    let mut peeked = [0u8; 1];
    match timeout(HANGUP_CHECK_TIMEOUT, stream.peek(&mut peeked)).await {
        Ok(Ok(0)) | Ok(Err(_)) => true,
        Ok(Ok(_)) | Err(_) => false,
    }
}

/// Handle to a relay running in the background.
///
/// Dropping the handle also stops the relay.
#[derive(Debug)]
pub struct RelayHandle {
    local_addr: SocketAddr,
    discovery_addr: SocketAddr,
    shutdown_tx: watch::Sender<bool>,
    task: JoinHandle<Result<(), RelayError>>,
}

impl RelayHandle {
    /// Address of the TCP listener.
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Address of the discovery socket.
    pub fn discovery_addr(&self) -> SocketAddr {
        self.discovery_addr
    }

    /// Check whether the relay task has stopped.
    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    /// Stop accepting, abort running sessions and wait for the relay to stop.
    pub async fn shutdown(self) -> Result<(), RelayError> {
        // A send error means the relay already stopped on its own.
        let _ = self.shutdown_tx.send(true);
        self.task
            .await
            .map_err(|e| RelayError::TaskFailed(e.to_string()))?
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn loopback_config() -> RelayConfig {
        RelayBuilder::new()
            .bind_ip(Ipv4Addr::LOCALHOST.into())
            .port(0)
            .build()
    }

    #[test]
    fn test_builder() {
        let config = RelayBuilder::new()
            .port(4000)
            .discovery_port(4001)
            .slot_policy(SlotPolicy::Recycle)
            .max_message_size(512)
            .build();

        assert_eq!(config.tcp_port, 4000);
        assert_eq!(config.discovery_port, 4001);
        assert_eq!(config.slot_policy, SlotPolicy::Recycle);
        assert_eq!(config.max_message_size, 512);
        assert_eq!(config.bind_ip, IpAddr::V4(Ipv4Addr::UNSPECIFIED));
    }

    #[test]
    fn test_default_config() {
        let config = RelayConfig::default();
        assert_eq!(config.tcp_port, DEFAULT_RELAY_PORT);
        assert_eq!(config.discovery_port, DEFAULT_RELAY_PORT);
        assert_eq!(config.slot_policy, SlotPolicy::SingleSession);
    }

    #[tokio::test]
    async fn test_bind_reports_addresses() {
        let relay = Relay::bind(loopback_config()).await.unwrap();
        assert!(relay.local_addr().ip().is_loopback());
        assert_ne!(relay.local_addr().port(), 0);
        assert_ne!(relay.discovery_addr().port(), 0);
        assert_eq!(relay.config().slot_policy, SlotPolicy::SingleSession);
    }

    #[tokio::test]
    async fn test_bind_failure() {
        let taken = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = taken.local_addr().unwrap().port();

        let config = RelayBuilder::new()
            .bind_ip(Ipv4Addr::LOCALHOST.into())
            .tcp_port(port)
            .discovery_port(0)
            .build();
        let err = Relay::bind(config).await.unwrap_err();
        assert!(matches!(err, RelayError::BindFailed { addr, .. } if addr.port() == port));
    }

    #[tokio::test]
    async fn test_spawn_and_shutdown() {
        let handle = Relay::bind(loopback_config()).await.unwrap().spawn();
        assert!(!handle.is_finished());
        handle.shutdown().await.unwrap();
    }
}
