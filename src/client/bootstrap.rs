//! Finding a relay to play on.
//!
//! A player first asks the network for a relay. If none answers within the
//! discovery timeout it hosts one itself and connects to it on loopback, so
//! the next player to start finds it.

use std::net::{IpAddr, Ipv4Addr, Ipv6Addr, SocketAddr};

use tracing::info;

use super::player::ClientError;
use crate::server::{Relay, RelayConfig, RelayHandle};
use crate::transport::{DiscoveryConfig, discover};

/// Where the player should connect.
#[derive(Debug)]
pub enum RelayLocation {
    /// Another process answered discovery.
    Discovered(SocketAddr),
    /// No relay answered; this process hosts one.
    Hosted {
        /// Loopback address of the hosted relay.
        addr: SocketAddr,
        /// Handle keeping the hosted relay alive.
        relay: RelayHandle,
    },
}

impl RelayLocation {
    /// Address to connect to.
    pub fn addr(&self) -> SocketAddr {
        match self {
            RelayLocation::Discovered(addr) => *addr,
            RelayLocation::Hosted { addr, .. } => *addr,
        }
    }

    /// Check whether this process hosts the relay.
    pub fn is_hosted(&self) -> bool {
        matches!(self, RelayLocation::Hosted { .. })
    }

    /// Handle of the hosted relay, if any.
    pub fn into_relay(self) -> Option<RelayHandle> {
        match self {
            RelayLocation::Discovered(_) => None,
            RelayLocation::Hosted { relay, .. } => Some(relay),
        }
    }
}

/// Discover a relay, or host one with `fallback` if none answers.
///
/// A discovered relay is reached at the address its discovery reply came
/// from, which assumes it serves TCP on its discovery port (the default).
pub async fn locate_or_host(
    discovery: &DiscoveryConfig,
    fallback: RelayConfig,
) -> Result<RelayLocation, ClientError> {
    if let Some(addr) = discover(discovery).await? {
        return Ok(RelayLocation::Discovered(addr));
    }

    info!(port = fallback.tcp_port, "no relay found, hosting one");
    let relay = Relay::bind(fallback).await?.spawn();
    let bound = relay.local_addr();
    let ip = match bound.ip() {
        IpAddr::V4(ip) if ip.is_unspecified() => IpAddr::V4(Ipv4Addr::LOCALHOST),
        IpAddr::V6(ip) if ip.is_unspecified() => IpAddr::V6(Ipv6Addr::LOCALHOST),
        ip => ip,
    };

    Ok(RelayLocation::Hosted {
        addr: SocketAddr::new(ip, bound.port()),
        relay,
    })
}
