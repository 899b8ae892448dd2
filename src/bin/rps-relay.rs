// rps-relay: headless relay pairing two rps-graph players.

use std::net::IpAddr;

use clap::Parser;
use rps_graph::RpsError;
use rps_graph::core::constants::{DEFAULT_MAX_MESSAGE_SIZE, DEFAULT_RELAY_PORT};
use rps_graph::server::{Relay, RelayBuilder, SlotPolicy};

#[derive(Parser)]
#[command(name = "rps-relay")]
#[command(about = "Relay for Rock-Paper-Scissors over graph commitments", long_about = None)]
#[command(version)]
struct Cli {
    /// TCP port for player connections
    #[arg(short, long, default_value_t = DEFAULT_RELAY_PORT)]
    port: u16,

    /// UDP discovery port (defaults to the TCP port)
    #[arg(short, long)]
    discovery_port: Option<u16>,

    /// Address to bind
    #[arg(short, long, default_value = "0.0.0.0")]
    bind: IpAddr,

    /// Admit a new pair after each session instead of serving only one
    #[arg(long)]
    recycle_slots: bool,

    /// Largest accepted message in bytes
    #[arg(long, default_value_t = DEFAULT_MAX_MESSAGE_SIZE)]
    max_message_size: usize,
}

#[tokio::main]
async fn main() -> Result<(), RpsError> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    if cli.max_message_size == 0 {
        return Err(RpsError::Config("max message size must be positive".into()));
    }

    let policy = if cli.recycle_slots {
        SlotPolicy::Recycle
    } else {
        SlotPolicy::SingleSession
    };
    let config = RelayBuilder::new()
        .bind_ip(cli.bind)
        .tcp_port(cli.port)
        .discovery_port(cli.discovery_port.unwrap_or(cli.port))
        .slot_policy(policy)
        .max_message_size(cli.max_message_size)
        .build();

    let relay = Relay::bind(config).await?.spawn();
    tokio::signal::ctrl_c().await?;
    tracing::info!("interrupted");
    relay.shutdown().await?;
    Ok(())
}
