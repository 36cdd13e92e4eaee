//! dirswarm node
//!
//! Wires the core together: derives the local identity from the node's SSH
//! key pair, registers the shared directories in the name table, then runs
//! the TCP server, the discovery listener, and one startup announcement.

use std::net::Ipv4Addr;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use tokio::net::{TcpListener, UdpSocket};
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use dirswarm_keys::{LocalIdentity, PeerRegistry};
use dirswarm_nametable::{register_share, NameTable};
use dirswarm_network::{announce, run_discovery_listener, run_server, NodeState, DEFAULT_PORT};

#[derive(Parser)]
#[command(name = "dirswarm-node")]
#[command(about = "Peer-to-peer directory sharing node")]
#[command(version)]
struct Cli {
    /// Directory to share; repeatable, or a path-list in DIRSWARM_SHARE
    #[arg(short, long = "share", env = "DIRSWARM_SHARE", value_delimiter = ':')]
    share: Vec<PathBuf>,

    /// Swarm port for discovery datagrams and peer connections
    #[arg(short, long, env = "DIRSWARM_PORT", default_value_t = DEFAULT_PORT)]
    port: u16,

    /// OpenSSH public key file (default: ~/.ssh/id_rsa.pub)
    #[arg(long)]
    pubkey: Option<PathBuf>,

    /// PKCS#1 private key file (default: ~/.ssh/id_rsa)
    #[arg(long)]
    privkey: Option<PathBuf>,

    /// Known-peers registry file (default: ~/.dirswarm/known_peers.json)
    #[arg(long)]
    registry: Option<PathBuf>,

    /// Discard per-share cache files and rescan every share
    #[arg(long)]
    reset_cache: bool,

    /// Skip the startup broadcast announcement
    #[arg(long)]
    no_announce: bool,

    /// Log filter when RUST_LOG is unset
    #[arg(long, env = "DIRSWARM_LOG", default_value = "info")]
    log_level: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&cli.log_level));
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .init();

    let home = dirs::home_dir().context("cannot determine home directory")?;
    let pubkey = cli.pubkey.unwrap_or_else(|| home.join(".ssh").join("id_rsa.pub"));
    let privkey = cli.privkey.unwrap_or_else(|| home.join(".ssh").join("id_rsa"));
    let registry_path = cli
        .registry
        .unwrap_or_else(|| home.join(".dirswarm").join("known_peers.json"));

    // Without its own identity the node cannot participate at all.
    let identity = LocalIdentity::from_key_files(&pubkey, &privkey)
        .context("cannot establish local identity")?;
    info!(id = %identity.id, "local identity established");

    let table = NameTable::new();
    table.add_id(&identity.id)?;

    if cli.share.is_empty() {
        warn!("no shared directories configured, advertising an empty table");
    }
    for share in &cli.share {
        match register_share(&table, &identity.id, share, cli.reset_cache) {
            Ok(()) => info!(share = %share.display(), "registered share"),
            Err(e) => warn!(share = %share.display(), error = %e, "skipping share"),
        }
    }

    let registry = PeerRegistry::open(registry_path);
    info!(known_peers = registry.len(), "peer registry loaded");

    let state = NodeState::new(identity, table, registry, cli.port);

    let listener = TcpListener::bind((Ipv4Addr::UNSPECIFIED, cli.port))
        .await
        .with_context(|| format!("bind tcp listener on port {}", cli.port))?;
    let datagrams = UdpSocket::bind((Ipv4Addr::UNSPECIFIED, cli.port))
        .await
        .with_context(|| format!("bind discovery listener on port {}", cli.port))?;

    {
        let state = state.clone();
        tokio::spawn(async move {
            if let Err(e) = run_server(state, listener).await {
                error!(error = %e, "tcp server stopped");
            }
        });
    }
    {
        let state = state.clone();
        tokio::spawn(async move {
            if let Err(e) = run_discovery_listener(state, datagrams).await {
                error!(error = %e, "discovery listener stopped");
            }
        });
    }

    if cli.no_announce {
        info!("startup announcement disabled");
    } else if let Err(e) = announce(state.port, &state.identity.id).await {
        // Peers can still reach us through their own announcements.
        warn!(error = %e, "startup announcement failed");
    }

    tokio::signal::ctrl_c().await.context("wait for ctrl-c")?;
    info!("shutting down");
    Ok(())
}
