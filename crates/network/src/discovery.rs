//! Peer discovery
//!
//! Announcement is one UDP broadcast datagram: a fixed marker immediately
//! followed by the sender's identity, no length prefix. The listener drops
//! anything without the marker, records the sender, guards against the
//! node hearing its own broadcast, and promotes real peers to a full sync
//! handshake.

use std::net::{IpAddr, Ipv4Addr, SocketAddr};

use anyhow::{Context, Result};
use tokio::net::UdpSocket;
use tracing::{debug, info, warn};

use crate::state::NodeState;
use crate::sync;

/// Prefix every valid discovery datagram starts with.
pub const DISCOVERY_MARKER: &[u8] = b"DIRSWARM v1 ";

/// Datagrams larger than this cannot be valid announcements.
const MAX_DATAGRAM: usize = 1024;

/// Broadcast one announcement datagram to the subnet.
pub async fn announce(port: u16, id: &str) -> Result<()> {
    let socket = UdpSocket::bind((Ipv4Addr::UNSPECIFIED, 0))
        .await
        .context("bind announce socket")?;
    socket.set_broadcast(true).context("enable broadcast")?;

    let mut payload = DISCOVERY_MARKER.to_vec();
    payload.extend_from_slice(id.as_bytes());
    socket
        .send_to(&payload, (Ipv4Addr::BROADCAST, port))
        .await
        .context("send announcement")?;

    info!(%id, port, "announced presence to subnet");
    Ok(())
}

/// Long-lived discovery listener over a pre-bound socket. Each valid
/// datagram from a new peer spawns one handshake task; a failed handshake
/// only logs.
pub async fn run_discovery_listener(state: NodeState, socket: UdpSocket) -> Result<()> {
    let local = socket.local_addr().context("discovery listener address")?;

    let local_ip = match local_ip_address::local_ip() {
        Ok(ip) => Some(ip),
        Err(e) => {
            warn!(error = %e, "cannot determine local address, self-echo guard degraded");
            None
        }
    };

    info!(%local, "discovery listener running");

    let mut buf = vec![0u8; MAX_DATAGRAM];
    loop {
        let (len, from) = match socket.recv_from(&mut buf).await {
            Ok(recv) => recv,
            Err(e) => {
                warn!(error = %e, "discovery receive failed");
                continue;
            }
        };

        let payload = &buf[..len];
        let Some(id_bytes) = payload.strip_prefix(DISCOVERY_MARKER) else {
            warn!(%from, "discarding datagram without discovery marker");
            continue;
        };
        let id = String::from_utf8_lossy(id_bytes).trim().to_string();

        // Broadcast delivery includes the sender itself.
        if is_self_echo(&state, local_ip, from.ip(), &id) {
            debug!(%from, "ignoring own announcement");
            continue;
        }

        if !state.connected.record(&id, from.ip()) {
            continue;
        }

        info!(peer = %id, %from, "discovered peer");

        let state = state.clone();
        let peer_addr = SocketAddr::new(from.ip(), state.port);
        tokio::spawn(async move {
            if let Err(e) = sync::initiate(&state, peer_addr).await {
                warn!(peer = %peer_addr, error = %e, "handshake failed");
            }
        });
    }
}

/// Address match per the protocol; the identity match additionally covers
/// multi-homed hosts where the broadcast returns on a different interface.
fn is_self_echo(state: &NodeState, local_ip: Option<IpAddr>, from: IpAddr, id: &str) -> bool {
    local_ip == Some(from) || id == state.identity.id
}
