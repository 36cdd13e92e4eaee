//! Sync handshake
//!
//! The connection-oriented exchange that lets two nodes trade identity and
//! name-table snapshots. The protocol is symmetric over two streams: the
//! initiator sends `General TCP` + hello + snapshot on its outbound stream;
//! the responder dials back, answers `General ANSWER` + its own hello +
//! snapshot on the return channel, then reads the initiator's payloads from
//! the original stream. Each side merges only after the full snapshot
//! decodes; a failure aborts that handshake and nothing else.

use std::net::{IpAddr, SocketAddr};

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use tokio::io::{AsyncBufRead, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::time::timeout;
use tracing::{debug, info};

use dirswarm_keys::{parse_public_key, Peer};
use dirswarm_types::TableSnapshot;

use crate::command::Command;
use crate::state::NodeState;
use crate::wire::{read_message, write_line, write_message, CONNECT_TIMEOUT, READ_TIMEOUT};

/// Identity announcement sent at the start of every handshake.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Hello {
    pub id: String,
    /// The sender's one-line OpenSSH public key blob.
    pub raw_key: Vec<u8>,
}

impl Hello {
    fn local(state: &NodeState) -> Self {
        Self {
            id: state.identity.id.clone(),
            raw_key: state.identity.raw_public.clone(),
        }
    }
}

/// Open a handshake toward a freshly discovered peer (initiator role).
/// The peer's answer arrives later as an inbound `General ANSWER` stream.
pub async fn initiate(state: &NodeState, addr: SocketAddr) -> Result<()> {
    let stream = timeout(CONNECT_TIMEOUT, TcpStream::connect(addr))
        .await
        .context("connect timed out")?
        .with_context(|| format!("connect to {addr}"))?;
    debug!(peer = %addr, "initiating sync");
    send_handshake(state, stream, Command::SyncRequest).await
}

/// Write one half of the symmetric exchange: command line, hello, snapshot.
pub async fn send_handshake(
    state: &NodeState,
    mut stream: TcpStream,
    command: Command,
) -> Result<()> {
    write_line(&mut stream, command.line()).await?;
    write_message(&mut stream, &Hello::local(state)).await?;
    write_message(&mut stream, &state.table.snapshot()).await?;
    stream.shutdown().await.context("close handshake stream")?;
    Ok(())
}

/// Responder role for `General TCP`: dial back with the answer, then read
/// the initiator's payloads from the inbound stream.
pub async fn handle_sync_request<R>(state: &NodeState, reader: &mut R, peer_ip: IpAddr) -> Result<()>
where
    R: AsyncBufRead + Unpin,
{
    let back_addr = SocketAddr::new(peer_ip, state.port);
    let back = timeout(CONNECT_TIMEOUT, TcpStream::connect(back_addr))
        .await
        .context("dial-back timed out")?
        .with_context(|| format!("dial back to {back_addr}"))?;
    send_handshake(state, back, Command::SyncAnswer).await?;

    receive_sync(state, reader, peer_ip).await
}

/// Read the peer's hello + snapshot, record the peer, and merge. Used for
/// the inbound half of both roles.
pub async fn receive_sync<R>(state: &NodeState, reader: &mut R, peer_ip: IpAddr) -> Result<()>
where
    R: AsyncBufRead + Unpin,
{
    let hello: Hello = timeout(READ_TIMEOUT, read_message(reader))
        .await
        .context("hello read timed out")??;

    let (public, derived_id) = parse_public_key(&hello.raw_key).context("parse peer key")?;
    if derived_id != hello.id {
        bail!(
            "peer announced identity {:?} but its key says {:?}",
            hello.id,
            derived_id
        );
    }

    let snapshot: TableSnapshot = timeout(READ_TIMEOUT, read_message(reader))
        .await
        .context("table read timed out")??;

    // The registry save is blocking file I/O; keep it off the runtime.
    let registry = state.registry.clone();
    let peer = Peer {
        id: hello.id.clone(),
        raw_key: hello.raw_key,
        public,
    };
    tokio::task::spawn_blocking(move || registry.record(peer))
        .await
        .context("registry write task")?
        .context("persist peer registry")?;
    state.connected.record(&hello.id, peer_ip);

    let adopted = state.table.merge(snapshot);
    info!(peer = %hello.id, %peer_ip, adopted, "sync complete");
    Ok(())
}
