//! TCP server
//!
//! One task per accepted connection. The first line selects the command;
//! sync commands hand the stream to the handshake logic, queries answer
//! with a single frame and close. A failure in one connection never
//! touches another.

use std::net::SocketAddr;

use anyhow::{bail, Context, Result};
use tokio::io::{AsyncWrite, BufReader};
use tokio::net::{TcpListener, TcpStream};
use tokio::time::timeout;
use tracing::{debug, info, warn};

use dirswarm_types::split_global_path;

use crate::command::Command;
use crate::relay;
use crate::state::NodeState;
use crate::sync;
use crate::wire::{read_line, write_frame, write_message, READ_TIMEOUT};

/// Accept loop. Runs until the listener fails fatally.
pub async fn run_server(state: NodeState, listener: TcpListener) -> Result<()> {
    let local = listener.local_addr().context("listener address")?;
    info!(%local, "tcp server running");

    loop {
        let (stream, peer) = match listener.accept().await {
            Ok(accepted) => accepted,
            Err(e) => {
                warn!(error = %e, "accept failed");
                continue;
            }
        };

        let state = state.clone();
        tokio::spawn(async move {
            if let Err(e) = handle_connection(&state, stream, peer).await {
                warn!(%peer, error = %e, "connection failed");
            }
        });
    }
}

async fn handle_connection(state: &NodeState, stream: TcpStream, peer: SocketAddr) -> Result<()> {
    let (read_half, mut write_half) = stream.into_split();
    let mut reader = BufReader::new(read_half);

    let line = timeout(READ_TIMEOUT, read_line(&mut reader))
        .await
        .context("command read timed out")??;
    let Some(command) = Command::parse(&line) else {
        bail!("unknown command line {line:?}");
    };
    debug!(%peer, command = command.line(), "handling connection");

    let argument = if command.takes_argument() {
        Some(
            timeout(READ_TIMEOUT, read_line(&mut reader))
                .await
                .context("argument read timed out")??,
        )
    } else {
        None
    };

    match command {
        Command::SyncRequest => sync::handle_sync_request(state, &mut reader, peer.ip()).await,
        Command::SyncAnswer => sync::receive_sync(state, &mut reader, peer.ip()).await,
        Command::ListDirectories => {
            respond_listing(&mut write_half, state.table.list_all_dirs()).await
        }
        Command::ListDirectoriesId => {
            let id = argument.unwrap_or_default();
            respond_listing(&mut write_half, state.table.list_dirs(&id)).await
        }
        Command::ListDirectory => {
            let arg = argument.unwrap_or_default();
            let listing = split_global_path(&arg)
                .map_err(|e| e.to_string())
                .and_then(|(id, key)| state.table.list_dir(id, key).map_err(|e| e.to_string()));
            respond_listing(&mut write_half, listing).await
        }
        Command::ListKnownIds => {
            write_message(&mut write_half, &state.registry.ids()).await
        }
        Command::ListConnectedIds => {
            write_message(&mut write_half, &state.connected.ids()).await
        }
        Command::Search => {
            respond_listing(&mut write_half, state.table.search(&argument.unwrap_or_default()))
                .await
        }
        Command::SearchDirectory => {
            respond_listing(
                &mut write_half,
                state.table.search_dir(&argument.unwrap_or_default()),
            )
            .await
        }
        Command::SearchFile => {
            respond_listing(
                &mut write_half,
                state.table.search_file(&argument.unwrap_or_default()),
            )
            .await
        }
        Command::OpenFile => {
            let bytes = relay::open_file(state, &argument.unwrap_or_default()).await;
            write_frame(&mut write_half, &bytes).await
        }
    }
}

/// Missing entries are an empty result on the wire, not a failure.
async fn respond_listing<W, E>(writer: &mut W, listing: Result<Vec<String>, E>) -> Result<()>
where
    W: AsyncWrite + Unpin,
    E: std::fmt::Display,
{
    let listing = match listing {
        Ok(listing) => listing,
        Err(e) => {
            debug!(error = %e, "query produced no result");
            Vec::new()
        }
    };
    write_message(writer, &listing).await
}
