//! Outbound request helpers
//!
//! One connection per request: command line, optional argument line, one
//! response frame. Used by the relay for remote fetches and by anything
//! that wants to query a running node (tests, external CLIs).

use std::net::SocketAddr;

use anyhow::{Context, Result};
use tokio::net::TcpStream;
use tokio::time::timeout;

use crate::command::Command;
use crate::wire::{read_frame, read_message, write_line, CONNECT_TIMEOUT, READ_TIMEOUT};

async fn connect(addr: SocketAddr) -> Result<TcpStream> {
    timeout(CONNECT_TIMEOUT, TcpStream::connect(addr))
        .await
        .context("connect timed out")?
        .with_context(|| format!("connect to {addr}"))
}

async fn send_request(
    stream: &mut TcpStream,
    command: Command,
    argument: Option<&str>,
) -> Result<()> {
    write_line(stream, command.line()).await?;
    if let Some(argument) = argument {
        write_line(stream, argument).await?;
    }
    Ok(())
}

/// Issue a listing/search query and collect the string response.
pub async fn query(addr: SocketAddr, command: Command, argument: Option<&str>) -> Result<Vec<String>> {
    let mut stream = connect(addr).await?;
    send_request(&mut stream, command, argument).await?;
    timeout(READ_TIMEOUT, read_message(&mut stream))
        .await
        .context("response timed out")?
}

/// Fetch the bytes of `id/dir/filename` from the node at `addr`. An empty
/// response means not found.
pub async fn open_file(addr: SocketAddr, path: &str) -> Result<Vec<u8>> {
    let mut stream = connect(addr).await?;
    send_request(&mut stream, Command::OpenFile, Some(path)).await?;
    timeout(READ_TIMEOUT, read_frame(&mut stream))
        .await
        .context("response timed out")?
}
