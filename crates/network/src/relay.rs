//! File relay
//!
//! Serves `Open File` requests. A path owned by the local identity is read
//! straight from disk; a path owned by a connected peer is fetched from
//! that peer and relayed verbatim. Absence (unknown record, missing file,
//! unconnected owner) is an empty response, never an error across the
//! wire, so a requester can always distinguish "no bytes" from a hung
//! connection.

use anyhow::Result;
use std::net::SocketAddr;
use tracing::debug;

use dirswarm_types::split_file_path;

use crate::client;
use crate::state::NodeState;

/// Resolve an `id/dir/filename` request to its bytes. Never fails; every
/// failure mode degrades to an empty response.
pub async fn open_file(state: &NodeState, path: &str) -> Vec<u8> {
    match try_open(state, path).await {
        Ok(bytes) => bytes,
        Err(e) => {
            debug!(%path, error = %e, "open file failed");
            Vec::new()
        }
    }
}

async fn try_open(state: &NodeState, path: &str) -> Result<Vec<u8>> {
    let (owner, dir_key, filename) = split_file_path(path)?;

    if owner == state.identity.id {
        let Some(record) = state.table.lookup_file(owner, dir_key, filename) else {
            debug!(%path, "no record for local file");
            return Ok(Vec::new());
        };
        return match tokio::fs::read(record.local_path.join(&record.filename)).await {
            Ok(bytes) => Ok(bytes),
            Err(e) => {
                debug!(%path, error = %e, "local file unreadable");
                Ok(Vec::new())
            }
        };
    }

    let Some(ip) = state.connected.lookup(owner) else {
        debug!(owner = %owner, "owner not connected, answering empty");
        return Ok(Vec::new());
    };

    let addr = SocketAddr::new(ip, state.port);
    debug!(%path, peer = %addr, "relaying open file");
    client::open_file(addr, path).await
}
