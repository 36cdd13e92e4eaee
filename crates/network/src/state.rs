//! Shared per-node context
//!
//! One [`NodeState`] is built at startup and cloned into every task: the
//! discovery loops, each accepted connection, and each relay dial-out. All
//! contained maps are internally lock-guarded, so clones share state.

use std::sync::Arc;

use dirswarm_keys::{LocalIdentity, PeerRegistry};
use dirswarm_nametable::NameTable;

use crate::peers::ConnectedPeers;

#[derive(Debug, Clone)]
pub struct NodeState {
    pub identity: Arc<LocalIdentity>,
    pub table: NameTable,
    pub registry: PeerRegistry,
    pub connected: ConnectedPeers,
    /// The well-known swarm port peers are dialed back on.
    pub port: u16,
}

impl NodeState {
    pub fn new(
        identity: LocalIdentity,
        table: NameTable,
        registry: PeerRegistry,
        port: u16,
    ) -> Self {
        Self {
            identity: Arc::new(identity),
            table,
            registry,
            connected: ConnectedPeers::new(),
            port,
        }
    }
}
