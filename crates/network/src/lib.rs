//! dirswarm networking
//!
//! Everything that makes a node a peer: UDP broadcast discovery, the
//! connection-oriented sync handshake that exchanges identities and table
//! snapshots, the TCP query server, and the file relay.
//!
//! ## Modules
//! - `command`: the closed wire command set
//! - `wire`: line and length-prefixed frame codecs
//! - `peers`: ephemeral identity -> address map of live peers
//! - `state`: the shared per-node context handed to every task
//! - `discovery`: broadcast announcer and datagram listener
//! - `sync`: the symmetric dial-back handshake
//! - `server`: accept loop and query dispatch
//! - `relay`: local file serving and remote relaying
//! - `client`: outbound request helpers (used by the relay and callers)

pub mod client;
pub mod command;
pub mod discovery;
pub mod peers;
pub mod relay;
pub mod server;
pub mod state;
pub mod sync;
pub mod wire;

pub use command::Command;
pub use discovery::{announce, run_discovery_listener, DISCOVERY_MARKER};
pub use peers::ConnectedPeers;
pub use server::run_server;
pub use state::NodeState;

/// Well-known swarm port for discovery datagrams and peer connections.
pub const DEFAULT_PORT: u16 = 5453;
