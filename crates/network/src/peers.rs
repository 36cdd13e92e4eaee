//! Connected peers
//!
//! Ephemeral identity -> IP map of peers seen alive this run, fed by
//! discovery datagrams and completed handshakes. Not persisted; entries
//! live until the process exits.

use std::collections::HashMap;
use std::net::IpAddr;
use std::sync::Arc;

use parking_lot::RwLock;
use tracing::warn;

use dirswarm_types::identity_valid;

#[derive(Debug, Clone, Default)]
pub struct ConnectedPeers {
    inner: Arc<RwLock<HashMap<String, IpAddr>>>,
}

impl ConnectedPeers {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a live peer. Returns false (and records nothing) for an
    /// identity that fails validation.
    pub fn record(&self, id: &str, addr: IpAddr) -> bool {
        if !identity_valid(id) {
            warn!(identity = %id, %addr, "ignoring peer with invalid identity");
            return false;
        }
        self.inner.write().insert(id.to_string(), addr);
        true
    }

    pub fn lookup(&self, id: &str) -> Option<IpAddr> {
        self.inner.read().get(id).copied()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.inner.read().contains_key(id)
    }

    pub fn ids(&self) -> Vec<String> {
        self.inner.read().keys().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.inner.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.read().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::Ipv4Addr;

    #[test]
    fn records_and_looks_up_peers() {
        let peers = ConnectedPeers::new();
        let addr = IpAddr::V4(Ipv4Addr::new(192, 168, 1, 7));

        assert!(peers.record("bob@y.com", addr));
        assert_eq!(peers.lookup("bob@y.com"), Some(addr));
        assert!(peers.lookup("carol@z.org").is_none());
        assert_eq!(peers.ids(), vec!["bob@y.com".to_string()]);
    }

    #[test]
    fn rejects_invalid_identities() {
        let peers = ConnectedPeers::new();
        assert!(!peers.record("garbage", IpAddr::V4(Ipv4Addr::LOCALHOST)));
        assert!(peers.is_empty());
    }

    #[test]
    fn rerecording_updates_the_address() {
        let peers = ConnectedPeers::new();
        let first = IpAddr::V4(Ipv4Addr::new(10, 0, 0, 1));
        let second = IpAddr::V4(Ipv4Addr::new(10, 0, 0, 2));
        peers.record("bob@y.com", first);
        peers.record("bob@y.com", second);
        assert_eq!(peers.lookup("bob@y.com"), Some(second));
        assert_eq!(peers.len(), 1);
    }
}
