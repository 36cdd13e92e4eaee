//! Persisted peer registry
//!
//! Identity -> peer map of every remote node this one has ever completed a
//! handshake with, persisted as a single JSON file. A missing or corrupt
//! file just means an empty registry; a failed save is an error because the
//! file must never be left half-written (writes go through a temp file that
//! is atomically persisted over the target).

use std::collections::HashMap;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{anyhow, Context, Result};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::codec::RsaPublicKey;

/// A remote peer as learned from a handshake. Immutable once constructed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Peer {
    pub id: String,
    /// The peer's one-line OpenSSH blob exactly as received.
    pub raw_key: Vec<u8>,
    pub public: RsaPublicKey,
}

/// On-disk registry of known peers.
#[derive(Debug, Clone)]
pub struct PeerRegistry {
    path: PathBuf,
    peers: Arc<RwLock<HashMap<String, Peer>>>,
}

impl PeerRegistry {
    /// Open the registry at `path`, loading any previously saved peers.
    /// Absence or corruption of the file is non-fatal.
    pub fn open(path: PathBuf) -> Self {
        let peers = match std::fs::read(&path) {
            Ok(bytes) => match serde_json::from_slice::<HashMap<String, Peer>>(&bytes) {
                Ok(map) => {
                    debug!(peers = map.len(), path = %path.display(), "loaded peer registry");
                    map
                }
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "corrupt peer registry, starting empty");
                    HashMap::new()
                }
            },
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => HashMap::new(),
            Err(e) => {
                warn!(path = %path.display(), error = %e, "unreadable peer registry, starting empty");
                HashMap::new()
            }
        };

        Self {
            path,
            peers: Arc::new(RwLock::new(peers)),
        }
    }

    pub fn get(&self, id: &str) -> Option<Peer> {
        self.peers.read().get(id).cloned()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.peers.read().contains_key(id)
    }

    pub fn ids(&self) -> Vec<String> {
        self.peers.read().keys().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.peers.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.peers.read().is_empty()
    }

    /// Upsert a peer and persist the registry.
    pub fn record(&self, peer: Peer) -> Result<()> {
        {
            let mut peers = self.peers.write();
            peers.insert(peer.id.clone(), peer);
        }
        self.save()
    }

    /// Write the registry to disk via a temp file in the same directory.
    pub fn save(&self) -> Result<()> {
        let encoded = {
            let peers = self.peers.read();
            serde_json::to_vec_pretty(&*peers).context("encode peer registry")?
        };

        let parent = self
            .path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("."));
        std::fs::create_dir_all(&parent)
            .with_context(|| format!("create registry dir {}", parent.display()))?;

        let mut temp = tempfile::NamedTempFile::new_in(&parent)
            .with_context(|| format!("create temp registry file in {}", parent.display()))?;
        temp.write_all(&encoded).context("write temp registry file")?;
        temp.as_file().sync_all().context("sync temp registry file")?;
        temp.persist(&self.path).map_err(|e| {
            anyhow!(
                "persist peer registry to {} failed: {}",
                self.path.display(),
                e.error
            )
        })?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use num_bigint::BigUint;

    fn sample_peer(id: &str) -> Peer {
        Peer {
            id: id.to_string(),
            raw_key: b"ssh-rsa AAAA test".to_vec(),
            public: RsaPublicKey {
                e: BigUint::from(65537u32),
                n: BigUint::from(0xdeadbeefu32),
            },
        }
    }

    #[test]
    fn round_trips_through_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("known_peers.json");

        let registry = PeerRegistry::open(path.clone());
        assert!(registry.is_empty());

        registry.record(sample_peer("bob@y.com")).unwrap();
        registry.record(sample_peer("carol@z.org")).unwrap();

        let reloaded = PeerRegistry::open(path);
        assert_eq!(reloaded.len(), 2);
        assert_eq!(reloaded.get("bob@y.com"), Some(sample_peer("bob@y.com")));
        assert!(reloaded.contains("carol@z.org"));
    }

    #[test]
    fn record_overwrites_existing_entry() {
        let dir = tempfile::tempdir().unwrap();
        let registry = PeerRegistry::open(dir.path().join("known_peers.json"));

        let mut peer = sample_peer("bob@y.com");
        registry.record(peer.clone()).unwrap();
        peer.raw_key = b"ssh-rsa BBBB test".to_vec();
        registry.record(peer.clone()).unwrap();

        assert_eq!(registry.len(), 1);
        assert_eq!(registry.get("bob@y.com").unwrap().raw_key, peer.raw_key);
    }

    #[test]
    fn corrupt_file_loads_as_empty() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("known_peers.json");
        std::fs::write(&path, b"{ not json").unwrap();

        let registry = PeerRegistry::open(path);
        assert!(registry.is_empty());
    }
}
