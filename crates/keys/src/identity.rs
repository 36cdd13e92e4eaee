//! Local node identity
//!
//! The node's identity is derived from its OpenSSH RSA key pair: the comment
//! field of the public blob is the identity token, the keys themselves stay
//! attached to it for the lifetime of the process. Failing to parse either
//! key file is fatal at startup; without them the node has no name.

use std::path::Path;

use anyhow::{Context, Result};

use crate::codec::{parse_private_key, parse_public_key, RsaPrivateKey, RsaPublicKey};

/// The local node's identity and key pair.
#[derive(Debug, Clone)]
pub struct LocalIdentity {
    pub id: String,
    pub public: RsaPublicKey,
    /// The full one-line OpenSSH blob, as sent to peers during handshakes.
    pub raw_public: Vec<u8>,
    #[allow(dead_code)]
    private: RsaPrivateKey,
}

impl LocalIdentity {
    /// Derive the local identity from key files on disk.
    pub fn from_key_files(pub_path: &Path, priv_path: &Path) -> Result<Self> {
        let raw_public = std::fs::read(pub_path)
            .with_context(|| format!("read public key file {}", pub_path.display()))?;
        let (public, id) = parse_public_key(&raw_public)
            .with_context(|| format!("parse public key file {}", pub_path.display()))?;

        let raw_private = std::fs::read(priv_path)
            .with_context(|| format!("read private key file {}", priv_path.display()))?;
        let private = parse_private_key(&raw_private)
            .with_context(|| format!("parse private key file {}", priv_path.display()))?;

        Ok(Self {
            id,
            public,
            raw_public,
            private,
        })
    }

    /// Construct directly from blobs (used by tests and embedders).
    pub fn from_blobs(raw_public: Vec<u8>, raw_private: &[u8]) -> Result<Self> {
        let (public, id) = parse_public_key(&raw_public).context("parse public key blob")?;
        let private = parse_private_key(raw_private).context("parse private key blob")?;
        Ok(Self {
            id,
            public,
            raw_public,
            private,
        })
    }
}
