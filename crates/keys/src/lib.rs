//! dirswarm key handling
//!
//! Parses the node's OpenSSH RSA key pair into a [`LocalIdentity`] and keeps
//! the persisted registry of previously-seen remote peers.
//!
//! ## Modules
//! - `codec`: ssh-rsa public blob and PKCS#1 PEM private key parsing
//! - `identity`: the local node's derived identity and key pair
//! - `registry`: identity -> peer map persisted to disk

pub mod codec;
pub mod identity;
pub mod registry;

pub use codec::{parse_private_key, parse_public_key, KeyError, RsaPrivateKey, RsaPublicKey};
pub use identity::LocalIdentity;
pub use registry::{Peer, PeerRegistry};
