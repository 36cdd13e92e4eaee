//! Identity validation and global-path handling
//!
//! A dirswarm identity is an email-shaped token (`local@domain.tld`) taken
//! from the comment field of the node's public key. It is the top-level key
//! of the name table and the peer's network handle, so every mutation that
//! takes an identity is gated on [`identity_valid`].

use once_cell::sync::Lazy;
use regex::Regex;

/// TLD is restricted to 2-4 letters.
static IDENTITY_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[a-zA-Z0-9._%+-]+@[a-zA-Z0-9.-]+\.[a-zA-Z]{2,4}$").expect("identity regex")
});

/// Errors from global-path splitting.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PathError {
    #[error("malformed global path: {0}")]
    Malformed(String),
    #[error("invalid identity: {0}")]
    InvalidIdentity(String),
}

/// Returns true iff `id` is an acceptable identity token.
pub fn identity_valid(id: &str) -> bool {
    IDENTITY_RE.is_match(id)
}

/// Join the components of a global path: `identity/dir_key/filename`.
///
/// Global paths always use `/` regardless of the host platform; they are
/// table keys, not filesystem paths.
pub fn global_path(id: &str, dir_key: &str, filename: &str) -> String {
    format!("{id}/{dir_key}/{filename}")
}

/// Split `identity/rest` into its identity and the remainder.
pub fn split_global_path(path: &str) -> Result<(&str, &str), PathError> {
    let (id, rest) = path
        .split_once('/')
        .ok_or_else(|| PathError::Malformed(path.to_string()))?;

    if !identity_valid(id) {
        return Err(PathError::InvalidIdentity(id.to_string()));
    }

    if rest.is_empty() {
        return Err(PathError::Malformed(path.to_string()));
    }

    Ok((id, rest))
}

/// Split `identity/dir/.../filename` into (identity, dir key, filename).
///
/// The dir key is everything between the identity and the final segment,
/// so nested shares (`id/photos/2024/img.jpg`) resolve to the entry keyed
/// `photos/2024`.
pub fn split_file_path(path: &str) -> Result<(&str, &str, &str), PathError> {
    let (id, rest) = split_global_path(path)?;

    let (dir_key, filename) = rest
        .rsplit_once('/')
        .ok_or_else(|| PathError::Malformed(path.to_string()))?;

    if dir_key.is_empty() || filename.is_empty() {
        return Err(PathError::Malformed(path.to_string()));
    }

    Ok((id, dir_key, filename))
}
