//! Per-share cache files
//!
//! Each shared directory carries a `.dirswarm` file holding the JSON image
//! of its table entries, so a restart can load the share without rescanning
//! the tree. The cache is best-effort: corruption or absence falls back to
//! a fresh scan, and the dot-prefixed name keeps the file itself out of the
//! advertised listings.

use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use dirswarm_types::DirMap;

use crate::table::{NameTable, TableError};

pub const SHARE_CACHE_FILE: &str = ".dirswarm";

#[derive(Debug, Serialize, Deserialize)]
struct ShareCache {
    id: String,
    base_key: String,
    dirs: DirMap,
}

/// Register one shared directory with the table, preferring a valid cache
/// file over a rescan. `reset` discards any existing cache first.
pub fn register_share(table: &NameTable, id: &str, dir: &Path, reset: bool) -> Result<()> {
    let base_key = dir
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .with_context(|| format!("share {} has no directory name", dir.display()))?;

    let cache_path = dir.join(SHARE_CACHE_FILE);

    if reset && cache_path.exists() {
        std::fs::remove_file(&cache_path)
            .with_context(|| format!("remove share cache {}", cache_path.display()))?;
    }

    if let Some(cache) = load_cache(&cache_path, id, &base_key) {
        let mut restored = 0;
        for (key, files) in cache.dirs {
            match table.insert_listing(id, &key, files) {
                Ok(()) => restored += 1,
                Err(TableError::AlreadyExists(_)) => {}
                Err(e) => return Err(e.into()),
            }
        }
        debug!(share = %dir.display(), dirs = restored, "restored share from cache");
        return Ok(());
    }

    match table.add_dir(id, dir, &base_key, true) {
        Ok(()) => {}
        // Re-registering an already-known share is fine.
        Err(TableError::AlreadyExists(_)) => return Ok(()),
        Err(e) => return Err(e).with_context(|| format!("scan share {}", dir.display())),
    }

    write_cache(table, id, &base_key, &cache_path);
    Ok(())
}

fn load_cache(path: &Path, id: &str, base_key: &str) -> Option<ShareCache> {
    let bytes = match std::fs::read(path) {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return None,
        Err(e) => {
            warn!(path = %path.display(), error = %e, "unreadable share cache, rescanning");
            return None;
        }
    };

    match serde_json::from_slice::<ShareCache>(&bytes) {
        Ok(cache) if cache.id == id && cache.base_key == base_key => Some(cache),
        Ok(_) => {
            warn!(path = %path.display(), "share cache belongs to another identity or key, rescanning");
            None
        }
        Err(e) => {
            warn!(path = %path.display(), error = %e, "corrupt share cache, rescanning");
            None
        }
    }
}

/// Cache writes are best-effort; a failure only costs a rescan next run.
fn write_cache(table: &NameTable, id: &str, base_key: &str, path: &Path) {
    let cache = ShareCache {
        id: id.to_string(),
        base_key: base_key.to_string(),
        dirs: table.listings_under(id, base_key),
    };

    match serde_json::to_vec_pretty(&cache) {
        Ok(encoded) => {
            if let Err(e) = std::fs::write(path, encoded) {
                warn!(path = %path.display(), error = %e, "could not write share cache");
            }
        }
        Err(e) => warn!(path = %path.display(), error = %e, "could not encode share cache"),
    }
}
