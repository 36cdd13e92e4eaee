//! File records and table snapshot aliases

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;

use crate::identity::global_path;

/// One entry of a shared directory as advertised in the name table.
///
/// `global_path` is always `owner/dir_key/filename`; `local_path` only has
/// meaning on the owning node (it is where the bytes live on disk).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileRecord {
    pub local_path: PathBuf,
    pub global_path: String,
    pub filename: String,
    pub size: u64,
    /// Identity of the advertising peer.
    pub owner: String,
    pub is_dir: bool,
    pub keep_copy: bool,
    pub online: bool,
    /// Reserved for chunked transfer; always 1 today.
    pub num_chunks: u32,
}

impl FileRecord {
    pub fn new(
        owner: &str,
        dir_key: &str,
        filename: &str,
        local_dir: PathBuf,
        size: u64,
        is_dir: bool,
    ) -> Self {
        Self {
            local_path: local_dir,
            global_path: global_path(owner, dir_key, filename),
            filename: filename.to_string(),
            size,
            owner: owner.to_string(),
            is_dir,
            keep_copy: true,
            online: false,
            num_chunks: 1,
        }
    }
}

/// Contents of one shared directory.
pub type DirListing = Vec<FileRecord>;

/// Directory key -> listing, for one identity.
pub type DirMap = HashMap<String, DirListing>;

/// The serializable image of a name table, exchanged during sync.
pub type TableSnapshot = HashMap<String, DirMap>;
