//! The name table store
//!
//! A lock-guarded identity -> directory -> file-record map. All operations
//! take `&self`; a merge holds the write lock for the whole fold, so readers
//! never observe a half-applied merge.

use std::path::Path;
use std::sync::Arc;

use parking_lot::RwLock;
use tracing::{debug, warn};

use dirswarm_types::{global_path, identity_valid, DirMap, FileRecord, TableSnapshot};

/// Errors from name table operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TableError {
    /// The identity does not match the required email-shaped pattern.
    #[error("invalid identity: {0}")]
    InvalidIdentity(String),
    /// Missing table entry, or a directory that cannot be listed.
    #[error("not found: {0}")]
    NotFound(String),
    /// A directory key is already registered for the identity.
    #[error("already exists: {0}")]
    AlreadyExists(String),
}

/// The replicated name table.
#[derive(Debug, Clone, Default)]
pub struct NameTable {
    inner: Arc<RwLock<TableSnapshot>>,
}

impl NameTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an identity. Validates the token and is idempotent.
    pub fn add_id(&self, id: &str) -> Result<(), TableError> {
        if !identity_valid(id) {
            return Err(TableError::InvalidIdentity(id.to_string()));
        }
        self.inner.write().entry(id.to_string()).or_default();
        Ok(())
    }

    /// Scan the immediate children of `local_dir` into the entry
    /// `(id, base_key)`. Hidden (dot-prefixed) names are skipped. With
    /// `recursive`, every nested directory becomes its own top-level entry
    /// keyed `base_key/child`, not a single deep tree.
    pub fn add_dir(
        &self,
        id: &str,
        local_dir: &Path,
        base_key: &str,
        recursive: bool,
    ) -> Result<(), TableError> {
        if !identity_valid(id) {
            return Err(TableError::InvalidIdentity(id.to_string()));
        }
        if self.contains_dir(id, base_key) {
            return Err(TableError::AlreadyExists(format!("{id}/{base_key}")));
        }

        let entries = std::fs::read_dir(local_dir)
            .map_err(|e| TableError::NotFound(format!("{}: {e}", local_dir.display())))?;

        let mut files = Vec::new();
        let mut subdirs = Vec::new();

        for entry in entries {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    warn!(dir = %local_dir.display(), error = %e, "skipping unreadable entry");
                    continue;
                }
            };
            let name = entry.file_name().to_string_lossy().into_owned();
            if name.starts_with('.') {
                continue;
            }
            let meta = match entry.metadata() {
                Ok(meta) => meta,
                Err(e) => {
                    warn!(entry = %name, error = %e, "skipping entry without metadata");
                    continue;
                }
            };

            files.push(FileRecord::new(
                id,
                base_key,
                &name,
                local_dir.to_path_buf(),
                meta.len(),
                meta.is_dir(),
            ));
            if recursive && meta.is_dir() {
                subdirs.push(name);
            }
        }

        self.insert_listing(id, base_key, files)?;

        for sub in subdirs {
            let child_key = format!("{base_key}/{sub}");
            // A nested key that is somehow already present is left alone.
            if let Err(TableError::NotFound(msg)) =
                self.add_dir(id, &local_dir.join(&sub), &child_key, true)
            {
                warn!(key = %child_key, error = %msg, "skipping nested directory");
            }
        }

        Ok(())
    }

    /// Insert a prepared listing under `(id, key)`. Fails with
    /// `AlreadyExists` instead of overwriting.
    pub fn insert_listing(
        &self,
        id: &str,
        key: &str,
        files: Vec<FileRecord>,
    ) -> Result<(), TableError> {
        if !identity_valid(id) {
            return Err(TableError::InvalidIdentity(id.to_string()));
        }
        let mut table = self.inner.write();
        let dirs = table.entry(id.to_string()).or_default();
        if dirs.contains_key(key) {
            return Err(TableError::AlreadyExists(format!("{id}/{key}")));
        }
        dirs.insert(key.to_string(), files);
        Ok(())
    }

    /// All registered identities; `NotFound` when the table is empty.
    pub fn list_ids(&self) -> Result<Vec<String>, TableError> {
        let table = self.inner.read();
        if table.is_empty() {
            return Err(TableError::NotFound("empty table".into()));
        }
        Ok(table.keys().cloned().collect())
    }

    /// Every `id/key` pair in the table; `NotFound` when the table is empty.
    pub fn list_all_dirs(&self) -> Result<Vec<String>, TableError> {
        let table = self.inner.read();
        if table.is_empty() {
            return Err(TableError::NotFound("empty table".into()));
        }
        let mut dirs = Vec::new();
        for (id, dir_map) in table.iter() {
            for key in dir_map.keys() {
                dirs.push(format!("{id}/{key}"));
            }
        }
        Ok(dirs)
    }

    /// Directory keys shared by `id`, as `id/key`.
    pub fn list_dirs(&self, id: &str) -> Result<Vec<String>, TableError> {
        let table = self.inner.read();
        let dirs = table
            .get(id)
            .ok_or_else(|| TableError::NotFound(id.to_string()))?;
        Ok(dirs.keys().map(|key| format!("{id}/{key}")).collect())
    }

    /// Global paths of every file under `(id, key)`.
    pub fn list_dir(&self, id: &str, key: &str) -> Result<Vec<String>, TableError> {
        let table = self.inner.read();
        let files = table
            .get(id)
            .and_then(|dirs| dirs.get(key))
            .ok_or_else(|| TableError::NotFound(format!("{id}/{key}")))?;
        Ok(files
            .iter()
            .map(|f| global_path(id, key, &f.filename))
            .collect())
    }

    /// Case-sensitive substring scan over directory keys.
    pub fn search_dir(&self, needle: &str) -> Result<Vec<String>, TableError> {
        let table = self.inner.read();
        let mut matches = Vec::new();
        for (id, dirs) in table.iter() {
            for key in dirs.keys() {
                if key.contains(needle) {
                    matches.push(format!("{id}/{key}"));
                }
            }
        }
        if matches.is_empty() {
            return Err(TableError::NotFound(needle.to_string()));
        }
        Ok(matches)
    }

    /// Case-sensitive substring scan over filenames; directory entries are
    /// excluded from the file search.
    pub fn search_file(&self, needle: &str) -> Result<Vec<String>, TableError> {
        let table = self.inner.read();
        let mut matches = Vec::new();
        for (id, dirs) in table.iter() {
            for (key, files) in dirs.iter() {
                for file in files {
                    if !file.is_dir && file.filename.contains(needle) {
                        matches.push(global_path(id, key, &file.filename));
                    }
                }
            }
        }
        if matches.is_empty() {
            return Err(TableError::NotFound(needle.to_string()));
        }
        Ok(matches)
    }

    /// Directory matches followed by file matches. `NotFound` only when
    /// both scans come up empty.
    pub fn search(&self, needle: &str) -> Result<Vec<String>, TableError> {
        let mut result = self.search_dir(needle).unwrap_or_default();
        result.extend(self.search_file(needle).unwrap_or_default());
        if result.is_empty() {
            return Err(TableError::NotFound(needle.to_string()));
        }
        Ok(result)
    }

    /// Remove one directory entry. Removing an identity's last entry prunes
    /// the identity itself. Missing entries are a no-op.
    pub fn delete_dir(&self, id: &str, key: &str) {
        let mut table = self.inner.write();
        if let Some(dirs) = table.get_mut(id) {
            if dirs.remove(key).is_some() && dirs.is_empty() {
                table.remove(id);
            }
        }
    }

    /// Remove an identity and all its entries.
    pub fn delete_id(&self, id: &str) {
        self.inner.write().remove(id);
    }

    pub fn contains_id(&self, id: &str) -> bool {
        self.inner.read().contains_key(id)
    }

    pub fn contains_dir(&self, id: &str, key: &str) -> bool {
        self.inner
            .read()
            .get(id)
            .is_some_and(|dirs| dirs.contains_key(key))
    }

    /// Find one file record for the relay path `(id, key, filename)`.
    pub fn lookup_file(&self, id: &str, key: &str, filename: &str) -> Option<FileRecord> {
        self.inner
            .read()
            .get(id)?
            .get(key)?
            .iter()
            .find(|f| f.filename == filename)
            .cloned()
    }

    /// The directory keys of `id` matching `base_key` or nested under it.
    /// Used when writing share cache files.
    pub fn listings_under(&self, id: &str, base_key: &str) -> DirMap {
        let prefix = format!("{base_key}/");
        let table = self.inner.read();
        let Some(dirs) = table.get(id) else {
            return DirMap::new();
        };
        dirs.iter()
            .filter(|(key, _)| *key == base_key || key.starts_with(&prefix))
            .map(|(key, files)| (key.clone(), files.clone()))
            .collect()
    }

    /// Serializable image of the whole table, for sync and caching.
    pub fn snapshot(&self) -> TableSnapshot {
        self.inner.read().clone()
    }

    /// Fold a remote snapshot into the local table.
    ///
    /// Union of missing directories only: a `(identity, key)` pair already
    /// present locally is never touched, even when the remote listing
    /// differs. Idempotent. Returns the number of adopted directories.
    pub fn merge(&self, remote: TableSnapshot) -> usize {
        let mut table = self.inner.write();
        let mut adopted = 0;

        for (id, dirs) in remote {
            if !identity_valid(&id) {
                warn!(identity = %id, "dropping invalid identity from remote table");
                continue;
            }
            for (key, files) in dirs {
                let local_dirs = table.entry(id.clone()).or_default();
                if local_dirs.contains_key(&key) {
                    continue;
                }
                debug!(identity = %id, key = %key, files = files.len(), "adopted remote directory");
                local_dirs.insert(key, files);
                adopted += 1;
            }
        }

        adopted
    }

    /// Number of identities in the table.
    pub fn len(&self) -> usize {
        self.inner.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.read().is_empty()
    }
}
