//! dirswarm core types
//!
//! Data model shared by every dirswarm crate: the file records that make up
//! the replicated name table, the serializable table snapshot exchanged
//! between peers, and identity/global-path handling.
//!
//! ## Modules
//! - `identity`: email-shaped identity validation and global-path splitting
//! - `record`: file records and table snapshot aliases

pub mod identity;
pub mod record;

pub use identity::{global_path, identity_valid, split_file_path, split_global_path, PathError};
pub use record::{DirListing, DirMap, FileRecord, TableSnapshot};
