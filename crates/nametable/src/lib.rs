//! dirswarm name table
//!
//! The replicated metadata store: identity -> shared directory -> file
//! records. Every node holds its own instance and keeps it eventually
//! consistent with peers through [`NameTable::merge`].
//!
//! ## Modules
//! - `table`: the store itself plus add/list/search/delete/merge
//! - `cache`: per-share cache files written into shared directories

pub mod cache;
pub mod table;

pub use cache::{register_share, SHARE_CACHE_FILE};
pub use table::{NameTable, TableError};
