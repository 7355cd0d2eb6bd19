//! Item catalog - the persistent record of remote items and their progress.
//!
//! Every run lists the configured source directories and records what it
//! sees. The catalog then decides which items still need a transfer and
//! tracks each one through transfer, source removal and the final move.

mod sqlite;
mod types;

pub use sqlite::SqliteCatalog;
pub use types::*;

use std::path::Path;

use crate::listing::RemoteEntry;

/// Joins a remote directory and a basename with exactly one `/`.
pub fn remote_path(source_dir: &str, name: &str) -> String {
    if source_dir.ends_with('/') {
        format!("{}{}", source_dir, name)
    } else {
        format!("{}/{}", source_dir, name)
    }
}

/// Trait for item catalog storage.
pub trait ItemCatalog: Send + Sync {
    /// Records entries listed in `source_dir` on `host`.
    ///
    /// Entries already known by remote path are left alone. Returns the
    /// number of new items.
    fn record_seen(
        &self,
        host: &str,
        source_dir: &str,
        entries: &[RemoteEntry],
    ) -> Result<u32, CatalogError>;

    /// Items eligible for a new transfer, oldest first: pending, or failed
    /// with fewer than `max_retries` attempts.
    fn candidates(&self, host: &str, max_retries: u32) -> Result<Vec<RemoteItem>, CatalogError>;

    /// Items of `host` in the given status.
    fn in_status(&self, host: &str, status: ItemStatus) -> Result<Vec<RemoteItem>, CatalogError>;

    /// Transferred items not moved to their target yet.
    fn awaiting_move(&self, host: &str) -> Result<Vec<RemoteItem>, CatalogError>;

    /// Transferred items whose remote source still exists.
    fn awaiting_source_removal(&self, host: &str) -> Result<Vec<RemoteItem>, CatalogError>;

    /// Get an item by id.
    fn get(&self, id: i64) -> Result<RemoteItem, CatalogError>;

    /// Marks a transfer launched; increments the attempt counter.
    fn mark_transferring(&self, id: i64) -> Result<(), CatalogError>;

    fn mark_transferred(&self, id: i64) -> Result<(), CatalogError>;

    fn mark_failed(&self, id: i64) -> Result<(), CatalogError>;

    /// Records the final local location.
    fn mark_moved(&self, id: i64, destination: &Path) -> Result<(), CatalogError>;

    fn mark_source_removed(&self, id: i64) -> Result<(), CatalogError>;
}
