//! Types for the item catalog.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::listing::EntryKind;

/// Transfer state of a catalogued item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemStatus {
    /// Seen on the remote host, never transferred.
    Pending,
    /// A transfer was launched and not yet reconciled.
    Transferring,
    /// Fully present in the working directory.
    Transferred,
    /// The last transfer attempt did not complete.
    Failed,
}

impl ItemStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ItemStatus::Pending => "pending",
            ItemStatus::Transferring => "transferring",
            ItemStatus::Transferred => "transferred",
            ItemStatus::Failed => "failed",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(ItemStatus::Pending),
            "transferring" => Some(ItemStatus::Transferring),
            "transferred" => Some(ItemStatus::Transferred),
            "failed" => Some(ItemStatus::Failed),
            _ => None,
        }
    }
}

/// A remote file or directory known to the catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteItem {
    pub id: i64,
    /// Remote host the item lives on.
    pub host: String,
    /// Source directory it was listed in.
    pub source_dir: String,
    /// Basename.
    pub name: String,
    /// Full remote path (`source_dir/name`).
    pub remote_path: String,
    pub kind: EntryKind,
    pub size_bytes: u64,
    pub status: ItemStatus,
    /// Number of transfers launched so far.
    pub attempts: u32,
    pub first_seen_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub transfer_started_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub transferred_at: Option<DateTime<Utc>>,
    /// Final local location after the move.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub moved_to: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub moved_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_removed_at: Option<DateTime<Utc>>,
}

/// Errors for catalog operations.
#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("Database error: {0}")]
    Database(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Internal error: {0}")]
    Internal(String),
}
