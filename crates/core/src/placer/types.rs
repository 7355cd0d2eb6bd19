//! Types for the placer module.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// One finished item to move out of the working directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MoveRequest {
    /// Item name, for logging.
    pub name: String,
    /// Path inside the working directory.
    pub source: PathBuf,
    /// Final path (target directory joined with the item name).
    pub destination: PathBuf,
}

impl MoveRequest {
    pub fn new(name: impl Into<String>, source: impl Into<PathBuf>, destination: impl Into<PathBuf>) -> Self {
        Self {
            name: name.into(),
            source: source.into(),
            destination: destination.into(),
        }
    }
}

/// Outcome of a successful move.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MoveResult {
    pub destination: PathBuf,
    /// Bytes in the moved item (all files for a directory).
    pub size_bytes: u64,
    /// Whether a rename was used instead of copy + remove.
    pub atomic: bool,
}
