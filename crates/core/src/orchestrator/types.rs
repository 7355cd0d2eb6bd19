//! Types for the run orchestrator.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors that abort a run.
#[derive(Debug, Error)]
pub enum OrchestratorError {
    /// Transfer client error.
    #[error("lftp error: {0}")]
    Lftp(#[from] crate::lftp::LftpError),

    /// Catalog error.
    #[error("catalog error: {0}")]
    Catalog(#[from] crate::catalog::CatalogError),

    /// Placer error.
    #[error("placer error: {0}")]
    Placer(#[from] crate::placer::PlacerError),

    /// Settings that cannot be used for a run.
    #[error("invalid run settings: {0}")]
    InvalidSettings(String),

    /// Filesystem error while inspecting the working directory.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl OrchestratorError {
    /// Full client output when the run died on a transfer client failure.
    pub fn client_output(&self) -> Option<&str> {
        match self {
            Self::Lftp(e) => e.output(),
            _ => None,
        }
    }
}

/// Declared transfer policy.
///
/// Speed, connection and transfer limits are enforced by the client through
/// emitted commands; `max_retries` is applied when selecting items.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConcurrencyLimits {
    /// Bytes per second, 0 = unlimited.
    pub speed_limit: u64,
    /// Parallel connections per transfer.
    pub connection_limit: u32,
    /// Parallel active transfer jobs.
    pub transfer_limit: u32,
    /// Transfer attempts per item.
    pub max_retries: u32,
}

impl Default for ConcurrencyLimits {
    fn default() -> Self {
        Self {
            speed_limit: 0,
            connection_limit: 25,
            transfer_limit: 3,
            max_retries: 5,
        }
    }
}

/// Pipeline stages, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStage {
    Init,
    ProbeStatus,
    ParseQueue,
    ApplyLimits,
    InitiateTransfers,
    UpdateLocalQueue,
    RemoveSourceFiles,
    MoveFinished,
    Report,
    Terminal,
}

impl fmt::Display for RunStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            RunStage::Init => "init",
            RunStage::ProbeStatus => "probe_status",
            RunStage::ParseQueue => "parse_queue",
            RunStage::ApplyLimits => "apply_limits",
            RunStage::InitiateTransfers => "initiate_transfers",
            RunStage::UpdateLocalQueue => "update_local_queue",
            RunStage::RemoveSourceFiles => "remove_source_files",
            RunStage::MoveFinished => "move_finished",
            RunStage::Report => "report",
            RunStage::Terminal => "terminal",
        };
        write!(f, "{}", s)
    }
}

/// Summary of one run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunReport {
    /// Whether a backgrounded client session was found.
    pub backgrounded: bool,
    /// Transfer slots that were free for this run.
    pub available_slots: u32,
    /// Items whose transfer started immediately.
    pub new_transfers: Vec<String>,
    /// Items handed to the client's queue.
    pub queued_transfers: Vec<String>,
    /// Items found complete in the working directory.
    pub completed: Vec<String>,
    /// Items whose transfer did not complete.
    pub failed: Vec<String>,
    /// Items whose remote source was removed.
    pub removed_sources: Vec<String>,
    /// Items moved to their target directory.
    pub moved_items: Vec<String>,
    /// Items whose move failed; retried on the next run.
    pub failed_moves: Vec<String>,
}

impl RunReport {
    /// Every item launched this run, started or queued.
    pub fn launched(&self) -> impl Iterator<Item = &String> {
        self.new_transfers.iter().chain(self.queued_transfers.iter())
    }
}
