//! Queue snapshot types.

use serde::{Deserialize, Serialize};

/// What a job transfers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobKind {
    /// Recursive directory copy (`mirror`).
    Mirror,
    /// Single file fetch (`pget` / `get`).
    SingleFile,
}

/// Where a job stands in the client's queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Queued,
    Active,
    Done,
    Failed,
}

impl JobStatus {
    /// Queued or active.
    pub fn is_in_flight(&self) -> bool {
        matches!(self, JobStatus::Queued | JobStatus::Active)
    }
}

/// One transfer job reported by the client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueJob {
    /// Job number assigned by lftp; queued commands have none yet.
    pub id: Option<u32>,
    pub kind: JobKind,
    /// Remote path, unescaped.
    pub path: String,
    pub status: JobStatus,
    /// 1-based transfer slot occupied by an active job.
    pub slot: Option<u32>,
}

/// Structured view of one `jobs -v` listing.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueSnapshot {
    pub jobs: Vec<QueueJob>,
    pub transfer_limit: u32,
    /// Whether any session or job line was seen.
    pub backgrounded: bool,
}

impl QueueSnapshot {
    /// Snapshot of a client with nothing running.
    pub fn idle(transfer_limit: u32) -> Self {
        Self {
            jobs: Vec::new(),
            transfer_limit,
            backgrounded: false,
        }
    }

    pub fn is_backgrounded(&self) -> bool {
        self.backgrounded
    }

    pub fn active_count(&self) -> usize {
        self.count(JobStatus::Active)
    }

    pub fn queued_count(&self) -> usize {
        self.count(JobStatus::Queued)
    }

    /// Free transfer slots: the transfer limit minus active jobs, never negative.
    pub fn available_slots(&self) -> u32 {
        let active = u32::try_from(self.active_count()).unwrap_or(u32::MAX);
        self.transfer_limit.saturating_sub(active)
    }

    /// Whether a queued or active job transfers `path`.
    pub fn contains_path(&self, path: &str) -> bool {
        self.jobs
            .iter()
            .any(|job| job.path == path && job.status.is_in_flight())
    }

    /// Status of the job transferring `path`, if listed.
    pub fn status_of(&self, path: &str) -> Option<JobStatus> {
        self.jobs
            .iter()
            .find(|job| job.path == path)
            .map(|job| job.status)
    }

    fn count(&self, status: JobStatus) -> usize {
        self.jobs.iter().filter(|job| job.status == status).count()
    }
}
