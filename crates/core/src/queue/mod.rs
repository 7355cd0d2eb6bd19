//! Parser for the transfer client's job listing.
//!
//! A run probes the background session with `jobs -v`; the text that comes
//! back is turned into a [`QueueSnapshot`] from which the free transfer
//! capacity is derived. The listing is not a structured protocol, so the
//! parser is total: lines it does not recognize are skipped.

mod parser;
mod types;

pub use parser::parse_jobs;
pub use types::{JobKind, JobStatus, QueueJob, QueueSnapshot};
