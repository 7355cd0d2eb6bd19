//! Run orchestration.
//!
//! A [`Locomotive`] executes one pass of the pipeline:
//!
//! 1. Probe the backgrounded lftp session and parse its job list
//! 2. Apply the speed and transfer limits
//! 3. List the sources and launch transfers for new items
//! 4. Settle items the session no longer knows about
//! 5. Remove remote sources of transferred items
//! 6. Move transferred items to their target directories
//!
//! Each invocation runs the pipeline once; scheduling repeated runs is left
//! to cron or a systemd timer.

mod config;
mod runner;
mod types;

pub use config::{RunSettings, SourceTarget};
pub use runner::Locomotive;
pub use types::{ConcurrencyLimits, OrchestratorError, RunReport, RunStage};
