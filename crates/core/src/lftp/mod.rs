//! Command-and-control driver for the lftp transfer client.
//!
//! lftp does the protocol work; this module builds its command scripts,
//! runs them in the foreground or detached, and keeps an audit log of what
//! was executed.
//!
//! # Example
//!
//! ```ignore
//! use locomotive_core::lftp::{ConnectionCredentials, ExecuteOptions, Lftp, MirrorOptions, ShellBackend};
//!
//! let creds = ConnectionCredentials::new("example.com", 22, "u", "p");
//! let mut lftp = Lftp::new(creds, "/data/work", ShellBackend::new("lftp"));
//!
//! lftp.set_speed_limit(0)
//!     .set_transfer_limit(3)
//!     .mirror_dir("/remote/My Folder", MirrorOptions::default());
//!
//! // connect -p 22 -u u,p sftp://example.com; set net:limit-total-rate 0; ... exit parent;
//! let outcome = lftp.execute(ExecuteOptions::detached()).await?;
//! ```

mod backend;
mod driver;
mod error;
mod escape;
mod script;
mod types;

pub use backend::{ShellBackend, TransferBackend};
pub use driver::Lftp;
pub use error::LftpError;
pub use escape::{escape_path, split_words};
pub use script::{build_connection_preamble, render_script, CommandBatch};
pub use types::{
    CommandLogEntry, ConnectionCredentials, ExecuteOptions, ExecutionOutcome, ForegroundOutput,
    MirrorOptions, PgetOptions,
};
