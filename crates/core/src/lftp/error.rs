//! Error types for the lftp driver.

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur while driving the transfer client.
#[derive(Debug, Error)]
pub enum LftpError {
    /// The client binary (or the shell used to launch it) could not be found.
    #[error("lftp not found at path: {path}")]
    ClientNotFound { path: PathBuf },

    /// A synchronous script exited with a nonzero status.
    #[error("lftp exited with code {exit_code}")]
    ClientFailure { exit_code: i32, output: String },

    /// A detached launch did not report a process id.
    #[error("failed to launch lftp in the background: {reason}")]
    LaunchFailed { reason: String },

    /// I/O error while spawning or reading the process.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl LftpError {
    /// Creates a client failure from captured output.
    pub fn client_failure(exit_code: i32, output: impl Into<String>) -> Self {
        Self::ClientFailure {
            exit_code,
            output: output.into(),
        }
    }

    /// Whether the client ran and reported failure.
    pub fn is_client_failure(&self) -> bool {
        matches!(self, Self::ClientFailure { .. })
    }

    /// Full diagnostic text captured from the client, if any.
    pub fn output(&self) -> Option<&str> {
        match self {
            Self::ClientFailure { output, .. } => Some(output),
            _ => None,
        }
    }
}
