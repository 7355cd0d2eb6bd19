//! Types for the lftp driver.

use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Credentials and endpoint of the remote host.
///
/// When `private_keyfile` is set the connection preamble routes through an
/// SSH connect program using that key, keeping user/password negotiation as
/// the fallback path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectionCredentials {
    /// Hostname or address of the remote source.
    pub host: String,
    /// SSH port.
    pub port: u16,
    /// Login user.
    pub username: String,
    /// Login password (may be empty when a key is used).
    #[serde(default)]
    pub password: String,
    /// Private key handed to `ssh -i`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub private_keyfile: Option<PathBuf>,
    /// Public key file. Carried for completeness; lftp picks it up next to
    /// the private key.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub public_keyfile: Option<PathBuf>,
}

impl ConnectionCredentials {
    /// Creates password-only credentials.
    pub fn new(
        host: impl Into<String>,
        port: u16,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        Self {
            host: host.into(),
            port,
            username: username.into(),
            password: password.into(),
            private_keyfile: None,
            public_keyfile: None,
        }
    }

    /// Sets the private key file.
    pub fn with_private_keyfile(mut self, path: impl Into<PathBuf>) -> Self {
        self.private_keyfile = Some(path.into());
        self
    }

    /// Sets the public key file.
    pub fn with_public_keyfile(mut self, path: impl Into<PathBuf>) -> Self {
        self.public_keyfile = Some(path.into());
        self
    }
}

/// Options for a recursive directory copy.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MirrorOptions {
    /// `--use-pget-n`: parallel connections per file.
    pub pget_connections: Option<u32>,
    /// `--parallel`: files transferred in parallel.
    pub parallel_files: Option<u32>,
    /// Prefix with `queue` instead of running immediately.
    pub enqueue: bool,
}

/// Options for a single-file fetch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PgetOptions {
    /// `-n`: parallel chunk connections.
    pub connections: Option<u32>,
    /// Prefix with `queue` instead of running immediately.
    pub enqueue: bool,
}

/// How a script is handed to the transfer client.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExecuteOptions {
    /// Launch in the background and return immediately.
    pub detach: bool,
    /// Pipe the commands into an existing backgrounded session.
    pub attach_to_session: bool,
    /// Session to attach to; `None` lets lftp pick the only one.
    pub session_id: Option<String>,
    /// A nonzero exit is an expected answer (status probes): it is still
    /// returned as an error but logged at debug level only.
    pub probe: bool,
}

impl ExecuteOptions {
    /// Synchronous run capturing output and exit code.
    pub fn foreground() -> Self {
        Self::default()
    }

    /// Fire-and-forget run.
    pub fn detached() -> Self {
        Self {
            detach: true,
            ..Self::default()
        }
    }

    /// Synchronous run against a backgrounded session.
    pub fn attached(session_id: Option<String>) -> Self {
        Self {
            attach_to_session: true,
            session_id,
            ..Self::default()
        }
    }

    /// Attached run whose failure only means "no such session".
    pub fn probe(session_id: Option<String>) -> Self {
        Self {
            probe: true,
            ..Self::attached(session_id)
        }
    }
}

/// Raw result of a synchronous backend run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ForegroundOutput {
    /// Combined stdout and stderr.
    pub output: String,
    /// Process exit code (`-1` when terminated by a signal).
    pub exit_code: i32,
}

/// What an execute call achieved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExecutionOutcome {
    /// Synchronous run that exited with status 0.
    Completed { output: String, exit_code: i32 },
    /// Detached run. Only the launch is known; the transfer itself may still
    /// fail and has to be reconciled by a later status probe.
    LaunchedUnconfirmed { pid: u32 },
}

impl ExecutionOutcome {
    /// Captured output (empty for detached runs).
    pub fn output(&self) -> &str {
        match self {
            ExecutionOutcome::Completed { output, .. } => output,
            ExecutionOutcome::LaunchedUnconfirmed { .. } => "",
        }
    }

    /// Exit code, or `None` when success is only assumed.
    pub fn exit_code(&self) -> Option<i32> {
        match self {
            ExecutionOutcome::Completed { exit_code, .. } => Some(*exit_code),
            ExecutionOutcome::LaunchedUnconfirmed { .. } => None,
        }
    }

    /// Whether the outcome is confirmed by an exit code.
    pub fn is_confirmed(&self) -> bool {
        matches!(self, ExecutionOutcome::Completed { .. })
    }
}

/// Audit record of one executed script.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandLogEntry {
    /// When the script was handed to the backend.
    pub executed_at: DateTime<Utc>,
    /// Full script text, exactly as executed.
    pub script: String,
    /// Real exit code, or `None` for an assumed-success detached run.
    pub exit_code: Option<i32>,
}
