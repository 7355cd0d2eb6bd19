//! The lftp driver: pending batch, execution and audit log.

use std::path::{Path, PathBuf};

use chrono::Utc;
use tracing::{debug, error};

use super::backend::TransferBackend;
use super::error::LftpError;
use super::script::{build_connection_preamble, render_script, CommandBatch};
use super::types::{
    CommandLogEntry, ConnectionCredentials, ExecuteOptions, ExecutionOutcome, MirrorOptions,
    PgetOptions,
};

/// Drives the external lftp client.
///
/// Commands accumulate in a pending [`CommandBatch`] until [`Lftp::execute`]
/// renders them behind a fresh connection preamble and hands the script to
/// the backend. The batch is cleared only when the execution succeeds; a
/// failed run leaves it intact for inspection.
pub struct Lftp<B: TransferBackend> {
    credentials: ConnectionCredentials,
    working_dir: PathBuf,
    backend: B,
    pending: CommandBatch,
    last_script: Option<String>,
    command_log: Vec<CommandLogEntry>,
}

impl<B: TransferBackend> Lftp<B> {
    /// Creates a driver for one remote host.
    pub fn new(credentials: ConnectionCredentials, working_dir: impl Into<PathBuf>, backend: B) -> Self {
        let working_dir = working_dir.into();
        Self {
            credentials,
            pending: CommandBatch::new(working_dir.clone()),
            working_dir,
            backend,
            last_script: None,
            command_log: Vec::new(),
        }
    }

    /// Current credentials.
    pub fn credentials(&self) -> &ConnectionCredentials {
        &self.credentials
    }

    /// Replaces the credentials; the next execute uses them.
    pub fn set_credentials(&mut self, credentials: ConnectionCredentials) {
        self.credentials = credentials;
    }

    /// Local directory transfers land in.
    pub fn working_dir(&self) -> &Path {
        &self.working_dir
    }

    /// The process backend.
    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// A new empty batch bound to this driver's working dir.
    pub fn new_batch(&self) -> CommandBatch {
        CommandBatch::new(self.working_dir.clone())
    }

    /// Commands waiting for the next execute.
    pub fn pending(&self) -> &CommandBatch {
        &self.pending
    }

    /// Removes and returns the pending batch, e.g. after a failure the
    /// caller chose to tolerate.
    pub fn take_pending(&mut self) -> CommandBatch {
        let fresh = self.new_batch();
        std::mem::replace(&mut self.pending, fresh)
    }

    /// Appends a prepared batch to the pending one.
    pub fn submit(&mut self, batch: CommandBatch) -> &mut Self {
        self.pending.extend(batch);
        self
    }

    /// Appends a global rate limit (bytes/sec, 0 = unlimited).
    pub fn set_speed_limit(&mut self, bytes_per_sec: u64) -> &mut Self {
        self.pending.set_speed_limit(bytes_per_sec);
        self
    }

    /// Appends the parallel transfer job limit.
    pub fn set_transfer_limit(&mut self, limit: u32) -> &mut Self {
        self.pending.set_transfer_limit(limit);
        self
    }

    /// Appends a directory listing.
    pub fn list_dir(&mut self, path: &str, machine_readable: bool) -> &mut Self {
        self.pending.list_dir(path, machine_readable);
        self
    }

    /// Appends a recursive directory copy.
    pub fn mirror_dir(&mut self, path: &str, options: MirrorOptions) -> &mut Self {
        self.pending.mirror_dir(path, options);
        self
    }

    /// Appends a single-file parallel fetch.
    pub fn pget_file(&mut self, path: &str, options: PgetOptions) -> &mut Self {
        self.pending.pget_file(path, options);
        self
    }

    /// Appends a raw command.
    pub fn add_command(&mut self, command: impl Into<String>) -> &mut Self {
        self.pending.add_command(command);
        self
    }

    /// Executes the pending batch.
    ///
    /// Detached runs return [`ExecutionOutcome::LaunchedUnconfirmed`] as soon
    /// as the client is launched; nothing confirms the transfers afterwards.
    /// A synchronous run with a nonzero exit logs the full client output and
    /// returns [`LftpError::ClientFailure`].
    pub async fn execute(&mut self, options: ExecuteOptions) -> Result<ExecutionOutcome, LftpError> {
        // credentials may have changed since the last call
        let preamble = build_connection_preamble(&self.credentials);

        let attach = options
            .attach_to_session
            .then(|| (self.backend.client(), options.session_id.as_deref()));
        let mut script = render_script(&preamble, self.pending.commands(), attach);

        if options.detach {
            script.push_str(" exit parent;");
        }

        debug!("Executing lftp commands: {}", self.redact(&script));
        self.last_script = Some(script.clone());

        let outcome = if options.detach {
            let pid = self.backend.run_background(&script).await?;
            debug!("lftp launched in the background with pid {}", pid);
            ExecutionOutcome::LaunchedUnconfirmed { pid }
        } else {
            let result = self.backend.run_foreground(&script).await?;
            if result.exit_code != 0 {
                if options.probe {
                    debug!("lftp probe exited with code {}: {}", result.exit_code, result.output);
                } else {
                    error!("{}", result.output);
                }
                return Err(LftpError::client_failure(result.exit_code, result.output));
            }
            ExecutionOutcome::Completed {
                output: result.output,
                exit_code: result.exit_code,
            }
        };

        self.command_log.push(CommandLogEntry {
            executed_at: Utc::now(),
            script,
            exit_code: outcome.exit_code(),
        });
        self.pending = self.new_batch();

        Ok(outcome)
    }

    /// Script text of the most recent execute attempt.
    pub fn last_command(&self) -> Option<&str> {
        self.last_script.as_deref()
    }

    /// Every successfully executed script, oldest first.
    pub fn command_log(&self) -> &[CommandLogEntry] {
        &self.command_log
    }

    /// The most recent successful execution.
    pub fn last_logged_command(&self) -> Option<&CommandLogEntry> {
        self.command_log.last()
    }

    fn redact(&self, script: &str) -> String {
        if self.credentials.password.is_empty() {
            return script.to_string();
        }
        script.replace(
            &format!("-u {},{} ", self.credentials.username, self.credentials.password),
            &format!("-u {},**** ", self.credentials.username),
        )
    }
}
