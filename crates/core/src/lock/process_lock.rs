//! Lock file guarding one job definition across processes.

use std::fs::{self, File, OpenOptions};
use std::path::{Path, PathBuf};

use fs2::FileExt;
use thiserror::Error;
use tracing::debug;

use super::fingerprint::InvocationFingerprint;

/// Errors from locking operations.
#[derive(Debug, Error)]
pub enum LockError {
    /// Failed to create the lock directory or open the lock file.
    #[error("failed to create lock: {0}")]
    CreateFailed(String),

    /// The OS refused the lock for a reason other than contention.
    #[error("failed to acquire lock: {0}")]
    AcquireFailed(String),

    /// Failed to release the lock.
    #[error("failed to release lock: {0}")]
    ReleaseFailed(String),
}

/// Result of a lock attempt.
#[derive(Debug)]
pub enum LockAttempt {
    /// The lock is ours until the guard is dropped.
    Held(ProcessLock),
    /// Another process runs the same job definition.
    Busy,
}

impl LockAttempt {
    /// Whether the attempt acquired the lock.
    pub fn is_held(&self) -> bool {
        matches!(self, LockAttempt::Held(_))
    }
}

/// Exclusive lock keyed by an [`InvocationFingerprint`].
///
/// The lock is released when the guard is dropped, so every exit path of
/// the owning scope (success, `?` propagation, panic unwinding) gives it up.
#[derive(Debug)]
pub struct ProcessLock {
    path: PathBuf,
    file: Option<File>,
}

impl ProcessLock {
    /// Attempts a non-blocking exclusive acquisition.
    ///
    /// The lock file is `<dir>/locomotive-<fingerprint>.lock`; `dir` is
    /// created if missing.
    pub fn acquire(dir: &Path, fingerprint: &InvocationFingerprint) -> Result<LockAttempt, LockError> {
        fs::create_dir_all(dir).map_err(|e| {
            LockError::CreateFailed(format!("cannot create {}: {}", dir.display(), e))
        })?;

        let path = dir.join(fingerprint.lock_file_name());

        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(&path)
            .map_err(|e| {
                LockError::CreateFailed(format!("cannot open {}: {}", path.display(), e))
            })?;

        match file.try_lock_exclusive() {
            Ok(()) => {
                debug!("Acquired process lock {}", path.display());
                Ok(LockAttempt::Held(Self {
                    path,
                    file: Some(file),
                }))
            }
            Err(e) if e.kind() == std::io::ErrorKind::WouldBlock => Ok(LockAttempt::Busy),
            Err(e) if e.raw_os_error() == fs2::lock_contended_error().raw_os_error() => {
                Ok(LockAttempt::Busy)
            }
            Err(e) => Err(LockError::AcquireFailed(e.to_string())),
        }
    }

    /// Whether this guard still holds the lock.
    pub fn is_held(&self) -> bool {
        self.file.is_some()
    }

    /// Path of the lock file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Releases the lock early. Calling it again is a no-op.
    pub fn release(&mut self) -> Result<(), LockError> {
        if let Some(file) = self.file.take() {
            file.unlock()
                .map_err(|e| LockError::ReleaseFailed(e.to_string()))?;
            debug!("Released process lock {}", self.path.display());
        }
        Ok(())
    }
}

impl Drop for ProcessLock {
    fn drop(&mut self) {
        if let Some(file) = self.file.take() {
            let _ = file.unlock();
        }
    }
}
