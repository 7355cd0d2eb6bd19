//! Single-instance locking for scheduled runs.
//!
//! Every run computes an [`InvocationFingerprint`] from its effective
//! arguments and options. The fingerprint names a lock file; holding an
//! OS-level exclusive lock on that file means "this job definition is
//! running". A second run with the same fingerprint observes
//! [`LockAttempt::Busy`] and must exit successfully without doing anything,
//! while runs with different fingerprints never contend.
//!
//! # Example
//!
//! ```ignore
//! use locomotive_core::lock::{InvocationFingerprint, LockAttempt, ProcessLock};
//!
//! let fingerprint = InvocationFingerprint::from_pairs([("host", "example.com")]);
//! match ProcessLock::acquire(&lock_dir, &fingerprint)? {
//!     LockAttempt::Held(lock) => { /* run; lock released on drop */ }
//!     LockAttempt::Busy => { /* another instance owns this job */ }
//! }
//! ```

mod fingerprint;
mod process_lock;

pub use fingerprint::InvocationFingerprint;
pub use process_lock::{LockAttempt, LockError, ProcessLock};
