//! Testing utilities and mock implementations.
//!
//! The mocks record every call and never touch the network or spawn
//! processes, so a whole run can be exercised with an in-memory catalog
//! and temporary directories.
//!
//! # Example
//!
//! ```rust,ignore
//! use locomotive_core::testing::{fixtures, MockBackend, MockNotifier};
//!
//! let backend = MockBackend::new();
//! backend.on_script("jobs -v", "", 1);
//! backend.on_script("cls", fixtures::listing(&[("Show S01", 4096, true)]), 0);
//! ```

mod mock_backend;
mod mock_notifier;
mod mock_placer;

pub use mock_backend::MockBackend;
pub use mock_notifier::MockNotifier;
pub use mock_placer::MockPlacer;

/// Test fixtures and helper functions.
pub mod fixtures {
    use crate::lftp::ConnectionCredentials;
    use crate::listing::{EntryKind, RemoteEntry};

    /// Password credentials for `example.com:22`.
    pub fn credentials() -> ConnectionCredentials {
        ConnectionCredentials::new("example.com", 22, "user", "secret")
    }

    /// Renders `(name, size, is_dir)` tuples the way a machine-readable
    /// listing prints them.
    pub fn listing(entries: &[(&str, u64, bool)]) -> String {
        entries
            .iter()
            .map(|(name, size, is_dir)| {
                format!("{:>12} {}{}\n", size, name, if *is_dir { "/" } else { "" })
            })
            .collect()
    }

    /// A remote file entry.
    pub fn file_entry(name: &str, size_bytes: u64) -> RemoteEntry {
        RemoteEntry {
            name: name.to_string(),
            kind: EntryKind::File,
            size_bytes,
        }
    }

    /// A remote directory entry.
    pub fn dir_entry(name: &str) -> RemoteEntry {
        RemoteEntry {
            name: name.to_string(),
            kind: EntryKind::Directory,
            size_bytes: 4096,
        }
    }

    /// A `jobs -v` answer with `active` running mirrors and `queued`
    /// waiting pgets, all targeting `working_dir`.
    pub fn jobs_output(active: &[&str], queued: &[&str], working_dir: &str) -> String {
        let mut out = String::from("[0] queue (sftp://user@example.com)\n");
        for (i, path) in active.iter().enumerate() {
            let lead = if i == 0 { "Now executing: " } else { "-" };
            out.push_str(&format!(
                "\t{}[{}] mirror -c {} {}\n",
                lead,
                i + 1,
                path,
                working_dir
            ));
        }
        if !queued.is_empty() {
            out.push_str("\tCommands queued:\n");
            for (i, path) in queued.iter().enumerate() {
                out.push_str(&format!("\t {}. pget -c {} -o {}\n", i + 1, path, working_dir));
            }
        }
        out
    }
}
