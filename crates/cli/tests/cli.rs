//! End-to-end tests spawning the `loco` binary.
//!
//! A shell script stands in for lftp so no remote host is needed.

use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};

use tempfile::TempDir;

use locomotive_core::lock::{InvocationFingerprint, LockAttempt, ProcessLock};

struct Sandbox {
    dir: TempDir,
}

impl Sandbox {
    fn new() -> Self {
        Self {
            dir: TempDir::new().expect("Failed to create sandbox"),
        }
    }

    fn path(&self, name: &str) -> PathBuf {
        self.dir.path().join(name)
    }

    /// Writes a fake lftp that prints `output` and exits with `code`.
    #[cfg(unix)]
    fn fake_lftp(&self, output: &str, code: i32) -> PathBuf {
        use std::os::unix::fs::PermissionsExt;

        let path = self.path("fake-lftp");
        fs::write(&path, format!("#!/bin/sh\necho '{}'\nexit {}\n", output, code)).unwrap();
        fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).unwrap();
        path
    }

    fn config(&self, lftp: &Path) -> PathBuf {
        let path = self.path("locomotive.toml");
        let content = format!(
            r#"
[lftp]
path = "{lftp}"

[connection]
username = "user"
password = "secret"

[transfer]
working_dir = "{work}"

[database]
path = "{db}"

[lock]
dir = "{locks}"
"#,
            lftp = lftp.display(),
            work = self.path("work").display(),
            db = self.path("locomotive.db").display(),
            locks = self.path("locks").display(),
        );
        fs::write(&path, content).unwrap();
        path
    }
}

fn loco_command(args: &[&str]) -> Command {
    let mut command = Command::new(env!("CARGO_BIN_EXE_loco"));
    command.args(args).env_remove("LOCO_CONFIG");
    command
}

fn loco(args: &[&str]) -> Output {
    loco_command(args)
        .env("LOCO_LOG", "info")
        .output()
        .expect("Failed to spawn loco")
}

fn stderr(output: &Output) -> String {
    String::from_utf8_lossy(&output.stderr).into_owned()
}

#[test]
fn test_help_lists_options() {
    let output = loco(&["--help"]);
    assert!(output.status.success());

    let help = String::from_utf8_lossy(&output.stdout);
    for option in ["--username", "--transfer-limit", "--private-keyfile", "--config"] {
        assert!(help.contains(option), "help is missing {}", option);
    }
}

#[test]
fn test_missing_explicit_config_fails() {
    let output = loco(&["example.com", "/in", "--config", "/nonexistent/locomotive.toml"]);
    assert_eq!(output.status.code(), Some(1));
    assert!(stderr(&output).contains("Failed to load config"));
}

#[test]
fn test_missing_username_fails_validation() {
    let sandbox = Sandbox::new();
    let config = sandbox.path("empty.toml");
    fs::write(&config, "").unwrap();

    let output = loco(&["example.com", "/in", "--config", config.to_str().unwrap()]);
    assert_eq!(output.status.code(), Some(1));
    assert!(stderr(&output).contains("username"));
}

#[cfg(unix)]
#[test]
fn test_busy_lock_exits_cleanly() {
    let sandbox = Sandbox::new();
    let config = sandbox.config(&sandbox.fake_lftp("should not run", 1));
    let config_arg = config.to_str().unwrap();

    let fingerprint = InvocationFingerprint::from_pairs([
        ("host", "example.com"),
        ("source", "/in"),
        ("config", config_arg),
    ]);
    let held = ProcessLock::acquire(&sandbox.path("locks"), &fingerprint).unwrap();
    assert!(matches!(held, LockAttempt::Held(_)));

    // argument order differs from the holder's
    let output = loco(&["--config", config_arg, "example.com", "/in"]);
    assert_eq!(output.status.code(), Some(0));
    assert!(stderr(&output).contains("already running"));
    assert!(!sandbox.path("locomotive.db").exists());
}

#[cfg(unix)]
#[test]
fn test_busy_lock_message_shown_with_single_verbose() {
    let sandbox = Sandbox::new();
    let config = sandbox.config(&sandbox.fake_lftp("should not run", 1));
    let config_arg = config.to_str().unwrap();

    let fingerprint = InvocationFingerprint::from_pairs([
        ("host", "example.com"),
        ("config", config_arg),
    ]);
    let _held = ProcessLock::acquire(&sandbox.path("locks"), &fingerprint).unwrap();

    let output = loco_command(&["example.com", "--config", config_arg, "-v"])
        .env_remove("LOCO_LOG")
        .output()
        .expect("Failed to spawn loco");
    assert_eq!(output.status.code(), Some(0));
    assert!(stderr(&output).contains("already running"));
}

#[cfg(unix)]
#[test]
fn test_client_failure_exits_with_output() {
    let sandbox = Sandbox::new();
    let config = sandbox.config(&sandbox.fake_lftp("cls: Access failed: No such file", 1));

    let output = loco(&["example.com", "/in", "--config", config.to_str().unwrap()]);
    assert_eq!(output.status.code(), Some(1));

    let log = stderr(&output);
    assert!(log.contains("Access failed: No such file"));
    assert!(log.contains("initiate_transfers"));
}

#[cfg(unix)]
#[test]
fn test_empty_source_run_succeeds() {
    let sandbox = Sandbox::new();
    let config = sandbox.config(&sandbox.fake_lftp("", 0));

    let output = loco(&[
        "example.com",
        "/in",
        "--config",
        config.to_str().unwrap(),
        "-t",
        "2",
    ]);
    assert!(output.status.success(), "stderr: {}", stderr(&output));

    let log = stderr(&output);
    assert!(log.contains("Locomotive did not start any new transfers."));
    assert!(log.contains("Locomotive did not move any transferred items."));
    assert!(sandbox.path("locomotive.db").exists());
}
