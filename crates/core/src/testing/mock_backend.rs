//! Mock transfer backend for testing.

use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard};

use crate::lftp::{ForegroundOutput, LftpError, TransferBackend};

/// A canned answer for scripts containing `pattern`.
#[derive(Debug, Clone)]
struct ScriptRule {
    pattern: String,
    output: String,
    exit_code: i32,
}

#[derive(Debug, Default)]
struct BackendState {
    rules: Vec<ScriptRule>,
    queued: VecDeque<ForegroundOutput>,
    foreground: Vec<String>,
    background: Vec<String>,
    next_pid: u32,
    launch_error: Option<String>,
}

/// Mock implementation of the TransferBackend trait.
///
/// Never spawns a process. Foreground scripts are answered by the first
/// matching rule, then by queued responses in order, then with empty output
/// and exit code 0. Every script is recorded for assertions.
///
/// # Example
///
/// ```rust,ignore
/// let backend = MockBackend::new();
/// backend.on_script("jobs -v", "", 1);
/// backend.on_script("cls", "4096 Show S01/\n", 0);
///
/// // ... run the pipeline ...
///
/// assert_eq!(backend.background_scripts().len(), 1);
/// ```
#[derive(Debug, Clone)]
pub struct MockBackend {
    state: Arc<Mutex<BackendState>>,
}

impl Default for MockBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl MockBackend {
    /// Create a new mock backend.
    pub fn new() -> Self {
        Self {
            state: Arc::new(Mutex::new(BackendState {
                next_pid: 1000,
                ..Default::default()
            })),
        }
    }

    fn state(&self) -> MutexGuard<'_, BackendState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Answers every foreground script containing `pattern`.
    pub fn on_script(&self, pattern: impl Into<String>, output: impl Into<String>, exit_code: i32) {
        self.state().rules.push(ScriptRule {
            pattern: pattern.into(),
            output: output.into(),
            exit_code,
        });
    }

    /// Queues a one-shot answer for the next unmatched foreground script.
    pub fn push_foreground(&self, output: impl Into<String>, exit_code: i32) {
        self.state().queued.push_back(ForegroundOutput {
            output: output.into(),
            exit_code,
        });
    }

    /// Pid reported by the next background launch.
    pub fn set_next_pid(&self, pid: u32) {
        self.state().next_pid = pid;
    }

    /// Makes background launches fail.
    pub fn fail_launches(&self, reason: impl Into<String>) {
        self.state().launch_error = Some(reason.into());
    }

    /// Foreground scripts, oldest first.
    pub fn foreground_scripts(&self) -> Vec<String> {
        self.state().foreground.clone()
    }

    /// Background scripts, oldest first.
    pub fn background_scripts(&self) -> Vec<String> {
        self.state().background.clone()
    }
}

#[async_trait]
impl TransferBackend for MockBackend {
    fn name(&self) -> &str {
        "mock"
    }

    fn client(&self) -> &str {
        "lftp"
    }

    async fn run_foreground(&self, script: &str) -> Result<ForegroundOutput, LftpError> {
        let mut state = self.state();
        state.foreground.push(script.to_string());

        if let Some(rule) = state.rules.iter().find(|r| script.contains(&r.pattern)) {
            return Ok(ForegroundOutput {
                output: rule.output.clone(),
                exit_code: rule.exit_code,
            });
        }

        Ok(state.queued.pop_front().unwrap_or(ForegroundOutput {
            output: String::new(),
            exit_code: 0,
        }))
    }

    async fn run_background(&self, script: &str) -> Result<u32, LftpError> {
        let mut state = self.state();
        if let Some(reason) = state.launch_error.clone() {
            return Err(LftpError::LaunchFailed { reason });
        }
        state.background.push(script.to_string());
        let pid = state.next_pid;
        state.next_pid += 1;
        Ok(pid)
    }
}
