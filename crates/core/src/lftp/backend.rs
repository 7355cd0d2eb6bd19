//! Process backends that hand a rendered script to the transfer client.

use std::borrow::Cow;
use std::path::PathBuf;
use std::process::Stdio;

use async_trait::async_trait;
use shell_escape::unix::escape;
use tokio::process::Command;

use super::error::LftpError;
use super::types::ForegroundOutput;

/// Capability interface over the external transfer client.
///
/// The driver only knows these two ways of running a script, so another
/// backend can be substituted without touching the pipeline sequencing.
#[async_trait]
pub trait TransferBackend: Send + Sync {
    /// Returns the name of this backend implementation.
    fn name(&self) -> &str;

    /// Path or name of the client binary, used inside attach scripts.
    fn client(&self) -> &str;

    /// Runs a script to completion, capturing combined output and exit code.
    async fn run_foreground(&self, script: &str) -> Result<ForegroundOutput, LftpError>;

    /// Launches a script in the background and returns its process id.
    async fn run_background(&self, script: &str) -> Result<u32, LftpError>;
}

/// Runs lftp through `sh -c`, using the client's documented framing:
///
/// - foreground: `<client> -c '<script>' 2>&1`
/// - background: `<client> -c '<script>' > /dev/null 2>&1 & echo $!`
#[derive(Debug, Clone)]
pub struct ShellBackend {
    client: String,
    shell: PathBuf,
}

impl ShellBackend {
    /// Creates a backend invoking the given client binary.
    pub fn new(client: impl Into<String>) -> Self {
        Self {
            client: client.into(),
            shell: PathBuf::from("/bin/sh"),
        }
    }

    /// Overrides the shell used to run the command line.
    pub fn with_shell(mut self, shell: impl Into<PathBuf>) -> Self {
        self.shell = shell.into();
        self
    }

    /// Command line for a synchronous run.
    pub fn foreground_command_line(&self, script: &str) -> String {
        format!(
            "{} -c {} 2>&1",
            quote(&self.client),
            quote(script)
        )
    }

    /// Command line for a detached run.
    pub fn background_command_line(&self, script: &str) -> String {
        format!(
            "{} -c {} > /dev/null 2>&1 & echo $!",
            quote(&self.client),
            quote(script)
        )
    }

    async fn run_shell(&self, command_line: &str) -> Result<std::process::Output, LftpError> {
        Command::new(&self.shell)
            .arg("-c")
            .arg(command_line)
            .stdin(Stdio::null())
            .output()
            .await
            .map_err(|e| {
                if e.kind() == std::io::ErrorKind::NotFound {
                    LftpError::ClientNotFound {
                        path: self.shell.clone(),
                    }
                } else {
                    LftpError::Io(e)
                }
            })
    }
}

impl Default for ShellBackend {
    fn default() -> Self {
        Self::new("lftp")
    }
}

/// Quotes one word for `sh`. Words made of safe characters pass through.
fn quote(word: &str) -> Cow<'_, str> {
    escape(Cow::Borrowed(word))
}

#[async_trait]
impl TransferBackend for ShellBackend {
    fn name(&self) -> &str {
        "shell"
    }

    fn client(&self) -> &str {
        &self.client
    }

    async fn run_foreground(&self, script: &str) -> Result<ForegroundOutput, LftpError> {
        let output = self.run_shell(&self.foreground_command_line(script)).await?;
        let exit_code = output.status.code().unwrap_or(-1);

        // 127 is the shell's "command not found"
        if exit_code == 127 && !self.client.is_empty() {
            let text = String::from_utf8_lossy(&output.stdout);
            if text.contains("not found") {
                return Err(LftpError::ClientNotFound {
                    path: PathBuf::from(&self.client),
                });
            }
        }

        Ok(ForegroundOutput {
            output: String::from_utf8_lossy(&output.stdout).trim_end().to_string(),
            exit_code,
        })
    }

    async fn run_background(&self, script: &str) -> Result<u32, LftpError> {
        let output = self.run_shell(&self.background_command_line(script)).await?;
        let stdout = String::from_utf8_lossy(&output.stdout);

        stdout
            .lines()
            .last()
            .and_then(|line| line.trim().parse::<u32>().ok())
            .ok_or_else(|| LftpError::LaunchFailed {
                reason: format!("no process id in shell output: {:?}", stdout.trim()),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_foreground_framing() {
        let backend = ShellBackend::new("lftp");
        assert_eq!(
            backend.foreground_command_line("connect -p 22 -u u,p sftp://h; jobs -v;"),
            "lftp -c 'connect -p 22 -u u,p sftp://h; jobs -v;' 2>&1"
        );
    }

    #[test]
    fn test_background_framing() {
        let backend = ShellBackend::new("/usr/bin/lftp");
        assert_eq!(
            backend.background_command_line("connect -p 22 -u u,p sftp://h; exit parent;"),
            "/usr/bin/lftp -c 'connect -p 22 -u u,p sftp://h; exit parent;' > /dev/null 2>&1 & echo $!"
        );
    }

    #[test]
    fn test_single_quotes_in_script_are_escaped() {
        let backend = ShellBackend::new("lftp");
        assert_eq!(
            backend.foreground_command_line("mirror -c it\\'s /w;"),
            "lftp -c 'mirror -c it\\'\\''s /w;' 2>&1"
        );
    }

    #[test]
    fn test_client_path_quoted_only_when_needed() {
        assert_eq!(quote("/usr/bin/lftp"), "/usr/bin/lftp");
        assert_eq!(quote("/opt/my tools/lftp"), "'/opt/my tools/lftp'");
        assert_eq!(quote(""), "''");

        let backend = ShellBackend::new("/opt/my tools/lftp");
        assert!(backend
            .foreground_command_line("jobs -v;")
            .starts_with("'/opt/my tools/lftp' -c 'jobs -v;'"));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_quoted_script_reaches_client_verbatim() {
        // `sh` stands in for lftp and prints the script text it was given
        let backend = ShellBackend::new("sh");
        let out = backend
            .run_foreground("printf '%s' \"it's a \\$HOME! (x)\"")
            .await
            .unwrap();
        assert_eq!(out.exit_code, 0);
        assert_eq!(out.output, "it's a $HOME! (x)");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_foreground_captures_output_and_exit_code() {
        // `sh` stands in for lftp: `sh -c '<script>'` runs the script
        let backend = ShellBackend::new("sh");

        let ok = backend.run_foreground("echo hello; echo oops >&2").await.unwrap();
        assert_eq!(ok.exit_code, 0);
        assert!(ok.output.contains("hello"));
        assert!(ok.output.contains("oops"));

        let failed = backend.run_foreground("echo broken; exit 3").await.unwrap();
        assert_eq!(failed.exit_code, 3);
        assert_eq!(failed.output, "broken");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_background_returns_pid() {
        let backend = ShellBackend::new("sh");
        let pid = backend.run_background("true").await.unwrap();
        assert!(pid > 0);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_missing_shell() {
        let backend = ShellBackend::new("lftp").with_shell("/nonexistent/sh");
        let err = backend.run_foreground("true").await.unwrap_err();
        assert!(matches!(err, LftpError::ClientNotFound { .. }));
    }
}
