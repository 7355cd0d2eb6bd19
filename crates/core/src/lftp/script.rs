//! Command batches and script rendering.
//!
//! A script is one line of semicolon-terminated lftp commands, always led by
//! exactly one connection preamble:
//!
//! ```text
//! [set sftp:connect-program "ssh -a -x -i <key>"; ]connect -p <port> -u <user>,<password> sftp://<host>; <cmd1>; <cmd2>;
//! ```

use std::path::{Path, PathBuf};

use tracing::info;

use super::escape::escape_path;
use super::types::{ConnectionCredentials, MirrorOptions, PgetOptions};

/// Builds the connection preamble for a set of credentials.
///
/// With a private key file the preamble first points sftp at an `ssh`
/// connect program using that key, then issues the same `connect` used for
/// password negotiation.
pub fn build_connection_preamble(credentials: &ConnectionCredentials) -> String {
    let connect = format!(
        "connect -p {} -u {},{} sftp://{}",
        credentials.port, credentials.username, credentials.password, credentials.host
    );

    match &credentials.private_keyfile {
        Some(key) => format!(
            "set sftp:connect-program \"ssh -a -x -i {}\"; {}",
            key.display(),
            connect
        ),
        None => connect,
    }
}

/// Renders the full script text.
///
/// When `attach` is set, the commands are echoed into
/// `<client> -c attach [session]` so a backgrounded session executes them.
pub fn render_script<'a>(
    preamble: &str,
    commands: impl IntoIterator<Item = &'a str>,
    attach: Option<(&str, Option<&str>)>,
) -> String {
    let mut script = format!("{}; ", preamble);

    if attach.is_some() {
        script.push_str("echo \"");
    }

    for command in commands {
        script.push_str(command);
        script.push_str("; ");
    }
    let mut script = script.trim_end().to_string();

    if let Some((client, session_id)) = attach {
        script.push_str("\" | ");
        script.push_str(client);
        script.push_str(" -c attach");
        if let Some(id) = session_id {
            script.push(' ');
            script.push_str(id);
        }
    }

    script
}

/// An ordered, append-only batch of lftp commands.
///
/// Global settings (`set ...`) are kept ahead of every other command so the
/// client applies them before any transfer in the same script, whatever
/// order the builder calls were made in.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandBatch {
    working_dir: PathBuf,
    settings: Vec<String>,
    commands: Vec<String>,
}

impl CommandBatch {
    /// Creates an empty batch whose transfers land in `working_dir`.
    pub fn new(working_dir: impl Into<PathBuf>) -> Self {
        Self {
            working_dir: working_dir.into(),
            settings: Vec::new(),
            commands: Vec::new(),
        }
    }

    /// Local directory transfers are written to.
    pub fn working_dir(&self) -> &Path {
        &self.working_dir
    }

    /// Sets the global rate limit in bytes per second (0 = unlimited).
    pub fn set_speed_limit(&mut self, bytes_per_sec: u64) -> &mut Self {
        self.settings
            .push(format!("set net:limit-total-rate {}", bytes_per_sec));
        info!("Speed limit set to {} Bps.", bytes_per_sec);
        self
    }

    /// Sets how many queued jobs the client runs in parallel.
    pub fn set_transfer_limit(&mut self, limit: u32) -> &mut Self {
        self.settings.push(format!("set cmd:queue-parallel {}", limit));
        info!("Parallel transfer limit set to {} item(s).", limit);
        self
    }

    /// Lists a remote directory.
    ///
    /// The machine-readable form prints one entry per line as
    /// `<size in bytes> <basename>`, with a trailing `/` on directories.
    pub fn list_dir(&mut self, path: &str, machine_readable: bool) -> &mut Self {
        let command = if machine_readable {
            format!("cls -1 -B -F -s --block-size=1 {}", escape_path(path))
        } else {
            format!("ls {}", escape_path(path))
        };
        self.commands.push(command);
        self
    }

    /// Recursively copies a remote directory into the working dir.
    pub fn mirror_dir(&mut self, path: &str, options: MirrorOptions) -> &mut Self {
        let mut command = String::from("mirror -c");
        if let Some(n) = options.pget_connections {
            command.push_str(&format!(" --use-pget-n={}", n));
        }
        if let Some(n) = options.parallel_files {
            command.push_str(&format!(" --parallel={}", n));
        }
        command.push_str(&format!(
            " {} {}",
            escape_path(path),
            escape_path(&self.working_dir.to_string_lossy())
        ));
        self.push_transfer(command, options.enqueue)
    }

    /// Fetches a single remote file with resumable parallel chunks.
    pub fn pget_file(&mut self, path: &str, options: PgetOptions) -> &mut Self {
        let mut command = String::from("pget -c");
        if let Some(n) = options.connections {
            command.push_str(&format!(" -n {}", n));
        }
        command.push_str(&format!(
            " {} -o {}",
            escape_path(path),
            escape_path(&self.working_dir.to_string_lossy())
        ));
        self.push_transfer(command, options.enqueue)
    }

    /// Removes a remote file, or a directory tree when `recursive`.
    pub fn remove_path(&mut self, path: &str, recursive: bool) -> &mut Self {
        let command = if recursive {
            format!("rm -r {}", escape_path(path))
        } else {
            format!("rm {}", escape_path(path))
        };
        self.commands.push(command);
        self
    }

    /// Appends a raw command. The caller is responsible for its escaping.
    pub fn add_command(&mut self, command: impl Into<String>) -> &mut Self {
        self.commands.push(command.into());
        self
    }

    /// Appends every command of `other`, keeping settings first.
    pub fn extend(&mut self, other: CommandBatch) -> &mut Self {
        self.settings.extend(other.settings);
        self.commands.extend(other.commands);
        self
    }

    /// Commands in execution order.
    pub fn commands(&self) -> impl Iterator<Item = &str> {
        self.settings
            .iter()
            .chain(self.commands.iter())
            .map(String::as_str)
    }

    /// Number of commands.
    pub fn len(&self) -> usize {
        self.settings.len() + self.commands.len()
    }

    /// Whether the batch holds no commands.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn push_transfer(&mut self, command: String, enqueue: bool) -> &mut Self {
        if enqueue {
            self.commands.push(format!("queue {}", command));
        } else {
            self.commands.push(command);
        }
        self
    }
}
