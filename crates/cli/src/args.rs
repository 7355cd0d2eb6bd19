//! Command line arguments.

use std::path::PathBuf;

use clap::{ArgAction, Parser};

use locomotive_core::Config;

/// Transfers new items from a remote host through lftp, then moves them into
/// place once finished.
#[derive(Parser, Debug)]
#[command(name = "loco")]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Remote host to transfer from
    pub host: String,

    /// Remote source directories, colon-delimited
    pub source: Option<String>,

    /// Local target directories, colon-delimited, one per source
    pub target: Option<String>,

    /// Public key file
    #[arg(long, value_name = "PATH")]
    pub public_keyfile: Option<PathBuf>,

    /// Private key file, used through ssh
    #[arg(long, value_name = "PATH")]
    pub private_keyfile: Option<PathBuf>,

    /// Login user
    #[arg(short, long)]
    pub username: Option<String>,

    /// Login password
    #[arg(short, long)]
    pub password: Option<String>,

    /// SSH port
    #[arg(short = 'o', long)]
    pub port: Option<u16>,

    /// Local directory transfers land in
    #[arg(short, long, value_name = "PATH")]
    pub working_dir: Option<PathBuf>,

    /// Global rate limit in bytes/sec (0 = unlimited)
    #[arg(short, long)]
    pub speed_limit: Option<u64>,

    /// Parallel connections per transfer
    #[arg(short, long)]
    pub connection_limit: Option<u32>,

    /// Parallel transfers
    #[arg(short, long)]
    pub transfer_limit: Option<u32>,

    /// Transfer attempts per item
    #[arg(short, long)]
    pub max_retries: Option<u32>,

    /// Configuration file (default: $LOCO_CONFIG, then ./locomotive.toml)
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// More output, repeatable
    #[arg(short, long, action = ArgAction::Count)]
    pub verbose: u8,

    /// No output
    #[arg(short, long, conflicts_with = "verbose")]
    pub quiet: bool,
}

impl Args {
    /// Overrides configuration values with the ones given on the command line.
    pub fn apply_to(&self, config: &mut Config) {
        if let Some(path) = &self.public_keyfile {
            config.connection.public_keyfile = Some(path.clone());
        }
        if let Some(path) = &self.private_keyfile {
            config.connection.private_keyfile = Some(path.clone());
        }
        if let Some(username) = &self.username {
            config.connection.username = username.clone();
        }
        if let Some(password) = &self.password {
            config.connection.password = password.clone();
        }
        if let Some(port) = self.port {
            config.connection.port = port;
        }
        if let Some(dir) = &self.working_dir {
            config.transfer.working_dir = dir.clone();
        }
        if let Some(limit) = self.speed_limit {
            config.transfer.speed_limit = limit;
        }
        if let Some(limit) = self.connection_limit {
            config.transfer.connection_limit = limit;
        }
        if let Some(limit) = self.transfer_limit {
            config.transfer.transfer_limit = limit;
        }
        if let Some(retries) = self.max_retries {
            config.transfer.max_retries = retries;
        }
    }

    /// Every given argument and option by long name, verbosity excluded.
    pub fn fingerprint_pairs(&self) -> Vec<(&'static str, String)> {
        let path = |p: &PathBuf| p.display().to_string();

        let mut pairs = vec![("host", self.host.clone())];
        let optional = [
            ("source", self.source.clone()),
            ("target", self.target.clone()),
            ("public-keyfile", self.public_keyfile.as_ref().map(path)),
            ("private-keyfile", self.private_keyfile.as_ref().map(path)),
            ("username", self.username.clone()),
            ("password", self.password.clone()),
            ("port", self.port.map(|v| v.to_string())),
            ("working-dir", self.working_dir.as_ref().map(path)),
            ("speed-limit", self.speed_limit.map(|v| v.to_string())),
            ("connection-limit", self.connection_limit.map(|v| v.to_string())),
            ("transfer-limit", self.transfer_limit.map(|v| v.to_string())),
            ("max-retries", self.max_retries.map(|v| v.to_string())),
            ("config", self.config.as_ref().map(path)),
        ];
        pairs.extend(
            optional
                .into_iter()
                .filter_map(|(name, value)| value.map(|v| (name, v))),
        );
        pairs
    }

    /// Log filter implied by `-q` / `-v`.
    pub fn log_filter(&self) -> &'static str {
        if self.quiet {
            return "off";
        }
        match self.verbose {
            0 => "warn",
            1 => "info",
            2 => "debug",
            _ => "trace",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Args {
        Args::try_parse_from(std::iter::once("loco").chain(args.iter().copied())).unwrap()
    }

    #[test]
    fn test_positional_arguments() {
        let args = parse(&["example.com", "/in/tv:/in/movies", "/media/tv"]);
        assert_eq!(args.host, "example.com");
        assert_eq!(args.source.as_deref(), Some("/in/tv:/in/movies"));
        assert_eq!(args.target.as_deref(), Some("/media/tv"));
    }

    #[test]
    fn test_short_options() {
        let args = parse(&[
            "example.com", "-u", "user", "-p", "pw", "-o", "2222", "-w", "/work", "-s", "1000",
            "-c", "10", "-t", "2", "-m", "4",
        ]);
        assert_eq!(args.username.as_deref(), Some("user"));
        assert_eq!(args.port, Some(2222));
        assert_eq!(args.working_dir, Some(PathBuf::from("/work")));
        assert_eq!(args.speed_limit, Some(1000));
        assert_eq!(args.connection_limit, Some(10));
        assert_eq!(args.transfer_limit, Some(2));
        assert_eq!(args.max_retries, Some(4));
    }

    #[test]
    fn test_cli_overrides_config() {
        let mut config = Config::default();
        config.connection.username = "from-file".to_string();
        config.transfer.transfer_limit = 9;

        parse(&["h", "-u", "from-cli"]).apply_to(&mut config);
        assert_eq!(config.connection.username, "from-cli");
        assert_eq!(config.transfer.transfer_limit, 9);
    }

    #[test]
    fn test_fingerprint_pairs_skip_verbosity() {
        let quiet = parse(&["h", "/in", "-u", "user", "-q"]);
        let loud = parse(&["-vvv", "h", "/in", "-u", "user"]);
        assert_eq!(quiet.fingerprint_pairs(), loud.fingerprint_pairs());
        assert_eq!(
            quiet.fingerprint_pairs(),
            vec![
                ("host", "h".to_string()),
                ("source", "/in".to_string()),
                ("username", "user".to_string()),
            ]
        );
    }

    #[test]
    fn test_log_filter() {
        assert_eq!(parse(&["h"]).log_filter(), "warn");
        assert_eq!(parse(&["h", "-v"]).log_filter(), "info");
        assert_eq!(parse(&["h", "-vv"]).log_filter(), "debug");
        assert_eq!(parse(&["h", "-vvv"]).log_filter(), "trace");
        assert_eq!(parse(&["h", "-q"]).log_filter(), "off");
    }

    #[test]
    fn test_quiet_conflicts_with_verbose() {
        assert!(Args::try_parse_from(["loco", "h", "-q", "-v"]).is_err());
    }
}
