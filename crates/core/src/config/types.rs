use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::path::PathBuf;

use crate::notify::EventKind;
use crate::orchestrator::ConcurrencyLimits;

/// Root configuration
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub lftp: LftpConfig,
    #[serde(default)]
    pub connection: ConnectionConfig,
    #[serde(default)]
    pub transfer: TransferConfig,
    #[serde(default)]
    pub remove_sources: RemoveSourcesConfig,
    /// Remote source directory -> local target directory
    #[serde(default)]
    pub source_target_map: BTreeMap<String, PathBuf>,
    #[serde(default)]
    pub notifications: NotificationsConfig,
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub lock: LockConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Transfer client configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LftpConfig {
    /// Path or name of the lftp binary
    #[serde(default = "default_lftp_path")]
    pub path: String,
}

impl Default for LftpConfig {
    fn default() -> Self {
        Self {
            path: default_lftp_path(),
        }
    }
}

fn default_lftp_path() -> String {
    "lftp".to_string()
}

/// Remote connection configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ConnectionConfig {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default)]
    pub private_keyfile: Option<PathBuf>,
    #[serde(default)]
    pub public_keyfile: Option<PathBuf>,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            username: String::new(),
            password: String::new(),
            port: default_port(),
            private_keyfile: None,
            public_keyfile: None,
        }
    }
}

fn default_port() -> u16 {
    22
}

/// Transfer policy
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TransferConfig {
    /// Where items are downloaded before being moved
    #[serde(default = "default_working_dir")]
    pub working_dir: PathBuf,
    /// Global rate limit in bytes/sec (0 = unlimited)
    #[serde(default)]
    pub speed_limit: u64,
    /// Parallel connections per transfer
    #[serde(default = "default_connection_limit")]
    pub connection_limit: u32,
    /// Parallel active transfer jobs
    #[serde(default = "default_transfer_limit")]
    pub transfer_limit: u32,
    /// Transfer attempts per item before giving up
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    /// "HH:MM" -> bytes/sec
    #[serde(default)]
    pub speed_schedule: HashMap<String, u64>,
}

impl Default for TransferConfig {
    fn default() -> Self {
        Self {
            working_dir: default_working_dir(),
            speed_limit: 0,
            connection_limit: default_connection_limit(),
            transfer_limit: default_transfer_limit(),
            max_retries: default_max_retries(),
            speed_schedule: HashMap::new(),
        }
    }
}

impl TransferConfig {
    pub fn limits(&self) -> ConcurrencyLimits {
        ConcurrencyLimits {
            speed_limit: self.speed_limit,
            connection_limit: self.connection_limit,
            transfer_limit: self.transfer_limit,
            max_retries: self.max_retries,
        }
    }
}

fn default_working_dir() -> PathBuf {
    std::env::temp_dir().join("locomotive")
}

fn default_connection_limit() -> u32 {
    25
}

fn default_transfer_limit() -> u32 {
    3
}

fn default_max_retries() -> u32 {
    5
}

/// Remote source cleanup after a finished transfer
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct RemoveSourcesConfig {
    #[serde(default)]
    pub remove: bool,
    /// Regexes matched against item names; matches are never removed
    #[serde(default)]
    pub exclude: Vec<String>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct NotificationsConfig {
    #[serde(default)]
    pub prowl: ProwlConfig,
}

/// Prowl push notification configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ProwlConfig {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default)]
    pub api_key: Option<String>,
    /// Events to push (default: all)
    #[serde(default = "default_prowl_events")]
    pub events: Vec<EventKind>,
    #[serde(default = "default_prowl_url")]
    pub api_url: String,
    #[serde(default = "default_application")]
    pub application: String,
    /// Request timeout in seconds (default: 10)
    #[serde(default = "default_timeout")]
    pub timeout_secs: u32,
}

impl Default for ProwlConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            api_key: None,
            events: default_prowl_events(),
            api_url: default_prowl_url(),
            application: default_application(),
            timeout_secs: default_timeout(),
        }
    }
}

fn default_prowl_events() -> Vec<EventKind> {
    vec![EventKind::TransferStarted, EventKind::ItemMoved]
}

fn default_prowl_url() -> String {
    "https://api.prowlapp.com/publicapi/add".to_string()
}

fn default_application() -> String {
    "Locomotive".to_string()
}

fn default_timeout() -> u32 {
    10
}

/// Database configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DatabaseConfig {
    #[serde(default = "default_db_path")]
    pub path: PathBuf,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_db_path(),
        }
    }
}

fn default_db_path() -> PathBuf {
    PathBuf::from("locomotive.db")
}

/// Process lock configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LockConfig {
    #[serde(default = "default_lock_dir")]
    pub dir: PathBuf,
}

impl Default for LockConfig {
    fn default() -> Self {
        Self {
            dir: default_lock_dir(),
        }
    }
}

fn default_lock_dir() -> PathBuf {
    std::env::temp_dir().join("locomotive-locks")
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct LoggingConfig {
    #[serde(default)]
    pub format: LogFormat,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// Sanitized config for logging (secrets redacted)
#[derive(Debug, Clone, Serialize)]
pub struct SanitizedConfig {
    pub lftp: LftpConfig,
    pub connection: SanitizedConnectionConfig,
    pub transfer: TransferConfig,
    pub remove_sources: RemoveSourcesConfig,
    pub source_target_map: BTreeMap<String, PathBuf>,
    pub notifications: SanitizedNotificationsConfig,
    pub database: DatabaseConfig,
    pub lock: LockConfig,
    pub logging: LoggingConfig,
}

/// Connection config with the password hidden
#[derive(Debug, Clone, Serialize)]
pub struct SanitizedConnectionConfig {
    pub username: String,
    pub password_configured: bool,
    pub port: u16,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub private_keyfile: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub public_keyfile: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SanitizedNotificationsConfig {
    pub prowl: SanitizedProwlConfig,
}

/// Prowl config with the API key hidden
#[derive(Debug, Clone, Serialize)]
pub struct SanitizedProwlConfig {
    pub enabled: bool,
    pub api_key_configured: bool,
    pub events: Vec<EventKind>,
}

impl From<&Config> for SanitizedConfig {
    fn from(config: &Config) -> Self {
        Self {
            lftp: config.lftp.clone(),
            connection: SanitizedConnectionConfig {
                username: config.connection.username.clone(),
                password_configured: !config.connection.password.is_empty(),
                port: config.connection.port,
                private_keyfile: config.connection.private_keyfile.clone(),
                public_keyfile: config.connection.public_keyfile.clone(),
            },
            transfer: config.transfer.clone(),
            remove_sources: config.remove_sources.clone(),
            source_target_map: config.source_target_map.clone(),
            notifications: SanitizedNotificationsConfig {
                prowl: SanitizedProwlConfig {
                    enabled: config.notifications.prowl.enabled,
                    api_key_configured: config
                        .notifications
                        .prowl
                        .api_key
                        .as_deref()
                        .is_some_and(|k| !k.is_empty()),
                    events: config.notifications.prowl.events.clone(),
                },
            },
            database: config.database.clone(),
            lock: config.lock.clone(),
            logging: config.logging.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_documented_values() {
        let config: Config = toml::from_str("").unwrap();
        assert_eq!(config.lftp.path, "lftp");
        assert_eq!(config.connection.port, 22);
        assert_eq!(config.transfer.speed_limit, 0);
        assert_eq!(config.transfer.connection_limit, 25);
        assert_eq!(config.transfer.transfer_limit, 3);
        assert_eq!(config.transfer.max_retries, 5);
        assert!(!config.remove_sources.remove);
        assert!(!config.notifications.prowl.enabled);
        assert_eq!(config.database.path.to_str().unwrap(), "locomotive.db");
        assert_eq!(config.logging.format, LogFormat::Pretty);
    }

    #[test]
    fn test_deserialize_full_config() {
        let toml = r#"
[connection]
username = "u"
password = "p"
port = 2222
private_keyfile = "/home/u/.ssh/id_rsa"

[transfer]
working_dir = "/data/work"
speed_limit = 1048576
connection_limit = 10
transfer_limit = 2
max_retries = 3

[transfer.speed_schedule]
"08:00" = 500000
"23:00" = 0

[remove_sources]
remove = true
exclude = ["\\.keep$", "^sample"]

[source_target_map]
"/downloads/tv" = "/media/tv"
"/downloads/movies" = "/media/movies"

[notifications.prowl]
enabled = true
api_key = "abc"
events = ["item_moved"]

[logging]
format = "json"
"#;
        let config: Config = toml::from_str(toml).unwrap();
        assert_eq!(config.connection.port, 2222);
        assert_eq!(
            config.connection.private_keyfile.as_deref().unwrap().to_str(),
            Some("/home/u/.ssh/id_rsa")
        );
        assert_eq!(config.transfer.speed_schedule.len(), 2);
        assert_eq!(config.remove_sources.exclude.len(), 2);
        assert_eq!(config.source_target_map.len(), 2);
        assert_eq!(config.notifications.prowl.events, vec![EventKind::ItemMoved]);
        assert_eq!(config.logging.format, LogFormat::Json);

        let limits = config.transfer.limits();
        assert_eq!(limits.speed_limit, 1_048_576);
        assert_eq!(limits.connection_limit, 10);
        assert_eq!(limits.transfer_limit, 2);
        assert_eq!(limits.max_retries, 3);
    }

    #[test]
    fn test_sanitized_config_hides_secrets() {
        let mut config = Config::default();
        config.connection.username = "u".to_string();
        config.connection.password = "hunter2".to_string();
        config.notifications.prowl.api_key = Some("secret-key".to_string());

        let sanitized = SanitizedConfig::from(&config);
        assert!(sanitized.connection.password_configured);
        assert!(sanitized.notifications.prowl.api_key_configured);

        let json = serde_json::to_string(&sanitized).unwrap();
        assert!(!json.contains("hunter2"));
        assert!(!json.contains("secret-key"));
    }
}
