pub mod catalog;
pub mod config;
pub mod lftp;
pub mod listing;
pub mod lock;
pub mod notify;
pub mod orchestrator;
pub mod placer;
pub mod queue;
pub mod schedule;
pub mod testing;

pub use catalog::{CatalogError, ItemCatalog, ItemStatus, RemoteItem, SqliteCatalog};
pub use config::{
    load_config, load_config_from_str, load_config_or_default, validate_config, Config,
    ConfigError, LogFormat, SanitizedConfig,
};
pub use lftp::{
    ConnectionCredentials, ExecuteOptions, ExecutionOutcome, Lftp, LftpError, ShellBackend,
    TransferBackend,
};
pub use lock::{InvocationFingerprint, LockAttempt, LockError, ProcessLock};
pub use notify::{NotificationEvent, Notifier, NotifierSet, NotifyError};
pub use orchestrator::{
    ConcurrencyLimits, Locomotive, OrchestratorError, RunReport, RunSettings, RunStage,
    SourceTarget,
};
pub use placer::{FsPlacer, Placer, PlacerConfig};
pub use queue::{parse_jobs, QueueSnapshot};
pub use schedule::SpeedSchedule;
