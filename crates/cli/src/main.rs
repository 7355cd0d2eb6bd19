mod args;

use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::Parser;
use tracing::{debug, error, info, info_span, Instrument};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};
use uuid::Uuid;

use locomotive_core::{
    load_config, load_config_or_default, validate_config, Config, ConnectionCredentials, FsPlacer,
    InvocationFingerprint, Lftp, LockAttempt, LogFormat, Locomotive, NotifierSet, ProcessLock,
    RunSettings, SanitizedConfig, ShellBackend, SourceTarget, SqliteCatalog,
};

use args::Args;

/// Config file used when neither `--config` nor `LOCO_CONFIG` is given.
const DEFAULT_CONFIG_FILE: &str = "locomotive.toml";

#[tokio::main(flavor = "current_thread")]
async fn main() {
    let args = Args::parse();

    let config = load(&args);
    let format = config
        .as_ref()
        .map(|c| c.logging.format)
        .unwrap_or_default();
    init_logging(args.log_filter(), format);

    let result = match config {
        Ok(config) => run(args, config).await,
        Err(e) => Err(e),
    };

    if let Err(e) = result {
        error!("Fatal error: {:#}", e);
        std::process::exit(1);
    }
}

/// Loads the config file. An explicitly named file must exist.
fn load(args: &Args) -> Result<Config> {
    let explicit = args
        .config
        .clone()
        .or_else(|| std::env::var_os("LOCO_CONFIG").map(PathBuf::from));

    match explicit {
        Some(path) => load_config(&path)
            .with_context(|| format!("Failed to load config from {:?}", path)),
        None => load_config_or_default(&PathBuf::from(DEFAULT_CONFIG_FILE))
            .with_context(|| format!("Failed to load config from {}", DEFAULT_CONFIG_FILE)),
    }
}

fn init_logging(default_filter: &str, format: LogFormat) {
    let filter = EnvFilter::try_from_env("LOCO_LOG").unwrap_or_else(|_| EnvFilter::new(default_filter));
    let registry = tracing_subscriber::registry().with(filter);

    match format {
        LogFormat::Pretty => registry
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init(),
        LogFormat::Json => registry
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_writer(std::io::stderr),
            )
            .init(),
    }
}

async fn run(args: Args, mut config: Config) -> Result<()> {
    args.apply_to(&mut config);
    validate_config(&config).context("Configuration validation failed")?;
    debug!("Configuration: {:?}", SanitizedConfig::from(&config));

    let fingerprint = InvocationFingerprint::from_pairs(args.fingerprint_pairs());
    let _lock = match ProcessLock::acquire(&config.lock.dir, &fingerprint)
        .context("Failed to acquire process lock")?
    {
        LockAttempt::Held(lock) => lock,
        LockAttempt::Busy => {
            info!("Locomotive is already running with these arguments in another process.");
            return Ok(());
        }
    };

    let sources = SourceTarget::resolve(
        args.source.as_deref(),
        args.target.as_deref(),
        &config.source_target_map,
    );
    if sources.is_empty() {
        bail!("No source directories given and none configured in source_target_map");
    }

    let settings = RunSettings::from_config(args.host.clone(), sources, &config)?;

    let mut credentials = ConnectionCredentials::new(
        args.host.clone(),
        config.connection.port,
        config.connection.username.clone(),
        config.connection.password.clone(),
    );
    credentials.private_keyfile = config.connection.private_keyfile.clone();
    credentials.public_keyfile = config.connection.public_keyfile.clone();

    let lftp = Lftp::new(
        credentials,
        settings.working_dir.clone(),
        ShellBackend::new(config.lftp.path.clone()),
    );
    let catalog = SqliteCatalog::new(&config.database.path)
        .with_context(|| format!("Failed to open database {:?}", config.database.path))?;
    let notifiers =
        NotifierSet::from_config(&config.notifications).context("Failed to set up notifications")?;

    let mut locomotive = Locomotive::new(settings, lftp, catalog, FsPlacer::with_defaults(), notifiers)?;

    let span = info_span!("run", id = %Uuid::new_v4(), host = %args.host);
    let result = locomotive.run().instrument(span).await;
    let report = result.with_context(|| format!("Run failed in stage {}", locomotive.stage()))?;

    debug!(
        "Run finished: {} started, {} queued, {} moved",
        report.new_transfers.len(),
        report.queued_transfers.len(),
        report.moved_items.len()
    );
    Ok(())
}
