// # rrsync - single-record DNS management
//
// Thin entry point over `rrsync-core`:
// 1. Parse the subcommand
// 2. Read configuration from environment variables
// 3. Build the record store and the shared rate limiter
// 4. Run one lifecycle operation, cancelled on SIGINT/SIGTERM
//
// All record logic lives in `rrsync_core::Reconciler`.
//
// ## Configuration
//
// - `RRSYNC_API_URL`: API base URL (default `https://api.godaddy.com`)
// - `RRSYNC_API_KEY` / `RRSYNC_API_SECRET`: credentials, falling back to
//   `GODADDY_API_KEY` / `GODADDY_API_SECRET`
// - `RRSYNC_RATE_STRATEGY`: `token_bucket` or `fixed_window` (default `token_bucket`)
// - `RRSYNC_RATE_RPS`: requests per second (default 1)
// - `RRSYNC_RATE_BURST`: bucket size, or requests per window (default 60)
// - `RRSYNC_RATE_WINDOW_SECS`: fixed window length (default 60)
// - `RRSYNC_HTTP_TIMEOUT_SECS`: per-request timeout (default 10)
// - `RRSYNC_MODE`: `live` or `dry_run` (default `live`)
// - `RRSYNC_LOG_LEVEL`: trace, debug, info, warn, error (default `info`)
//
// ## Example
//
// ```bash
// export GODADDY_API_KEY=...
// export GODADDY_API_SECRET=...
//
// rrsync update 'example.com:TXT:@:old-value' --data new-value --ttl 3600
// ```

mod cli;

use anyhow::{Context, Result};
use clap::Parser;
use rrsync_core::{
    DeleteOutcome, RateLimitConfig, RateLimitStrategy, ReadOutcome, Reconciler, StoreConfig,
    StoreMode, UpdateOutcome,
};
use rrsync_provider_godaddy::GoDaddyStore;
use std::env;
use std::process::ExitCode;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{Level, error, info, warn};
use tracing_subscriber::FmtSubscriber;

#[cfg(unix)]
use tokio::signal::unix::{SignalKind, signal};

use cli::{Cli, Command};

/// Exit codes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RrsyncExitCode {
    /// Operation completed
    Success = 0,
    /// Configuration or startup error
    ConfigError = 1,
    /// Operation failed or was interrupted
    RuntimeError = 2,
    /// `get` found no matching record
    RecordAbsent = 3,
}

impl From<RrsyncExitCode> for ExitCode {
    fn from(code: RrsyncExitCode) -> Self {
        ExitCode::from(code as u8)
    }
}

/// Application configuration
struct Config {
    store: StoreConfig,
    log_level: String,
}

impl Config {
    /// Load configuration from environment variables
    fn from_env() -> Result<Self> {
        let api_key = env_with_fallback("RRSYNC_API_KEY", "GODADDY_API_KEY").context(
            "RRSYNC_API_KEY is required. Set it via: export RRSYNC_API_KEY=your_key",
        )?;
        let api_secret = env_with_fallback("RRSYNC_API_SECRET", "GODADDY_API_SECRET").context(
            "RRSYNC_API_SECRET is required. Set it via: export RRSYNC_API_SECRET=your_secret",
        )?;

        let mut store = StoreConfig::new(
            env::var("RRSYNC_API_URL").unwrap_or_else(|_| "https://api.godaddy.com".to_string()),
            api_key,
            api_secret,
        );

        let defaults = RateLimitConfig::default();
        let strategy = match env::var("RRSYNC_RATE_STRATEGY") {
            Ok(raw) => raw
                .parse::<RateLimitStrategy>()
                .map_err(|e| anyhow::anyhow!("RRSYNC_RATE_STRATEGY: {}", e))?,
            Err(_) => defaults.strategy,
        };
        store.rate_limit = RateLimitConfig {
            strategy,
            requests_per_second: parse_env("RRSYNC_RATE_RPS")?
                .unwrap_or(defaults.requests_per_second),
            burst: parse_env("RRSYNC_RATE_BURST")?.unwrap_or(defaults.burst),
            window_secs: parse_env("RRSYNC_RATE_WINDOW_SECS")?.unwrap_or(defaults.window_secs),
        };
        if let Some(secs) = parse_env("RRSYNC_HTTP_TIMEOUT_SECS")? {
            store.http_timeout_secs = secs;
        }
        if let Ok(mode) = env::var("RRSYNC_MODE") {
            store.mode = mode
                .parse::<StoreMode>()
                .map_err(|e| anyhow::anyhow!("RRSYNC_MODE: {}", e))?;
        }

        Ok(Self {
            store,
            log_level: env::var("RRSYNC_LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),
        })
    }

    /// Validate the configuration
    fn validate(&self) -> Result<()> {
        self.store
            .validate()
            .map_err(|e| anyhow::anyhow!("{}", e))?;

        if self.store.api_url.starts_with("http://") {
            eprintln!(
                "WARNING: RRSYNC_API_URL uses HTTP (not HTTPS). \
                Credentials will be sent in clear text."
            );
        }

        if self.log_level().is_none() {
            anyhow::bail!(
                "RRSYNC_LOG_LEVEL '{}' is not valid. \
                Valid levels: trace, debug, info, warn, error",
                self.log_level
            );
        }

        Ok(())
    }

    fn log_level(&self) -> Option<Level> {
        match self.log_level.to_lowercase().as_str() {
            "trace" => Some(Level::TRACE),
            "debug" => Some(Level::DEBUG),
            "info" => Some(Level::INFO),
            "warn" => Some(Level::WARN),
            "error" => Some(Level::ERROR),
            _ => None,
        }
    }
}

/// First non-empty value of `primary` or `fallback`
fn env_with_fallback(primary: &str, fallback: &str) -> Option<String> {
    [primary, fallback]
        .iter()
        .filter_map(|name| env::var(name).ok())
        .find(|v| !v.is_empty())
}

/// Parse an optional numeric environment variable
fn parse_env<T>(name: &str) -> Result<Option<T>>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|e| anyhow::anyhow!("{} must be a number, got '{}': {}", name, raw, e)),
        Err(_) => Ok(None),
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    // Load configuration from environment
    let config = match Config::from_env() {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("Configuration error: {:#}", e);
            return RrsyncExitCode::ConfigError.into();
        }
    };

    if let Err(e) = config.validate() {
        eprintln!("Configuration validation error: {}", e);
        return RrsyncExitCode::ConfigError.into();
    }

    // Logs go to stderr, stdout carries command output
    let subscriber = FmtSubscriber::builder()
        .with_max_level(config.log_level().unwrap_or(Level::INFO))
        .with_writer(std::io::stderr)
        .finish();

    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Failed to set tracing subscriber: {}", e);
        return RrsyncExitCode::ConfigError.into();
    }

    info!("Starting rrsync {}", cli.command.name());
    info!("Store configuration: {:?}", config.store);

    let rt = match tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            error!("Failed to create tokio runtime: {}", e);
            return RrsyncExitCode::RuntimeError.into();
        }
    };

    rt.block_on(async {
        match run(config, cli.command).await {
            Ok(code) => code,
            Err(e) => {
                error!("Command failed: {:#}", e);
                RrsyncExitCode::RuntimeError
            }
        }
    })
    .into()
}

/// Build the reconciler and run one command
async fn run(config: Config, command: Command) -> Result<RrsyncExitCode> {
    let store = GoDaddyStore::new(&config.store).context("cannot create record store")?;
    let limiter = config
        .store
        .rate_limit
        .build()
        .context("cannot create rate limiter")?;
    let reconciler = Reconciler::new(Arc::new(store), limiter);

    let cancel = CancellationToken::new();
    let signal_task = tokio::spawn(cancel_on_shutdown_signal(cancel.clone()));

    let result = execute(&reconciler, command, &cancel).await;
    signal_task.abort();

    if cancel.is_cancelled() {
        warn!("Interrupted; writes already sent are not rolled back");
    }
    result
}

async fn execute(
    reconciler: &Reconciler,
    command: Command,
    cancel: &CancellationToken,
) -> Result<RrsyncExitCode> {
    match command {
        Command::Get(args) => {
            let (domain, template) = args.into_parts();
            match reconciler.read(&domain, &template, cancel).await? {
                ReadOutcome::Absent => {
                    eprintln!("No matching record: {}", template);
                    Ok(RrsyncExitCode::RecordAbsent)
                }
                outcome => {
                    if let ReadOutcome::Ambiguous { matches, .. } = &outcome {
                        eprintln!("WARNING: {} records match, showing one of them", matches);
                    }
                    if let Some(record) = outcome.record() {
                        println!("{}", serde_json::to_string_pretty(record)?);
                    }
                    Ok(RrsyncExitCode::Success)
                }
            }
        }

        Command::Create(args) => {
            let (domain, record) = args.into_parts();
            reconciler.create(&domain, &record, cancel).await?;
            info!("Created {}", record);
            Ok(RrsyncExitCode::Success)
        }

        Command::Update {
            record,
            data,
            recreate,
        } => {
            let (domain, old) = record.into_parts();
            let mut new = old.clone();
            new.data = data;

            match reconciler.update(&domain, &old, &new, cancel).await? {
                UpdateOutcome::Replaced => info!("Updated {}", new),
                UpdateOutcome::Unchanged => info!("Already up to date: {}", new),
                UpdateOutcome::Gone if recreate => {
                    warn!("Record to update is gone, creating {}", new);
                    reconciler.create(&domain, &new, cancel).await?;
                }
                UpdateOutcome::Gone => {
                    warn!("Record to update is gone, nothing changed (use --recreate to add it)");
                }
            }
            Ok(RrsyncExitCode::Success)
        }

        Command::Delete(args) => {
            let (domain, record) = args.into_parts();
            match reconciler.delete(&domain, &record, cancel).await? {
                DeleteOutcome::Deleted => info!("Deleted {}", record),
                DeleteOutcome::Replaced { kept } => {
                    info!("Deleted {} ({} other records kept)", record, kept)
                }
                DeleteOutcome::AlreadyGone => info!("Already gone: {}", record),
            }
            Ok(RrsyncExitCode::Success)
        }
    }
}

/// Cancel `cancel` on SIGTERM or SIGINT
#[cfg(unix)]
async fn cancel_on_shutdown_signal(cancel: CancellationToken) {
    let (mut sigterm, mut sigint) = match (
        signal(SignalKind::terminate()),
        signal(SignalKind::interrupt()),
    ) {
        (Ok(term), Ok(int)) => (term, int),
        (Err(e), _) | (_, Err(e)) => {
            warn!("Failed to setup signal handlers: {}", e);
            return;
        }
    };

    let received = tokio::select! {
        _ = sigterm.recv() => "SIGTERM",
        _ = sigint.recv() => "SIGINT",
    };
    info!("Received {}, cancelling", received);
    cancel.cancel();
}

/// Cancel `cancel` on Ctrl-C
///
/// Fallback implementation for non-Unix platforms.
#[cfg(not(unix))]
async fn cancel_on_shutdown_signal(cancel: CancellationToken) {
    match tokio::signal::ctrl_c().await {
        Ok(()) => {
            info!("Received Ctrl-C, cancelling");
            cancel.cancel();
        }
        Err(e) => warn!("Failed to wait for Ctrl-C: {}", e),
    }
}
