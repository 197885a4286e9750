//! vaultpush daemon - scheduled vault synchronization
//!
//! Pushes a local (or freshly cloned) vault tree to an S3-compatible store:
//! - one sync cycle immediately on start
//! - another cycle every `schedule.interval_minutes`
//! - graceful shutdown on SIGTERM/SIGINT
//!
//! # Architecture
//!
//! `main` loads and validates configuration, installs tracing, wires the S3
//! adapter and source provider into a `SyncEngine`, then either runs a
//! single cycle (`--once`) or enters the interval loop. The loop is
//! controlled by a `CancellationToken` that the signal handler cancels.

use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter, Layer};

use vaultpush_core::config::{Config, LoggingConfig, ValidationError};
use vaultpush_core::domain::BatchResult;
use vaultpush_s3::S3ObjectStore;
use vaultpush_sync::engine::EngineSettings;
use vaultpush_sync::source::provider_from_config;
use vaultpush_sync::{LogObserver, SyncEngine, SyncError};

// ============================================================================
// CLI
// ============================================================================

#[derive(Debug, Parser)]
#[command(name = "vaultpushd", version, about = "Push a notes vault to S3-compatible storage")]
struct Cli {
    /// Configuration file (defaults to $XDG_CONFIG_HOME/vaultpush/config.yaml)
    #[arg(short, long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Run a single sync cycle and exit
    #[arg(long)]
    once: bool,
}

// ============================================================================
// Configuration + tracing
// ============================================================================

/// Loads the config file, applies environment overrides and validates
///
/// An explicit `--config` path must exist; the default path falls back to
/// built-in defaults when absent.
fn load_config(path: Option<&PathBuf>) -> Result<(Config, PathBuf)> {
    let (mut config, path) = match path {
        Some(path) => (
            Config::load(path).with_context(|| format!("Failed to load {}", path.display()))?,
            path.clone(),
        ),
        None => {
            let path = Config::default_path();
            (Config::load_or_default(&path), path)
        }
    };

    config
        .apply_env_overrides()
        .context("Invalid environment override")?;

    let errors = config.validate();
    if !errors.is_empty() {
        anyhow::bail!("Invalid configuration:\n{}", format_validation_errors(&errors));
    }

    Ok((config, path))
}

fn format_validation_errors(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(|e| format!("  - {e}"))
        .collect::<Vec<_>>()
        .join("\n")
}

/// `RUST_LOG` wins; otherwise `logging.level` from config
fn env_filter(logging: &LoggingConfig) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&logging.level))
}

/// Opens `path` for appending, creating parent directories as needed
fn open_log_file(path: &Path) -> Result<File> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create log directory {}", parent.display()))?;
    }
    OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .with_context(|| format!("Failed to open log file {}", path.display()))
}

/// Installs stdout logging plus an optional file sink
///
/// The returned guard flushes the file writer on drop and must live until
/// the process exits.
fn init_tracing(logging: &LoggingConfig) -> Result<Option<WorkerGuard>> {
    let stdout_layer = if logging.json {
        fmt::layer().json().with_target(true).boxed()
    } else {
        fmt::layer().with_target(true).boxed()
    };

    let (file_layer, guard) = match &logging.file {
        Some(path) => {
            let (writer, guard) = tracing_appender::non_blocking(open_log_file(path)?);
            let layer = if logging.json {
                fmt::layer().json().with_writer(writer).boxed()
            } else {
                fmt::layer().with_ansi(false).with_writer(writer).boxed()
            };
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(env_filter(logging))
        .with(stdout_layer)
        .with(file_layer)
        .try_init()
        .context("Failed to install tracing subscriber")?;

    Ok(guard)
}

// ============================================================================
// DaemonService
// ============================================================================

/// Owns the engine and drives sync cycles
struct DaemonService {
    config: Config,
    engine: SyncEngine,
    shutdown: CancellationToken,
}

impl DaemonService {
    /// Wires the S3 adapter, source provider and log observer into an engine
    fn new(config: Config, shutdown: CancellationToken) -> Result<Self> {
        let store = S3ObjectStore::from_config(&config.store)
            .context("Failed to configure object store")?;
        info!(endpoint = %store.endpoint(), "Object store configured");

        let source = provider_from_config(&config.source)?;
        let settings = EngineSettings::from_config(&config).context("Invalid engine settings")?;
        let engine = SyncEngine::new(
            Arc::new(store),
            source,
            Arc::new(LogObserver),
            settings,
        );

        Ok(Self {
            config,
            engine,
            shutdown,
        })
    }

    /// Runs one cycle and logs its summary
    async fn run_cycle(&self) -> Result<BatchResult, SyncError> {
        info!("Starting sync cycle");
        let result = self
            .engine
            .run_sync_with_cancel(self.shutdown.child_token())
            .await;

        match &result {
            Ok(batch) => log_summary(batch),
            Err(e) => {
                if let Some(batch) = e.batch_result() {
                    log_summary(batch);
                }
                error!(error = %e, "Sync cycle failed");
            }
        }
        result
    }

    /// Runs a single cycle; any failure becomes the process exit status
    async fn run_once(&self) -> Result<()> {
        self.run_cycle().await?;
        Ok(())
    }

    /// Runs a cycle now and then once per interval until shutdown
    ///
    /// A failed cycle is logged and the loop keeps going.
    async fn sync_loop(&self) -> Result<()> {
        let period = self.config.schedule_interval();
        info!(interval_minutes = self.config.schedule.interval_minutes, "Starting sync loop");

        let mut interval = tokio::time::interval(period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                biased;
                _ = self.shutdown.cancelled() => {
                    info!("Shutdown signal received");
                    break;
                }
                _ = interval.tick() => {}
            }

            if let Err(SyncError::Cancelled) = self.run_cycle().await {
                warn!("Sync cycle interrupted by shutdown");
                break;
            }
        }

        info!("Sync loop terminated");
        Ok(())
    }
}

fn log_summary(batch: &BatchResult) {
    let summary = batch.summary();
    match serde_json::to_string(&summary) {
        Ok(json) => info!(
            uploaded = summary.uploaded,
            skipped = summary.skipped,
            failed = summary.failed,
            duration_ms = summary.duration_ms,
            summary = %json,
            "Sync cycle completed"
        ),
        Err(e) => warn!(error = %e, "Failed to serialize batch summary"),
    }
}

// ============================================================================
// Graceful shutdown
// ============================================================================

/// Waits for SIGTERM or SIGINT and cancels `token`
async fn shutdown_signal(token: CancellationToken) {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received SIGINT (Ctrl+C)");
        }
        _ = terminate => {
            info!("Received SIGTERM");
        }
    }

    token.cancel();
}

// ============================================================================
// Main entry point
// ============================================================================

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let (config, config_path) = load_config(cli.config.as_ref())?;

    let _log_guard = init_tracing(&config.logging)?;
    info!(
        config_path = %config_path.display(),
        log_file = ?config.logging.file,
        once = cli.once,
        "vaultpush daemon starting (vaultpushd)"
    );

    let shutdown_token = CancellationToken::new();
    let signal_token = shutdown_token.clone();
    tokio::spawn(async move {
        shutdown_signal(signal_token).await;
    });

    let service = DaemonService::new(config, shutdown_token)?;
    let result = if cli.once {
        service.run_once().await
    } else {
        service.sync_loop().await
    };

    match &result {
        Ok(()) => info!("vaultpush daemon shut down gracefully"),
        Err(e) => error!(error = %format!("{e:#}"), "vaultpush daemon exiting with error"),
    }

    result
}

// ============================================================================
// Tests
// ============================================================================
