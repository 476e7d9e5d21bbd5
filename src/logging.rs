use std::{
    fs,
    path::{Path, PathBuf},
    time::{Duration, SystemTime},
};

use anyhow::{Context, Result, anyhow};
use tracing_appender::{
    non_blocking::WorkerGuard,
    rolling::{RollingFileAppender, Rotation},
};
use tracing_error::ErrorLayer;
use tracing_subscriber::{
    EnvFilter, Layer, filter::LevelFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt,
};

use crate::config::{LoggingConfig, LoggingRotation};

const LOG_FILE_PREFIX: &str = "panacea.log";
const SECONDS_PER_DAY: u64 = 24 * 60 * 60;

/// Flushes the non-blocking file writer when dropped at the end of `main`.
pub struct LoggingGuard(WorkerGuard);

/// Installs the JSON file layer and the WARN stderr layer. Events emitted
/// while a command runs carry its `command` span, and with it the run id.
pub fn init_tracing(config: &LoggingConfig, run_id: &str) -> Result<LoggingGuard> {
    if config.filter.trim().is_empty() {
        return Err(anyhow!("logging.filter cannot be empty"));
    }
    if config.dir.as_os_str().is_empty() {
        return Err(anyhow!("logging.dir cannot be empty"));
    }

    let log_dir = std::path::absolute(&config.dir)
        .with_context(|| format!("failed to resolve logging.dir {}", config.dir.display()))?;
    fs::create_dir_all(&log_dir)
        .with_context(|| format!("failed to create logging directory {}", log_dir.display()))?;
    let purge = purge_expired_logs(&log_dir, config.retention_days, SystemTime::now());

    let (writer, worker_guard) = tracing_appender::non_blocking(rolling_appender(
        &log_dir,
        &config.rotation,
    )?);
    let env_filter = EnvFilter::try_new(&config.filter)
        .with_context(|| format!("failed to parse logging.filter '{}'", config.filter))?;

    let file_layer = fmt::layer()
        .json()
        .with_timer(fmt::time::UtcTime::rfc_3339())
        .with_current_span(true)
        .with_span_list(false)
        .with_ansi(false)
        .with_writer(writer)
        .with_filter(env_filter);
    let stderr_layer = config.stderr_warn_enabled.then(|| {
        fmt::layer()
            .with_writer(std::io::stderr)
            .with_target(false)
            .without_time()
            .with_filter(LevelFilter::WARN)
    });

    tracing_subscriber::registry()
        .with(ErrorLayer::default())
        .with(file_layer)
        .with(stderr_layer)
        .try_init()
        .context("failed to initialize tracing subscriber")?;

    tracing::info!(
        target: "logging",
        run_id = %run_id,
        dir = %log_dir.display(),
        rotation = ?config.rotation,
        removed = purge.removed.len(),
        "logging_initialized"
    );
    for warning in purge.warnings {
        tracing::warn!(target: "logging", warning = %warning, "log_retention_failed");
    }

    Ok(LoggingGuard(worker_guard))
}

fn rolling_appender(log_dir: &Path, rotation: &LoggingRotation) -> Result<RollingFileAppender> {
    let rotation = match rotation {
        LoggingRotation::Daily => Rotation::DAILY,
        LoggingRotation::Hourly => Rotation::HOURLY,
    };
    RollingFileAppender::builder()
        .rotation(rotation)
        .filename_prefix(LOG_FILE_PREFIX)
        .build(log_dir)
        .with_context(|| format!("failed to open log files in {}", log_dir.display()))
}

#[derive(Debug, Default)]
struct LogPurge {
    removed: Vec<PathBuf>,
    warnings: Vec<String>,
}

/// Deletes `panacea.log*` files last modified `retention_days` or more
/// before `now`. Corpus files sharing the directory are never touched.
fn purge_expired_logs(log_dir: &Path, retention_days: usize, now: SystemTime) -> LogPurge {
    let keep_for = Duration::from_secs((retention_days as u64).saturating_mul(SECONDS_PER_DAY));
    let cutoff = now.checked_sub(keep_for).unwrap_or(SystemTime::UNIX_EPOCH);

    let mut purge = LogPurge::default();
    let entries = match fs::read_dir(log_dir) {
        Ok(entries) => entries,
        Err(err) => {
            purge
                .warnings
                .push(format!("failed to scan {}: {err}", log_dir.display()));
            return purge;
        }
    };

    for entry in entries.flatten() {
        let path = entry.path();
        let is_log = entry
            .file_name()
            .to_str()
            .is_some_and(|name| name.starts_with(LOG_FILE_PREFIX));
        if !is_log {
            continue;
        }

        let expired = entry
            .metadata()
            .and_then(|metadata| metadata.modified().map(|at| metadata.is_file() && at <= cutoff));
        match expired {
            Ok(true) => match fs::remove_file(&path) {
                Ok(()) => purge.removed.push(path),
                Err(err) => purge
                    .warnings
                    .push(format!("failed to remove {}: {err}", path.display())),
            },
            Ok(false) => {}
            Err(err) => purge
                .warnings
                .push(format!("failed to stat {}: {err}", path.display())),
        }
    }
    purge
}
