//! Tracing subscriber setup for binaries.

use std::fs;

use anyhow::{Context, Result};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::prelude::*;
use tracing_subscriber::{EnvFilter, fmt};

use crate::config::{Config, paths};

/// Overrides the configured log level; accepts full `EnvFilter` syntax.
pub const LOG_ENV: &str = "PARLOR_LOG";

const LOG_FILE_PREFIX: &str = "parlor.log";

/// Installs the global subscriber: stderr always, plus a daily rolling file
/// under `$PARLOR_HOME/logs` when `log_to_file` is set.
///
/// Keep the returned guard alive for the life of the process; dropping it
/// flushes and stops the file writer.
pub fn init(config: &Config) -> Result<Option<WorkerGuard>> {
    let filter = build_filter(std::env::var(LOG_ENV).ok().as_deref(), &config.log_level);

    let stderr_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false);

    let (file_layer, guard) = if config.log_to_file {
        let dir = paths::logs_dir();
        fs::create_dir_all(&dir)
            .with_context(|| format!("Failed to create log directory {}", dir.display()))?;
        let appender = tracing_appender::rolling::daily(&dir, LOG_FILE_PREFIX);
        let (writer, guard) = tracing_appender::non_blocking(appender);
        let layer = fmt::layer().with_writer(writer).with_ansi(false);
        (Some(layer), Some(guard))
    } else {
        (None, None)
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(stderr_layer)
        .with(file_layer)
        .try_init()
        .context("Failed to install tracing subscriber")?;

    Ok(guard)
}

/// Picks the first valid directive of: env override, configured level, default.
fn select_directive(env_value: Option<&str>, configured: &str) -> String {
    [env_value, Some(configured)]
        .into_iter()
        .flatten()
        .map(str::trim)
        .filter(|d| !d.is_empty())
        .find(|d| EnvFilter::try_new(d).is_ok())
        .unwrap_or(Config::DEFAULT_LOG_LEVEL)
        .to_string()
}

fn build_filter(env_value: Option<&str>, configured: &str) -> EnvFilter {
    EnvFilter::new(select_directive(env_value, configured))
}
