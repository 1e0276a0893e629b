//! File logging
//!
//! The terminal belongs to the UI, so logs go to a daily-rotated file in the
//! log directory. `RUST_LOG` overrides the level given on the command line.

use std::path::Path;

use anyhow::Context;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

pub const LOG_FILE_PREFIX: &str = "weathersync-map.log";

/// `RUST_LOG` if it is set and valid, otherwise `default_level`.
pub fn build_filter(default_level: &str) -> anyhow::Result<EnvFilter> {
    EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(default_level))
        .with_context(|| format!("invalid log level {default_level:?}"))
}

/// Install the global subscriber. Keep the guard alive until exit or the
/// last buffered lines are lost.
pub fn init(log_dir: &Path, default_level: &str) -> anyhow::Result<WorkerGuard> {
    std::fs::create_dir_all(log_dir)
        .with_context(|| format!("failed to create log directory {}", log_dir.display()))?;

    let appender = tracing_appender::rolling::daily(log_dir, LOG_FILE_PREFIX);
    let (writer, guard) = tracing_appender::non_blocking(appender);

    tracing_subscriber::registry()
        .with(build_filter(default_level)?)
        .with(
            fmt::layer()
                .with_writer(writer)
                .with_ansi(false)
                .with_target(true),
        )
        .try_init()
        .context("failed to install tracing subscriber")?;

    Ok(guard)
}
