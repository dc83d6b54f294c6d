// ============================================================
// Layer 6 - Logging
// ============================================================
// One process-wide tracing subscriber with two sinks:
//
//   file    -> <log_dir>/wafer-quality.log.YYYY-MM-DD (daily roll),
//              INFO and above, overridable through RUST_LOG
//   console -> stderr, ERROR and above unless --verbose is given
//
// The returned guard flushes the non-blocking file writer when it
// is dropped, so main() must hold it until exit.

use std::{fs, path::Path};

use anyhow::{Context, Result};
use tracing::Level;
use tracing_appender::{non_blocking, non_blocking::WorkerGuard, rolling};
use tracing_subscriber::{
    filter::LevelFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer,
};

pub const LOG_FILE_PREFIX: &str = "wafer-quality.log";

pub fn init(log_dir: &Path, console_level: Level) -> Result<WorkerGuard> {
    fs::create_dir_all(log_dir)
        .with_context(|| format!("Cannot create log directory '{}'", log_dir.display()))?;

    let (file_writer, guard) = non_blocking(rolling::daily(log_dir, LOG_FILE_PREFIX));

    let file_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("wafer_quality=info,warn"));

    let file_layer = fmt::layer()
        .with_writer(file_writer)
        .with_ansi(false)
        .with_target(true)
        .with_filter(file_filter);

    let console_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_filter(LevelFilter::from_level(console_level));

    tracing_subscriber::registry()
        .with(file_layer)
        .with(console_layer)
        .try_init()
        .context("A global tracing subscriber is already installed")?;

    Ok(guard)
}
