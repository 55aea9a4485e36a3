//! Logging setup for the binary
//!
//! Log lines go to stdout and, without ANSI colors, to the configured log
//! file. `RUST_LOG` overrides the default `info` filter.

use crate::error::{Error, Result};
use std::path::Path;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, fmt};

const DEFAULT_FILTER: &str = "info";

/// Install the global subscriber
///
/// The returned guard flushes the file writer when dropped; keep it alive for
/// the whole run.
pub fn init(log_file: &Path) -> Result<WorkerGuard> {
    let appender = file_appender(log_file)?;
    let (file_writer, guard) = tracing_appender::non_blocking(appender);

    tracing_subscriber::registry()
        .with(env_filter())
        .with(fmt::layer().with_target(false))
        .with(
            fmt::layer()
                .with_target(false)
                .with_ansi(false)
                .with_writer(file_writer),
        )
        .try_init()
        .map_err(|e| Error::Other(format!("failed to install log subscriber: {}", e)))?;

    Ok(guard)
}

fn env_filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER))
}

/// Appender writing to exactly `log_file` (no rotation, appends across runs)
fn file_appender(log_file: &Path) -> Result<RollingFileAppender> {
    let file_name = log_file
        .file_name()
        .and_then(|name| name.to_str())
        .ok_or_else(|| {
            Error::config(
                format!("log file {} has no file name", log_file.display()),
                "paths.log_file",
            )
        })?;
    let dir = match log_file.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    std::fs::create_dir_all(dir)?;

    RollingFileAppender::builder()
        .rotation(Rotation::NEVER)
        .filename_prefix(file_name)
        .build(dir)
        .map_err(|e| {
            Error::config(
                format!("cannot open log file {}: {}", log_file.display(), e),
                "paths.log_file",
            )
        })
}
