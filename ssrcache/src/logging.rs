//! Logging setup for the render cache.
//!
//! Two entry points:
//! - [`init_logging`] for the long-running reaper daemon: a cleared log file
//!   in `logs/` plus stdout, both driven by one `EnvFilter`.
//! - [`init_console_logging`] for one-shot CLI commands: compact stderr only.
//!
//! Both honour `RUST_LOG` and fall back to `info`; `debug` forces the
//! debug level.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

/// Default log directory, relative to the working directory.
pub const DEFAULT_LOG_DIR: &str = "logs";

/// Default log file name.
pub const DEFAULT_LOG_FILE: &str = "ssrcache.log";

/// Keeps the non-blocking file writer alive.
///
/// Dropping this guard flushes and closes the log file.
pub struct LoggingGuard {
    _file_guard: WorkerGuard,
}

/// Initializes file + stdout logging.
///
/// The log file is truncated so each daemon session starts clean.
///
/// # Errors
///
/// Returns an error if the log directory cannot be created or the file
/// cannot be truncated.
pub fn init_logging(
    log_dir: &Path,
    log_file: &str,
    debug: bool,
) -> Result<LoggingGuard, io::Error> {
    let log_path = prepare_log_file(log_dir, log_file)?;

    let file_appender = tracing_appender::rolling::never(log_dir, log_file);
    let (non_blocking_file, file_guard) = tracing_appender::non_blocking(file_appender);

    let file_layer = tracing_subscriber::fmt::layer()
        .with_writer(non_blocking_file)
        .with_ansi(false)
        .with_span_events(FmtSpan::CLOSE);

    let stdout_layer = tracing_subscriber::fmt::layer()
        .with_writer(io::stdout)
        .with_ansi(true)
        .compact();

    tracing_subscriber::registry()
        .with(env_filter(debug))
        .with(file_layer)
        .with(stdout_layer)
        .init();

    tracing::debug!(path = %log_path.display(), "File logging initialized");

    Ok(LoggingGuard {
        _file_guard: file_guard,
    })
}

/// Initializes stderr-only logging for short-lived commands.
///
/// Safe to call more than once; later calls are ignored.
pub fn init_console_logging(debug: bool) {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter(debug))
        .with_writer(io::stderr)
        .compact()
        .try_init();
}

/// Creates `log_dir` and truncates `log_file` inside it.
fn prepare_log_file(log_dir: &Path, log_file: &str) -> Result<PathBuf, io::Error> {
    fs::create_dir_all(log_dir)?;
    let log_path = log_dir.join(log_file);
    fs::write(&log_path, "")?;
    Ok(log_path)
}

fn env_filter(debug: bool) -> EnvFilter {
    if debug {
        return EnvFilter::new("debug");
    }
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
}
