//! Logging setup for binaries embedding the manager.
//!
//! - Human-readable output on stderr, so stdout stays free for event output
//! - Optional plain-text log file, cleared at session start
//! - Filter from `RUST_LOG`, defaulting to `info`

use std::fs;
use std::io;
use std::path::Path;

use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

/// Default log file name.
pub const DEFAULT_LOG_FILE: &str = "pacekeeper.log";

/// Keeps the file writer alive. Dropping it flushes the log file.
pub struct LoggingGuard {
    _file_guard: Option<WorkerGuard>,
}

/// Install the global subscriber.
///
/// `default_level` applies when `RUST_LOG` is unset. With `log_dir` set, the
/// directory is created, `log_file` inside it truncated, and every event is
/// also written there.
///
/// # Errors
///
/// Fails if the log directory cannot be created or the file cannot be
/// truncated.
pub fn init_logging(
    default_level: &str,
    log_dir: Option<&Path>,
    log_file: &str,
) -> Result<LoggingGuard, io::Error> {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    let stderr_layer = tracing_subscriber::fmt::layer()
        .with_writer(io::stderr)
        .with_target(false);

    let (file_layer, file_guard) = match log_dir {
        Some(dir) => {
            fs::create_dir_all(dir)?;
            fs::write(dir.join(log_file), "")?;

            let appender = tracing_appender::rolling::never(dir, log_file);
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let layer = tracing_subscriber::fmt::layer()
                .with_writer(writer)
                .with_ansi(false);
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(stderr_layer)
        .with(file_layer)
        .init();

    Ok(LoggingGuard {
        _file_guard: file_guard,
    })
}
