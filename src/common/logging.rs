//! Logging and tracing configuration
//!
//! Console output of the run itself goes to stdout through the runner; tracing
//! goes to stderr and, when requested, to a log file that keeps the full
//! command transcript of a run for later review.

use std::path::PathBuf;
use std::sync::Mutex;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use super::paths;

/// Initialize tracing for the CLI
///
/// Logs are controlled by the `RUST_LOG` environment variable.
/// Default level is INFO for this crate (DEBUG with `verbose`), WARN for dependencies.
///
/// When `log_to_file` is set, a second layer writes the same events to
/// `<data dir>/logs/rtctest.log`. Returns the log file path if one was opened.
pub fn init_cli(verbose: bool, log_to_file: bool) -> Option<PathBuf> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        if verbose {
            EnvFilter::new("rtctest=debug,warn")
        } else {
            EnvFilter::new("rtctest=info,warn")
        }
    });

    let stderr_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .compact();

    let (file_layer, log_path) = if log_to_file {
        match open_log_file() {
            Some((file, path)) => {
                let layer = fmt::layer()
                    .with_writer(Mutex::new(file))
                    .with_ansi(false)
                    .with_target(true)
                    .with_file(true)
                    .with_line_number(true);
                (Some(layer), Some(path))
            }
            None => (None, None),
        }
    } else {
        (None, None)
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(stderr_layer)
        .with(file_layer)
        .init();

    log_path
}

fn open_log_file() -> Option<(std::fs::File, PathBuf)> {
    let dir = match paths::ensure_log_dir() {
        Ok(Some(dir)) => dir,
        Ok(None) => return None,
        Err(e) => {
            eprintln!("Warning: Could not create log directory: {}", e);
            return None;
        }
    };

    let log_file = dir.join("rtctest.log");
    match std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&log_file)
    {
        Ok(file) => Some((file, log_file)),
        Err(e) => {
            eprintln!("Warning: Could not open log file: {}", e);
            None
        }
    }
}
