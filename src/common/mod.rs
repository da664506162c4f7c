//! Common utilities shared by the CLI and the driver

pub mod config;
pub mod error;
pub mod logging;
pub mod paths;

pub use error::{Error, Result};

/// Quote a value for a POSIX shell command line
///
/// Wraps in single quotes and rewrites embedded single quotes as `'\''`.
pub fn shell_quote(value: &str) -> String {
    format!("'{}'", value.replace('\'', r"'\''"))
}
