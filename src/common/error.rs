//! Error types for the RTC test CLI
//!
//! Assertion failures carry the exercise name so the console output points
//! straight at the hwclock invocation that misbehaved.

use std::io;
use thiserror::Error;

/// Result type alias using our Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for the RTC test CLI
#[derive(Error, Debug)]
pub enum Error {
    // === Assertion Errors ===
    #[error("{exercise}: '{command}' exited with {actual}, expected {expected}")]
    UnexpectedExitCode {
        exercise: String,
        command: String,
        expected: i32,
        actual: i32,
    },

    #[error("Test assertion failed: {0}")]
    TestAssertion(String),

    // === Host Errors ===
    #[error("Failed to reach host {host}: {reason}")]
    Connection { host: String, reason: String },

    #[error("Command '{command}' timed out after {secs} seconds")]
    Timeout { command: String, secs: u64 },

    #[error("Missing exit status marker in output of '{command}': last line was {last_line:?}")]
    ExitMarker {
        command: String,
        last_line: Option<String>,
    },

    #[error("Host did not reach state {state} within {secs} seconds")]
    SystemState { state: String, secs: u64 },

    #[error("Kernel config {flag} for {kernel}: {reason}")]
    KernelConfig {
        kernel: String,
        flag: String,
        reason: String,
    },

    // === Configuration Errors ===
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid configuration file: {0}")]
    ConfigParse(String),

    #[error("Invalid test scenario: {0}")]
    ScenarioParse(String),

    // === IO Errors ===
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("Failed to read file '{path}': {error}")]
    FileRead { path: String, error: String },

    // === Serialization Errors ===
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    // === Internal Errors ===
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Create an unexpected exit code error
    pub fn unexpected_exit(exercise: &str, command: &str, expected: i32, actual: i32) -> Self {
        Self::UnexpectedExitCode {
            exercise: exercise.to_string(),
            command: command.to_string(),
            expected,
            actual,
        }
    }

    /// Create a connection error
    pub fn connection(host: &str, reason: impl Into<String>) -> Self {
        Self::Connection {
            host: host.to_string(),
            reason: reason.into(),
        }
    }

    /// Create a kernel config error
    pub fn kernel_config(kernel: &str, flag: &str, reason: impl Into<String>) -> Self {
        Self::KernelConfig {
            kernel: kernel.to_string(),
            flag: flag.to_string(),
            reason: reason.into(),
        }
    }

    /// Whether this error is an assertion on the SUT's behaviour rather than
    /// a failure of the test infrastructure
    pub fn is_assertion(&self) -> bool {
        matches!(
            self,
            Error::UnexpectedExitCode { .. } | Error::TestAssertion(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unexpected_exit_names_exercise() {
        let err = Error::unexpected_exit("compare", "timeout 10 hwclock --compare", 124, 0);
        let msg = err.to_string();
        assert!(msg.starts_with("compare:"));
        assert!(msg.contains("exited with 0, expected 124"));
        assert!(err.is_assertion());
    }

    #[test]
    fn test_infrastructure_errors_are_not_assertions() {
        let err = Error::connection("sut.example", "ssh exited with status 255");
        assert!(!err.is_assertion());

        let err = Error::Timeout {
            command: "hwclock -r".to_string(),
            secs: 5,
        };
        assert!(!err.is_assertion());
    }
}
