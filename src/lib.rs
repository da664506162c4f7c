//! RTC driver test for OpenPOWER systems
//!
//! This library runs a scripted sequence of hwclock exercises on a system
//! under test and asserts on each command's exit code.

pub mod cli;
pub mod commands;
pub mod common;
pub mod host;
pub mod testing;

// Re-export commonly used types for tests
pub use common::{Error, Result};
pub use host::{CommandOutput, Host, HostExecutor, ScriptedExecutor};
pub use testing::{RtcDriverTest, TestResult, TestScenario};
