//! RTC test driver
//!
//! The RTC script is data ([`TestScenario`]) run by a small interpreter
//! ([`run_scenario`]) against whatever [`crate::host::HostExecutor`] the
//! caller provides.

mod config;
pub mod devices;
mod driver;
pub mod rtc;
mod runner;

pub use config::*;
pub use driver::{RtcDriverTest, Target};
pub use runner::{run_scenario, TestResult};
