//! System state control
//!
//! The SUT is provisioned outside this tool. All the controller has to do is
//! make sure the operating system is up and answering before the first
//! exercise runs.

use std::fmt;

use async_trait::async_trait;
use tokio::time::{sleep, Duration, Instant};

use crate::common::config::Config;
use crate::common::{Error, Result};

use super::Host;

/// States the driver can ask for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SystemState {
    Unknown,
    OperatingSystem,
}

impl fmt::Display for SystemState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SystemState::Unknown => write!(f, "unknown"),
            SystemState::OperatingSystem => write!(f, "operating system"),
        }
    }
}

/// Moves the SUT into a requested state
#[async_trait]
pub trait SystemController: Send {
    /// Block until the SUT is in `state` or report why it cannot get there
    async fn goto_state(&mut self, host: &mut Host, state: SystemState) -> Result<()>;

    /// Last state reached
    fn state(&self) -> SystemState;
}

/// Treats "answers a trivial command" as "booted to the OS"
#[derive(Debug, Clone)]
pub struct ReachabilityController {
    boot_wait: Duration,
    poll_interval: Duration,
    state: SystemState,
}

impl ReachabilityController {
    pub fn new(boot_wait: Duration, poll_interval: Duration) -> Self {
        Self {
            boot_wait,
            poll_interval,
            state: SystemState::Unknown,
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(
            Duration::from_secs(config.timeouts.boot_wait_secs),
            Duration::from_secs(config.timeouts.poll_interval_secs),
        )
    }
}

#[async_trait]
impl SystemController for ReachabilityController {
    async fn goto_state(&mut self, host: &mut Host, state: SystemState) -> Result<()> {
        if state != SystemState::OperatingSystem {
            return Err(Error::Config(format!(
                "Cannot drive the host to state '{}'",
                state
            )));
        }
        if self.state == state {
            return Ok(());
        }

        let deadline = Instant::now() + self.boot_wait;
        let mut attempts = 0u32;
        loop {
            attempts += 1;
            match host.run("true").await {
                Ok(out) if out.success() => {
                    tracing::info!(host = %host.describe(), attempts, "Host is at {}", state);
                    self.state = state;
                    return Ok(());
                }
                Ok(out) => {
                    tracing::debug!(exit_code = out.exit_code, "Reachability probe failed");
                }
                Err(e @ (Error::Connection { .. } | Error::Timeout { .. })) => {
                    tracing::debug!(error = %e, "Host not reachable yet");
                }
                Err(e) => return Err(e),
            }

            if Instant::now() >= deadline {
                return Err(Error::SystemState {
                    state: state.to_string(),
                    secs: self.boot_wait.as_secs(),
                });
            }
            sleep(self.poll_interval).await;
        }
    }

    fn state(&self) -> SystemState {
        self.state
    }
}
