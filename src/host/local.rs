//! Local execution, for running the suite directly on the SUT

use std::process::Stdio;

use async_trait::async_trait;
use tokio::process::Command;
use tokio::time::{timeout, Duration};

use crate::common::{Error, Result};

use super::{CommandOutput, HostExecutor};

/// Executor that runs commands with `sh -c` on this machine
#[derive(Debug, Clone)]
pub struct LocalExecutor {
    command_timeout: Duration,
}

impl LocalExecutor {
    pub fn new(command_timeout: Duration) -> Self {
        Self { command_timeout }
    }
}

#[async_trait]
impl HostExecutor for LocalExecutor {
    async fn run(&mut self, command: &str) -> Result<CommandOutput> {
        let mut cmd = Command::new("sh");
        cmd.arg("-c")
            .arg(command)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let output = timeout(self.command_timeout, cmd.output())
            .await
            .map_err(|_| Error::Timeout {
                command: command.to_string(),
                secs: self.command_timeout.as_secs(),
            })??;

        let stderr = String::from_utf8_lossy(&output.stderr);
        if !stderr.trim().is_empty() {
            tracing::debug!(command, stderr = %stderr.trim(), "sh stderr");
        }

        let exit_code = output.status.code().ok_or_else(|| {
            Error::Internal(format!("'{}' was terminated by a signal", command))
        })?;

        Ok(CommandOutput::new(
            exit_code,
            &String::from_utf8_lossy(&output.stdout),
        ))
    }

    fn describe(&self) -> String {
        "localhost".to_string()
    }
}
