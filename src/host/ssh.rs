//! Remote execution through the system ssh client
//!
//! One ssh process per command. BatchMode keeps ssh from ever prompting, so a
//! missing key shows up as a connection error instead of a hang.

use std::path::PathBuf;
use std::process::Stdio;

use async_trait::async_trait;
use tokio::process::Command;
use tokio::time::{timeout, Duration};

use crate::common::config::{Config, ExitStatusMode};
use crate::common::{Error, Result};

use super::{with_exit_marker, CommandOutput, HostExecutor};

/// Exit status ssh itself uses for connection and protocol failures
const SSH_FAILURE_STATUS: i32 = 255;

/// Executor that runs each command with `ssh user@host -- <command>`
#[derive(Debug, Clone)]
pub struct SshExecutor {
    binary: PathBuf,
    destination: String,
    port: u16,
    identity_file: Option<PathBuf>,
    options: Vec<String>,
    exit_status: ExitStatusMode,
    command_timeout: Duration,
}

impl SshExecutor {
    /// Build an executor for the host named in `config`
    pub fn from_config(config: &Config) -> Result<Self> {
        config.validate_remote()?;

        let binary = if config.ssh.binary.is_absolute() {
            config.ssh.binary.clone()
        } else {
            which::which(&config.ssh.binary).map_err(|e| {
                Error::Config(format!(
                    "ssh client '{}' not found: {}",
                    config.ssh.binary.display(),
                    e
                ))
            })?
        };

        let mut options = vec![
            "BatchMode=yes".to_string(),
            format!("ConnectTimeout={}", config.timeouts.connect_secs),
            format!(
                "StrictHostKeyChecking={}",
                config.ssh.strict_host_key_checking
            ),
        ];
        options.extend(config.ssh.extra_options.iter().cloned());

        Ok(Self {
            binary,
            destination: config.destination(),
            port: config.host.port,
            identity_file: config.host.identity_file.clone(),
            options,
            exit_status: config.ssh.exit_status,
            command_timeout: Duration::from_secs(config.timeouts.command_secs),
        })
    }

    /// Full ssh argument vector for one remote command
    pub fn build_args(&self, command: &str) -> Vec<String> {
        let mut args = Vec::with_capacity(self.options.len() * 2 + 7);
        for option in &self.options {
            args.push("-o".to_string());
            args.push(option.clone());
        }
        args.push("-p".to_string());
        args.push(self.port.to_string());
        if let Some(identity) = &self.identity_file {
            args.push("-i".to_string());
            args.push(identity.display().to_string());
        }
        args.push(self.destination.clone());
        args.push("--".to_string());
        args.push(match self.exit_status {
            ExitStatusMode::Process => command.to_string(),
            ExitStatusMode::Marker => with_exit_marker(command),
        });
        args
    }
}

#[async_trait]
impl HostExecutor for SshExecutor {
    async fn run(&mut self, command: &str) -> Result<CommandOutput> {
        let mut cmd = Command::new(&self.binary);
        cmd.args(self.build_args(command))
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let output = match timeout(self.command_timeout, cmd.output()).await {
            Ok(result) => result.map_err(|e| {
                Error::connection(&self.destination, format!("failed to spawn ssh: {}", e))
            })?,
            Err(_) => {
                return Err(Error::Timeout {
                    command: command.to_string(),
                    secs: self.command_timeout.as_secs(),
                })
            }
        };

        let stdout = String::from_utf8_lossy(&output.stdout);
        let stderr = String::from_utf8_lossy(&output.stderr);
        if !stderr.trim().is_empty() {
            tracing::debug!(command, stderr = %stderr.trim(), "ssh stderr");
        }

        let status = output.status.code().ok_or_else(|| {
            Error::connection(&self.destination, "ssh terminated by signal")
        })?;

        match self.exit_status {
            ExitStatusMode::Process => {
                if status == SSH_FAILURE_STATUS {
                    return Err(Error::connection(
                        &self.destination,
                        connection_reason(&stderr),
                    ));
                }
                Ok(CommandOutput::new(status, &stdout))
            }
            ExitStatusMode::Marker => match CommandOutput::from_marked(command, &stdout) {
                Ok(out) => Ok(out),
                Err(_) if status == SSH_FAILURE_STATUS => Err(Error::connection(
                    &self.destination,
                    connection_reason(&stderr),
                )),
                Err(e) => Err(e),
            },
        }
    }

    fn describe(&self) -> String {
        format!("ssh://{}:{}", self.destination, self.port)
    }
}

fn connection_reason(stderr: &str) -> String {
    stderr
        .lines()
        .rev()
        .find(|l| !l.trim().is_empty())
        .map(|l| l.trim().to_string())
        .unwrap_or_else(|| format!("ssh exited with status {}", SSH_FAILURE_STATUS))
}
