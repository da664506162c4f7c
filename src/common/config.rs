//! Configuration file handling
//!
//! Everything the driver needs to reach the SUT lives here. The struct is
//! built once at startup and handed to the driver; nothing reads it globally.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use super::paths::config_path;
use super::{Error, Result};

/// Main configuration structure
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct Config {
    /// Target host settings
    #[serde(default)]
    pub host: HostConfig,

    /// SSH client settings
    #[serde(default)]
    pub ssh: SshConfig,

    /// Timeout settings
    #[serde(default)]
    pub timeouts: Timeouts,
}

/// Where the SUT is and how to log into it
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct HostConfig {
    /// Hostname or IP address of the SUT. Empty means "not configured".
    #[serde(default)]
    pub address: String,

    /// Login user
    #[serde(default = "default_user")]
    pub user: String,

    /// SSH port
    #[serde(default = "default_port")]
    pub port: u16,

    /// Private key passed to ssh with `-i`
    #[serde(default)]
    pub identity_file: Option<PathBuf>,
}

impl Default for HostConfig {
    fn default() -> Self {
        Self {
            address: String::new(),
            user: default_user(),
            port: default_port(),
            identity_file: None,
        }
    }
}

fn default_user() -> String {
    "root".to_string()
}

fn default_port() -> u16 {
    22
}

/// How the executor learns a command's exit status
#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum ExitStatusMode {
    /// Use the exit status of the ssh process (ssh forwards the remote status)
    #[default]
    Process,
    /// Append `; echo; echo $?` and parse the trailing line of stdout
    Marker,
}

/// SSH client settings
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SshConfig {
    /// ssh binary; looked up in PATH when relative
    #[serde(default = "default_ssh_binary")]
    pub binary: PathBuf,

    /// Value for `-o StrictHostKeyChecking=`
    #[serde(default = "default_strict_host_key_checking")]
    pub strict_host_key_checking: String,

    /// Extra `-o` options, e.g. `UserKnownHostsFile=/dev/null`
    #[serde(default)]
    pub extra_options: Vec<String>,

    /// Exit status strategy
    #[serde(default)]
    pub exit_status: ExitStatusMode,
}

impl Default for SshConfig {
    fn default() -> Self {
        Self {
            binary: default_ssh_binary(),
            strict_host_key_checking: default_strict_host_key_checking(),
            extra_options: Vec::new(),
            exit_status: ExitStatusMode::default(),
        }
    }
}

fn default_ssh_binary() -> PathBuf {
    PathBuf::from("ssh")
}

fn default_strict_host_key_checking() -> String {
    "accept-new".to_string()
}

/// Timeout settings in seconds
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Timeouts {
    /// ssh `ConnectTimeout`
    #[serde(default = "default_connect")]
    pub connect_secs: u64,

    /// Upper bound for a single remote command
    #[serde(default = "default_command")]
    pub command_secs: u64,

    /// How long to wait for the host to answer before giving up on the OS state
    #[serde(default = "default_boot_wait")]
    pub boot_wait_secs: u64,

    /// Delay between reachability probes
    #[serde(default = "default_poll_interval")]
    pub poll_interval_secs: u64,
}

impl Default for Timeouts {
    fn default() -> Self {
        Self {
            connect_secs: default_connect(),
            command_secs: default_command(),
            boot_wait_secs: default_boot_wait(),
            poll_interval_secs: default_poll_interval(),
        }
    }
}

fn default_connect() -> u64 {
    10
}
fn default_command() -> u64 {
    300
}
fn default_boot_wait() -> u64 {
    600
}
fn default_poll_interval() -> u64 {
    5
}

/// Values given on the command line, applied on top of the file
#[derive(Debug, Default, Clone)]
pub struct Overrides {
    pub address: Option<String>,
    pub user: Option<String>,
    pub port: Option<u16>,
    pub identity_file: Option<PathBuf>,
}

impl Config {
    /// Load configuration from the default config file
    ///
    /// Returns default configuration if file doesn't exist
    pub fn load() -> Result<Self> {
        match config_path() {
            Some(path) if path.exists() => Self::load_from(&path),
            _ => Ok(Self::default()),
        }
    }

    /// Load configuration from an explicit file
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| Error::FileRead {
            path: path.display().to_string(),
            error: e.to_string(),
        })?;
        toml::from_str(&content).map_err(|e| Error::ConfigParse(e.to_string()))
    }

    /// Apply command line overrides
    pub fn apply(&mut self, overrides: Overrides) {
        if let Some(address) = overrides.address {
            self.host.address = address;
        }
        if let Some(user) = overrides.user {
            self.host.user = user;
        }
        if let Some(port) = overrides.port {
            self.host.port = port;
        }
        if overrides.identity_file.is_some() {
            self.host.identity_file = overrides.identity_file;
        }
    }

    /// Check that a remote run has a target
    pub fn validate_remote(&self) -> Result<()> {
        if self.host.address.trim().is_empty() {
            return Err(Error::Config(
                "No host configured. Pass --host or set [host] address in config.toml".to_string(),
            ));
        }
        if self.timeouts.command_secs == 0 {
            return Err(Error::Config(
                "timeouts.command_secs must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }

    /// `user@address` as passed to ssh
    pub fn destination(&self) -> String {
        if self.host.user.is_empty() {
            self.host.address.clone()
        } else {
            format!("{}@{}", self.host.user, self.host.address)
        }
    }
}
