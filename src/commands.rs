//! CLI command definitions
//!
//! Defines the clap commands for the RTC test CLI.

use clap::{Args, Subcommand};
use std::path::PathBuf;

#[derive(Subcommand)]
pub enum Commands {
    /// Run the RTC driver test against a host
    Run {
        #[command(flatten)]
        target: TargetArgs,

        /// Run a YAML scenario instead of the built-in RTC script
        #[arg(long)]
        scenario: Option<PathBuf>,

        /// Print the result as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show the exercises and commands a run would send, without connecting
    Plan {
        /// YAML scenario to show instead of the built-in RTC script
        #[arg(long)]
        scenario: Option<PathBuf>,

        /// Print the scenario as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show the effective configuration
    Config {
        #[command(flatten)]
        target: TargetArgs,
    },
}

/// Host selection, shared by commands that resolve a target
#[derive(Args, Debug, Default)]
pub struct TargetArgs {
    /// Configuration file (default: platform config dir)
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// SUT hostname or address
    #[arg(long)]
    pub host: Option<String>,

    /// Login user
    #[arg(long, short)]
    pub user: Option<String>,

    /// SSH port
    #[arg(long, short)]
    pub port: Option<u16>,

    /// SSH private key
    #[arg(long, short)]
    pub identity: Option<PathBuf>,

    /// Run commands on this machine instead of over ssh
    #[arg(long, conflicts_with = "host")]
    pub local: bool,
}
