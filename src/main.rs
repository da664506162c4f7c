//! rtctest - RTC driver validation for OpenPOWER hosts
//!
//! Drives a booted SUT through a scripted sequence of hwclock exercises and
//! fails on the first unexpected exit code.

use clap::Parser;
use rtctest::{cli, commands, common};
use commands::Commands;

#[derive(Parser)]
#[command(name = "rtctest", about = "RTC driver test for OpenPOWER hosts")]
#[command(version, long_about = None)]
struct Cli {
    /// Print every command and its output
    #[arg(long, short, global = true)]
    verbose: bool,

    /// Also write logs to the data directory
    #[arg(long, global = true)]
    log_file: bool,

    #[command(subcommand)]
    command: Commands,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    if let Some(path) = common::logging::init_cli(cli.verbose, cli.log_file) {
        tracing::info!(path = %path.display(), "Logging to file");
    }

    if let Err(e) = cli::dispatch(cli.command, cli.verbose).await {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}
