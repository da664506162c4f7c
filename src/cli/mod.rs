//! CLI command handling
//!
//! Resolves configuration, dispatches commands and formats their output.

use colored::Colorize;

use crate::commands::{Commands, TargetArgs};
use crate::common::config::{Config, Overrides};
use crate::common::{paths, Error, Result};
use crate::testing::{rtc, RtcDriverTest, Target, TestScenario, TestStep};

/// Dispatch a CLI command
pub async fn dispatch(command: Commands, verbose: bool) -> Result<()> {
    match command {
        Commands::Run {
            target,
            scenario,
            json,
        } => {
            let local = target.local;
            let config = resolve_config(target)?;
            let scenario = match scenario {
                Some(path) => TestScenario::load(&path)?,
                None => rtc::rtc_driver_scenario(),
            };

            let test = RtcDriverTest::new(config)
                .with_scenario(scenario)
                .with_target(if local { Target::Local } else { Target::Remote })
                .verbose(verbose);
            let result = test.run().await?;

            if json {
                println!("{}", serde_json::to_string_pretty(&result)?);
            }

            if result.passed {
                Ok(())
            } else {
                Err(Error::TestAssertion(format!(
                    "{} failed at step {}/{}: {}",
                    result.name,
                    result.steps_run,
                    result.steps_total,
                    result.error.as_deref().unwrap_or("unknown error")
                )))
            }
        }

        Commands::Plan { scenario, json } => {
            let scenario = match scenario {
                Some(path) => TestScenario::load(&path)?,
                None => rtc::rtc_driver_scenario(),
            };

            if json {
                println!("{}", serde_json::to_string_pretty(&scenario)?);
            } else {
                print_plan(&scenario);
            }
            Ok(())
        }

        Commands::Config { target } => {
            let explicit = target.config.clone();
            let config = resolve_config(target)?;

            let source = explicit
                .or_else(|| paths::config_path().filter(|p| p.exists()))
                .map(|p| p.display().to_string())
                .unwrap_or_else(|| "(defaults)".to_string());
            println!("# source: {}", source);
            let text = toml::to_string_pretty(&config)
                .map_err(|e| Error::Internal(format!("Failed to render configuration: {}", e)))?;
            print!("{}", text);
            Ok(())
        }
    }
}

/// Load the config file and apply command line overrides
fn resolve_config(target: TargetArgs) -> Result<Config> {
    let mut config = match &target.config {
        Some(path) => Config::load_from(path)?,
        None => Config::load()?,
    };
    config.apply(Overrides {
        address: target.host,
        user: target.user,
        port: target.port,
        identity_file: target.identity,
    });
    Ok(config)
}

/// Human-readable listing of what a run would do
fn print_plan(scenario: &TestScenario) {
    println!("{}", scenario.name.white().bold());
    if let Some(desc) = &scenario.description {
        println!("  {}", desc.dimmed());
    }
    if let Some(req) = &scenario.module {
        println!(
            "  module: {} (if {} is modular)",
            req.module, req.config_flag
        );
    }
    println!();

    for (i, step) in scenario.steps.iter().enumerate() {
        let num = i + 1;
        match step {
            TestStep::ReadDeviceFiles {
                directory,
                pattern,
                expect_exit,
            } => {
                println!("{:>3}. {}", num, step.label().cyan());
                println!(
                    "       hwclock -r -f {}/<*{}*>  (expect {})",
                    directory.trim_end_matches('/'),
                    pattern,
                    expect_exit
                );
            }
            TestStep::Exercise(ex) => {
                println!("{:>3}. {}  {}", num, ex.name.cyan(), ex.intent.dimmed());
                for cmd in &ex.commands {
                    println!("       {}  (expect {})", cmd.command, cmd.expect_exit);
                }
                for diag in &ex.diagnostics {
                    println!("       {}  (not checked)", diag.dimmed());
                }
                if ex.read_hwclock_after {
                    println!("       {}", "hwclock -r  (not checked)".dimmed());
                }
            }
            TestStep::ReadHwclock | TestStep::ReadSystime => {
                println!("{:>3}. {}  {}", num, step.label(), "(not checked)".dimmed());
            }
        }
    }
}
