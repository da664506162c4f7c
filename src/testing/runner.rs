//! Test runner implementation
//!
//! Interprets a [`TestScenario`] against a [`Host`]. Steps run strictly in
//! order; the first unexpected exit code stops the run and is reported as a
//! failed [`TestResult`]. Transport errors are not test failures and are
//! returned as `Err` instead.

use colored::Colorize;
use serde::Serialize;

use crate::common::{shell_quote, Error, Result};
use crate::host::modules::load_module_based_on_config;
use crate::host::{Host, SystemController, SystemState};

use super::config::{Exercise, TestScenario, TestStep};
use super::devices;

/// Result of a test run
#[derive(Debug, Clone, Serialize)]
pub struct TestResult {
    pub name: String,
    pub passed: bool,
    pub steps_run: usize,
    pub steps_total: usize,
    pub commands_run: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failed_step: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Run a scenario against `host`
pub async fn run_scenario(
    scenario: &TestScenario,
    host: &mut Host,
    system: &mut dyn SystemController,
    verbose: bool,
) -> Result<TestResult> {
    let steps_total = scenario.steps.len();

    println!(
        "\n{} {}",
        "Running Test:".blue().bold(),
        scenario.name.white().bold()
    );
    if let Some(desc) = &scenario.description {
        println!("  {}", desc.dimmed());
    }

    // TODO: also run the scenario from skiroot once a petitboot console executor exists
    println!("\n{}", "Setup:".cyan());
    system
        .goto_state(host, SystemState::OperatingSystem)
        .await?;
    println!("  {} {} at {}", "✓".green(), host.describe(), SystemState::OperatingSystem);

    let hwclock = host.hwclock_version().await?;
    let kernel = host.kernel_version().await?;
    let os = host.os_name().await?;
    tracing::info!(
        %hwclock,
        kernel = kernel.as_deref().unwrap_or("unknown"),
        os = os.as_deref().unwrap_or("unknown"),
        "Host identification"
    );
    if verbose {
        println!("  hwclock: {}", hwclock.dimmed());
        println!("  kernel:  {}", kernel.as_deref().unwrap_or("unknown").dimmed());
        if let Some(os) = &os {
            println!("  os:      {}", os.dimmed());
        }
    }

    if let Some(req) = &scenario.module {
        // The kernel config file is named after the release
        let kernel = kernel.as_deref().ok_or_else(|| {
            Error::kernel_config("unknown", &req.config_flag, "kernel release unavailable")
        })?;
        let status =
            load_module_based_on_config(host, kernel, &req.config_flag, &req.module).await?;
        println!("  {} {} ({:?})", "✓".green(), req.module, status);
    }

    // Execute test steps
    println!("\n{}", "Steps:".cyan());

    for (i, step) in scenario.steps.iter().enumerate() {
        let step_num = i + 1;

        match execute_step(host, step, step_num, verbose).await {
            Ok(()) => {}
            Err(e) if e.is_assertion() => {
                println!("  {} Step {}: {}", "✗".red(), step_num, e);
                tracing::error!(step = step_num, error = %e, "Exercise failed");

                return Ok(TestResult {
                    name: scenario.name.clone(),
                    passed: false,
                    steps_run: step_num,
                    steps_total,
                    commands_run: host.commands_run(),
                    failed_step: Some(step.label()),
                    error: Some(e.to_string()),
                });
            }
            Err(e) => return Err(e),
        }
    }

    println!(
        "\n{} {}\n",
        "✓".green().bold(),
        "Test Passed".green().bold()
    );

    Ok(TestResult {
        name: scenario.name.clone(),
        passed: true,
        steps_run: steps_total,
        steps_total,
        commands_run: host.commands_run(),
        failed_step: None,
        error: None,
    })
}

/// Execute a single test step
async fn execute_step(
    host: &mut Host,
    step: &TestStep,
    step_num: usize,
    verbose: bool,
) -> Result<()> {
    match step {
        TestStep::ReadDeviceFiles {
            directory,
            pattern,
            expect_exit,
        } => {
            execute_device_files_step(host, directory, pattern, *expect_exit, step_num, verbose)
                .await
        }
        TestStep::Exercise(exercise) => {
            execute_exercise_step(host, exercise, step_num, verbose).await
        }
        TestStep::ReadHwclock => {
            let out = host.read_hwclock().await?;
            print_diagnostic(step_num, "hwclock -r", &out.stdout, verbose);
            Ok(())
        }
        TestStep::ReadSystime => {
            let out = host.read_systime().await?;
            print_diagnostic(step_num, "date", &out.stdout, verbose);
            Ok(())
        }
    }
}

/// Read the hardware clock from each discovered special file
async fn execute_device_files_step(
    host: &mut Host,
    directory: &str,
    pattern: &str,
    expect_exit: i32,
    step_num: usize,
    verbose: bool,
) -> Result<()> {
    let files = devices::discover(host, directory, pattern).await?;
    if files.is_empty() {
        tracing::warn!(directory, pattern, "No device files found");
    }

    for file in &files {
        tracing::info!("Reading the hwclock from special file {}", file);
        let command = format!("hwclock -r -f {}", shell_quote(file));
        let out = host.run_checked("read-from-file", &command, expect_exit).await?;
        if verbose {
            for line in &out.stdout {
                println!("      {}", line.dimmed());
            }
        }
    }

    println!(
        "  {} Step {}: read-from-file ({} device file{})",
        "✓".green(),
        step_num,
        files.len(),
        if files.len() == 1 { "" } else { "s" }
    );
    Ok(())
}

/// Run an exercise's asserted commands, then its diagnostics
async fn execute_exercise_step(
    host: &mut Host,
    exercise: &Exercise,
    step_num: usize,
    verbose: bool,
) -> Result<()> {
    tracing::info!(exercise = %exercise.name, "{}", exercise.intent);

    for cmd in &exercise.commands {
        if verbose {
            println!("    $ {}", cmd.command.dimmed());
        }
        let out = host
            .run_checked(&exercise.name, &cmd.command, cmd.expect_exit)
            .await?;
        if verbose {
            for line in &out.stdout {
                println!("      {}", line.dimmed());
            }
        }
    }

    println!(
        "  {} Step {}: {} {}",
        "✓".green(),
        step_num,
        exercise.name,
        exercise.intent.dimmed()
    );

    for diag in &exercise.diagnostics {
        let out = host.run(diag).await?;
        tracing::info!(command = %diag, exit_code = out.exit_code, "{}", out.text());
        print_diagnostic(step_num, diag, &out.stdout, verbose);
    }

    if exercise.read_hwclock_after {
        let out = host.read_hwclock().await?;
        print_diagnostic(step_num, "hwclock -r", &out.stdout, verbose);
    }
    Ok(())
}

fn print_diagnostic(step_num: usize, command: &str, stdout: &[String], verbose: bool) {
    if !verbose {
        return;
    }
    println!("    {} [{}] {}", "·".dimmed(), step_num, command.dimmed());
    for line in stdout {
        println!("      {}", line.dimmed());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::{ReachabilityController, ScriptedExecutor};
    use crate::testing::config::ModuleRequirement;
    use tokio::time::Duration;

    fn executor() -> ScriptedExecutor {
        ScriptedExecutor::new().on_exact("uname -r", 0, "6.1.0-ppc64le\n")
    }

    fn system() -> ReachabilityController {
        ReachabilityController::new(Duration::ZERO, Duration::ZERO)
    }

    fn scenario(steps: Vec<TestStep>) -> TestScenario {
        TestScenario {
            name: "unit".to_string(),
            description: None,
            module: None,
            steps,
        }
    }

    #[tokio::test]
    async fn test_missing_kernel_release_is_not_asserted() {
        let exec = ScriptedExecutor::new()
            .on_exact("uname -r", 1, "")
            .on_prefix("hwclock --systohc", 0, "");
        let log = exec.log();
        let mut host = Host::new(Box::new(exec));
        let scenario = scenario(vec![TestStep::Exercise(
            Exercise::new("systohc", "systohc").command("hwclock --systohc"),
        )]);

        let result = run_scenario(&scenario, &mut host, &mut system(), false)
            .await
            .unwrap();
        assert!(result.passed);
        assert!(log.contains_prefix("hwclock --systohc"));
    }

    #[tokio::test]
    async fn test_module_requires_kernel_release() {
        let exec = ScriptedExecutor::new().on_exact("uname -r", 1, "");
        let log = exec.log();
        let mut host = Host::new(Box::new(exec));
        let mut scenario = scenario(vec![TestStep::ReadHwclock]);
        scenario.module = Some(ModuleRequirement {
            config_flag: "CONFIG_RTC_DRV_OPAL".to_string(),
            module: "rtc-opal".to_string(),
        });

        let err = run_scenario(&scenario, &mut host, &mut system(), false)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::KernelConfig { .. }));
        assert!(!log.contains_prefix("grep"));
        assert!(!log.commands().contains(&"hwclock -r".to_string()));
    }

    #[tokio::test]
    async fn test_exercise_without_hwclock_read() {
        let exec = executor().on_prefix("timeout", 124, "");
        let log = exec.log();
        let mut host = Host::new(Box::new(exec));
        let scenario = scenario(vec![TestStep::Exercise(
            Exercise::new("compare", "compare")
                .expect("timeout 10 hwclock --compare", 124)
                .without_hwclock_read(),
        )]);

        let result = run_scenario(&scenario, &mut host, &mut system(), false)
            .await
            .unwrap();
        assert!(result.passed);
        assert_eq!(
            log.commands().last().map(String::as_str),
            Some("timeout 10 hwclock --compare")
        );
        assert!(!log.contains_prefix("hwclock -r"));
    }

    #[tokio::test]
    async fn test_exercise_passes_on_expected_code() {
        let exec = executor().on_prefix("timeout", 124, "");
        let log = exec.log();
        let mut host = Host::new(Box::new(exec));
        let scenario = scenario(vec![TestStep::Exercise(
            Exercise::new("compare", "compare").expect("timeout 10 hwclock --compare", 124),
        )]);

        let result = run_scenario(&scenario, &mut host, &mut system(), false)
            .await
            .unwrap();
        assert!(result.passed);
        assert_eq!(result.steps_run, 1);
        assert!(log.contains_prefix("hwclock -r"));
    }

    #[tokio::test]
    async fn test_failure_stops_remaining_steps() {
        let exec = executor().on_prefix("hwclock --utc", 1, "");
        let log = exec.log();
        let mut host = Host::new(Box::new(exec));
        let scenario = scenario(vec![
            TestStep::Exercise(Exercise::new("keep-utc", "utc").command("hwclock --utc")),
            TestStep::Exercise(Exercise::new("keep-localtime", "local").command("hwclock --localtime")),
        ]);

        let result = run_scenario(&scenario, &mut host, &mut system(), false)
            .await
            .unwrap();
        assert!(!result.passed);
        assert_eq!(result.steps_run, 1);
        assert_eq!(result.failed_step.as_deref(), Some("keep-utc"));
        assert!(result.error.unwrap().contains("keep-utc"));
        assert_eq!(log.commands().last().map(String::as_str), Some("hwclock --utc"));
        assert!(!log.contains_prefix("hwclock --localtime"));
        // The failed exercise's trailing hwclock read is skipped too
        assert!(!log.contains_prefix("hwclock -r"));
    }

    #[tokio::test]
    async fn test_diagnostics_are_not_asserted() {
        let exec = executor()
            .on_prefix("cat /etc/adjtime", 1, "cat: /etc/adjtime: No such file")
            .on_exact("hwclock -r", 1, "");
        let mut host = Host::new(Box::new(exec));
        let scenario = scenario(vec![
            TestStep::ReadHwclock,
            TestStep::ReadSystime,
            TestStep::Exercise(
                Exercise::new("adjust", "adjust")
                    .command("hwclock --adjust")
                    .diagnostic("cat /etc/adjtime"),
            ),
        ]);

        let result = run_scenario(&scenario, &mut host, &mut system(), true)
            .await
            .unwrap();
        assert!(result.passed);
    }

    #[tokio::test]
    async fn test_transport_error_is_err() {
        let exec = executor().disconnect_on("hwclock --systohc");
        let mut host = Host::new(Box::new(exec));
        let scenario = scenario(vec![TestStep::Exercise(
            Exercise::new("systohc", "systohc").command("hwclock --systohc"),
        )]);

        let err = run_scenario(&scenario, &mut host, &mut system(), false)
            .await
            .unwrap_err();
        assert!(!err.is_assertion());
    }

    #[tokio::test]
    async fn test_device_file_read_failure() {
        let exec = executor()
            .on_prefix("ls -1", 0, "rtc0\ntty0\nrtc1\n")
            .on_exact("hwclock -r -f '/dev/rtc1'", 1, "");
        let log = exec.log();
        let mut host = Host::new(Box::new(exec));
        let scenario = scenario(vec![
            TestStep::ReadDeviceFiles {
                directory: "/dev".to_string(),
                pattern: "rtc".to_string(),
                expect_exit: 0,
            },
            TestStep::ReadHwclock,
        ]);

        let result = run_scenario(&scenario, &mut host, &mut system(), false)
            .await
            .unwrap();
        assert!(!result.passed);
        assert!(log.contains_prefix("hwclock -r -f '/dev/rtc0'"));
        assert!(!log.commands().contains(&"hwclock -r".to_string()));
    }
}
