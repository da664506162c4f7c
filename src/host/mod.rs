//! Host collaborators
//!
//! The driver never talks to a transport directly. It goes through [`Host`],
//! which wraps a [`HostExecutor`] (ssh, local shell, or a scripted fake) and
//! adds the handful of well-known queries the RTC run needs.

pub mod local;
pub mod modules;
pub mod scripted;
pub mod ssh;
pub mod system;

use async_trait::async_trait;
use serde::Serialize;

use crate::common::{Error, Result};

pub use local::LocalExecutor;
pub use scripted::ScriptedExecutor;
pub use ssh::SshExecutor;
pub use system::{ReachabilityController, SystemController, SystemState};

/// Runs a shell command line on the SUT
#[async_trait]
pub trait HostExecutor: Send {
    /// Run `command` and wait for it to finish
    async fn run(&mut self, command: &str) -> Result<CommandOutput>;

    /// Short human-readable target description for logs
    fn describe(&self) -> String;
}

/// Result of one command on the SUT
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CommandOutput {
    pub exit_code: i32,
    pub stdout: Vec<String>,
}

impl CommandOutput {
    /// Build from an exit code and raw stdout text
    pub fn new(exit_code: i32, stdout: &str) -> Self {
        Self {
            exit_code,
            stdout: stdout.lines().map(str::to_string).collect(),
        }
    }

    /// Build from output of [`with_exit_marker`]
    ///
    /// The marker line is removed from `stdout`.
    pub fn from_marked(command: &str, stdout: &str) -> Result<Self> {
        let mut lines: Vec<String> = stdout.lines().map(str::to_string).collect();
        while lines.last().is_some_and(|l| l.trim().is_empty()) {
            lines.pop();
        }
        let exit_code = parse_exit_marker(command, &lines)?;
        lines.pop();
        // Separator echoed ahead of the marker
        if lines.last().is_some_and(|l| l.is_empty()) {
            lines.pop();
        }
        Ok(Self {
            exit_code,
            stdout: lines,
        })
    }

    pub fn success(&self) -> bool {
        self.exit_code == 0
    }

    /// Stdout joined back into one string
    pub fn text(&self) -> String {
        self.stdout.join("\n")
    }
}

/// Append the exit status marker to a command
///
/// The bare `echo` keeps the marker on its own line when the command's
/// output does not end in a newline.
pub fn with_exit_marker(command: &str) -> String {
    format!("{}; echo; echo $?", command)
}

/// Parse the decimal exit status from the last line of `lines`
///
/// Anything before the last line is diagnostic output and is ignored.
pub fn parse_exit_marker(command: &str, lines: &[String]) -> Result<i32> {
    let last = lines.last().map(|l| l.trim());
    last.and_then(|l| l.parse::<i32>().ok())
        .ok_or_else(|| Error::ExitMarker {
            command: command.to_string(),
            last_line: last.map(str::to_string),
        })
}

/// The SUT as seen by the driver
pub struct Host {
    executor: Box<dyn HostExecutor>,
    commands_run: usize,
}

impl Host {
    pub fn new(executor: Box<dyn HostExecutor>) -> Self {
        Self {
            executor,
            commands_run: 0,
        }
    }

    pub fn describe(&self) -> String {
        self.executor.describe()
    }

    /// Number of commands sent so far
    pub fn commands_run(&self) -> usize {
        self.commands_run
    }

    /// Run a command without asserting on its exit code
    pub async fn run(&mut self, command: &str) -> Result<CommandOutput> {
        tracing::debug!(command, "Running host command");
        self.commands_run += 1;
        let output = self.executor.run(command).await?;
        tracing::debug!(
            command,
            exit_code = output.exit_code,
            lines = output.stdout.len(),
            "Host command finished"
        );
        for line in &output.stdout {
            tracing::trace!("  | {}", line);
        }
        Ok(output)
    }

    /// Run a command and require `expected` as its exit code
    pub async fn run_checked(
        &mut self,
        exercise: &str,
        command: &str,
        expected: i32,
    ) -> Result<CommandOutput> {
        let output = self.run(command).await?;
        if output.exit_code != expected {
            return Err(Error::unexpected_exit(
                exercise,
                command,
                expected,
                output.exit_code,
            ));
        }
        Ok(output)
    }

    /// `hwclock -V`, for the log only
    pub async fn hwclock_version(&mut self) -> Result<String> {
        let output = self.run("hwclock -V").await?;
        Ok(output.text().trim().to_string())
    }

    /// Running kernel release (`uname -r`), for the log and module lookup
    ///
    /// Unasserted: a failing or empty `uname -r` gives `None`.
    pub async fn kernel_version(&mut self) -> Result<Option<String>> {
        let output = self.run("uname -r").await?;
        let release = output.text().trim().to_string();
        if !output.success() || release.is_empty() {
            tracing::warn!(exit_code = output.exit_code, "uname -r returned no kernel release");
            return Ok(None);
        }
        Ok(Some(release))
    }

    /// `PRETTY_NAME` from /etc/os-release, if the host has one
    pub async fn os_name(&mut self) -> Result<Option<String>> {
        let output = self.run("cat /etc/os-release").await?;
        if !output.success() {
            return Ok(None);
        }
        Ok(parse_pretty_name(&output.stdout))
    }

    /// Read the hardware clock (diagnostic)
    pub async fn read_hwclock(&mut self) -> Result<CommandOutput> {
        let output = self.run("hwclock -r").await?;
        tracing::info!(exit_code = output.exit_code, "hwclock: {}", output.text().trim());
        Ok(output)
    }

    /// Read the system time (diagnostic)
    pub async fn read_systime(&mut self) -> Result<CommandOutput> {
        let output = self.run("date").await?;
        tracing::info!(exit_code = output.exit_code, "system time: {}", output.text().trim());
        Ok(output)
    }

    /// One entry per line of `ls -1 <directory>`
    pub async fn list_dir(&mut self, directory: &str) -> Result<Vec<String>> {
        let command = format!("ls -1 {}", crate::common::shell_quote(directory));
        let output = self.run(&command).await?;
        if !output.success() {
            tracing::warn!(directory, exit_code = output.exit_code, "Directory listing failed");
        }
        Ok(output.stdout)
    }
}

fn parse_pretty_name(lines: &[String]) -> Option<String> {
    lines.iter().find_map(|line| {
        line.strip_prefix("PRETTY_NAME=")
            .map(|v| v.trim().trim_matches('"').to_string())
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lines(v: &[&str]) -> Vec<String> {
        v.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_marker_selects_last_line() {
        let out = lines(&["hwclock: using /dev/rtc0", "Mon 01 Jan 2018", "0"]);
        assert_eq!(parse_exit_marker("hwclock -r", &out).unwrap(), 0);

        let out = lines(&["124"]);
        assert_eq!(parse_exit_marker("timeout 10 hwclock --compare", &out).unwrap(), 124);

        // A numeric diagnostic line earlier in the output is not the marker
        let out = lines(&["7", "some output", "3"]);
        assert_eq!(parse_exit_marker("x", &out).unwrap(), 3);
    }

    #[test]
    fn test_marker_missing() {
        let err = parse_exit_marker("hwclock -r", &[]).unwrap_err();
        assert!(matches!(err, Error::ExitMarker { last_line: None, .. }));

        let err = parse_exit_marker("hwclock -r", &lines(&["0", "not a number"])).unwrap_err();
        match err {
            Error::ExitMarker { last_line, .. } => {
                assert_eq!(last_line.as_deref(), Some("not a number"));
            }
            _ => panic!("Expected ExitMarker error"),
        }
    }

    #[test]
    fn test_from_marked_strips_marker() {
        let out =
            CommandOutput::from_marked("hwclock -r", "2016-01-01 20:20:20\n\n0\n\n").unwrap();
        assert_eq!(out.exit_code, 0);
        assert_eq!(out.stdout, lines(&["2016-01-01 20:20:20"]));
    }

    #[test]
    fn test_from_marked_output_without_trailing_newline() {
        // `printf LOCAL; echo; echo $?` prints "LOCAL\n0\n"
        let out = CommandOutput::from_marked("printf LOCAL", "LOCAL\n0\n").unwrap();
        assert_eq!(out.exit_code, 0);
        assert_eq!(out.stdout, lines(&["LOCAL"]));
    }

    #[test]
    fn test_from_marked_keeps_real_blank_line() {
        let out = CommandOutput::from_marked("cat /etc/adjtime", "0.0 0 0.0\n\n\n1\n").unwrap();
        assert_eq!(out.exit_code, 1);
        assert_eq!(out.stdout, lines(&["0.0 0 0.0", ""]));
    }

    #[test]
    fn test_with_exit_marker() {
        assert_eq!(
            with_exit_marker("hwclock --adjust"),
            "hwclock --adjust; echo; echo $?"
        );
    }

    #[test]
    fn test_parse_pretty_name() {
        let os_release = lines(&[
            "NAME=\"Ubuntu\"",
            "PRETTY_NAME=\"Ubuntu 22.04.3 LTS\"",
            "VERSION_ID=\"22.04\"",
        ]);
        assert_eq!(
            parse_pretty_name(&os_release).as_deref(),
            Some("Ubuntu 22.04.3 LTS")
        );
        assert_eq!(parse_pretty_name(&lines(&["NAME=x"])), None);
    }
}
