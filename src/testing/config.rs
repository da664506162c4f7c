//! Test scenario configuration types
//!
//! A scenario is the RTC script as data: an ordered list of steps that the
//! runner interprets one at a time. The built-in scenario lives in
//! [`super::rtc`]; the same types deserialize from YAML.

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::common::{Error, Result};

/// A complete test scenario
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
pub struct TestScenario {
    /// Name of the test scenario
    pub name: String,
    /// Optional description of what the test verifies
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Kernel module to make available before the steps run
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub module: Option<ModuleRequirement>,
    /// The sequence of test steps to execute
    pub steps: Vec<TestStep>,
}

/// Kernel module gated on a kernel config flag
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
pub struct ModuleRequirement {
    pub config_flag: String,
    pub module: String,
}

/// A single test step in the execution flow
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum TestStep {
    /// Read the hardware clock from every matching special file
    ReadDeviceFiles {
        /// Directory to list (e.g. "/dev")
        directory: String,
        /// Substring an entry must contain (e.g. "rtc")
        pattern: String,
        /// Expected exit code of each read
        #[serde(default)]
        expect_exit: i32,
    },
    /// Run an asserted exercise
    Exercise(Exercise),
    /// Read the hardware clock, unasserted
    ReadHwclock,
    /// Read the system time, unasserted
    ReadSystime,
}

/// One named exercise: asserted commands plus unasserted follow-ups
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
pub struct Exercise {
    pub name: String,
    /// Printed before the exercise runs
    pub intent: String,
    pub commands: Vec<CheckedCommand>,
    /// Commands run after the asserted ones, output logged only
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub diagnostics: Vec<String>,
    #[serde(default = "default_true")]
    pub read_hwclock_after: bool,
}

/// A command and the exit code it must return
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
pub struct CheckedCommand {
    pub command: String,
    #[serde(default)]
    pub expect_exit: i32,
}

fn default_true() -> bool {
    true
}

impl Exercise {
    pub fn new(name: &str, intent: impl Into<String>) -> Self {
        Self {
            name: name.to_string(),
            intent: intent.into(),
            commands: Vec::new(),
            diagnostics: Vec::new(),
            read_hwclock_after: true,
        }
    }

    /// Add a command expected to exit 0
    pub fn command(self, command: impl Into<String>) -> Self {
        self.expect(command, 0)
    }

    /// Add a command expected to exit with `code`
    pub fn expect(mut self, command: impl Into<String>, code: i32) -> Self {
        self.commands.push(CheckedCommand {
            command: command.into(),
            expect_exit: code,
        });
        self
    }

    /// Add an unasserted follow-up command
    pub fn diagnostic(mut self, command: impl Into<String>) -> Self {
        self.diagnostics.push(command.into());
        self
    }

    pub fn without_hwclock_read(mut self) -> Self {
        self.read_hwclock_after = false;
        self
    }
}

impl TestStep {
    /// Short label for console output
    pub fn label(&self) -> String {
        match self {
            TestStep::ReadDeviceFiles {
                directory, pattern, ..
            } => format!("read-from-file ({}/*{}*)", directory.trim_end_matches('/'), pattern),
            TestStep::Exercise(ex) => ex.name.clone(),
            TestStep::ReadHwclock => "read hwclock".to_string(),
            TestStep::ReadSystime => "read systime".to_string(),
        }
    }
}

impl TestScenario {
    /// Load and validate a scenario from a YAML file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| Error::FileRead {
            path: path.display().to_string(),
            error: e.to_string(),
        })?;
        Self::from_yaml(&content)
    }

    /// Parse and validate a scenario from YAML text
    pub fn from_yaml(content: &str) -> Result<Self> {
        let scenario: TestScenario = serde_yaml::from_str(content)
            .map_err(|e| Error::ScenarioParse(e.to_string()))?;
        scenario.validate()?;
        Ok(scenario)
    }

    /// Reject scenarios the runner cannot interpret meaningfully
    pub fn validate(&self) -> Result<()> {
        if self.steps.is_empty() {
            return Err(Error::ScenarioParse(format!(
                "scenario '{}' has no steps",
                self.name
            )));
        }
        for (i, step) in self.steps.iter().enumerate() {
            match step {
                TestStep::Exercise(ex) => {
                    if ex.name.trim().is_empty() {
                        return Err(Error::ScenarioParse(format!("step {} has no name", i + 1)));
                    }
                    if ex.commands.is_empty() {
                        return Err(Error::ScenarioParse(format!(
                            "exercise '{}' has no commands",
                            ex.name
                        )));
                    }
                    if let Some(c) = ex.commands.iter().find(|c| c.command.trim().is_empty()) {
                        return Err(Error::ScenarioParse(format!(
                            "exercise '{}' has an empty command (expect_exit {})",
                            ex.name, c.expect_exit
                        )));
                    }
                }
                TestStep::ReadDeviceFiles {
                    directory, pattern, ..
                } => {
                    if directory.is_empty() || pattern.is_empty() {
                        return Err(Error::ScenarioParse(format!(
                            "step {} needs both directory and pattern",
                            i + 1
                        )));
                    }
                }
                TestStep::ReadHwclock | TestStep::ReadSystime => {}
            }
        }
        Ok(())
    }

    /// Exercises in order, skipping the diagnostic reads
    pub fn exercises(&self) -> impl Iterator<Item = &Exercise> {
        self.steps.iter().filter_map(|s| match s {
            TestStep::Exercise(ex) => Some(ex),
            _ => None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const YAML: &str = r#"
name: reduced rtc
description: just the compare
module:
  config_flag: CONFIG_RTC_DRV_OPAL
  module: rtc_opal
steps:
  - action: read_device_files
    directory: /dev
    pattern: rtc
  - action: read_hwclock
  - action: exercise
    name: compare
    intent: Testing hwclock compare
    commands:
      - command: timeout 10 hwclock --compare
        expect_exit: 124
  - action: exercise
    name: adjust
    intent: Adjusting
    commands:
      - command: hwclock --adjust
    diagnostics:
      - cat /etc/adjtime
    read_hwclock_after: false
"#;

    #[test]
    fn test_parse_yaml_scenario() {
        let scenario = TestScenario::from_yaml(YAML).unwrap();
        assert_eq!(scenario.name, "reduced rtc");
        assert_eq!(scenario.steps.len(), 4);
        assert_eq!(
            scenario.module.as_ref().map(|m| m.module.as_str()),
            Some("rtc_opal")
        );

        match &scenario.steps[0] {
            TestStep::ReadDeviceFiles { expect_exit, .. } => assert_eq!(*expect_exit, 0),
            _ => panic!("Expected ReadDeviceFiles step"),
        }
        assert_eq!(scenario.steps[1], TestStep::ReadHwclock);

        let exercises: Vec<_> = scenario.exercises().collect();
        assert_eq!(exercises[0].commands[0].expect_exit, 124);
        assert!(exercises[0].read_hwclock_after);
        assert_eq!(exercises[1].commands[0].expect_exit, 0);
        assert_eq!(exercises[1].diagnostics, vec!["cat /etc/adjtime".to_string()]);
        assert!(!exercises[1].read_hwclock_after);
    }

    #[test]
    fn test_rejects_empty_scenario() {
        let err = TestScenario::from_yaml("name: empty\nsteps: []\n").unwrap_err();
        assert!(matches!(err, Error::ScenarioParse(_)));
    }

    #[test]
    fn test_rejects_exercise_without_commands() {
        let yaml = "name: x\nsteps:\n  - action: exercise\n    name: nothing\n    intent: nothing\n    commands: []\n";
        let err = TestScenario::from_yaml(yaml).unwrap_err();
        assert!(err.to_string().contains("has no commands"));
    }

    #[test]
    fn test_rejects_unknown_action() {
        let yaml = "name: x\nsteps:\n  - action: reboot\n";
        assert!(matches!(
            TestScenario::from_yaml(yaml),
            Err(Error::ScenarioParse(_))
        ));
    }

    #[test]
    fn test_step_labels() {
        let step = TestStep::ReadDeviceFiles {
            directory: "/dev/".to_string(),
            pattern: "rtc".to_string(),
            expect_exit: 0,
        };
        assert_eq!(step.label(), "read-from-file (/dev/*rtc*)");
        assert_eq!(TestStep::ReadSystime.label(), "read systime");
    }
}
