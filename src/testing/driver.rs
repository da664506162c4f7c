//! RTC driver test entry point
//!
//! Wires a [`Config`] to concrete collaborators and runs a scenario.

use tokio::time::Duration;

use crate::common::config::Config;
use crate::common::Result;
use crate::host::{
    Host, HostExecutor, LocalExecutor, ReachabilityController, SshExecutor, SystemController,
};

use super::config::TestScenario;
use super::rtc::rtc_driver_scenario;
use super::runner::{run_scenario, TestResult};

/// Where the commands are executed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Target {
    /// On the configured host over ssh
    #[default]
    Remote,
    /// On this machine (the tool is running on the SUT)
    Local,
}

/// The RTC driver test case
pub struct RtcDriverTest {
    config: Config,
    scenario: TestScenario,
    target: Target,
    verbose: bool,
}

impl RtcDriverTest {
    /// Built-in RTC scenario against the host in `config`
    pub fn new(config: Config) -> Self {
        Self {
            config,
            scenario: rtc_driver_scenario(),
            target: Target::Remote,
            verbose: false,
        }
    }

    pub fn with_scenario(mut self, scenario: TestScenario) -> Self {
        self.scenario = scenario;
        self
    }

    pub fn with_target(mut self, target: Target) -> Self {
        self.target = target;
        self
    }

    pub fn verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    pub fn scenario(&self) -> &TestScenario {
        &self.scenario
    }

    /// Build the executor and state controller from the configuration and run
    pub async fn run(&self) -> Result<TestResult> {
        let executor: Box<dyn HostExecutor> = match self.target {
            Target::Remote => Box::new(SshExecutor::from_config(&self.config)?),
            Target::Local => Box::new(LocalExecutor::new(Duration::from_secs(
                self.config.timeouts.command_secs,
            ))),
        };
        tracing::info!(host = %executor.describe(), scenario = %self.scenario.name, "Starting run");

        let mut host = Host::new(executor);
        let mut system = ReachabilityController::from_config(&self.config);
        self.run_with(&mut host, &mut system).await
    }

    /// Run against caller-supplied collaborators
    pub async fn run_with(
        &self,
        host: &mut Host,
        system: &mut dyn SystemController,
    ) -> Result<TestResult> {
        let result = run_scenario(&self.scenario, host, system, self.verbose).await?;
        tracing::info!(
            passed = result.passed,
            steps_run = result.steps_run,
            commands_run = result.commands_run,
            "Run finished"
        );
        Ok(result)
    }
}
