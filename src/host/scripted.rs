//! Scripted executor
//!
//! Replays canned results instead of touching a machine. Every command is
//! recorded so a test can assert exactly what was sent and in which order.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use crate::common::{Error, Result};

use super::{CommandOutput, HostExecutor};

/// What a rule answers with
#[derive(Debug, Clone)]
enum Reply {
    Output(CommandOutput),
    Disconnect,
}

#[derive(Debug, Clone)]
enum Pattern {
    Exact(String),
    Prefix(String),
}

impl Pattern {
    fn matches(&self, command: &str) -> bool {
        match self {
            Pattern::Exact(s) => command == s,
            Pattern::Prefix(p) => command.starts_with(p.as_str()),
        }
    }
}

/// Shared, cloneable view of the commands an executor has received
#[derive(Debug, Clone, Default)]
pub struct CommandLog(Arc<Mutex<Vec<String>>>);

impl CommandLog {
    pub fn commands(&self) -> Vec<String> {
        self.0.lock().map(|v| v.clone()).unwrap_or_default()
    }

    pub fn len(&self) -> usize {
        self.0.lock().map(|v| v.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Whether any recorded command starts with `prefix`
    pub fn contains_prefix(&self, prefix: &str) -> bool {
        self.commands().iter().any(|c| c.starts_with(prefix))
    }

    fn push(&self, command: &str) {
        if let Ok(mut v) = self.0.lock() {
            v.push(command.to_string());
        }
    }
}

/// Executor answering from a script of rules
///
/// One-shot rules are consumed first, in the order they were queued. Then
/// standing rules are tried, most recently added first. Commands no rule
/// matches get the default reply (exit 0, no output).
#[derive(Debug, Default)]
pub struct ScriptedExecutor {
    once: VecDeque<(Pattern, Reply)>,
    standing: Vec<(Pattern, Reply)>,
    default: Option<CommandOutput>,
    log: CommandLog,
}

impl ScriptedExecutor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reply used when nothing matches
    pub fn with_default(mut self, exit_code: i32, stdout: &str) -> Self {
        self.default = Some(CommandOutput::new(exit_code, stdout));
        self
    }

    /// Answer every command equal to `command`
    pub fn on_exact(mut self, command: &str, exit_code: i32, stdout: &str) -> Self {
        self.standing.push((
            Pattern::Exact(command.to_string()),
            Reply::Output(CommandOutput::new(exit_code, stdout)),
        ));
        self
    }

    /// Answer every command starting with `prefix`
    pub fn on_prefix(mut self, prefix: &str, exit_code: i32, stdout: &str) -> Self {
        self.standing.push((
            Pattern::Prefix(prefix.to_string()),
            Reply::Output(CommandOutput::new(exit_code, stdout)),
        ));
        self
    }

    /// Answer the next command starting with `prefix`, once
    pub fn once_prefix(mut self, prefix: &str, exit_code: i32, stdout: &str) -> Self {
        self.once.push_back((
            Pattern::Prefix(prefix.to_string()),
            Reply::Output(CommandOutput::new(exit_code, stdout)),
        ));
        self
    }

    /// Fail the next command starting with `prefix` as if the link dropped
    pub fn disconnect_once(mut self, prefix: &str) -> Self {
        self.once
            .push_back((Pattern::Prefix(prefix.to_string()), Reply::Disconnect));
        self
    }

    /// Fail every command starting with `prefix` as if the link dropped
    pub fn disconnect_on(mut self, prefix: &str) -> Self {
        self.standing
            .push((Pattern::Prefix(prefix.to_string()), Reply::Disconnect));
        self
    }

    /// Handle to the command log; stays valid after the executor is boxed
    pub fn log(&self) -> CommandLog {
        self.log.clone()
    }

    fn reply_for(&mut self, command: &str) -> Reply {
        if let Some(pos) = self.once.iter().position(|(p, _)| p.matches(command)) {
            if let Some((_, reply)) = self.once.remove(pos) {
                return reply;
            }
        }
        self.standing
            .iter()
            .rev()
            .find(|(p, _)| p.matches(command))
            .map(|(_, r)| r.clone())
            .unwrap_or_else(|| {
                Reply::Output(
                    self.default
                        .clone()
                        .unwrap_or_else(|| CommandOutput::new(0, "")),
                )
            })
    }
}

#[async_trait]
impl HostExecutor for ScriptedExecutor {
    async fn run(&mut self, command: &str) -> Result<CommandOutput> {
        self.log.push(command);
        match self.reply_for(command) {
            Reply::Output(out) => Ok(out),
            Reply::Disconnect => Err(Error::connection("scripted", "connection reset by peer")),
        }
    }

    fn describe(&self) -> String {
        "scripted".to_string()
    }
}
