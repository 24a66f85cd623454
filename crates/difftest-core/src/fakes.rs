//! In-memory fakes for the process seam (testing only)
//!
//! `ScriptedExecutor` satisfies `CommandExecutor` without spawning anything:
//! each command gets a canned exit code and stdout, and every call is recorded.

use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;

use crate::error::Result;
use crate::runner::{CommandExecutor, CommandOutput, CommandSpec};

#[derive(Debug, Clone)]
enum Matcher {
    /// Full command line, e.g. `make tests/a -j8`.
    Command(String),
    /// Program only. Also matches an absolute path ending in `/<program>`.
    Program(String),
}

#[derive(Debug, Clone)]
struct Rule {
    matcher: Matcher,
    exit_code: Option<i32>,
    stdout: String,
}

impl Rule {
    fn matches(&self, spec: &CommandSpec) -> bool {
        match &self.matcher {
            Matcher::Command(cmd) => *cmd == spec.display(),
            Matcher::Program(program) => {
                *program == spec.program || spec.program.ends_with(&format!("/{program}"))
            }
        }
    }
}

/// Executor returning scripted outputs. Unscripted commands exit 0 with
/// empty output.
#[derive(Debug, Default)]
pub struct ScriptedExecutor {
    rules: Vec<Rule>,
    calls: Mutex<Vec<CommandSpec>>,
}

impl ScriptedExecutor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Script the full command line `command`. Earlier rules win.
    pub fn on(mut self, command: &str, exit_code: i32, stdout: &str) -> Self {
        self.rules.push(Rule {
            matcher: Matcher::Command(command.to_string()),
            exit_code: Some(exit_code),
            stdout: stdout.to_string(),
        });
        self
    }

    /// Script every invocation of `program`.
    pub fn on_program(mut self, program: &str, exit_code: i32, stdout: &str) -> Self {
        self.rules.push(Rule {
            matcher: Matcher::Program(program.to_string()),
            exit_code: Some(exit_code),
            stdout: stdout.to_string(),
        });
        self
    }

    /// Script `program` as terminated by a signal.
    pub fn on_program_killed(mut self, program: &str) -> Self {
        self.rules.push(Rule {
            matcher: Matcher::Program(program.to_string()),
            exit_code: None,
            stdout: String::new(),
        });
        self
    }

    /// Commands executed so far, in order.
    pub fn calls(&self) -> Vec<CommandSpec> {
        self.calls.lock().unwrap().clone()
    }

    /// Executed command lines, in order.
    pub fn command_lines(&self) -> Vec<String> {
        self.calls().iter().map(CommandSpec::display).collect()
    }
}

#[async_trait]
impl CommandExecutor for ScriptedExecutor {
    async fn execute(&self, spec: &CommandSpec) -> Result<CommandOutput> {
        self.calls.lock().unwrap().push(spec.clone());

        let (exit_code, stdout) = self
            .rules
            .iter()
            .find(|r| r.matches(spec))
            .map(|r| (r.exit_code, r.stdout.clone()))
            .unwrap_or((Some(0), String::new()));

        Ok(CommandOutput {
            exit_code,
            stdout,
            stderr: String::new(),
            duration: Duration::from_millis(1),
        })
    }
}
