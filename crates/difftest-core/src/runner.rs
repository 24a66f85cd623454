//! External process execution and exit classification.

use crate::error::{DifftestError, Result};
use crate::report::ReportDocument;
use async_trait::async_trait;
use std::path::PathBuf;
use std::process::Stdio;
use std::time::{Duration, Instant};
use tokio::process::Command;
use tracing::debug;

/// A command to execute.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandSpec {
    /// Executable name or path.
    pub program: String,

    /// Arguments.
    pub args: Vec<String>,

    /// Working directory.
    pub cwd: PathBuf,
}

impl CommandSpec {
    pub fn new(program: impl Into<String>, cwd: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            cwd: cwd.into(),
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    /// Command line for logs and error messages.
    pub fn display(&self) -> String {
        std::iter::once(self.program.as_str())
            .chain(self.args.iter().map(String::as_str))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// Captured output of a finished process.
#[derive(Debug, Clone)]
pub struct CommandOutput {
    /// Exit code, `None` when terminated by a signal.
    pub exit_code: Option<i32>,

    /// Captured stdout.
    pub stdout: String,

    /// Captured stderr.
    pub stderr: String,

    /// Wall time from spawn to exit.
    pub duration: Duration,
}

/// Classification of a process exit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitClass {
    /// Exit code 0.
    Success,

    /// Exit code 1: the tool ran and reported a legitimate failure.
    ToolFailure,
}

impl CommandOutput {
    /// Classify the exit status. Anything other than 0 or 1 is an
    /// infrastructure failure.
    pub fn classify(&self, spec: &CommandSpec) -> Result<ExitClass> {
        match self.exit_code {
            Some(0) => Ok(ExitClass::Success),
            Some(1) => Ok(ExitClass::ToolFailure),
            exit_code => Err(DifftestError::Infrastructure {
                command: spec.display(),
                exit_code,
                stderr: self.stderr.trim().to_string(),
            }),
        }
    }
}

/// Executes external commands.
///
/// Implementations block the calling task until the process exits.
#[async_trait]
pub trait CommandExecutor: Send + Sync {
    async fn execute(&self, spec: &CommandSpec) -> Result<CommandOutput>;
}

/// Runs commands as child processes with tokio.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessRunner;

#[async_trait]
impl CommandExecutor for ProcessRunner {
    async fn execute(&self, spec: &CommandSpec) -> Result<CommandOutput> {
        debug!(command = %spec.display(), cwd = %spec.cwd.display(), "Spawning command");

        let start = Instant::now();
        let child = Command::new(&spec.program)
            .args(&spec.args)
            .current_dir(&spec.cwd)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|source| DifftestError::Spawn {
                command: spec.display(),
                source,
            })?;

        let output = child.wait_with_output().await?;
        let duration = start.elapsed();

        Ok(CommandOutput {
            exit_code: output.status.code(),
            stdout: String::from_utf8_lossy(&output.stdout).to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).to_string(),
            duration,
        })
    }
}

/// Outcome of running a test binary in JSON mode.
#[derive(Debug, Clone)]
pub enum JsonRun {
    /// Exit code 0 with a parsed report.
    Report {
        document: ReportDocument,
        duration: Duration,
    },

    /// Exit code 1; no report is expected.
    ToolFailure(CommandOutput),
}

/// Run `spec` and parse its stdout as a [`ReportDocument`].
///
/// A malformed report on a successful exit is an infrastructure failure.
pub async fn run_json(executor: &dyn CommandExecutor, spec: &CommandSpec) -> Result<JsonRun> {
    let output = executor.execute(spec).await?;

    match output.classify(spec)? {
        ExitClass::Success => {
            let document = ReportDocument::parse(&output.stdout).map_err(|source| {
                DifftestError::MalformedReport {
                    binary: spec.program.clone(),
                    source,
                }
            })?;
            Ok(JsonRun::Report {
                document,
                duration: output.duration,
            })
        }
        ExitClass::ToolFailure => Ok(JsonRun::ToolFailure(output)),
    }
}

/// Check that `program` resolves to a file, either as a path or via `PATH`.
pub fn ensure_tool_available(program: &str) -> Result<()> {
    let candidate = PathBuf::from(program);
    if candidate.components().count() > 1 {
        return if candidate.is_file() {
            Ok(())
        } else {
            Err(DifftestError::ToolNotFound(program.to_string()))
        };
    }

    let found = std::env::var_os("PATH")
        .map(|paths| std::env::split_paths(&paths).any(|dir| dir.join(program).is_file()))
        .unwrap_or(false);

    if found {
        Ok(())
    } else {
        Err(DifftestError::ToolNotFound(program.to_string()))
    }
}
