//! Error types for the orchestration engine.
//!
//! Every variant here is fatal for a pipeline run. Legitimate build or test
//! failures are never errors; they are reported as `Outcome::Fail` results.

use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum DifftestError {
    /// External command exited with a code other than 0 or 1, or was killed.
    #[error("Infrastructure failure: `{command}` exited with {}: {stderr}", describe_exit(.exit_code))]
    Infrastructure {
        command: String,
        exit_code: Option<i32>,
        stderr: String,
    },

    /// External command could not be started at all.
    #[error("Failed to spawn `{command}`: {source}")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },

    /// Test binary did not print a valid JSON report.
    #[error("Malformed report from `{binary}`: {source}")]
    MalformedReport {
        binary: String,
        #[source]
        source: serde_json::Error,
    },

    /// Configured tool is not on PATH.
    #[error("Unable to find `{0}` in PATH")]
    ToolNotFound(String),

    /// Manifest could not be read or parsed.
    #[error("Invalid manifest {path}: {message}")]
    Manifest { path: PathBuf, message: String },

    /// Full file listing failed.
    #[error("Failed to list project files: {0}")]
    Listing(String),

    /// Git changed-path query failed.
    #[error("Git error: {0}")]
    Git(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

fn describe_exit(code: &Option<i32>) -> String {
    match code {
        Some(code) => format!("exit code {code}"),
        None => "no exit code (terminated by signal)".to_string(),
    }
}

/// Result type for orchestration operations
pub type Result<T> = std::result::Result<T, DifftestError>;
