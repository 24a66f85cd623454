//! Normalized step outcomes and pipeline results.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Pass/fail outcome of a step.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Outcome {
    Pass,
    Fail,
}

/// Outcome of one executed step: configure, one build, one test run, or one
/// failing test case.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PhaseResult {
    /// Step label.
    pub name: String,

    pub outcome: Outcome,

    /// Elapsed wall time.
    #[serde(with = "duration_ms")]
    pub duration: Duration,

    /// Captured output or failure detail.
    pub details: Option<String>,
}

impl PhaseResult {
    pub fn pass(name: impl Into<String>, duration: Duration) -> Self {
        Self {
            name: name.into(),
            outcome: Outcome::Pass,
            duration,
            details: None,
        }
    }

    pub fn fail(name: impl Into<String>, duration: Duration) -> Self {
        Self {
            name: name.into(),
            outcome: Outcome::Fail,
            duration,
            details: None,
        }
    }

    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }

    pub fn passed(&self) -> bool {
        self.outcome == Outcome::Pass
    }
}

/// Whether any result in `results` failed.
pub fn contains_failures(results: &[PhaseResult]) -> bool {
    results.iter().any(|r| !r.passed())
}

/// Result of a complete pipeline invocation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineResult {
    /// Run ID, also attached to the run's tracing span.
    pub run_id: String,

    /// When the run started.
    pub started_at: DateTime<Utc>,

    /// Total duration.
    #[serde(with = "duration_ms")]
    pub duration: Duration,

    /// Normalized results in execution order.
    pub results: Vec<PhaseResult>,
}

impl PipelineResult {
    /// True when nothing failed (including the empty "nothing to do" run).
    pub fn success(&self) -> bool {
        !contains_failures(&self.results)
    }

    pub fn passed_count(&self) -> usize {
        self.results.iter().filter(|r| r.passed()).count()
    }

    pub fn failed_count(&self) -> usize {
        self.results.iter().filter(|r| !r.passed()).count()
    }
}

mod duration_ms {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_u64(d.as_millis() as u64)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        Ok(Duration::from_millis(u64::deserialize(d)?))
    }
}
