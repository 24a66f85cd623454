//! difftest core - change-driven test orchestration
//!
//! Provides an engine that:
//! - Maps changed source paths to the test binaries depending on them
//! - Configures and rebuilds only those binaries
//! - Runs them and normalizes their JSON reports into a flat result list

pub mod aggregator;
pub mod changes;
pub mod config;
pub mod error;
pub mod fakes;
pub mod orchestrator;
pub mod pipeline;
pub mod registry;
pub mod report;
pub mod resolver;
pub mod result;
pub mod runner;
pub mod telemetry;

// Re-export key types
pub use aggregator::ResultAggregator;
pub use changes::{git_changed_paths, ChangeSet, FileLister, WalkdirLister};
pub use config::{Manifest, Toolchain};
pub use error::{DifftestError, Result};
pub use orchestrator::BuildOrchestrator;
pub use pipeline::TestPipeline;
pub use registry::{TargetRegistry, TestTarget};
pub use report::{FailureInfo, ReportDocument};
pub use resolver::{resolve, resolve_change_set, ResolvedTargetSet};
pub use result::{Outcome, PhaseResult, PipelineResult};
pub use runner::{CommandExecutor, CommandOutput, CommandSpec, ExitClass, ProcessRunner};
pub use telemetry::init_tracing;
