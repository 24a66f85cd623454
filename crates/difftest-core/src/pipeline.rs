//! Pipeline orchestration: resolve, configure, build, run.

use crate::aggregator::ResultAggregator;
use crate::changes::{ChangeSet, FileLister, WalkdirLister};
use crate::config::Toolchain;
use crate::error::Result;
use crate::orchestrator::BuildOrchestrator;
use crate::registry::TargetRegistry;
use crate::resolver::{resolve_change_set, ResolvedTargetSet};
use crate::result::{contains_failures, PipelineResult};
use crate::runner::{CommandExecutor, ProcessRunner};
use crate::telemetry::run_span;
use chrono::Utc;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;
use tracing::{info, Instrument};
use uuid::Uuid;

/// Change-driven test pipeline.
///
/// Stages run strictly in order; a failure recorded by configure or build
/// stops the pipeline before any test binary runs. Infrastructure failures
/// abort the whole run with an error and no result list.
pub struct TestPipeline {
    registry: TargetRegistry,
    toolchain: Toolchain,
    project_root: PathBuf,
    executor: Arc<dyn CommandExecutor>,
    lister: Box<dyn FileLister>,
    check_tools: bool,
}

impl TestPipeline {
    /// Pipeline running real processes and listing files under `project_root`.
    pub fn new(registry: TargetRegistry, toolchain: Toolchain, project_root: impl Into<PathBuf>) -> Self {
        let project_root = project_root.into();
        let lister = WalkdirLister::new(&project_root).exclude(&toolchain.build_dir);
        Self {
            registry,
            toolchain,
            project_root,
            executor: Arc::new(ProcessRunner),
            lister: Box::new(lister),
            check_tools: false,
        }
    }

    /// Replace the process executor.
    pub fn with_executor(mut self, executor: Arc<dyn CommandExecutor>) -> Self {
        self.executor = executor;
        self
    }

    /// Replace the full file listing used for [`ChangeSet::AllFiles`].
    pub fn with_lister(mut self, lister: Box<dyn FileLister>) -> Self {
        self.lister = lister;
        self
    }

    /// Verify the configure and build tools are on `PATH` before configuring.
    pub fn with_tool_check(mut self, enabled: bool) -> Self {
        self.check_tools = enabled;
        self
    }

    pub fn registry(&self) -> &TargetRegistry {
        &self.registry
    }

    /// Targets affected by `change_set`.
    pub fn resolve(&self, change_set: &ChangeSet) -> Result<ResolvedTargetSet> {
        resolve_change_set(&self.registry, change_set, self.lister.as_ref())
    }

    /// Resolve `change_set` and run the affected targets.
    pub async fn run(&self, change_set: &ChangeSet) -> Result<PipelineResult> {
        let targets = self.resolve(change_set)?;
        self.run_targets(&targets).await
    }

    /// Configure, build and run `targets`.
    pub async fn run_targets(&self, targets: &ResolvedTargetSet) -> Result<PipelineResult> {
        let run_id = Uuid::new_v4().to_string();
        let span = run_span(&run_id);
        self.execute(targets, run_id).instrument(span).await
    }

    async fn execute(&self, targets: &ResolvedTargetSet, run_id: String) -> Result<PipelineResult> {
        let started_at = Utc::now();
        let start = Instant::now();

        let mut results = Vec::new();

        if targets.is_empty() {
            info!("No test targets affected, nothing to do");
            return Ok(PipelineResult {
                run_id,
                started_at,
                duration: start.elapsed(),
                results,
            });
        }

        info!(
            targets = targets.len(),
            project_root = %self.project_root.display(),
            "Starting test pipeline"
        );

        let orchestrator =
            BuildOrchestrator::new(self.executor.clone(), self.toolchain.clone(), &self.project_root);
        if self.check_tools {
            orchestrator.ensure_tools()?;
        }

        orchestrator.run(targets, &mut results).await?;

        if contains_failures(&results) {
            info!(results = results.len(), "Build stage failed, tests not run");
        } else {
            let aggregator = ResultAggregator::new(
                self.executor.clone(),
                orchestrator.build_dir(),
                &self.toolchain.json_flag,
            );
            results.extend(aggregator.run(targets).await?);
        }

        let result = PipelineResult {
            run_id,
            started_at,
            duration: start.elapsed(),
            results,
        };

        info!(
            passed = result.passed_count(),
            failed = result.failed_count(),
            duration_ms = result.duration.as_millis() as u64,
            success = result.success(),
            "Test pipeline finished"
        );

        Ok(result)
    }
}
