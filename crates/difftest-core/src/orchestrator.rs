//! Configure and build stages.

use crate::config::Toolchain;
use crate::error::Result;
use crate::resolver::ResolvedTargetSet;
use crate::result::{contains_failures, PhaseResult};
use crate::runner::{ensure_tool_available, CommandExecutor, CommandSpec, ExitClass};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, warn};

/// Name of the configure stage result.
pub const CONFIGURE_STAGE: &str = "(regenerate projects)";

/// Name of the build result for `binary`.
pub fn build_stage_name(binary: &str) -> String {
    format!("Build: {binary}")
}

/// Runs the configure stage, then builds every resolved target.
pub struct BuildOrchestrator {
    executor: Arc<dyn CommandExecutor>,
    toolchain: Toolchain,
    project_root: PathBuf,
    build_dir: PathBuf,
}

impl BuildOrchestrator {
    pub fn new(
        executor: Arc<dyn CommandExecutor>,
        toolchain: Toolchain,
        project_root: impl Into<PathBuf>,
    ) -> Self {
        let project_root = project_root.into();
        let build_dir = toolchain.build_dir_in(&project_root);
        Self {
            executor,
            toolchain,
            project_root,
            build_dir,
        }
    }

    pub fn build_dir(&self) -> &Path {
        &self.build_dir
    }

    /// Check that the configure and build tools can be found.
    pub fn ensure_tools(&self) -> Result<()> {
        ensure_tool_available(&self.toolchain.configure)?;
        ensure_tool_available(&self.toolchain.build)
    }

    /// Run configure then build, appending to `results`.
    ///
    /// Returns early after configure if it failed. The build stage attempts
    /// every target even when an earlier one fails.
    pub async fn run(&self, targets: &ResolvedTargetSet, results: &mut Vec<PhaseResult>) -> Result<()> {
        results.push(self.configure().await?);
        if contains_failures(results) {
            warn!(stage = "configure", "Configure failed, skipping build");
            return Ok(());
        }

        results.extend(self.build(targets).await?);
        Ok(())
    }

    /// Create the build directory and run the configure command in it.
    pub async fn configure(&self) -> Result<PhaseResult> {
        tokio::fs::create_dir_all(self.build_dir.join(&self.toolchain.work_subdir)).await?;

        let spec = CommandSpec::new(&self.toolchain.configure, &self.build_dir)
            .arg(self.project_root.to_string_lossy());

        info!(stage = "configure", command = %spec.display(), "Executing stage");
        self.step(CONFIGURE_STAGE.to_string(), &spec).await
    }

    /// Build each target in resolution order.
    pub async fn build(&self, targets: &ResolvedTargetSet) -> Result<Vec<PhaseResult>> {
        let mut results = Vec::with_capacity(targets.len());

        for binary in targets.iter() {
            let spec = CommandSpec::new(&self.toolchain.build, &self.build_dir)
                .arg(binary)
                .arg(self.toolchain.jobs_arg());

            info!(stage = "build", target = %binary, "Executing stage");
            results.push(self.step(build_stage_name(binary), &spec).await?);
        }

        Ok(results)
    }

    async fn step(&self, name: String, spec: &CommandSpec) -> Result<PhaseResult> {
        let output = self.executor.execute(spec).await?;

        let result = match output.classify(spec)? {
            ExitClass::Success => PhaseResult::pass(name, output.duration),
            ExitClass::ToolFailure => {
                warn!(step = %name, command = %spec.display(), "Step failed");
                PhaseResult::fail(name, output.duration).with_details(output.stdout)
            }
        };

        info!(
            step = %result.name,
            duration_ms = result.duration.as_millis() as u64,
            passed = result.passed(),
            "Step finished"
        );
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fakes::ScriptedExecutor;

    fn targets(names: &[&str]) -> ResolvedTargetSet {
        let mut set = ResolvedTargetSet::new();
        for n in names {
            set.insert(n);
        }
        set
    }

    #[tokio::test]
    async fn test_configure_creates_dirs_and_passes_root() {
        let root = tempfile::tempdir().unwrap();
        let executor = Arc::new(ScriptedExecutor::new());
        let orchestrator =
            BuildOrchestrator::new(executor.clone(), Toolchain::default(), root.path());

        let result = orchestrator.configure().await.unwrap();
        assert!(result.passed());
        assert_eq!(result.name, CONFIGURE_STAGE);
        assert!(root.path().join("UnitTests/tests").is_dir());

        let calls = executor.calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].program, "cmake");
        assert_eq!(calls[0].args, vec![root.path().to_string_lossy().to_string()]);
        assert_eq!(calls[0].cwd, root.path().join("UnitTests"));
    }

    #[tokio::test]
    async fn test_configure_is_idempotent() {
        let root = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(root.path().join("UnitTests/tests")).unwrap();
        let orchestrator = BuildOrchestrator::new(
            Arc::new(ScriptedExecutor::new()),
            Toolchain::default(),
            root.path(),
        );
        assert!(orchestrator.configure().await.unwrap().passed());
        assert!(orchestrator.configure().await.unwrap().passed());
    }

    #[tokio::test]
    async fn test_build_passes_jobs_hint() {
        let root = tempfile::tempdir().unwrap();
        let executor = Arc::new(ScriptedExecutor::new());
        let toolchain = Toolchain {
            jobs: 4,
            ..Toolchain::default()
        };
        let orchestrator = BuildOrchestrator::new(executor.clone(), toolchain, root.path());

        let results = orchestrator.build(&targets(&["tests/a", "tests/b"])).await.unwrap();
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].name, "Build: tests/a");

        let calls = executor.calls();
        assert_eq!(calls[1].program, "make");
        assert_eq!(calls[1].args, vec!["tests/b".to_string(), "-j4".to_string()]);
    }

    #[tokio::test]
    async fn test_build_failure_keeps_stdout_and_continues() {
        let root = tempfile::tempdir().unwrap();
        let executor = Arc::new(ScriptedExecutor::new().on("make tests/a -j8", 1, "a.cpp:3: error"));
        let orchestrator =
            BuildOrchestrator::new(executor.clone(), Toolchain::default(), root.path());

        let results = orchestrator.build(&targets(&["tests/a", "tests/b"])).await.unwrap();
        assert!(!results[0].passed());
        assert_eq!(results[0].details.as_deref(), Some("a.cpp:3: error"));
        assert!(results[1].passed());
        assert_eq!(executor.calls().len(), 2);
    }

    #[tokio::test]
    async fn test_configure_failure_skips_build() {
        let root = tempfile::tempdir().unwrap();
        let executor = Arc::new(ScriptedExecutor::new().on_program("cmake", 1, "CMake Error"));
        let orchestrator =
            BuildOrchestrator::new(executor.clone(), Toolchain::default(), root.path());

        let mut results = Vec::new();
        orchestrator.run(&targets(&["tests/a"]), &mut results).await.unwrap();
        assert_eq!(results.len(), 1);
        assert!(!results[0].passed());
        assert_eq!(executor.calls().len(), 1);
    }

    #[tokio::test]
    async fn test_build_exit_two_is_fatal() {
        let root = tempfile::tempdir().unwrap();
        let executor = Arc::new(ScriptedExecutor::new().on("make tests/a -j8", 2, ""));
        let orchestrator = BuildOrchestrator::new(executor, Toolchain::default(), root.path());

        let mut results = Vec::new();
        let err = orchestrator
            .run(&targets(&["tests/a", "tests/b"]), &mut results)
            .await
            .unwrap_err();
        assert!(matches!(err, crate::DifftestError::Infrastructure { .. }));
    }

    #[test]
    fn test_ensure_tools_reports_missing_tool() {
        let toolchain = Toolchain {
            configure: "difftest-missing-configure".to_string(),
            ..Toolchain::default()
        };
        let orchestrator =
            BuildOrchestrator::new(Arc::new(ScriptedExecutor::new()), toolchain, "/tmp");
        assert!(matches!(
            orchestrator.ensure_tools(),
            Err(crate::DifftestError::ToolNotFound(tool)) if tool == "difftest-missing-configure"
        ));
    }
}
