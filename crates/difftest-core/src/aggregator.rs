//! Test execution and report normalization.

use crate::error::Result;
use crate::report::ReportDocument;
use crate::resolver::ResolvedTargetSet;
use crate::result::PhaseResult;
use crate::runner::{run_json, CommandExecutor, CommandSpec, JsonRun};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

/// Runs each target's test binary and flattens the reports.
pub struct ResultAggregator {
    executor: Arc<dyn CommandExecutor>,
    build_dir: PathBuf,
    json_flag: String,
}

impl ResultAggregator {
    pub fn new(
        executor: Arc<dyn CommandExecutor>,
        build_dir: impl Into<PathBuf>,
        json_flag: impl Into<String>,
    ) -> Self {
        Self {
            executor,
            build_dir: build_dir.into(),
            json_flag: json_flag.into(),
        }
    }

    /// Run every target in resolution order and concatenate the results.
    pub async fn run(&self, targets: &ResolvedTargetSet) -> Result<Vec<PhaseResult>> {
        let mut results = Vec::new();
        for binary in targets.iter() {
            results.extend(self.run_target(binary).await?);
        }
        Ok(results)
    }

    /// Run one test binary in JSON mode.
    pub async fn run_target(&self, binary: &str) -> Result<Vec<PhaseResult>> {
        let spec = CommandSpec::new(binary_path(&self.build_dir, binary), &self.build_dir)
            .arg(&self.json_flag);

        info!(stage = "run", target = %binary, "Executing stage");

        match run_json(self.executor.as_ref(), &spec).await? {
            JsonRun::Report { document, duration } => {
                info!(
                    target = %binary,
                    title = %document.title,
                    passed = document.passed,
                    failed = document.failed,
                    duration_ms = duration.as_millis() as u64,
                    "Report parsed"
                );
                Ok(normalize(&document, duration))
            }
            JsonRun::ToolFailure(output) => {
                warn!(target = %binary, "Test binary exited with code 1");
                Ok(vec![PhaseResult::fail(format!("Run: {binary}"), output.duration)
                    .with_details(output.stdout)])
            }
        }
    }
}

/// Relative binaries live under the build directory.
fn binary_path(build_dir: &Path, binary: &str) -> String {
    let path = Path::new(binary);
    if path.is_absolute() {
        binary.to_string()
    } else {
        build_dir.join(path).to_string_lossy().to_string()
    }
}

/// Flatten a report into a summary result followed by one result per failure.
///
/// Failure entries are only emitted when the report is unsuccessful.
pub fn normalize(document: &ReportDocument, duration: Duration) -> Vec<PhaseResult> {
    let summary = if document.success {
        PhaseResult::pass(document.summary_name(), duration)
    } else {
        PhaseResult::fail(document.summary_name(), duration)
    };

    let mut results = vec![summary.with_details(document.summary_message())];

    if !document.success {
        results.extend(document.infos.iter().map(|info| {
            PhaseResult::fail(info.input.clone(), Duration::ZERO)
                .with_details(format!("Error message: {}", info.error))
        }));
    }

    results
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fakes::ScriptedExecutor;
    use crate::result::Outcome;
    use crate::DifftestError;

    fn targets(names: &[&str]) -> ResolvedTargetSet {
        let mut set = ResolvedTargetSet::new();
        for n in names {
            set.insert(n);
        }
        set
    }

    #[test]
    fn test_normalize_failing_report() {
        let doc = ReportDocument::parse(
            r#"{"title":"Suite","success":false,"passed":3,"failed":2,"infos":[{"input":"caseA","error":"boom"}]}"#,
        )
        .unwrap();

        let results = normalize(&doc, Duration::from_millis(40));
        assert_eq!(results.len(), 2);

        assert_eq!(results[0].name, "Suite (3/5)");
        assert_eq!(results[0].outcome, Outcome::Fail);
        assert_eq!(results[0].details.as_deref(), Some("2 tests failed"));
        assert_eq!(results[0].duration, Duration::from_millis(40));

        assert_eq!(results[1].name, "caseA");
        assert_eq!(results[1].outcome, Outcome::Fail);
        assert_eq!(results[1].duration, Duration::ZERO);
        assert_eq!(results[1].details.as_deref(), Some("Error message: boom"));
    }

    #[test]
    fn test_normalize_passing_report() {
        let doc = ReportDocument::parse(
            r#"{"title":"Suite","success":true,"passed":5,"failed":0,"infos":[]}"#,
        )
        .unwrap();

        let results = normalize(&doc, Duration::from_millis(10));
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].name, "Suite (5/5)");
        assert_eq!(results[0].outcome, Outcome::Pass);
        assert_eq!(results[0].details.as_deref(), Some("All tests passed"));
    }

    #[test]
    fn test_normalize_ignores_infos_on_success() {
        let doc = ReportDocument::parse(
            r#"{"title":"Odd","success":true,"passed":1,"infos":[{"input":"x","error":"y"}]}"#,
        )
        .unwrap();
        assert_eq!(normalize(&doc, Duration::ZERO).len(), 1);
    }

    #[test]
    fn test_normalize_single_failure_message() {
        let doc = ReportDocument::parse(
            r#"{"title":"T","success":false,"passed":0,"failed":1,"infos":[{"input":"a","error":"b"},{"input":"c","error":"d"}]}"#,
        )
        .unwrap();
        let results = normalize(&doc, Duration::ZERO);
        assert_eq!(results[0].details.as_deref(), Some("1 test failed"));
        let names: Vec<_> = results.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, vec!["T (0/1)", "a", "c"]);
    }

    #[test]
    fn test_normalize_huge_counts() {
        let doc = ReportDocument::parse(
            r#"{"title":"Big","success":false,"passed":18446744073709551615,"failed":1,"infos":[]}"#,
        )
        .unwrap();
        let results = normalize(&doc, Duration::ZERO);
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].name, "Big (18446744073709551615/18446744073709551616)");
        assert_eq!(results[0].outcome, Outcome::Fail);
    }

    #[test]
    fn test_binary_path_resolution() {
        assert_eq!(
            binary_path(Path::new("/repo/UnitTests"), "tests/jsonparser"),
            "/repo/UnitTests/tests/jsonparser"
        );
        assert_eq!(binary_path(Path::new("/repo/UnitTests"), "/opt/t"), "/opt/t");
    }

    #[tokio::test]
    async fn test_run_concatenates_in_target_order() {
        let executor = Arc::new(
            ScriptedExecutor::new()
                .on_program(
                    "tests/b",
                    0,
                    r#"{"title":"B","success":false,"passed":1,"failed":1,"infos":[{"input":"b1","error":"bad"}]}"#,
                )
                .on_program("tests/a", 0, r#"{"title":"A","success":true,"passed":2}"#),
        );
        let aggregator = ResultAggregator::new(executor.clone(), "/build", "--json");

        let results = aggregator.run(&targets(&["tests/a", "tests/b"])).await.unwrap();
        let names: Vec<_> = results.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, vec!["A (2/2)", "B (1/2)", "b1"]);

        let calls = executor.calls();
        assert_eq!(calls[0].program, "/build/tests/a");
        assert_eq!(calls[0].args, vec!["--json".to_string()]);
        assert_eq!(calls[0].cwd, PathBuf::from("/build"));
    }

    #[tokio::test]
    async fn test_run_exit_one_is_fail_result() {
        let executor = Arc::new(ScriptedExecutor::new().on_program("tests/a", 1, "usage: a [--json]"));
        let aggregator = ResultAggregator::new(executor, "/build", "--json");

        let results = aggregator.run_target("tests/a").await.unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].name, "Run: tests/a");
        assert!(!results[0].passed());
        assert_eq!(results[0].details.as_deref(), Some("usage: a [--json]"));
    }

    #[tokio::test]
    async fn test_run_malformed_report_is_fatal() {
        let executor = Arc::new(ScriptedExecutor::new().on_program("tests/a", 0, "Segmentation fault"));
        let aggregator = ResultAggregator::new(executor, "/build", "--json");

        let err = aggregator.run(&targets(&["tests/a"])).await.unwrap_err();
        assert!(matches!(err, DifftestError::MalformedReport { .. }));
    }

    #[tokio::test]
    async fn test_run_crash_is_fatal() {
        let executor = Arc::new(ScriptedExecutor::new().on_program_killed("tests/a"));
        let aggregator = ResultAggregator::new(executor.clone(), "/build", "--json");

        let err = aggregator
            .run(&targets(&["tests/a", "tests/b"]))
            .await
            .unwrap_err();
        assert!(matches!(err, DifftestError::Infrastructure { exit_code: None, .. }));
        assert_eq!(executor.calls().len(), 1);
    }
}
