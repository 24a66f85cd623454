//! difftest - change-driven test runner
//!
//! ## Commands
//!
//! - `run`: build and run the test binaries affected by a changeset
//! - `affected`: print the affected test binaries without building
//! - `targets`: list the targets declared in the manifest
//!
//! Exit codes: 0 when everything passed (or nothing was affected), 1 when a
//! build or test failed, 2 when the run itself broke.

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use difftest_core::config::MANIFEST_FILE;
use difftest_core::{
    git_changed_paths, init_tracing, ChangeSet, Manifest, Outcome, PipelineResult, TestPipeline,
};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing::{debug, Level};

#[derive(Parser)]
#[command(name = "difftest")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Build and run only the tests affected by a change", long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit JSON-formatted log lines
    #[arg(long, global = true)]
    log_json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Configure, build and run the affected test binaries
    Run {
        #[command(flatten)]
        project: ProjectArgs,

        #[command(flatten)]
        selection: SelectionArgs,

        /// Parallelism hint passed to the build tool
        #[arg(short, long, env = "DIFFTEST_JOBS")]
        jobs: Option<u32>,

        /// Build directory (default: from manifest)
        #[arg(long)]
        build_dir: Option<PathBuf>,

        /// Output format
        #[arg(long, value_enum, default_value_t = Format::Text)]
        format: Format,
    },

    /// Print the test binaries affected by a changeset
    Affected {
        #[command(flatten)]
        project: ProjectArgs,

        #[command(flatten)]
        selection: SelectionArgs,
    },

    /// List declared test targets
    Targets {
        #[command(flatten)]
        project: ProjectArgs,

        /// Output format
        #[arg(long, value_enum, default_value_t = Format::Text)]
        format: Format,
    },
}

#[derive(Args)]
struct ProjectArgs {
    /// Project root (default: current directory)
    #[arg(long, default_value = ".", env = "DIFFTEST_PROJECT_ROOT")]
    project_root: PathBuf,

    /// Manifest path (default: <project-root>/difftest.toml)
    #[arg(long, env = "DIFFTEST_MANIFEST")]
    manifest: Option<PathBuf>,
}

#[derive(Args)]
struct SelectionArgs {
    /// Changed paths, relative to the project root
    paths: Vec<String>,

    /// Select every file in the project tree
    #[arg(long, conflicts_with_all = ["paths", "since"])]
    all: bool,

    /// Use the files changed since this git revision
    #[arg(long, conflicts_with = "paths")]
    since: Option<String>,
}

#[derive(Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Format {
    Text,
    Json,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let level = if cli.verbose { Level::DEBUG } else { Level::INFO };
    init_tracing(cli.log_json, level);

    let outcome = match cli.command {
        Commands::Run {
            project,
            selection,
            jobs,
            build_dir,
            format,
        } => cmd_run(&project, &selection, jobs, build_dir, format).await,
        Commands::Affected { project, selection } => cmd_affected(&project, &selection),
        Commands::Targets { project, format } => cmd_targets(&project, format),
    };

    match outcome {
        Ok(code) => code,
        Err(e) => {
            eprintln!("difftest: infrastructure failure: {e:#}");
            ExitCode::from(2)
        }
    }
}

/// Canonical project root and its manifest.
fn load_project(project: &ProjectArgs) -> Result<(PathBuf, Manifest)> {
    let root = std::fs::canonicalize(&project.project_root)
        .with_context(|| format!("Project root {:?} not found", project.project_root))?;
    let manifest_path = project
        .manifest
        .clone()
        .unwrap_or_else(|| root.join(MANIFEST_FILE));
    debug!(manifest = %manifest_path.display(), "Loading manifest");
    let manifest = Manifest::load(&manifest_path)?;
    Ok((root, manifest))
}

fn change_set(root: &Path, selection: &SelectionArgs) -> Result<ChangeSet> {
    if let Some(since) = &selection.since {
        let paths = git_changed_paths(root, since)?;
        debug!(since = %since, changed = paths.len(), "Collected changed paths from git");
        return Ok(ChangeSet::Paths(paths));
    }
    Ok(ChangeSet::from_selection(selection.all, selection.paths.clone()))
}

async fn cmd_run(
    project: &ProjectArgs,
    selection: &SelectionArgs,
    jobs: Option<u32>,
    build_dir: Option<PathBuf>,
    format: Format,
) -> Result<ExitCode> {
    let (root, manifest) = load_project(project)?;
    let mut toolchain = manifest.toolchain.clone();
    if let Some(jobs) = jobs {
        toolchain.jobs = jobs;
    }
    if let Some(build_dir) = build_dir {
        toolchain.build_dir = build_dir;
    }

    let changes = change_set(&root, selection)?;
    let pipeline = TestPipeline::new(manifest.registry(), toolchain, &root).with_tool_check(true);

    let result = pipeline
        .run(&changes)
        .await
        .context("Test pipeline failed to run")?;

    match format {
        Format::Text => print_results(&result),
        Format::Json => println!("{}", serde_json::to_string_pretty(&result)?),
    }

    Ok(if result.success() {
        ExitCode::SUCCESS
    } else {
        ExitCode::from(1)
    })
}

fn print_results(result: &PipelineResult) {
    if result.results.is_empty() {
        println!("No test targets affected.");
        return;
    }

    for phase in &result.results {
        let status = match phase.outcome {
            Outcome::Pass => "✓",
            Outcome::Fail => "✗",
        };
        println!("  {} {} ({}ms)", status, phase.name, phase.duration.as_millis());
        if phase.outcome == Outcome::Fail {
            if let Some(details) = phase.details.as_deref().filter(|d| !d.trim().is_empty()) {
                for line in details.lines() {
                    println!("      {line}");
                }
            }
        }
    }

    println!();
    println!(
        "Status: {} ({} passed, {} failed, {}ms)",
        if result.success() { "✓ PASSED" } else { "✗ FAILED" },
        result.passed_count(),
        result.failed_count(),
        result.duration.as_millis()
    );
}

fn cmd_affected(project: &ProjectArgs, selection: &SelectionArgs) -> Result<ExitCode> {
    let (root, manifest) = load_project(project)?;
    let changes = change_set(&root, selection)?;
    let pipeline = TestPipeline::new(manifest.registry(), manifest.toolchain, &root);

    for binary in pipeline.resolve(&changes)?.iter() {
        println!("{binary}");
    }
    Ok(ExitCode::SUCCESS)
}

#[derive(Serialize)]
struct TargetSummary<'a> {
    binary: &'a str,
    dependencies: &'a [String],
}

fn cmd_targets(project: &ProjectArgs, format: Format) -> Result<ExitCode> {
    let (_, manifest) = load_project(project)?;

    match format {
        Format::Text => {
            for target in &manifest.targets {
                println!("{} ({} dependencies)", target.binary, target.dependencies.len());
            }
        }
        Format::Json => {
            let summaries: Vec<_> = manifest
                .targets
                .iter()
                .map(|t| TargetSummary {
                    binary: &t.binary,
                    dependencies: &t.dependencies,
                })
                .collect();
            println!("{}", serde_json::to_string_pretty(&summaries)?);
        }
    }
    Ok(ExitCode::SUCCESS)
}
