//! Logging setup and run-scoped spans.
//!
//! `difftest` prints its result listing on stdout, so every log line goes to
//! stderr. Each pipeline run is wrapped in a `difftest.run` span carrying the
//! run id, which ties configure, build and test events to one invocation.

use tracing::{Level, Span};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

/// Install the stderr subscriber used by the `difftest` binary.
///
/// `level` applies unless `RUST_LOG` is set. `json` switches to one JSON
/// object per line for CI log collectors. Only the first call in a process
/// installs anything.
pub fn init_tracing(json: bool, level: Level) {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level.as_str()));

    if json {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(fmt::layer().with_target(false).with_writer(std::io::stderr).json())
            .try_init()
            .ok();
    } else {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(fmt::layer().with_target(false).with_writer(std::io::stderr))
            .try_init()
            .ok();
    }
}

/// Span tagging every event of one pipeline run with its `run_id`.
pub fn run_span(run_id: &str) -> Span {
    tracing::info_span!("difftest.run", run_id = %run_id)
}
