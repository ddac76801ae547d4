//! sqlrunner -- batch SQL script runner with baseline comparison.
//!
//! This crate provides the core library for executing SQL scripts through
//! an external `sqlcmd`-style client, comparing captured output against
//! recorded baselines, and aggregating pass/fail results into a JSON report.

pub mod compare;
pub mod exec;
pub mod layout;
pub mod report;
pub mod runner;

use exec::{ExecutionOutcome, RunnerConfig};
use layout::Layout;
use runner::{Runner, RunnerError};

/// Run the full batch under `base_dir` and return the ordered outcomes.
///
/// Convenience entry point for embedding; the CLI goes through the same
/// path. Directory bootstrap happens here so a fresh checkout works.
pub async fn run_all(
    base_dir: &str,
    config: RunnerConfig,
) -> Result<Vec<ExecutionOutcome>, RunnerError> {
    let layout = Layout::new(base_dir);
    if let Err(e) = layout.ensure() {
        return Err(RunnerError::Discovery {
            dir: layout.scripts_dir.clone(),
            source: e,
        });
    }

    Runner::new(layout, config).run().await
}
