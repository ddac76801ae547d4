//! Batch orchestration: discover scripts, run them strictly one after
//! another, persist failure records as they happen, then build the report.
//!
//! Sequential on purpose. Script batches routinely carry implicit ordering
//! dependencies (schema setup before data checks), and each task owns its
//! own result file, so there is nothing to gain from parallelism that would
//! justify an explicit dependency model.

use std::path::PathBuf;

use thiserror::Error;
use tracing::{error, info};

use crate::exec::{self, ExecutionOutcome, RunnerConfig, ScriptTask};
use crate::layout::Layout;
use crate::report;

#[derive(Debug, Error)]
pub enum RunnerError {
    /// Nothing to test is a hard error, never a vacuous all-pass.
    #[error("no SQL scripts found in {dir}")]
    NoScriptsFound { dir: PathBuf },

    #[error("failed to scan scripts directory {dir}")]
    Discovery {
        dir: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to persist run report")]
    ReportPersist(#[source] anyhow::Error),
}

/// Drives one full run over all discovered tasks.
pub struct Runner {
    layout: Layout,
    config: RunnerConfig,
}

impl Runner {
    pub fn new(layout: Layout, config: RunnerConfig) -> Self {
        Self { layout, config }
    }

    pub fn layout(&self) -> &Layout {
        &self.layout
    }

    /// Discover tasks from the scripts directory.
    pub fn discover(&self) -> Result<Vec<ScriptTask>, RunnerError> {
        self.layout
            .discover_scripts()
            .map_err(|source| RunnerError::Discovery {
                dir: self.layout.scripts_dir.clone(),
                source,
            })
    }

    /// Run everything: discover, execute sequentially, report.
    ///
    /// Returns the full ordered outcome list so the caller can derive its
    /// exit status. No report is written when discovery comes up empty.
    pub async fn run(&self) -> Result<Vec<ExecutionOutcome>, RunnerError> {
        let tasks = self.discover()?;
        if tasks.is_empty() {
            error!(dir = %self.layout.scripts_dir.display(), "No SQL scripts found in scripts directory");
            return Err(RunnerError::NoScriptsFound {
                dir: self.layout.scripts_dir.clone(),
            });
        }
        self.run_tasks(tasks).await
    }

    /// Execute an explicit task list in order. One task finishes (pass,
    /// fail, or timeout) before the next starts; a task's failure never
    /// skips or aborts the rest of the batch.
    pub async fn run_tasks(
        &self,
        tasks: Vec<ScriptTask>,
    ) -> Result<Vec<ExecutionOutcome>, RunnerError> {
        info!(count = tasks.len(), "Running SQL scripts sequentially");

        let mut outcomes = Vec::with_capacity(tasks.len());
        for task in &tasks {
            let outcome = exec::run_task(&self.config, task).await;

            if !outcome.success {
                // Record the failure immediately; a record that cannot be
                // written must not cost us the remaining tasks.
                if let Err(e) = report::write_failure_record(&self.layout, &outcome) {
                    error!(script = %outcome.script_name, error = %e, "Could not save failure record");
                }
            }

            outcomes.push(outcome);
        }

        let run_report = report::build_report(&outcomes);
        report::write_report(&self.layout, &run_report).map_err(RunnerError::ReportPersist)?;
        report::log_summary(&run_report);

        Ok(outcomes)
    }
}
