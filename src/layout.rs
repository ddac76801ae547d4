//! On-disk layout: fixed directory structure under a base root, plus script
//! discovery. Discovery is the only place tasks are minted from the
//! filesystem; tests build tasks in memory and skip this module entirely.

use std::io;
use std::path::{Path, PathBuf};

use tracing::info;

use crate::exec::ScriptTask;

/// Extension scripts must carry to be picked up.
const SCRIPT_EXTENSION: &str = "sql";

/// The fixed relative structure under the base directory:
/// `scripts/` in, `results/` out, `expected/` baselines, `failed/` records,
/// and `test_report.json` at the top.
#[derive(Debug, Clone)]
pub struct Layout {
    pub base: PathBuf,
    pub scripts_dir: PathBuf,
    pub results_dir: PathBuf,
    pub expected_dir: PathBuf,
    pub failed_dir: PathBuf,
}

impl Layout {
    pub fn new(base: impl Into<PathBuf>) -> Self {
        let base = base.into();
        Self {
            scripts_dir: base.join("scripts"),
            results_dir: base.join("results"),
            expected_dir: base.join("expected"),
            failed_dir: base.join("failed"),
            base,
        }
    }

    /// Create the directory tree if any part is missing.
    pub fn ensure(&self) -> io::Result<()> {
        for dir in [
            &self.scripts_dir,
            &self.results_dir,
            &self.expected_dir,
            &self.failed_dir,
        ] {
            std::fs::create_dir_all(dir)?;
        }
        Ok(())
    }

    pub fn result_file(&self, task_name: &str) -> PathBuf {
        self.results_dir.join(format!("{}_result.txt", task_name))
    }

    pub fn expected_file(&self, task_name: &str) -> PathBuf {
        self.expected_dir.join(format!("{}_expected.txt", task_name))
    }

    pub fn failure_file(&self, task_name: &str) -> PathBuf {
        self.failed_dir.join(format!("{}_failure.json", task_name))
    }

    pub fn report_file(&self) -> PathBuf {
        self.base.join("test_report.json")
    }

    /// Enumerate `*.sql` scripts and build one task per script.
    ///
    /// Order is by task name: `read_dir` gives no guarantee and script
    /// batches often carry ordering dependencies (schema setup first), so
    /// the run order must at least be stable between runs.
    pub fn discover_scripts(&self) -> io::Result<Vec<ScriptTask>> {
        let mut tasks = Vec::new();

        for entry in std::fs::read_dir(&self.scripts_dir)? {
            let path = entry?.path();
            if !has_script_extension(&path) {
                continue;
            }
            let Some(stem) = path.file_stem().and_then(|s| s.to_str()) else {
                continue;
            };

            let expected = self.expected_file(stem);
            tasks.push(ScriptTask {
                name: stem.to_string(),
                script_file: path.clone(),
                result_file: self.result_file(stem),
                expected_file: expected.exists().then_some(expected),
            });
        }

        tasks.sort_by(|a, b| a.name.cmp(&b.name));
        info!(count = tasks.len(), dir = %self.scripts_dir.display(), "Found SQL scripts");
        Ok(tasks)
    }
}

fn has_script_extension(path: &Path) -> bool {
    path.is_file()
        && path
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case(SCRIPT_EXTENSION))
}
