//! Run report aggregation and persistence.
//!
//! Two kinds of records leave this module, both plain pretty-printed JSON:
//! one `test_report.json` per run (overwritten each run, fixed location)
//! and one `<task>_failure.json` per failing task. Field names are a stable
//! contract consumed by CI tooling; do not rename them.

use std::path::PathBuf;

use anyhow::{Context, Result};
use serde::Serialize;
use tracing::{error, info};

use crate::exec::ExecutionOutcome;
use crate::layout::Layout;

/// Literal recorded in failure records when no baseline file exists.
const NOT_FOUND: &str = "Not found";

/// Per-script entry in the run report.
#[derive(Debug, Serialize)]
pub struct ScriptSummary {
    pub script_name: String,
    pub success: bool,
    pub exit_code: i32,
    /// Seconds, rounded to 2 decimals.
    pub execution_time: f64,
    pub has_expected_file: bool,
    pub differences_count: usize,
}

/// Aggregate over all outcomes in one run.
#[derive(Debug, Serialize)]
pub struct RunReport {
    pub timestamp: String,
    pub total_scripts: usize,
    pub passed_scripts: usize,
    pub failed_scripts: usize,
    /// Percentage, 0 when nothing ran.
    pub success_rate: f64,
    pub execution_details: Vec<ScriptSummary>,
}

/// Standalone record persisted for every failing task.
#[derive(Debug, Serialize)]
struct FailureRecord<'a> {
    script_name: &'a str,
    timestamp: String,
    success: bool,
    exit_code: i32,
    execution_time: f64,
    differences: &'a [String],
    output_file: &'a PathBuf,
    /// Baseline path, or `"Not found"` if absent when the record is written.
    expected_file: String,
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Build the aggregate report for one completed run.
pub fn build_report(outcomes: &[ExecutionOutcome]) -> RunReport {
    let total_scripts = outcomes.len();
    let passed_scripts = outcomes.iter().filter(|o| o.success).count();
    let failed_scripts = total_scripts - passed_scripts;

    let success_rate = if total_scripts > 0 {
        passed_scripts as f64 / total_scripts as f64 * 100.0
    } else {
        0.0
    };

    RunReport {
        timestamp: chrono::Utc::now().to_rfc3339(),
        total_scripts,
        passed_scripts,
        failed_scripts,
        success_rate,
        execution_details: outcomes
            .iter()
            .map(|o| ScriptSummary {
                script_name: o.script_name.clone(),
                success: o.success,
                exit_code: o.exit_code,
                execution_time: round2(o.execution_time),
                has_expected_file: o.expected_file.as_deref().is_some_and(|p| p.exists()),
                differences_count: o.differences.len(),
            })
            .collect(),
    }
}

/// Persist the run report at its fixed location, replacing any prior one.
pub fn write_report(layout: &Layout, report: &RunReport) -> Result<PathBuf> {
    let path = layout.report_file();
    let json = serde_json::to_string_pretty(report)?;
    std::fs::write(&path, json)
        .with_context(|| format!("failed to write report to {}", path.display()))?;
    info!(path = %path.display(), "Generated test report");
    Ok(path)
}

/// Persist a standalone failure record for one failing outcome.
pub fn write_failure_record(layout: &Layout, outcome: &ExecutionOutcome) -> Result<PathBuf> {
    let expected_file = match &outcome.expected_file {
        Some(path) if path.exists() => path.display().to_string(),
        _ => NOT_FOUND.to_string(),
    };

    let record = FailureRecord {
        script_name: &outcome.script_name,
        timestamp: chrono::Utc::now().to_rfc3339(),
        success: outcome.success,
        exit_code: outcome.exit_code,
        execution_time: outcome.execution_time,
        differences: &outcome.differences,
        output_file: &outcome.output_file,
        expected_file,
    };

    let path = layout.failure_file(&outcome.script_name);
    let json = serde_json::to_string_pretty(&record)?;
    std::fs::write(&path, json)
        .with_context(|| format!("failed to write failure record to {}", path.display()))?;
    info!(path = %path.display(), "Saved failure details");
    Ok(path)
}

/// Log the end-of-run summary block.
pub fn log_summary(report: &RunReport) {
    info!("=== TEST SUMMARY ===");
    info!("Total scripts: {}", report.total_scripts);
    info!("Passed: {}", report.passed_scripts);
    info!("Failed: {}", report.failed_scripts);
    info!("Success rate: {:.1}%", report.success_rate);

    if report.failed_scripts > 0 {
        error!("Some tests failed. Check failed/ directory for details.");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn outcome(name: &str, success: bool) -> ExecutionOutcome {
        ExecutionOutcome {
            script_name: name.to_string(),
            success,
            exit_code: if success { 0 } else { 1 },
            output_file: PathBuf::from(format!("results/{}_result.txt", name)),
            expected_file: None,
            differences: if success {
                vec![]
            } else {
                vec!["Line 1: Expected 'a', Got 'b'".to_string()]
            },
            execution_time: 0.126,
        }
    }

    #[test]
    fn test_aggregation_counts_and_rate() {
        let outcomes = vec![
            outcome("a", true),
            outcome("b", false),
            outcome("c", true),
            outcome("d", true),
        ];
        let report = build_report(&outcomes);
        assert_eq!(report.total_scripts, 4);
        assert_eq!(report.passed_scripts, 3);
        assert_eq!(report.failed_scripts, 1);
        assert_eq!(report.success_rate, 75.0);
        assert_eq!(report.execution_details.len(), 4);
    }

    #[test]
    fn test_empty_run_has_zero_rate() {
        let report = build_report(&[]);
        assert_eq!(report.total_scripts, 0);
        assert_eq!(report.success_rate, 0.0);
    }

    #[test]
    fn test_execution_time_rounded_to_two_decimals() {
        let report = build_report(&[outcome("a", true)]);
        assert_eq!(report.execution_details[0].execution_time, 0.13);
    }

    #[test]
    fn test_report_json_schema_field_names() {
        let report = build_report(&[outcome("a", false)]);
        let value: serde_json::Value =
            serde_json::from_str(&serde_json::to_string(&report).unwrap()).unwrap();

        for key in [
            "timestamp",
            "total_scripts",
            "passed_scripts",
            "failed_scripts",
            "success_rate",
            "execution_details",
        ] {
            assert!(value.get(key).is_some(), "missing report field {}", key);
        }
        let detail = &value["execution_details"][0];
        for key in [
            "script_name",
            "success",
            "exit_code",
            "execution_time",
            "has_expected_file",
            "differences_count",
        ] {
            assert!(detail.get(key).is_some(), "missing detail field {}", key);
        }
        assert_eq!(detail["differences_count"], 1);
        assert_eq!(detail["has_expected_file"], false);
    }

    #[test]
    fn test_failure_record_uses_not_found_for_missing_baseline() {
        let dir = tempfile::tempdir().unwrap();
        let layout = Layout::new(dir.path());
        layout.ensure().unwrap();

        let path = write_failure_record(&layout, &outcome("broken", false)).unwrap();
        let value: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(path).unwrap()).unwrap();

        assert_eq!(value["script_name"], "broken");
        assert_eq!(value["success"], false);
        assert_eq!(value["exit_code"], 1);
        assert_eq!(value["expected_file"], "Not found");
        assert_eq!(value["differences"][0], "Line 1: Expected 'a', Got 'b'");
    }

    #[test]
    fn test_failure_record_keeps_existing_baseline_path() {
        let dir = tempfile::tempdir().unwrap();
        let layout = Layout::new(dir.path());
        layout.ensure().unwrap();

        let expected = layout.expected_file("broken");
        std::fs::write(&expected, "a\n").unwrap();

        let mut failing = outcome("broken", false);
        failing.expected_file = Some(expected.clone());

        let path = write_failure_record(&layout, &failing).unwrap();
        let value: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(path).unwrap()).unwrap();
        assert_eq!(value["expected_file"], expected.display().to_string());
    }

    #[test]
    fn test_report_overwrites_previous_run() {
        let dir = tempfile::tempdir().unwrap();
        let layout = Layout::new(dir.path());
        layout.ensure().unwrap();

        write_report(&layout, &build_report(&[outcome("a", true), outcome("b", true)])).unwrap();
        let path = write_report(&layout, &build_report(&[outcome("a", true)])).unwrap();

        let value: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(path).unwrap()).unwrap();
        assert_eq!(value["total_scripts"], 1);
    }
}
