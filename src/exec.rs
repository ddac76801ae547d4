//! sqlcmd process wrapper -- spawn one script, enforce the timeout, fold the
//! baseline comparison into a single immutable outcome.

use std::path::PathBuf;
use std::process::{ExitStatus, Stdio};
use std::time::{Duration, Instant};

use serde::Serialize;
use tracing::{error, info};

use crate::compare;

/// Per-script execution bound. Schema-heavy scripts can be slow, but
/// anything past this is treated as hung and killed.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(300);

/// Exit code recorded when the client process could not be evaluated at all
/// (timed out, failed to launch, or was killed by a signal).
pub const EXIT_CODE_UNKNOWN: i32 = -1;

/// Connection parameters passed to the client on every invocation.
#[derive(Debug, Clone)]
pub struct ConnectionInfo {
    pub server: String,
    pub database: String,
    pub username: String,
    pub password: String,
}

/// Run-level configuration shared by every task.
#[derive(Debug, Clone)]
pub struct RunnerConfig {
    /// Client binary; resolved via PATH unless an explicit path is given.
    pub client_path: PathBuf,
    pub connection: ConnectionInfo,
    pub timeout: Duration,
}

impl RunnerConfig {
    pub fn new(connection: ConnectionInfo) -> Self {
        Self {
            client_path: PathBuf::from("sqlcmd"),
            connection,
            timeout: DEFAULT_TIMEOUT,
        }
    }
}

/// One unit of work: a script to execute, where its output goes, and the
/// baseline to check it against (if one was recorded). Immutable once built.
#[derive(Debug, Clone)]
pub struct ScriptTask {
    /// Task identity -- the script's file stem. Every derived artifact
    /// (result, baseline, failure record) is named from it.
    pub name: String,
    pub script_file: PathBuf,
    pub result_file: PathBuf,
    /// Present only when a baseline file exists for this task.
    pub expected_file: Option<PathBuf>,
}

/// The recorded result of executing one task. Built exactly once, consumed
/// by the aggregator and by failure persistence.
#[derive(Debug, Clone, Serialize)]
pub struct ExecutionOutcome {
    pub script_name: String,
    pub success: bool,
    pub exit_code: i32,
    pub output_file: PathBuf,
    pub expected_file: Option<PathBuf>,
    pub differences: Vec<String>,
    /// Wall-clock seconds.
    pub execution_time: f64,
}

impl ExecutionOutcome {
    /// A task passes iff the client exited cleanly and nothing diverged
    /// from the baseline.
    pub fn succeeded(exit_code: i32, differences: &[String]) -> bool {
        exit_code == 0 && differences.is_empty()
    }
}

/// What happened to one client invocation. Tagged so every call site has to
/// handle the timeout and launch-failure paths explicitly.
#[derive(Debug)]
pub enum Invocation {
    Completed(ExitStatus),
    TimedOut,
    LaunchFailed(std::io::Error),
}

/// Spawn the client for one task and wait, bounded by the configured
/// timeout. On expiry the process is killed, not left running.
pub async fn invoke_client(config: &RunnerConfig, task: &ScriptTask) -> Invocation {
    let conn = &config.connection;

    let mut cmd = tokio::process::Command::new(&config.client_path);
    cmd.arg("-S")
        .arg(&conn.server)
        .arg("-d")
        .arg(&conn.database)
        .arg("-U")
        .arg(&conn.username)
        .arg("-P")
        .arg(&conn.password)
        .arg("-i")
        .arg(&task.script_file)
        .arg("-o")
        .arg(&task.result_file)
        // Column separator
        .arg("-s")
        .arg("|")
        // Remove trailing spaces
        .arg("-W")
        // Exit on first error inside the script
        .arg("-b")
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null());

    let mut child = match cmd.spawn() {
        Ok(child) => child,
        Err(e) => return Invocation::LaunchFailed(e),
    };

    match tokio::time::timeout(config.timeout, child.wait()).await {
        Ok(Ok(status)) => Invocation::Completed(status),
        Ok(Err(e)) => Invocation::LaunchFailed(e),
        Err(_) => {
            let _ = child.kill().await;
            Invocation::TimedOut
        }
    }
}

/// Run one task end to end: invoke the client, verify output was produced,
/// compare against the baseline, and assemble the outcome.
///
/// All failure modes are contained in the returned outcome; this never
/// errors, so one bad task cannot take down the batch.
pub async fn run_task(config: &RunnerConfig, task: &ScriptTask) -> ExecutionOutcome {
    info!(script = %task.name, "Running script");
    let start = Instant::now();

    let invocation = invoke_client(config, task).await;
    let execution_time = start.elapsed().as_secs_f64();

    let (exit_code, mut differences) = match invocation {
        Invocation::Completed(status) => {
            // A signal-terminated process has no exit code; fold it into
            // the unknown sentinel.
            (status.code().unwrap_or(EXIT_CODE_UNKNOWN), Vec::new())
        }
        Invocation::TimedOut => {
            error!(script = %task.name, timeout_secs = config.timeout.as_secs(), "Execution timeout");
            return failed_outcome(
                task,
                EXIT_CODE_UNKNOWN,
                vec!["Execution timeout".to_string()],
                execution_time,
            );
        }
        Invocation::LaunchFailed(e) => {
            error!(script = %task.name, error = %e, "Failed to run client");
            return failed_outcome(
                task,
                EXIT_CODE_UNKNOWN,
                vec![format!("Execution error: {}", e)],
                execution_time,
            );
        }
    };

    if !task.result_file.exists() {
        error!(script = %task.name, "No output file generated");
        return failed_outcome(
            task,
            exit_code,
            vec!["No output file generated".to_string()],
            execution_time,
        );
    }

    match &task.expected_file {
        Some(expected) => {
            info!(script = %task.name, "Comparing results against baseline");
            differences.extend(
                compare::compare_files(&task.result_file, expected)
                    .iter()
                    .map(|d| d.to_string()),
            );
        }
        None => {
            tracing::warn!(script = %task.name, "No expected result file found");
        }
    }

    let success = ExecutionOutcome::succeeded(exit_code, &differences);
    if success {
        info!(script = %task.name, "PASSED ({:.2}s)", execution_time);
    } else {
        error!(script = %task.name, exit_code, "FAILED");
        for diff in &differences {
            error!(script = %task.name, "  Difference: {}", diff);
        }
    }

    ExecutionOutcome {
        script_name: task.name.clone(),
        success,
        exit_code,
        output_file: task.result_file.clone(),
        expected_file: task.expected_file.clone(),
        differences,
        execution_time,
    }
}

fn failed_outcome(
    task: &ScriptTask,
    exit_code: i32,
    differences: Vec<String>,
    execution_time: f64,
) -> ExecutionOutcome {
    ExecutionOutcome {
        script_name: task.name.clone(),
        success: false,
        exit_code,
        output_file: task.result_file.clone(),
        expected_file: task.expected_file.clone(),
        differences,
        execution_time,
    }
}
