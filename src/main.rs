use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

use clap::Parser;

use sqlrunner::exec::{ConnectionInfo, RunnerConfig};
use sqlrunner::runner::RunnerError;

/// Exit code for the "nothing to test" condition, distinct from both
/// all-pass (0) and test failures (1).
const EXIT_NO_SCRIPTS: u8 = 2;

#[derive(Parser)]
#[command(
    name = "sqlrunner",
    about = "Run SQL scripts via sqlcmd and compare results against expected baselines",
    version,
    long_about = None
)]
struct Cli {
    /// SQL Server instance
    #[arg(long)]
    server: String,

    /// Database name
    #[arg(long)]
    database: String,

    /// SQL Server username
    #[arg(long)]
    username: String,

    /// SQL Server password
    #[arg(long)]
    password: String,

    /// Path to the sqlcmd executable
    #[arg(long, default_value = "sqlcmd")]
    sqlcmd: PathBuf,

    /// Base directory holding scripts/, results/, expected/ and failed/
    #[arg(long, default_value = "sql_test_results")]
    base_dir: String,

    /// Per-script timeout in seconds
    #[arg(long, default_value_t = 300)]
    timeout_secs: u64,
}

#[tokio::main]
async fn main() -> ExitCode {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    let config = RunnerConfig {
        client_path: cli.sqlcmd,
        connection: ConnectionInfo {
            server: cli.server,
            database: cli.database,
            username: cli.username,
            password: cli.password,
        },
        timeout: Duration::from_secs(cli.timeout_secs),
    };

    match sqlrunner::run_all(&cli.base_dir, config).await {
        Ok(outcomes) => {
            if outcomes.iter().all(|o| o.success) {
                ExitCode::SUCCESS
            } else {
                ExitCode::FAILURE
            }
        }
        Err(RunnerError::NoScriptsFound { dir }) => {
            tracing::error!(dir = %dir.display(), "Nothing to test");
            ExitCode::from(EXIT_NO_SCRIPTS)
        }
        Err(e) => {
            tracing::error!(error = %e, "Run aborted");
            ExitCode::FAILURE
        }
    }
}
