//! CLI entry point for pma-backup.

use std::io::IsTerminal;
use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Parser;
use pma_backup::{BackupRequest, download_sql_backup};
use tracing::{debug, info};

mod cli;

use cli::Args;

#[tokio::main]
async fn main() -> ExitCode {
    // Parse CLI arguments first (before tracing, so --help works without logs).
    // Usage errors exit with code 2 from here.
    let args = Args::parse();

    init_tracing(args.log_level());

    let request = args.into_request();
    debug!(?request, "CLI arguments parsed");

    match run(&request).await {
        Ok(path) => {
            let verb = if request.dry_run {
                "Would have"
            } else {
                "Successfully"
            };
            println!("{verb} saved SQL dump to: {}", path.display());
            ExitCode::SUCCESS
        }
        Err(error) => {
            eprintln!("Error: {error:#}");
            ExitCode::FAILURE
        }
    }
}

async fn run(request: &BackupRequest) -> Result<PathBuf> {
    info!(url = %request.url, "pma-backup starting");
    download_sql_backup(request)
        .await
        .with_context(|| format!("backup from {} failed", request.url))
}

/// Logs go to stderr; `RUST_LOG` overrides the level chosen by `-v`/`-q`.
fn init_tracing(default_level: &str) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level));
    let _ = tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_ansi(std::io::stderr().is_terminal())
        .with_env_filter(filter)
        .try_init();
}
