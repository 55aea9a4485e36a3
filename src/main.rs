//! report-poller command line entry point

use anyhow::Context;
use clap::Parser;
use report_poller::{Config, logging, run_batch, shutdown_signal};
use std::path::PathBuf;
use tracing::{error, info, warn};

/// Fetch yesterday's reports for every configured login.
#[derive(Parser)]
#[command(name = "report-poller", version, about)]
struct Cli {
    /// Path to the TOML configuration file.
    #[arg(long, default_value = "config/config.toml")]
    config: PathBuf,

    /// Only process the logins of this integration (overrides [source]).
    #[arg(long)]
    integration_id: Option<i64>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut config = Config::from_file(&cli.config)
        .with_context(|| format!("failed to load {}", cli.config.display()))?;
    if cli.integration_id.is_some() {
        config.source.integration_id = cli.integration_id;
    }

    let _log_guard = logging::init(&config.paths.log_file)?;
    info!(
        config = %cli.config.display(),
        integration_id = ?config.source.integration_id,
        "report-poller starting"
    );

    tokio::select! {
        result = run_batch(&config) => {
            match result {
                Ok(report) => info!(
                    complete = report.complete,
                    cycles = report.cycles,
                    succeeded = report.succeeded,
                    failed = report.failed(),
                    exhausted = report.exhausted,
                    pending = report.pending,
                    "report-poller finished"
                ),
                Err(e) => {
                    error!(error = %e, "report-poller failed");
                    return Err(e.into());
                }
            }
        }
        _ = shutdown_signal() => {
            warn!("shutdown requested, abandoning in-flight tasks");
        }
    }

    Ok(())
}
