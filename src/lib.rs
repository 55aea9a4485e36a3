//! # report-poller
//!
//! Batch fetcher for an asynchronous report API.
//!
//! The API builds reports lazily: a request for a report that is not ready yet
//! is answered with `201`/`202` and a `Retryin` header saying how many seconds
//! to wait. report-poller loads a set of logins, sends one report request per
//! login, stores every response on disk and keeps re-requesting each report
//! until the API delivers it, gives up on it, or the retry budget runs out.
//!
//! ## Pieces
//!
//! - [`db::Database`] loads logins and tokens
//! - [`batch::BatchBuilder`] renders one request per login from templates
//! - [`scheduler::Scheduler`] polls the task set on a fixed interval
//! - [`runner::TaskRunner`] performs single attempts
//! - [`classify::classify`] decides what a response means
//! - [`sink::ResponseStore`] writes every response to disk
//!
//! ## Quick Start
//!
//! ```no_run
//! use report_poller::{Config, run_batch};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = Config::from_file("config/config.toml".as_ref())?;
//!     let report = run_batch(&config).await?;
//!     println!("{} reports delivered", report.succeeded);
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::unwrap_used)]
#![warn(clippy::expect_used)]

/// Batch construction from logins and templates
pub mod batch;
/// Response classification
pub mod classify;
/// Configuration types
pub mod config;
/// Login store
pub mod db;
/// Error types
pub mod error;
/// Report API client
pub mod fetch;
/// Logging setup
pub mod logging;
/// Single-attempt task execution
pub mod runner;
/// Polling scheduler
pub mod scheduler;
/// Response persistence
pub mod sink;
/// Report tasks and claims
pub mod task;
/// Request templates
pub mod template;


// Re-export commonly used types
pub use batch::BatchBuilder;
pub use config::Config;
pub use db::{Database, LoginCredentials};
pub use error::{DatabaseError, Error, Result};
pub use fetch::{HttpReportClient, RawResponse, ReportFetcher};
pub use runner::TaskRunner;
pub use scheduler::{BatchReport, Scheduler};
pub use sink::ResponseStore;
pub use task::{Completion, ReportTask, TaskHandle};

use std::sync::Arc;

/// Run one complete batch as configured
///
/// Loads the logins, builds the tasks and polls them until the batch is
/// complete or the cycle limit is reached. Failures before polling starts are
/// returned as errors; failures of individual tasks are only counted in the
/// returned [`BatchReport`].
pub async fn run_batch(config: &Config) -> Result<BatchReport> {
    let db = Database::connect(
        &config.database.connection_url()?,
        config.database.max_connections,
    )
    .await?;
    let logins = db.load_credentials(config.source.integration_id).await;
    db.close().await;
    let logins = logins?;

    let tasks = BatchBuilder::from_paths(&config.paths)?.build(&logins)?;

    let client = HttpReportClient::from_config(&config.http)?;
    let runner = TaskRunner::new(
        Arc::new(client),
        ResponseStore::new(&config.paths.input_dir),
        config.http.try_count,
    );

    Ok(Scheduler::new(tasks, runner, &config.scheduler).run().await)
}

/// Wait for a termination signal
///
/// - **Unix:** listens for SIGTERM and SIGINT, with fallbacks if signal registration fails.
/// - **Windows/other:** listens for Ctrl+C via `tokio::signal::ctrl_c()`.
#[cfg(unix)]
pub async fn shutdown_signal() {
    use tokio::signal::unix::{SignalKind, signal};

    // Signal registration may fail in restricted environments (containers, tests)
    match (signal(SignalKind::terminate()), signal(SignalKind::interrupt())) {
        (Ok(mut sigterm), Ok(mut sigint)) => {
            tokio::select! {
                _ = sigterm.recv() => tracing::info!("received SIGTERM"),
                _ = sigint.recv() => tracing::info!("received SIGINT"),
            }
        }
        (Err(e), Ok(mut sigint)) => {
            tracing::warn!(error = %e, "could not register SIGTERM handler, waiting for SIGINT only");
            sigint.recv().await;
            tracing::info!("received SIGINT");
        }
        (Ok(mut sigterm), Err(e)) => {
            tracing::warn!(error = %e, "could not register SIGINT handler, waiting for SIGTERM only");
            sigterm.recv().await;
            tracing::info!("received SIGTERM");
        }
        (Err(e), Err(_)) => {
            tracing::error!(error = %e, "could not register any signal handlers, using ctrl_c fallback");
            tokio::signal::ctrl_c().await.ok();
        }
    }
}

/// Wait for a termination signal (Ctrl+C)
#[cfg(not(unix))]
pub async fn shutdown_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => tracing::info!("received Ctrl+C"),
        Err(e) => tracing::error!(error = %e, "failed to listen for Ctrl+C"),
    }
}
