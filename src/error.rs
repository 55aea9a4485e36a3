//! Error types for report-poller
//!
//! Errors fall into two groups:
//! - Run-level errors (configuration, templates, login store) abort the run
//!   before the scheduler starts.
//! - Task-level errors (transport, protocol, persistence) are absorbed by the
//!   task runner and recorded as the task's [`Completion`](crate::task::Completion).

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for report-poller operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for report-poller
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration error with context about which setting is invalid
    #[error("configuration error: {message}")]
    Config {
        /// Human-readable error message describing the configuration issue
        message: String,
        /// The configuration key that caused the error (e.g., "http.reports_url")
        key: Option<String>,
    },

    /// Template file could not be read
    #[error("failed to read template {}: {source}", path.display())]
    Template {
        /// Path of the template file
        path: PathBuf,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// Login store error
    #[error("database error: {0}")]
    Database(#[from] DatabaseError),

    /// Transport error talking to the report API (connect, timeout, body read)
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// The report API broke its response contract
    #[error("protocol violation on status {status}: {reason}")]
    ProtocolViolation {
        /// HTTP status code of the offending response
        status: u16,
        /// What was wrong with the response
        reason: String,
    },

    /// The login store returned no logins to process
    #[error("no logins found")]
    NoLogins,

    /// Other error
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Shorthand for a configuration error tied to a config key
    pub fn config(message: impl Into<String>, key: impl Into<String>) -> Self {
        Error::Config {
            message: message.into(),
            key: Some(key.into()),
        }
    }
}

/// Database-related errors
#[derive(Debug, Error)]
pub enum DatabaseError {
    /// Failed to connect to database
    #[error("failed to connect to database: {0}")]
    ConnectionFailed(String),

    /// Query failed
    #[error("query failed: {0}")]
    QueryFailed(String),

    /// Record not found
    #[error("record not found: {0}")]
    NotFound(String),
}
