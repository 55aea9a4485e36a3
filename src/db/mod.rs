//! Login store for report-poller
//!
//! Reads the accounts whose reports should be fetched. The store is any
//! database the `sqlx` Any driver can reach (MySQL in production, SQLite in
//! tests).
//!
//! ## Submodules
//!
//! Methods on [`Database`] are organized by domain:
//! - [`connection`]: connecting and closing the pool
//! - [`logins`]: login and token queries

use sqlx::{AnyPool, FromRow};

mod connection;
mod logins;

/// A login together with the token used to authorize its requests
#[derive(Debug, Clone, PartialEq, Eq, FromRow)]
pub struct LoginCredentials {
    /// Client login sent to the report API
    pub login: String,
    /// Authorization token of the integration owning the login
    pub token: String,
}

/// A login linked to a single integration (token loaded separately)
#[derive(Debug, Clone, PartialEq, Eq, FromRow)]
pub struct IntegrationLogin {
    /// Client login sent to the report API
    pub login: String,
}

/// Token row of an integration
#[derive(Debug, Clone, FromRow)]
pub struct IntegrationToken {
    /// Authorization token
    pub token: String,
}

/// Database handle for the login store
pub struct Database {
    pool: AnyPool,
}

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests;
