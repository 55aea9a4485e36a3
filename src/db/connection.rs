//! Database lifecycle.

use crate::error::DatabaseError;
use crate::{Error, Result};
use sqlx::any::AnyPoolOptions;

use super::Database;

impl Database {
    /// Connect to the login store
    ///
    /// `url` selects the driver by scheme (`mysql://`, `sqlite:`).
    pub async fn connect(url: &str, max_connections: u32) -> Result<Self> {
        sqlx::any::install_default_drivers();

        let pool = AnyPoolOptions::new()
            .max_connections(max_connections)
            .connect(url)
            .await
            .map_err(|e| {
                Error::Database(DatabaseError::ConnectionFailed(format!(
                    "Failed to connect to login store: {}",
                    e
                )))
            })?;

        tracing::debug!(max_connections, "connected to login store");

        Ok(Self { pool })
    }

    /// Close all connections in the pool
    pub async fn close(self) {
        self.pool.close().await;
    }
}
