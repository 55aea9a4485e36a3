//! Login and token queries.

use crate::error::DatabaseError;
use crate::{Error, Result};

use super::{Database, IntegrationLogin, IntegrationToken, LoginCredentials};

impl Database {
    /// Get the authorization token of one integration
    ///
    /// A missing row and an empty token are both reported as not found.
    pub async fn integration_token(&self, integration_id: i64) -> Result<String> {
        let row = sqlx::query_as::<_, IntegrationToken>(
            r#"
            SELECT token
            FROM integrations
            WHERE id = ?
            "#,
        )
        .bind(integration_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            Error::Database(DatabaseError::QueryFailed(format!(
                "Failed to load token for integration {}: {}",
                integration_id, e
            )))
        })?;

        match row {
            Some(IntegrationToken { token }) if !token.is_empty() => Ok(token),
            _ => Err(Error::Database(DatabaseError::NotFound(format!(
                "token for integration {}",
                integration_id
            )))),
        }
    }

    /// Get the logins linked to one integration
    pub async fn integration_logins(&self, integration_id: i64) -> Result<Vec<IntegrationLogin>> {
        sqlx::query_as::<_, IntegrationLogin>(
            r#"
            SELECT l.login AS login
            FROM logins l
            JOIN integration_logins il ON l.id = il.login_id
            WHERE il.integration_id = ?
            ORDER BY l.id
            "#,
        )
        .bind(integration_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            Error::Database(DatabaseError::QueryFailed(format!(
                "Failed to load logins for integration {}: {}",
                integration_id, e
            )))
        })
    }

    /// Get every login of every active, non-deleted integration with its token
    pub async fn active_logins(&self) -> Result<Vec<LoginCredentials>> {
        sqlx::query_as::<_, LoginCredentials>(
            r#"
            SELECT l.login AS login, i.token AS token
            FROM logins l
            JOIN integration_logins il ON l.id = il.login_id
            JOIN integrations i ON il.integration_id = i.id
            WHERE i.is_active = 1 AND i.is_deleted = 0
            ORDER BY l.id
            "#,
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            Error::Database(DatabaseError::QueryFailed(format!(
                "Failed to load active logins: {}",
                e
            )))
        })
    }

    /// Load the credentials of a batch
    ///
    /// With an `integration_id`, every login of that integration is paired with
    /// the integration's token. Without one, all active logins are loaded with
    /// their own tokens. An empty result is an error: there is nothing to poll.
    pub async fn load_credentials(
        &self,
        integration_id: Option<i64>,
    ) -> Result<Vec<LoginCredentials>> {
        let credentials = match integration_id {
            Some(id) => {
                let token = self.integration_token(id).await?;
                self.integration_logins(id)
                    .await?
                    .into_iter()
                    .map(|row| LoginCredentials {
                        login: row.login,
                        token: token.clone(),
                    })
                    .collect::<Vec<_>>()
            }
            None => self.active_logins().await?,
        };

        if credentials.is_empty() {
            return Err(Error::NoLogins);
        }

        tracing::info!(
            count = credentials.len(),
            integration_id = ?integration_id,
            "loaded logins"
        );

        Ok(credentials)
    }
}
