//! Templates, login store seeding and task fixtures

use report_poller::template::Template;
use report_poller::{BatchBuilder, LoginCredentials, TaskHandle};
use sqlx::AnyPool;
use std::path::{Path, PathBuf};

/// Header template in the shape the report API expects
pub const HEADER_TEMPLATE: &str = r#"{
    "Authorization": "Bearer @AuthorizationToken",
    "Client-Login": "@Client-Login",
    "Accept-Language": "en",
    "processingMode": "auto"
}"#;

/// Body template requesting one day of campaign statistics
pub const BODY_TEMPLATE: &str = r#"{
    "params": {
        "SelectionCriteria": {"DateFrom": "@DateFrom", "DateTo": "@DateTo"},
        "FieldNames": ["Date", "CampaignId", "Impressions", "Clicks", "Cost"],
        "ReportName": "@ReportName",
        "ReportType": "CAMPAIGN_PERFORMANCE_REPORT",
        "DateRangeType": "CUSTOM_DATE",
        "Format": "TSV"
    }
}"#;

/// Write both templates into `dir`, returning (header, body) paths
pub fn write_templates(dir: &Path) -> (PathBuf, PathBuf) {
    let header = dir.join("header.json");
    let body = dir.join("body.json");
    std::fs::write(&header, HEADER_TEMPLATE).unwrap();
    std::fs::write(&body, BODY_TEMPLATE).unwrap();
    (header, body)
}

/// One task per login, all sharing `token`
pub fn tasks(logins: &[&str], token: &str) -> Vec<TaskHandle> {
    let credentials: Vec<_> = logins
        .iter()
        .map(|login| LoginCredentials {
            login: login.to_string(),
            token: token.to_string(),
        })
        .collect();
    BatchBuilder::new(Template::new(HEADER_TEMPLATE), Template::new(BODY_TEMPLATE))
        .build(&credentials)
        .unwrap()
}

/// An integration row: (id, token, is_active, is_deleted)
pub type IntegrationRow<'a> = (i64, &'a str, bool, bool);

/// A login row linked to an integration: (id, login, integration_id)
pub type LoginRow<'a> = (i64, &'a str, i64);

/// Create a SQLite login store in `dir` and return its URL
pub async fn seed_login_store(
    dir: &Path,
    integrations: &[IntegrationRow<'_>],
    logins: &[LoginRow<'_>],
) -> String {
    sqlx::any::install_default_drivers();
    let url = format!("sqlite://{}/logins.db?mode=rwc", dir.display());
    let pool = AnyPool::connect(&url).await.unwrap();

    for statement in [
        "CREATE TABLE integrations (id INTEGER PRIMARY KEY, token TEXT NOT NULL, is_active INTEGER NOT NULL, is_deleted INTEGER NOT NULL)",
        "CREATE TABLE logins (id INTEGER PRIMARY KEY, login TEXT NOT NULL)",
        "CREATE TABLE integration_logins (integration_id INTEGER NOT NULL, login_id INTEGER NOT NULL)",
    ] {
        sqlx::query(statement).execute(&pool).await.unwrap();
    }

    for (id, token, active, deleted) in integrations {
        sqlx::query("INSERT INTO integrations (id, token, is_active, is_deleted) VALUES (?, ?, ?, ?)")
            .bind(*id)
            .bind(*token)
            .bind(*active as i64)
            .bind(*deleted as i64)
            .execute(&pool)
            .await
            .unwrap();
    }
    for (id, login, integration_id) in logins {
        sqlx::query("INSERT INTO logins (id, login) VALUES (?, ?)")
            .bind(*id)
            .bind(*login)
            .execute(&pool)
            .await
            .unwrap();
        sqlx::query("INSERT INTO integration_logins (integration_id, login_id) VALUES (?, ?)")
            .bind(*integration_id)
            .bind(*id)
            .execute(&pool)
            .await
            .unwrap();
    }

    pool.close().await;
    url
}
