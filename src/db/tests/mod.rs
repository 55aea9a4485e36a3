use crate::db::*;
use tempfile::TempDir;


/// Open a fresh SQLite login store with the production schema
pub(super) async fn seeded_store() -> (Database, TempDir) {
    let dir = tempfile::tempdir().unwrap();
    let url = format!("sqlite://{}/logins.db?mode=rwc", dir.path().display());
    let db = Database::connect(&url, 1).await.unwrap();

    for statement in [
        "CREATE TABLE integrations (id INTEGER PRIMARY KEY, token TEXT NOT NULL, is_active INTEGER NOT NULL, is_deleted INTEGER NOT NULL)",
        "CREATE TABLE logins (id INTEGER PRIMARY KEY, login TEXT NOT NULL)",
        "CREATE TABLE integration_logins (integration_id INTEGER NOT NULL, login_id INTEGER NOT NULL)",
    ] {
        sqlx::query(statement).execute(&db.pool).await.unwrap();
    }

    (db, dir)
}

/// Insert an integration row
pub(super) async fn insert_integration(db: &Database, id: i64, token: &str, active: bool, deleted: bool) {
    sqlx::query("INSERT INTO integrations (id, token, is_active, is_deleted) VALUES (?, ?, ?, ?)")
        .bind(id)
        .bind(token)
        .bind(active as i64)
        .bind(deleted as i64)
        .execute(&db.pool)
        .await
        .unwrap();
}

/// Insert a login and link it to an integration
pub(super) async fn insert_login(db: &Database, id: i64, login: &str, integration_id: i64) {
    sqlx::query("INSERT INTO logins (id, login) VALUES (?, ?)")
        .bind(id)
        .bind(login)
        .execute(&db.pool)
        .await
        .unwrap();
    sqlx::query("INSERT INTO integration_logins (integration_id, login_id) VALUES (?, ?)")
        .bind(integration_id)
        .bind(id)
        .execute(&db.pool)
        .await
        .unwrap();
}
