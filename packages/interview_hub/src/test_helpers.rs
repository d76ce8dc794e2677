use std::sync::Arc;

use crate::AppState;
use crate::config::{FileConfig, ServerConfig};
use crate::db::Database;
use crate::models::NewInterview;
use crate::repository::HubRepository;

/// Build a fully-wired `AppState` backed by an in-memory SQLite database.
pub async fn test_app_state() -> AppState {
    let pool = sqlx::sqlite::SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await
        .expect("in-memory sqlite");

    crate::db::run_migrations(&pool).await.expect("migrations");

    sqlx::query("PRAGMA foreign_keys = ON")
        .execute(&pool)
        .await
        .expect("pragma");

    let db = Arc::new(Database { pool: pool.clone() });
    let repository = Arc::new(HubRepository::new(pool));

    AppState::new(
        Arc::new(ServerConfig::from_file(&FileConfig::default())),
        db,
        repository,
    )
}

/// Insert a bare ACTIVE interview with a fixed id.
pub async fn seed_interview(state: &AppState, id: &str) {
    HubRepository::new(state.db.pool.clone())
        .create_interview(&NewInterview {
            id: Some(id.to_string()),
            position: Some("Backend Engineer".into()),
            ..Default::default()
        })
        .await
        .expect("seed interview");
}
