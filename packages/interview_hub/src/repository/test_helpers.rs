use sqlx::sqlite::SqlitePoolOptions;

use crate::models::NewInterview;

/// Create a fresh HubRepository backed by an in-memory SQLite database.
/// Each call returns an isolated database with all migrations applied.
pub async fn test_repository() -> super::HubRepository {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await
        .expect("Failed to create in-memory SQLite pool");

    crate::db::run_migrations(&pool)
        .await
        .expect("Failed to run migrations");

    sqlx::query("PRAGMA foreign_keys = ON")
        .execute(&pool)
        .await
        .expect("Failed to enable foreign keys");

    super::HubRepository::new(pool)
}

/// Insert a bare ACTIVE interview with a fixed id.
pub async fn seed_interview(repo: &super::HubRepository, id: &str) {
    repo.create_interview(&NewInterview {
        id: Some(id.to_string()),
        position: Some("Backend Engineer".into()),
        ..Default::default()
    })
    .await
    .expect("Failed to seed interview");
}
