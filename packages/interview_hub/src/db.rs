use anyhow::{Context, Result};
use sqlx::sqlite::{SqlitePool, SqlitePoolOptions};
use tracing::info;

use crate::config::{HubConfig, ServerConfig};

#[derive(Clone)]
pub struct Database {
    pub pool: SqlitePool,
}

impl Database {
    pub async fn new(config: &HubConfig, server_config: &ServerConfig) -> Result<Self> {
        info!("Connecting to database: {}", config.db_path.display());

        let pool = SqlitePoolOptions::new()
            .max_connections(server_config.max_db_connections)
            .min_connections(1)
            .connect(&config.db_url())
            .await
            .with_context(|| format!("Failed to connect to database: {}", config.db_url()))?;

        info!("Running database migrations...");
        self::run_migrations(&pool).await?;

        sqlx::query("PRAGMA journal_mode = WAL")
            .execute(&pool)
            .await?;
        sqlx::query("PRAGMA synchronous = NORMAL")
            .execute(&pool)
            .await?;
        sqlx::query("PRAGMA foreign_keys = ON")
            .execute(&pool)
            .await?;

        info!("Database initialized successfully");

        Ok(Self { pool })
    }

    /// Cheap round trip used by the readiness probe.
    pub async fn ping(&self) -> bool {
        sqlx::query("SELECT 1").execute(&self.pool).await.is_ok()
    }
}

/// Current schema version - increment when adding migrations
const SCHEMA_VERSION: i64 = 1;

pub(crate) async fn run_migrations(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS schema_version (
            version INTEGER PRIMARY KEY,
            applied_at INTEGER NOT NULL DEFAULT (unixepoch()),
            description TEXT
        )
        "#,
    )
    .execute(pool)
    .await?;

    let current_version: i64 =
        sqlx::query_scalar("SELECT COALESCE(MAX(version), 0) FROM schema_version")
            .fetch_one(pool)
            .await
            .unwrap_or(0);

    if current_version > SCHEMA_VERSION {
        anyhow::bail!(
            "Database schema version {} is newer than supported version {}. Please upgrade the application.",
            current_version,
            SCHEMA_VERSION
        );
    }

    if current_version == SCHEMA_VERSION {
        info!(
            "Database schema is up to date (version {})",
            current_version
        );
        return Ok(());
    }

    info!(
        "Migrating database from version {} to {}",
        current_version, SCHEMA_VERSION
    );

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS candidates (
            id TEXT PRIMARY KEY,
            name TEXT,
            email TEXT UNIQUE,
            phone TEXT,
            resume TEXT,
            experience TEXT,
            skills TEXT,
            education TEXT,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    // Timestamps are RFC 3339 text, which sorts chronologically.
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS interviews (
            id TEXT PRIMARY KEY,
            candidate_id TEXT REFERENCES candidates(id) ON DELETE SET NULL,
            position TEXT,
            department TEXT,
            level TEXT,
            description TEXT,
            status TEXT NOT NULL DEFAULT 'ACTIVE'
                CHECK (status IN ('ACTIVE', 'COMPLETED', 'CANCELLED', 'PENDING_REVIEW')),
            start_time TEXT NOT NULL,
            end_time TEXT,
            feedback TEXT,
            overall_score REAL,
            technical_skill_score REAL,
            problem_solving_score REAL,
            communication_score REAL,
            attitude_score REAL,
            experience_relevance_score REAL,
            strengths_notes TEXT,
            improvement_areas_notes TEXT,
            technical_feedback TEXT,
            cultural_fit_notes TEXT,
            recommendation_notes TEXT,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    // `seq` records insertion order for entries that share a timestamp.
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS interview_transcripts (
            seq INTEGER PRIMARY KEY AUTOINCREMENT,
            id TEXT NOT NULL UNIQUE,
            interview_id TEXT NOT NULL REFERENCES interviews(id) ON DELETE CASCADE,
            timestamp TEXT NOT NULL,
            speaker_type TEXT NOT NULL
                CHECK (speaker_type IN ('AGENT', 'CANDIDATE', 'SYSTEM')),
            content TEXT NOT NULL,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_transcripts_interview ON interview_transcripts(interview_id, timestamp, seq)",
    )
    .execute(pool)
    .await?;

    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_interviews_candidate ON interviews(candidate_id)",
    )
    .execute(pool)
    .await?;

    if current_version < SCHEMA_VERSION {
        sqlx::query("INSERT OR REPLACE INTO schema_version (version, description) VALUES (?, ?)")
            .bind(SCHEMA_VERSION)
            .bind("Initial schema: candidates, interviews, interview_transcripts")
            .execute(pool)
            .await?;
        info!("Schema upgraded to version {}", SCHEMA_VERSION);
    }

    info!("Database migrations completed");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use sqlx::sqlite::SqlitePoolOptions;

    async fn test_pool() -> SqlitePool {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .unwrap();
        run_migrations(&pool).await.unwrap();
        sqlx::query("PRAGMA foreign_keys = ON")
            .execute(&pool)
            .await
            .unwrap();
        pool
    }

    #[tokio::test]
    async fn run_migrations_idempotent() {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .unwrap();

        run_migrations(&pool).await.unwrap();
        run_migrations(&pool).await.unwrap();
    }

    #[tokio::test]
    async fn schema_version_recorded() {
        let pool = test_pool().await;
        let version: i64 =
            sqlx::query_scalar("SELECT COALESCE(MAX(version), 0) FROM schema_version")
                .fetch_one(&pool)
                .await
                .unwrap();
        assert_eq!(version, SCHEMA_VERSION);
    }

    #[tokio::test]
    async fn newer_schema_is_rejected() {
        let pool = test_pool().await;
        sqlx::query("INSERT INTO schema_version (version, description) VALUES (99, 'future')")
            .execute(&pool)
            .await
            .unwrap();
        let err = run_migrations(&pool).await.unwrap_err();
        assert!(err.to_string().contains("newer than supported"));
    }

    #[tokio::test]
    async fn all_tables_exist_after_migration() {
        let pool = test_pool().await;

        for table in ["candidates", "interviews", "interview_transcripts"] {
            let count: (i64,) = sqlx::query_as(&format!("SELECT COUNT(*) FROM {}", table))
                .fetch_one(&pool)
                .await
                .unwrap();
            assert_eq!(count.0, 0, "Table {} should exist and be empty", table);
        }
    }

    #[tokio::test]
    async fn status_check_constraint() {
        let pool = test_pool().await;
        let result = sqlx::query(
            "INSERT INTO interviews (id, status, start_time, created_at, updated_at) VALUES ('i1', 'DONE', 'x', 'x', 'x')",
        )
        .execute(&pool)
        .await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn transcript_requires_interview() {
        let pool = test_pool().await;
        let result = sqlx::query(
            "INSERT INTO interview_transcripts (id, interview_id, timestamp, speaker_type, content, created_at, updated_at) VALUES ('t1', 'missing', 'x', 'AGENT', 'hi', 'x', 'x')",
        )
        .execute(&pool)
        .await;
        assert!(result.is_err());
    }
}
