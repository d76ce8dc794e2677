use anyhow::{Context, Result};
use chrono::Utc;
use sqlx::Row;
use sqlx::sqlite::SqliteRow;
use uuid::Uuid;

use crate::models::{Candidate, NewCandidate};

use super::HubRepository;

fn candidate_from_row(r: &SqliteRow) -> Candidate {
    Candidate {
        id: r.get("id"),
        name: r.get("name"),
        email: r.get("email"),
        phone: r.get("phone"),
        resume: r.get("resume"),
        experience: r.get("experience"),
        skills: r.get("skills"),
        education: r.get("education"),
        created_at: r.get("created_at"),
        updated_at: r.get("updated_at"),
    }
}

impl HubRepository {
    pub async fn create_candidate(&self, new: &NewCandidate) -> Result<Candidate> {
        let id = Uuid::new_v4().to_string();
        let now = Utc::now();
        sqlx::query(
            r#"
            INSERT INTO candidates (id, name, email, phone, skills, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&id)
        .bind(&new.name)
        .bind(&new.email)
        .bind(&new.phone)
        .bind(&new.skills)
        .bind(now)
        .bind(now)
        .execute(&self.pool)
        .await
        .context("Failed to create candidate")?;

        self.get_candidate(&id)
            .await?
            .context("Candidate missing after insert")
    }

    pub async fn get_candidate(&self, id: &str) -> Result<Option<Candidate>> {
        let row = sqlx::query(
            r#"
            SELECT id, name, email, phone, resume, experience, skills, education,
                   created_at, updated_at
            FROM candidates
            WHERE id = ?
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.as_ref().map(candidate_from_row))
    }

    pub async fn get_candidate_by_email(&self, email: &str) -> Result<Option<Candidate>> {
        let row = sqlx::query(
            r#"
            SELECT id, name, email, phone, resume, experience, skills, education,
                   created_at, updated_at
            FROM candidates
            WHERE email = ?
            "#,
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.as_ref().map(candidate_from_row))
    }
}
