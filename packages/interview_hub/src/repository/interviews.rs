use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use room_core::{EvaluationFragment, FieldValue, Interview, InterviewStatus};
use sqlx::sqlite::{Sqlite, SqliteRow};
use sqlx::{Executor, QueryBuilder, Row};
use uuid::Uuid;

use crate::models::NewInterview;

use super::HubRepository;

const INTERVIEW_COLUMNS: &str = r#"
    id, candidate_id, position, department, level, description, status,
    start_time, end_time, feedback, overall_score, technical_skill_score,
    problem_solving_score, communication_score, attitude_score,
    experience_relevance_score, strengths_notes, improvement_areas_notes,
    technical_feedback, cultural_fit_notes, recommendation_notes,
    created_at, updated_at
"#;

fn interview_from_row(r: &SqliteRow) -> Result<Interview> {
    let status: String = r.get("status");
    let status: InterviewStatus = status.parse()?;
    Ok(Interview {
        id: r.get("id"),
        candidate_id: r.get("candidate_id"),
        position: r.get("position"),
        department: r.get("department"),
        level: r.get("level"),
        description: r.get("description"),
        status,
        start_time: r.get("start_time"),
        end_time: r.get("end_time"),
        feedback: r.get("feedback"),
        overall_score: r.get("overall_score"),
        technical_skill_score: r.get("technical_skill_score"),
        problem_solving_score: r.get("problem_solving_score"),
        communication_score: r.get("communication_score"),
        attitude_score: r.get("attitude_score"),
        experience_relevance_score: r.get("experience_relevance_score"),
        strengths_notes: r.get("strengths_notes"),
        improvement_areas_notes: r.get("improvement_areas_notes"),
        technical_feedback: r.get("technical_feedback"),
        cultural_fit_notes: r.get("cultural_fit_notes"),
        recommendation_notes: r.get("recommendation_notes"),
        created_at: r.get("created_at"),
        updated_at: r.get("updated_at"),
        transcript_entries: None,
    })
}

/// Shared by pool reads and reads inside the merge transaction.
async fn fetch_interview<'e, E>(executor: E, id: &str) -> Result<Option<Interview>>
where
    E: Executor<'e, Database = Sqlite>,
{
    let sql = format!("SELECT {} FROM interviews WHERE id = ?", INTERVIEW_COLUMNS);
    let row = sqlx::query(&sql).bind(id).fetch_optional(executor).await?;
    row.as_ref().map(interview_from_row).transpose()
}

impl HubRepository {
    pub async fn create_interview(&self, new: &NewInterview) -> Result<Interview> {
        let id = new
            .id
            .clone()
            .unwrap_or_else(|| Uuid::new_v4().to_string());
        let now = Utc::now();
        sqlx::query(
            r#"
            INSERT INTO interviews (id, candidate_id, position, department, level, description,
                                    status, start_time, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&id)
        .bind(&new.candidate_id)
        .bind(&new.position)
        .bind(&new.department)
        .bind(&new.level)
        .bind(&new.description)
        .bind(InterviewStatus::Active.as_str())
        .bind(now)
        .bind(now)
        .bind(now)
        .execute(&self.pool)
        .await
        .context("Failed to create interview")?;

        self.get_interview_record(&id)
            .await?
            .context("Interview missing after insert")
    }

    /// Interview row only, without the transcript.
    pub async fn get_interview_record(&self, id: &str) -> Result<Option<Interview>> {
        fetch_interview(&self.pool, id).await
    }

    /// Merge a fragment last-write-wins and return the updated record, or
    /// `None` when the interview does not exist.
    pub async fn merge_evaluation_fields(
        &self,
        id: &str,
        fragment: &EvaluationFragment,
        now: DateTime<Utc>,
    ) -> Result<Option<Interview>> {
        let mut tx = self.pool.begin().await?;

        let mut qb = QueryBuilder::<Sqlite>::new("UPDATE interviews SET updated_at = ");
        qb.push_bind(now);
        for (field, value) in fragment.iter() {
            qb.push(", ").push(field.column()).push(" = ");
            match value {
                FieldValue::Score(v) => qb.push_bind(*v),
                FieldValue::Text(v) => qb.push_bind(v.clone()),
                FieldValue::Status(s) => qb.push_bind(s.as_str()),
                FieldValue::Timestamp(t) => qb.push_bind(*t),
            };
        }
        qb.push(" WHERE id = ").push_bind(id);

        let result = qb
            .build()
            .execute(&mut *tx)
            .await
            .context("Failed to update evaluation")?;
        if result.rows_affected() == 0 {
            return Ok(None);
        }

        let interview = fetch_interview(&mut *tx, id).await?;
        tx.commit().await?;
        Ok(interview)
    }

    /// Interview with its transcript ordered by timestamp then insertion.
    pub async fn get_interview_with_transcript(&self, id: &str) -> Result<Option<Interview>> {
        let Some(mut interview) = self.get_interview_record(id).await? else {
            return Ok(None);
        };
        interview.transcript_entries = Some(self.list_transcript_entries(id).await?);
        Ok(Some(interview))
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_helpers::{seed_interview, test_repository};
    use super::*;
    use room_core::EvaluationField;

    #[tokio::test]
    async fn test_create_interview_defaults() {
        let repo = test_repository().await;
        let interview = repo
            .create_interview(&NewInterview {
                position: Some("SRE".into()),
                level: Some("SENIOR".into()),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(interview.status, InterviewStatus::Active);
        assert_eq!(interview.position.as_deref(), Some("SRE"));
        assert!(interview.end_time.is_none());
        assert!(interview.overall_score.is_none());
        assert!(!interview.id.is_empty());
    }

    #[tokio::test]
    async fn test_create_interview_with_fixed_id() {
        let repo = test_repository().await;
        seed_interview(&repo, "int-1").await;
        let fetched = repo.get_interview_record("int-1").await.unwrap().unwrap();
        assert_eq!(fetched.id, "int-1");
        assert!(repo.get_interview_record("int-2").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_create_interview_unknown_candidate_fails() {
        let repo = test_repository().await;
        let result = repo
            .create_interview(&NewInterview {
                candidate_id: Some("ghost".into()),
                ..Default::default()
            })
            .await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_merge_evaluation_fields() {
        let repo = test_repository().await;
        seed_interview(&repo, "int-1").await;

        let mut frag = EvaluationFragment::default();
        frag.set(EvaluationField::OverallScore, FieldValue::Score(Some(4.0)));
        frag.set(EvaluationField::Feedback, FieldValue::Text(Some("Strong".into())));
        frag.set(
            EvaluationField::Status,
            FieldValue::Status(InterviewStatus::Completed),
        );
        let end = Utc::now();
        frag.set(EvaluationField::EndTime, FieldValue::Timestamp(Some(end)));

        let updated = repo
            .merge_evaluation_fields("int-1", &frag, Utc::now())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(updated.overall_score, Some(4.0));
        assert_eq!(updated.feedback.as_deref(), Some("Strong"));
        assert_eq!(updated.status, InterviewStatus::Completed);
        assert_eq!(
            updated.end_time.map(|t| t.timestamp_millis()),
            Some(end.timestamp_millis())
        );
        assert_eq!(updated.position.as_deref(), Some("Backend Engineer"));
    }

    #[tokio::test]
    async fn test_merge_preserves_untouched_fields() {
        let repo = test_repository().await;
        seed_interview(&repo, "int-1").await;

        let mut first = EvaluationFragment::default();
        first.set(
            EvaluationField::TechnicalSkillScore,
            FieldValue::Score(Some(3.0)),
        );
        repo.merge_evaluation_fields("int-1", &first, Utc::now())
            .await
            .unwrap();

        let mut second = EvaluationFragment::default();
        second.set(
            EvaluationField::CommunicationScore,
            FieldValue::Score(Some(5.0)),
        );
        let updated = repo
            .merge_evaluation_fields("int-1", &second, Utc::now())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(updated.technical_skill_score, Some(3.0));
        assert_eq!(updated.communication_score, Some(5.0));
    }

    #[tokio::test]
    async fn test_merge_null_clears() {
        let repo = test_repository().await;
        seed_interview(&repo, "int-1").await;
        let mut set = EvaluationFragment::default();
        set.set(EvaluationField::StrengthsNotes, FieldValue::Text(Some("x".into())));
        repo.merge_evaluation_fields("int-1", &set, Utc::now())
            .await
            .unwrap();

        let mut clear = EvaluationFragment::default();
        clear.set(EvaluationField::StrengthsNotes, FieldValue::Text(None));
        let updated = repo
            .merge_evaluation_fields("int-1", &clear, Utc::now())
            .await
            .unwrap()
            .unwrap();
        assert!(updated.strengths_notes.is_none());
    }

    #[tokio::test]
    async fn test_merge_missing_interview() {
        let repo = test_repository().await;
        let result = repo
            .merge_evaluation_fields("nope", &EvaluationFragment::default(), Utc::now())
            .await
            .unwrap();
        assert!(result.is_none());
    }

    #[tokio::test]
    async fn test_merge_empty_fragment_touches_updated_at() {
        let repo = test_repository().await;
        seed_interview(&repo, "int-1").await;
        let before = repo.get_interview_record("int-1").await.unwrap().unwrap();
        let later = before.updated_at + chrono::Duration::seconds(10);

        let updated = repo
            .merge_evaluation_fields("int-1", &EvaluationFragment::default(), later)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(updated.updated_at.timestamp_millis(), later.timestamp_millis());
        assert_eq!(updated.created_at, before.created_at);
    }
}
