use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use room_core::{SpeakerType, TranscriptEntry};
use sqlx::Row;
use uuid::Uuid;

use super::HubRepository;

impl HubRepository {
    /// Append one entry. Returns `None` when the interview does not exist.
    pub async fn insert_transcript_entry(
        &self,
        interview_id: &str,
        speaker_type: SpeakerType,
        content: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<TranscriptEntry>> {
        let id = Uuid::new_v4().to_string();
        let result = sqlx::query(
            r#"
            INSERT INTO interview_transcripts
                (id, interview_id, timestamp, speaker_type, content, created_at, updated_at)
            SELECT ?, id, ?, ?, ?, ?, ?
            FROM interviews
            WHERE id = ?
            "#,
        )
        .bind(&id)
        .bind(now)
        .bind(speaker_type.as_str())
        .bind(content)
        .bind(now)
        .bind(now)
        .bind(interview_id)
        .execute(&self.pool)
        .await
        .context("Failed to save transcript entry")?;

        if result.rows_affected() == 0 {
            return Ok(None);
        }

        Ok(Some(TranscriptEntry {
            id,
            interview_id: interview_id.to_string(),
            speaker_type,
            content: content.to_string(),
            timestamp: now,
            created_at: now,
            updated_at: now,
        }))
    }

    pub async fn list_transcript_entries(&self, interview_id: &str) -> Result<Vec<TranscriptEntry>> {
        let rows = sqlx::query(
            r#"
            SELECT id, interview_id, timestamp, speaker_type, content, created_at, updated_at
            FROM interview_transcripts
            WHERE interview_id = ?
            ORDER BY timestamp ASC, seq ASC
            "#,
        )
        .bind(interview_id)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter()
            .map(|r| -> Result<TranscriptEntry> {
                let speaker: String = r.get("speaker_type");
                Ok(TranscriptEntry {
                    id: r.get("id"),
                    interview_id: r.get("interview_id"),
                    speaker_type: speaker.parse()?,
                    content: r.get("content"),
                    timestamp: r.get("timestamp"),
                    created_at: r.get("created_at"),
                    updated_at: r.get("updated_at"),
                })
            })
            .collect()
    }
}
