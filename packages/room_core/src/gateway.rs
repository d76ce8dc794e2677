//! Durable-store seam used by the router.

use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::{Mutex, RwLock};
use uuid::Uuid;

use crate::error::RoomError;
use crate::evaluation::EvaluationFragment;
use crate::protocol::{Interview, SpeakerType, TranscriptEntry};

/// Transcript entries are append-only; evaluation fragments merge
/// last-write-wins into the interview record.
#[async_trait]
pub trait PersistenceGateway: Send + Sync {
    async fn append_transcript_entry(
        &self,
        interview_id: &str,
        speaker_type: SpeakerType,
        content: &str,
    ) -> Result<TranscriptEntry, RoomError>;

    async fn merge_evaluation(
        &self,
        interview_id: &str,
        fragment: &EvaluationFragment,
    ) -> Result<Interview, RoomError>;

    /// Interview with its transcript ordered by timestamp.
    async fn get_interview(&self, interview_id: &str) -> Result<Interview, RoomError>;
}

#[derive(Default)]
struct MemoryState {
    interviews: HashMap<String, Interview>,
    transcripts: HashMap<String, Vec<TranscriptEntry>>,
}

/// In-process gateway for tests and embedding. Supports failure injection.
#[derive(Default)]
pub struct MemoryGateway {
    state: RwLock<MemoryState>,
    failure: Mutex<Option<RoomError>>,
    append_calls: AtomicU64,
    merge_calls: AtomicU64,
}

impl MemoryGateway {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn insert_interview(&self, interview: Interview) {
        self.state
            .write()
            .await
            .interviews
            .insert(interview.id.clone(), interview);
    }

    /// Every subsequent write fails with `error` until cleared.
    pub async fn fail_with(&self, error: Option<RoomError>) {
        *self.failure.lock().await = error;
    }

    pub fn append_calls(&self) -> u64 {
        self.append_calls.load(Ordering::Relaxed)
    }

    pub fn merge_calls(&self) -> u64 {
        self.merge_calls.load(Ordering::Relaxed)
    }

    async fn injected_failure(&self) -> Result<(), RoomError> {
        match self.failure.lock().await.clone() {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl PersistenceGateway for MemoryGateway {
    async fn append_transcript_entry(
        &self,
        interview_id: &str,
        speaker_type: SpeakerType,
        content: &str,
    ) -> Result<TranscriptEntry, RoomError> {
        self.append_calls.fetch_add(1, Ordering::Relaxed);
        self.injected_failure().await?;
        if content.trim().is_empty() {
            return Err(RoomError::validation("content must not be empty"));
        }

        let mut state = self.state.write().await;
        if !state.interviews.contains_key(interview_id) {
            return Err(RoomError::NotFound(interview_id.to_string()));
        }
        let now = Utc::now();
        let entry = TranscriptEntry {
            id: Uuid::new_v4().to_string(),
            interview_id: interview_id.to_string(),
            speaker_type,
            content: content.to_string(),
            timestamp: now,
            created_at: now,
            updated_at: now,
        };
        state
            .transcripts
            .entry(interview_id.to_string())
            .or_default()
            .push(entry.clone());
        Ok(entry)
    }

    async fn merge_evaluation(
        &self,
        interview_id: &str,
        fragment: &EvaluationFragment,
    ) -> Result<Interview, RoomError> {
        self.merge_calls.fetch_add(1, Ordering::Relaxed);
        self.injected_failure().await?;

        let mut state = self.state.write().await;
        let interview = state
            .interviews
            .get_mut(interview_id)
            .ok_or_else(|| RoomError::NotFound(interview_id.to_string()))?;
        fragment.apply_to(interview, Utc::now());
        Ok(interview.clone())
    }

    async fn get_interview(&self, interview_id: &str) -> Result<Interview, RoomError> {
        let state = self.state.read().await;
        let mut interview = state
            .interviews
            .get(interview_id)
            .cloned()
            .ok_or_else(|| RoomError::NotFound(interview_id.to_string()))?;
        let mut entries = state
            .transcripts
            .get(interview_id)
            .cloned()
            .unwrap_or_default();
        // Stable sort keeps insertion order for equal timestamps.
        entries.sort_by_key(|e| e.timestamp);
        interview.transcript_entries = Some(entries);
        Ok(interview)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::evaluation::{EvaluationField, FieldValue};

    async fn seeded() -> MemoryGateway {
        let gateway = MemoryGateway::new();
        gateway
            .insert_interview(Interview::new("int-1", Utc::now()))
            .await;
        gateway
    }

    #[tokio::test]
    async fn test_append_and_lookup_in_order() {
        let gateway = seeded().await;
        gateway
            .append_transcript_entry("int-1", SpeakerType::Agent, "first")
            .await
            .unwrap();
        gateway
            .append_transcript_entry("int-1", SpeakerType::Candidate, "second")
            .await
            .unwrap();

        let interview = gateway.get_interview("int-1").await.unwrap();
        let contents: Vec<_> = interview
            .transcript_entries
            .unwrap()
            .into_iter()
            .map(|e| e.content)
            .collect();
        assert_eq!(contents, vec!["first", "second"]);
        assert_eq!(gateway.append_calls(), 2);
    }

    #[tokio::test]
    async fn test_append_unknown_interview() {
        let gateway = seeded().await;
        let err = gateway
            .append_transcript_entry("int-9", SpeakerType::Agent, "x")
            .await
            .unwrap_err();
        assert_eq!(err, RoomError::NotFound("int-9".into()));
    }

    #[tokio::test]
    async fn test_merge_updates_record() {
        let gateway = seeded().await;
        let mut frag = EvaluationFragment::default();
        frag.set(EvaluationField::OverallScore, FieldValue::Score(Some(4.5)));
        let updated = gateway.merge_evaluation("int-1", &frag).await.unwrap();
        assert_eq!(updated.overall_score, Some(4.5));

        let fetched = gateway.get_interview("int-1").await.unwrap();
        assert_eq!(fetched.overall_score, Some(4.5));
    }

    #[tokio::test]
    async fn test_injected_failure() {
        let gateway = seeded().await;
        gateway
            .fail_with(Some(RoomError::Storage("disk full".into())))
            .await;
        let err = gateway
            .merge_evaluation("int-1", &EvaluationFragment::default())
            .await
            .unwrap_err();
        assert_eq!(err.kind(), crate::ErrorKind::Storage);

        gateway.fail_with(None).await;
        assert!(
            gateway
                .merge_evaluation("int-1", &EvaluationFragment::default())
                .await
                .is_ok()
        );
    }
}
