use async_trait::async_trait;
use chrono::Utc;
use room_core::{
    EvaluationFragment, Interview, PersistenceGateway, RoomError, SpeakerType, TranscriptEntry,
};
use tracing::error;

use super::HubRepository;

fn storage_error(context: &str, err: anyhow::Error) -> RoomError {
    error!("{}: {:#}", context, err);
    RoomError::Storage(format!("{:#}", err))
}

#[async_trait]
impl PersistenceGateway for HubRepository {
    async fn append_transcript_entry(
        &self,
        interview_id: &str,
        speaker_type: SpeakerType,
        content: &str,
    ) -> Result<TranscriptEntry, RoomError> {
        if content.trim().is_empty() {
            return Err(RoomError::validation("content must not be empty"));
        }
        self.insert_transcript_entry(interview_id, speaker_type, content, Utc::now())
            .await
            .map_err(|e| storage_error("Transcript append failed", e))?
            .ok_or_else(|| RoomError::NotFound(interview_id.to_string()))
    }

    async fn merge_evaluation(
        &self,
        interview_id: &str,
        fragment: &EvaluationFragment,
    ) -> Result<Interview, RoomError> {
        self.merge_evaluation_fields(interview_id, fragment, Utc::now())
            .await
            .map_err(|e| storage_error("Evaluation merge failed", e))?
            .ok_or_else(|| RoomError::NotFound(interview_id.to_string()))
    }

    async fn get_interview(&self, interview_id: &str) -> Result<Interview, RoomError> {
        self.get_interview_with_transcript(interview_id)
            .await
            .map_err(|e| storage_error("Interview lookup failed", e))?
            .ok_or_else(|| RoomError::NotFound(interview_id.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_helpers::{seed_interview, test_repository};
    use super::*;
    use room_core::{ErrorKind, EvaluationField, FieldValue};

    #[tokio::test]
    async fn test_append_maps_missing_interview() {
        let repo = test_repository().await;
        let err = repo
            .append_transcript_entry("int-9", SpeakerType::Agent, "hi")
            .await
            .unwrap_err();
        assert_eq!(err, RoomError::NotFound("int-9".into()));
    }

    #[tokio::test]
    async fn test_append_rejects_blank_content() {
        let repo = test_repository().await;
        seed_interview(&repo, "int-1").await;
        let err = repo
            .append_transcript_entry("int-1", SpeakerType::Agent, "  ")
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
    }

    #[tokio::test]
    async fn test_merge_and_lookup_through_gateway() {
        let repo = test_repository().await;
        seed_interview(&repo, "int-1").await;
        let gateway: &dyn PersistenceGateway = &repo;

        gateway
            .append_transcript_entry("int-1", SpeakerType::Candidate, "Hello")
            .await
            .unwrap();
        let mut frag = EvaluationFragment::default();
        frag.set(EvaluationField::AttitudeScore, FieldValue::Score(Some(5.0)));
        let merged = gateway.merge_evaluation("int-1", &frag).await.unwrap();
        assert_eq!(merged.attitude_score, Some(5.0));
        assert!(merged.transcript_entries.is_none());

        let looked_up = gateway.get_interview("int-1").await.unwrap();
        assert_eq!(looked_up.attitude_score, Some(5.0));
        assert_eq!(looked_up.transcript_entries.map(|t| t.len()), Some(1));
    }

    #[tokio::test]
    async fn test_storage_failure_maps_to_storage_error() {
        let repo = test_repository().await;
        repo.pool.close().await;
        let err = repo.get_interview("int-1").await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Storage);
    }
}
