//! Non-server CLI commands.

use anyhow::{Context, Result};
use room_core::Interview;
use tracing::info;

use crate::models::{NewCandidate, NewInterview};
use crate::repository::HubRepository;

#[derive(Debug, Clone)]
pub struct SeedRequest {
    pub name: String,
    pub email: String,
    pub position: String,
    pub department: Option<String>,
    pub level: Option<String>,
}

/// Insert (or reuse, by email) a candidate and open an ACTIVE interview for them.
pub async fn seed_command(repo: &HubRepository, req: &SeedRequest) -> Result<Interview> {
    let candidate = match repo.get_candidate_by_email(&req.email).await? {
        Some(existing) => {
            info!(candidate_id = %existing.id, "Reusing existing candidate");
            existing
        }
        None => repo
            .create_candidate(&NewCandidate {
                name: Some(req.name.clone()),
                email: Some(req.email.clone()),
                ..Default::default()
            })
            .await
            .context("Failed to seed candidate")?,
    };

    repo.create_interview(&NewInterview {
        candidate_id: Some(candidate.id),
        position: Some(req.position.clone()),
        department: req.department.clone(),
        level: req.level.clone(),
        ..Default::default()
    })
    .await
    .context("Failed to seed interview")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::test_helpers::test_repository;
    use room_core::InterviewStatus;

    fn request(email: &str) -> SeedRequest {
        SeedRequest {
            name: "Ada".into(),
            email: email.into(),
            position: "Backend Engineer".into(),
            department: Some("Platform".into()),
            level: Some("SENIOR".into()),
        }
    }

    #[tokio::test]
    async fn test_seed_creates_active_interview() {
        let repo = test_repository().await;
        let interview = seed_command(&repo, &request("ada@example.com"))
            .await
            .unwrap();
        assert_eq!(interview.status, InterviewStatus::Active);
        assert_eq!(interview.position.as_deref(), Some("Backend Engineer"));
        assert!(interview.candidate_id.is_some());
    }

    #[tokio::test]
    async fn test_seed_reuses_candidate_by_email() {
        let repo = test_repository().await;
        let first = seed_command(&repo, &request("ada@example.com"))
            .await
            .unwrap();
        let second = seed_command(&repo, &request("ada@example.com"))
            .await
            .unwrap();
        assert_ne!(first.id, second.id);
        assert_eq!(first.candidate_id, second.candidate_id);
    }
}
