use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use room_core::{ErrorKind, RoomError};
use tracing::warn;

use crate::AppState;

fn error_response(err: &RoomError) -> Response {
    let status = match err.kind() {
        ErrorKind::Validation => StatusCode::BAD_REQUEST,
        ErrorKind::NotFound => StatusCode::NOT_FOUND,
        ErrorKind::Storage | ErrorKind::Transport => StatusCode::INTERNAL_SERVER_ERROR,
    };
    (
        status,
        Json(serde_json::json!({
            "error": err.to_string(),
            "code": err.error_code(),
        })),
    )
        .into_response()
}

/// Interview snapshot including its transcript, oldest entry first.
pub async fn get_interview(State(state): State<AppState>, Path(id): Path<String>) -> Response {
    match state.router.gateway().get_interview(&id).await {
        Ok(interview) => Json(interview).into_response(),
        Err(e) => {
            if e.kind() != ErrorKind::NotFound {
                warn!(interview_id = %id, "Interview lookup failed: {}", e);
            }
            error_response(&e)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{Router, body::Body, http::Request, routing::get};
    use room_core::SpeakerType;
    use tower::ServiceExt;

    fn app(state: AppState) -> Router {
        Router::new()
            .route("/api/interviews/{id}", get(get_interview))
            .with_state(state)
    }

    async fn send(app: Router, uri: &str) -> (StatusCode, serde_json::Value) {
        let resp = app
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = resp.status();
        let body = axum::body::to_bytes(resp.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, serde_json::from_slice(&body).unwrap())
    }

    #[tokio::test]
    async fn test_get_interview_with_transcript() {
        let state = crate::test_helpers::test_app_state().await;
        crate::test_helpers::seed_interview(&state, "int-1").await;
        let gateway = state.router.gateway().clone();
        gateway
            .append_transcript_entry("int-1", SpeakerType::Agent, "Welcome")
            .await
            .unwrap();
        gateway
            .append_transcript_entry("int-1", SpeakerType::Candidate, "Thanks")
            .await
            .unwrap();

        let (status, json) = send(app(state), "/api/interviews/int-1").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["id"], "int-1");
        assert_eq!(json["status"], "ACTIVE");
        let entries = json["transcriptEntries"].as_array().unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0]["content"], "Welcome");
        assert_eq!(entries[1]["speakerType"], "CANDIDATE");
    }

    #[tokio::test]
    async fn test_get_missing_interview_is_404() {
        let state = crate::test_helpers::test_app_state().await;
        let (status, json) = send(app(state), "/api/interviews/nope").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(json["code"], "not_found");
        assert_eq!(json["error"], "interview not found: nope");
    }

    #[tokio::test]
    async fn test_storage_failure_is_500() {
        let state = crate::test_helpers::test_app_state().await;
        state.db.pool.close().await;
        let (status, json) = send(app(state), "/api/interviews/int-1").await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(json["code"], "storage_error");
    }
}
