//! Wire protocol and record types.
//!
//! Every frame is a JSON object `{"event": <name>, "data": <payload>}` in both
//! directions. Record types serialize camelCase to match the interview API.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use std::str::FromStr;

use crate::error::RoomError;

/// Who produced a transcript line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SpeakerType {
    Agent,
    Candidate,
    System,
}

impl SpeakerType {
    pub const ALL: [SpeakerType; 3] = [Self::Agent, Self::Candidate, Self::System];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Agent => "AGENT",
            Self::Candidate => "CANDIDATE",
            Self::System => "SYSTEM",
        }
    }
}

impl fmt::Display for SpeakerType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SpeakerType {
    type Err = RoomError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| {
                RoomError::validation(format!(
                    "invalid speakerType {:?}: expected AGENT, CANDIDATE or SYSTEM",
                    s
                ))
            })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum InterviewStatus {
    Active,
    Completed,
    Cancelled,
    PendingReview,
}

impl InterviewStatus {
    pub const ALL: [InterviewStatus; 4] = [
        Self::Active,
        Self::Completed,
        Self::Cancelled,
        Self::PendingReview,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Active => "ACTIVE",
            Self::Completed => "COMPLETED",
            Self::Cancelled => "CANCELLED",
            Self::PendingReview => "PENDING_REVIEW",
        }
    }
}

impl fmt::Display for InterviewStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for InterviewStatus {
    type Err = RoomError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|st| st.as_str() == s)
            .ok_or_else(|| RoomError::validation(format!("invalid status {:?}", s)))
    }
}

/// One persisted transcript line. Created only by the persistence gateway.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TranscriptEntry {
    pub id: String,
    pub interview_id: String,
    pub speaker_type: SpeakerType,
    pub content: String,
    pub timestamp: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Full interview record as broadcast in `evaluation-update`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Interview {
    pub id: String,
    pub candidate_id: Option<String>,
    pub position: Option<String>,
    pub department: Option<String>,
    pub level: Option<String>,
    pub description: Option<String>,
    pub status: InterviewStatus,
    pub start_time: DateTime<Utc>,
    pub end_time: Option<DateTime<Utc>>,
    pub feedback: Option<String>,
    pub overall_score: Option<f64>,
    pub technical_skill_score: Option<f64>,
    pub problem_solving_score: Option<f64>,
    pub communication_score: Option<f64>,
    pub attitude_score: Option<f64>,
    pub experience_relevance_score: Option<f64>,
    pub strengths_notes: Option<String>,
    pub improvement_areas_notes: Option<String>,
    pub technical_feedback: Option<String>,
    pub cultural_fit_notes: Option<String>,
    pub recommendation_notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    /// Present only on lookups that include the transcript.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transcript_entries: Option<Vec<TranscriptEntry>>,
}

impl Interview {
    /// A fresh ACTIVE interview with no evaluation fields set.
    pub fn new(id: impl Into<String>, now: DateTime<Utc>) -> Self {
        Self {
            id: id.into(),
            candidate_id: None,
            position: None,
            department: None,
            level: None,
            description: None,
            status: InterviewStatus::Active,
            start_time: now,
            end_time: None,
            feedback: None,
            overall_score: None,
            technical_skill_score: None,
            problem_solving_score: None,
            communication_score: None,
            attitude_score: None,
            experience_relevance_score: None,
            strengths_notes: None,
            improvement_areas_notes: None,
            technical_feedback: None,
            cultural_fit_notes: None,
            recommendation_notes: None,
            created_at: now,
            updated_at: now,
            transcript_entries: None,
        }
    }
}

// =============================================================================
// Client → server
// =============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentIdentify {
    pub agent_id: String,
    pub interview_id: String,
}

/// Raw transcript request. `speaker_type` stays a string so an unknown value is
/// reported as a validation error rather than a decode failure.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewTranscript {
    pub interview_id: String,
    #[serde(default)]
    pub speaker_type: String,
    #[serde(default)]
    pub content: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateEvaluation {
    pub interview_id: String,
    #[serde(default)]
    pub evaluation_data: Map<String, Value>,
}

/// Events sent FROM the client TO the server.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "kebab-case")]
pub enum ClientEvent {
    AgentIdentify(AgentIdentify),
    JoinInterview(String),
    LeaveInterview(String),
    NewTranscript(NewTranscript),
    UpdateEvaluation(UpdateEvaluation),
}

impl ClientEvent {
    pub const NAMES: [&'static str; 5] = [
        "agent-identify",
        "join-interview",
        "leave-interview",
        "new-transcript",
        "update-evaluation",
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Self::AgentIdentify(_) => "agent-identify",
            Self::JoinInterview(_) => "join-interview",
            Self::LeaveInterview(_) => "leave-interview",
            Self::NewTranscript(_) => "new-transcript",
            Self::UpdateEvaluation(_) => "update-evaluation",
        }
    }

    /// Decode one text frame, distinguishing unknown events from bad payloads.
    pub fn from_json(text: &str) -> Result<Self, RoomError> {
        let value: Value = serde_json::from_str(text)
            .map_err(|e| RoomError::validation(format!("malformed message: {}", e)))?;
        let name = value
            .get("event")
            .and_then(Value::as_str)
            .ok_or_else(|| RoomError::validation("message is missing an event name"))?;
        if !Self::NAMES.contains(&name) {
            return Err(RoomError::validation(format!("unknown event: {}", name)));
        }
        let name = name.to_string();
        serde_json::from_value(value)
            .map_err(|e| RoomError::validation(format!("malformed {} payload: {}", name, e)))
    }
}

// =============================================================================
// Server → client
// =============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentPresenceEvent {
    pub interview_id: String,
    pub agent_id: String,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorPayload {
    pub message: String,
}

/// Events sent FROM the server TO clients.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "kebab-case")]
pub enum ServerEvent {
    AgentConnected(AgentPresenceEvent),
    AgentDisconnected(AgentPresenceEvent),
    TranscriptUpdate(TranscriptEntry),
    EvaluationUpdate(Interview),
    Error(ErrorPayload),
}

impl ServerEvent {
    pub fn error(message: impl Into<String>) -> Self {
        Self::Error(ErrorPayload {
            message: message.into(),
        })
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::AgentConnected(_) => "agent-connected",
            Self::AgentDisconnected(_) => "agent-disconnected",
            Self::TranscriptUpdate(_) => "transcript-update",
            Self::EvaluationUpdate(_) => "evaluation-update",
            Self::Error(_) => "error",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_decode_join_interview() {
        let msg = ClientEvent::from_json(r#"{"event":"join-interview","data":"int-1"}"#).unwrap();
        assert_eq!(msg, ClientEvent::JoinInterview("int-1".into()));
    }

    #[test]
    fn test_decode_agent_identify() {
        let msg = ClientEvent::from_json(
            r#"{"event":"agent-identify","data":{"agentId":"a1","interviewId":"int-1"}}"#,
        )
        .unwrap();
        match msg {
            ClientEvent::AgentIdentify(AgentIdentify {
                agent_id,
                interview_id,
            }) => {
                assert_eq!(agent_id, "a1");
                assert_eq!(interview_id, "int-1");
            }
            other => panic!("Expected AgentIdentify, got {:?}", other),
        }
    }

    #[test]
    fn test_decode_new_transcript_keeps_raw_speaker() {
        let msg = ClientEvent::from_json(
            r#"{"event":"new-transcript","data":{"interviewId":"int-1","speakerType":"INTERVIEWER","content":"hi"}}"#,
        )
        .unwrap();
        match msg {
            ClientEvent::NewTranscript(t) => assert_eq!(t.speaker_type, "INTERVIEWER"),
            other => panic!("Expected NewTranscript, got {:?}", other),
        }
    }

    #[test]
    fn test_decode_update_evaluation() {
        let msg = ClientEvent::from_json(
            r#"{"event":"update-evaluation","data":{"interviewId":"int-1","evaluationData":{"overallScore":4}}}"#,
        )
        .unwrap();
        match msg {
            ClientEvent::UpdateEvaluation(u) => {
                assert_eq!(u.interview_id, "int-1");
                assert_eq!(u.evaluation_data.get("overallScore"), Some(&json!(4)));
            }
            other => panic!("Expected UpdateEvaluation, got {:?}", other),
        }
    }

    #[test]
    fn test_decode_unknown_event() {
        let err = ClientEvent::from_json(r#"{"event":"launch-rockets","data":{}}"#).unwrap_err();
        assert_eq!(err.to_string(), "unknown event: launch-rockets");
    }

    #[test]
    fn test_decode_missing_event_name() {
        let err = ClientEvent::from_json(r#"{"data":"int-1"}"#).unwrap_err();
        assert!(matches!(err, RoomError::Validation(_)));
    }

    #[test]
    fn test_decode_malformed_payload() {
        let err = ClientEvent::from_json(r#"{"event":"join-interview","data":{"id":1}}"#)
            .unwrap_err();
        assert!(err.to_string().starts_with("malformed join-interview payload"));
    }

    #[test]
    fn test_decode_not_json() {
        let err = ClientEvent::from_json("hello").unwrap_err();
        assert!(err.to_string().starts_with("malformed message"));
    }

    #[test]
    fn test_server_event_wire_shape() {
        let ts = Utc::now();
        let event = ServerEvent::AgentConnected(AgentPresenceEvent {
            interview_id: "int-1".into(),
            agent_id: "a1".into(),
            timestamp: ts,
        });
        let value = serde_json::to_value(&event).unwrap();
        assert_eq!(value["event"], "agent-connected");
        assert_eq!(value["data"]["interviewId"], "int-1");
        assert_eq!(value["data"]["agentId"], "a1");
        assert!(value["data"]["timestamp"].is_string());
    }

    #[test]
    fn test_error_event_wire_shape() {
        let value = serde_json::to_value(ServerEvent::error("Failed to save transcript")).unwrap();
        assert_eq!(
            value,
            json!({"event": "error", "data": {"message": "Failed to save transcript"}})
        );
    }

    #[test]
    fn test_transcript_entry_camel_case() {
        let now = Utc::now();
        let entry = TranscriptEntry {
            id: "t1".into(),
            interview_id: "int-1".into(),
            speaker_type: SpeakerType::Candidate,
            content: "Hello".into(),
            timestamp: now,
            created_at: now,
            updated_at: now,
        };
        let value = serde_json::to_value(&entry).unwrap();
        assert_eq!(value["interviewId"], "int-1");
        assert_eq!(value["speakerType"], "CANDIDATE");
        assert!(value.get("createdAt").is_some());
    }

    #[test]
    fn test_interview_omits_transcript_when_absent() {
        let interview = Interview::new("int-1", Utc::now());
        let value = serde_json::to_value(&interview).unwrap();
        assert_eq!(value["status"], "ACTIVE");
        assert!(value.get("transcriptEntries").is_none());
        assert!(value["overallScore"].is_null());
    }

    #[test]
    fn test_speaker_type_parse() {
        assert_eq!("AGENT".parse::<SpeakerType>().unwrap(), SpeakerType::Agent);
        assert_eq!("SYSTEM".parse::<SpeakerType>().unwrap(), SpeakerType::System);
        assert!("agent".parse::<SpeakerType>().is_err());
    }

    #[test]
    fn test_status_parse() {
        assert_eq!(
            "PENDING_REVIEW".parse::<InterviewStatus>().unwrap(),
            InterviewStatus::PendingReview
        );
        assert!("DONE".parse::<InterviewStatus>().is_err());
    }
}
