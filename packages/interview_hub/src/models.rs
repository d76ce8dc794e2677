use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Levels accepted for `interviews.level`.
pub const JOB_LEVELS: [&str; 6] = ["ENTRY", "MID", "SENIOR", "LEAD", "MANAGER", "EXECUTIVE"];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Candidate {
    pub id: String,
    pub name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub resume: Option<String>,
    pub experience: Option<String>,
    pub skills: Option<String>,
    pub education: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default)]
pub struct NewCandidate {
    pub name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub skills: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct NewInterview {
    /// Generated when absent.
    pub id: Option<String>,
    pub candidate_id: Option<String>,
    pub position: Option<String>,
    pub department: Option<String>,
    pub level: Option<String>,
    pub description: Option<String>,
}
