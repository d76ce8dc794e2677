//! Error taxonomy for room operations.

use serde::{Deserialize, Serialize};

/// Coarse classification of a [`RoomError`], used for metrics and logging.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    Validation,
    NotFound,
    Storage,
    Transport,
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum RoomError {
    /// Malformed or missing payload fields. Detected before any persistence call.
    #[error("{0}")]
    Validation(String),

    /// The interview id does not correspond to a persisted interview.
    #[error("interview not found: {0}")]
    NotFound(String),

    #[error("storage error: {0}")]
    Storage(String),

    /// Delivery to a single connection failed.
    #[error("delivery to {connection_id} failed: {reason}")]
    Transport {
        connection_id: String,
        reason: String,
    },
}

impl RoomError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Validation(_) => ErrorKind::Validation,
            Self::NotFound(_) => ErrorKind::NotFound,
            Self::Storage(_) => ErrorKind::Storage,
            Self::Transport { .. } => ErrorKind::Transport,
        }
    }

    pub fn error_code(&self) -> &'static str {
        match self.kind() {
            ErrorKind::Validation => "validation_error",
            ErrorKind::NotFound => "not_found",
            ErrorKind::Storage => "storage_error",
            ErrorKind::Transport => "transport_error",
        }
    }
}
