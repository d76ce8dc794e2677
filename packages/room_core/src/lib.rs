//! Room-scoped broadcast layer for live interview sessions.
//!
//! Connections join interview rooms, an agent connection may claim presence for
//! an interview, and inbound events are validated, persisted through a
//! [`PersistenceGateway`], then fanned out to every member of the room.

pub mod connection;
pub mod error;
pub mod evaluation;
pub mod gateway;
pub mod presence;
pub mod protocol;
pub mod registry;
pub mod router;

pub use connection::{Connection, ConnectionRole};
pub use error::{ErrorKind, RoomError};
pub use evaluation::{EvaluationField, EvaluationFragment, FieldValue};
pub use gateway::{MemoryGateway, PersistenceGateway};
pub use presence::{AgentPresence, PresenceTracker};
pub use protocol::{
    AgentIdentify, AgentPresenceEvent, ClientEvent, ErrorPayload, Interview, InterviewStatus,
    NewTranscript, ServerEvent, SpeakerType, TranscriptEntry, UpdateEvaluation,
};
pub use registry::{BroadcastReport, SessionRegistry};
pub use router::{DispatchReport, EventRouter, Outbound};
