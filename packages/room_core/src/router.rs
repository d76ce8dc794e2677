//! Inbound event dispatch.
//!
//! Each handler validates, awaits persistence where needed and returns the
//! deliveries it wants made. Delivery happens only after the handler returns, so
//! a room never sees state that was not confirmed by the gateway.

use std::sync::Arc;
use tracing::{debug, warn};

use crate::connection::Connection;
use crate::error::{ErrorKind, RoomError};
use crate::evaluation::EvaluationFragment;
use crate::gateway::PersistenceGateway;
use crate::presence::PresenceTracker;
use crate::protocol::{
    AgentIdentify, ClientEvent, NewTranscript, ServerEvent, SpeakerType, UpdateEvaluation,
};
use crate::registry::SessionRegistry;

/// A delivery produced by a handler.
#[derive(Debug, Clone, PartialEq)]
pub enum Outbound {
    /// Every current member of the interview room.
    Room {
        interview_id: String,
        event: ServerEvent,
    },
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DispatchReport {
    pub broadcasts: usize,
    pub delivered: usize,
    pub dropped: usize,
    pub rejected: Option<ErrorKind>,
}

pub struct EventRouter {
    registry: Arc<SessionRegistry>,
    presence: Arc<PresenceTracker>,
    gateway: Arc<dyn PersistenceGateway>,
}

impl EventRouter {
    pub fn new(
        registry: Arc<SessionRegistry>,
        presence: Arc<PresenceTracker>,
        gateway: Arc<dyn PersistenceGateway>,
    ) -> Self {
        Self {
            registry,
            presence,
            gateway,
        }
    }

    pub fn registry(&self) -> &Arc<SessionRegistry> {
        &self.registry
    }

    pub fn presence(&self) -> &Arc<PresenceTracker> {
        &self.presence
    }

    pub fn gateway(&self) -> &Arc<dyn PersistenceGateway> {
        &self.gateway
    }

    /// Run the handler for one event without delivering anything.
    pub async fn handle(
        &self,
        connection: &Connection,
        event: ClientEvent,
    ) -> Result<Vec<Outbound>, RoomError> {
        match event {
            ClientEvent::AgentIdentify(msg) => self.on_agent_identify(connection, msg).await,
            ClientEvent::JoinInterview(interview_id) => {
                require("interviewId", &interview_id)?;
                self.registry.join(&interview_id, connection.id()).await;
                Ok(Vec::new())
            }
            ClientEvent::LeaveInterview(interview_id) => {
                require("interviewId", &interview_id)?;
                self.registry.leave(&interview_id, connection.id()).await;
                Ok(Vec::new())
            }
            ClientEvent::NewTranscript(msg) => self.on_new_transcript(msg).await,
            ClientEvent::UpdateEvaluation(msg) => self.on_update_evaluation(msg).await,
        }
    }

    async fn on_agent_identify(
        &self,
        connection: &Connection,
        msg: AgentIdentify,
    ) -> Result<Vec<Outbound>, RoomError> {
        require("agentId", &msg.agent_id)?;
        require("interviewId", &msg.interview_id)?;
        let event = self
            .presence
            .identify_agent(&msg.interview_id, &msg.agent_id, connection)
            .await;
        Ok(vec![Outbound::Room {
            interview_id: msg.interview_id,
            event,
        }])
    }

    async fn on_new_transcript(&self, msg: NewTranscript) -> Result<Vec<Outbound>, RoomError> {
        require("interviewId", &msg.interview_id)?;
        let speaker_type: SpeakerType = msg.speaker_type.parse()?;
        require("content", &msg.content)?;

        let entry = self
            .gateway
            .append_transcript_entry(&msg.interview_id, speaker_type, &msg.content)
            .await?;
        Ok(vec![Outbound::Room {
            interview_id: msg.interview_id,
            event: ServerEvent::TranscriptUpdate(entry),
        }])
    }

    async fn on_update_evaluation(
        &self,
        msg: UpdateEvaluation,
    ) -> Result<Vec<Outbound>, RoomError> {
        require("interviewId", &msg.interview_id)?;
        let fragment = EvaluationFragment::from_json(&msg.evaluation_data)?;

        let interview = self
            .gateway
            .merge_evaluation(&msg.interview_id, &fragment)
            .await?;
        Ok(vec![Outbound::Room {
            interview_id: msg.interview_id,
            event: ServerEvent::EvaluationUpdate(interview),
        }])
    }

    /// Handle one event and perform its deliveries. Failures go to the sender only.
    pub async fn dispatch(&self, connection: &Connection, event: ClientEvent) -> DispatchReport {
        let name = event.name();
        debug!(conn_id = %connection.id(), event = name, "Dispatching");
        match self.handle(connection, event).await {
            Ok(outbound) => self.deliver(outbound).await,
            Err(err) => self.reject(connection, name, err),
        }
    }

    /// Decode a text frame and dispatch it.
    pub async fn dispatch_text(&self, connection: &Connection, text: &str) -> DispatchReport {
        match ClientEvent::from_json(text) {
            Ok(event) => self.dispatch(connection, event).await,
            Err(err) => self.reject(connection, "unknown", err),
        }
    }

    /// Presence first, then room cleanup, then the agent-loss broadcast to the
    /// members that remain.
    pub async fn disconnect(&self, connection: &Connection) -> DispatchReport {
        let departures = self.presence.on_disconnect(connection).await;
        let left = self.registry.leave_all(connection.id()).await;
        self.registry.unregister(connection.id()).await;
        debug!(conn_id = %connection.id(), rooms_left = left.len(), "Connection cleaned up");

        let outbound = departures
            .into_iter()
            .map(|(interview_id, event)| Outbound::Room {
                interview_id,
                event,
            })
            .collect();
        self.deliver(outbound).await
    }

    async fn deliver(&self, outbound: Vec<Outbound>) -> DispatchReport {
        let mut report = DispatchReport::default();
        for item in outbound {
            match item {
                Outbound::Room {
                    interview_id,
                    event,
                } => {
                    let sent = self.registry.broadcast(&interview_id, event).await;
                    report.broadcasts += 1;
                    report.delivered += sent.delivered;
                    report.dropped += sent.dropped;
                }
            }
        }
        report
    }

    fn reject(&self, connection: &Connection, event: &str, err: RoomError) -> DispatchReport {
        warn!(
            conn_id = %connection.id(),
            event = event,
            code = err.error_code(),
            "Event rejected: {}",
            err
        );
        let message = error_message(event, &err);
        let mut report = DispatchReport {
            rejected: Some(err.kind()),
            ..Default::default()
        };
        match connection.try_deliver(Arc::new(ServerEvent::error(message))) {
            Ok(()) => report.delivered = 1,
            Err(e) => {
                report.dropped = 1;
                warn!(conn_id = %connection.id(), "Error delivery failed: {}", e);
            }
        }
        report
    }
}

fn require(field: &str, value: &str) -> Result<(), RoomError> {
    if value.trim().is_empty() {
        return Err(RoomError::validation(format!("{} must not be empty", field)));
    }
    Ok(())
}

/// Validation messages pass through as-is; persistence failures get the
/// operation prefix clients already match on.
fn error_message(event: &str, err: &RoomError) -> String {
    if err.kind() == ErrorKind::Validation {
        return err.to_string();
    }
    match event {
        "new-transcript" => format!("Failed to save transcript: {}", err),
        "update-evaluation" => format!("Failed to update evaluation: {}", err),
        _ => err.to_string(),
    }
}
