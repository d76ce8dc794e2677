//! Agent presence per interview.
//!
//! At most one agent record per interview. A later identify from a different
//! connection replaces the record silently; the displaced connection is not told.

use chrono::Utc;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, info};

use crate::connection::Connection;
use crate::protocol::{AgentPresenceEvent, ServerEvent};
use crate::registry::SessionRegistry;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AgentPresence {
    pub agent_id: String,
    pub connection_id: String,
}

pub struct PresenceTracker {
    slots: RwLock<HashMap<String, AgentPresence>>,
    registry: Arc<SessionRegistry>,
}

impl PresenceTracker {
    pub fn new(registry: Arc<SessionRegistry>) -> Self {
        Self {
            slots: RwLock::new(HashMap::new()),
            registry,
        }
    }

    /// Claim presence, join the room and bind the connection's role. Returns
    /// the `agent-connected` event for the caller to broadcast.
    pub async fn identify_agent(
        &self,
        interview_id: &str,
        agent_id: &str,
        connection: &Connection,
    ) -> ServerEvent {
        let previous = self.slots.write().await.insert(
            interview_id.to_string(),
            AgentPresence {
                agent_id: agent_id.to_string(),
                connection_id: connection.id().to_string(),
            },
        );
        if let Some(prev) = previous.filter(|p| p.connection_id != connection.id()) {
            debug!(
                interview = %interview_id,
                displaced_conn = %prev.connection_id,
                displaced_agent = %prev.agent_id,
                "Agent presence replaced"
            );
        }

        self.registry.join(interview_id, connection.id()).await;
        connection.bind_agent(agent_id, interview_id).await;
        info!(
            conn_id = %connection.id(),
            interview = %interview_id,
            agent_id = %agent_id,
            "Agent identified"
        );

        ServerEvent::AgentConnected(AgentPresenceEvent {
            interview_id: interview_id.to_string(),
            agent_id: agent_id.to_string(),
            timestamp: Utc::now(),
        })
    }

    /// For an agent connection, produce one `agent-disconnected` per interview
    /// it announced itself on: every slot it still holds (cleared here) plus its
    /// bound interview when a newer agent has displaced it there.
    pub async fn on_disconnect(&self, connection: &Connection) -> Vec<(String, ServerEvent)> {
        let role = connection.role().await;
        if !role.is_agent {
            return Vec::new();
        }

        let mut departed: Vec<(String, String)> = {
            let mut slots = self.slots.write().await;
            let held: Vec<String> = slots
                .iter()
                .filter(|(_, p)| p.connection_id == connection.id())
                .map(|(interview_id, _)| interview_id.clone())
                .collect();
            held.into_iter()
                .filter_map(|interview_id| {
                    slots
                        .remove(&interview_id)
                        .map(|p| (interview_id, p.agent_id))
                })
                .collect()
        };
        if let (Some(interview_id), Some(agent_id)) = (role.bound_interview_id, role.agent_id) {
            if !departed.iter().any(|(id, _)| *id == interview_id) {
                departed.push((interview_id, agent_id));
            }
        }
        departed.sort();

        let now = Utc::now();
        departed
            .into_iter()
            .map(|(interview_id, agent_id)| {
                info!(
                    conn_id = %connection.id(),
                    interview = %interview_id,
                    agent_id = %agent_id,
                    "Agent disconnected"
                );
                let event = ServerEvent::AgentDisconnected(AgentPresenceEvent {
                    interview_id: interview_id.clone(),
                    agent_id,
                    timestamp: now,
                });
                (interview_id, event)
            })
            .collect()
    }

    pub async fn current_agent(&self, interview_id: &str) -> Option<AgentPresence> {
        self.slots.read().await.get(interview_id).cloned()
    }

    pub async fn agent_count(&self) -> usize {
        self.slots.read().await.len()
    }
}
