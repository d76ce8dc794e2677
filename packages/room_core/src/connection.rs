//! One transport channel as seen by the room layer.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::{RwLock, mpsc};

use crate::error::RoomError;
use crate::protocol::ServerEvent;

/// What a connection has claimed to be. Only `agent-identify` mutates it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConnectionRole {
    pub is_agent: bool,
    pub agent_id: Option<String>,
    pub bound_interview_id: Option<String>,
}

/// Owned by the transport for the socket's lifetime. The registry only keeps a
/// `Weak` to it, so a dropped socket can never be delivered to.
#[derive(Debug)]
pub struct Connection {
    id: String,
    tx: mpsc::Sender<Arc<ServerEvent>>,
    role: RwLock<ConnectionRole>,
    drops: AtomicU64,
}

impl Connection {
    pub fn new(id: impl Into<String>, tx: mpsc::Sender<Arc<ServerEvent>>) -> Self {
        Self {
            id: id.into(),
            tx,
            role: RwLock::new(ConnectionRole::default()),
            drops: AtomicU64::new(0),
        }
    }

    /// Build a connection together with the receiving half its writer drains.
    pub fn channel(
        id: impl Into<String>,
        capacity: usize,
    ) -> (Arc<Self>, mpsc::Receiver<Arc<ServerEvent>>) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        (Arc::new(Self::new(id, tx)), rx)
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    /// Non-blocking enqueue. A full or closed channel counts as a drop.
    pub fn try_deliver(&self, event: Arc<ServerEvent>) -> Result<(), RoomError> {
        self.tx.try_send(event).map_err(|e| {
            self.drops.fetch_add(1, Ordering::Relaxed);
            let reason = match e {
                mpsc::error::TrySendError::Full(_) => "channel full",
                mpsc::error::TrySendError::Closed(_) => "channel closed",
            };
            RoomError::Transport {
                connection_id: self.id.clone(),
                reason: reason.to_string(),
            }
        })
    }

    pub async fn role(&self) -> ConnectionRole {
        self.role.read().await.clone()
    }

    pub(crate) async fn bind_agent(&self, agent_id: &str, interview_id: &str) {
        let mut role = self.role.write().await;
        role.is_agent = true;
        role.agent_id = Some(agent_id.to_string());
        role.bound_interview_id = Some(interview_id.to_string());
    }

    pub fn drop_count(&self) -> u64 {
        self.drops.load(Ordering::Relaxed)
    }
}
