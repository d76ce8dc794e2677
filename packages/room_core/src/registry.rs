//! Session registry: which connections are in which interview room.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Weak};
use tokio::sync::RwLock;
use tracing::{debug, warn};

use crate::connection::Connection;
use crate::error::RoomError;
use crate::protocol::ServerEvent;

/// Outcome of one fan-out.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BroadcastReport {
    pub recipients: usize,
    pub delivered: usize,
    pub dropped: usize,
}

/// Rooms and the inverse index share one lock so they never disagree.
#[derive(Debug, Default)]
struct Rooms {
    members: HashMap<String, HashSet<String>>,
    joined: HashMap<String, HashSet<String>>,
}

#[derive(Debug, Default)]
pub struct SessionRegistry {
    rooms: RwLock<Rooms>,
    connections: RwLock<HashMap<String, Weak<Connection>>>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn register(&self, connection: &Arc<Connection>) {
        self.connections
            .write()
            .await
            .insert(connection.id().to_string(), Arc::downgrade(connection));
        debug!(conn_id = %connection.id(), "Connection registered");
    }

    pub async fn unregister(&self, connection_id: &str) {
        self.connections.write().await.remove(connection_id);
        debug!(conn_id = %connection_id, "Connection unregistered");
    }

    /// Idempotent. The interview id is not checked against storage.
    pub async fn join(&self, interview_id: &str, connection_id: &str) {
        let mut rooms = self.rooms.write().await;
        let inserted = rooms
            .members
            .entry(interview_id.to_string())
            .or_default()
            .insert(connection_id.to_string());
        rooms
            .joined
            .entry(connection_id.to_string())
            .or_default()
            .insert(interview_id.to_string());
        if inserted {
            debug!(conn_id = %connection_id, interview = %interview_id, "Joined room");
        }
    }

    /// Removing a non-member is a no-op.
    pub async fn leave(&self, interview_id: &str, connection_id: &str) {
        let mut rooms = self.rooms.write().await;
        Self::remove_member(&mut rooms, interview_id, connection_id);
        if let Some(set) = rooms.joined.get_mut(connection_id) {
            set.remove(interview_id);
            if set.is_empty() {
                rooms.joined.remove(connection_id);
            }
        }
    }

    /// Leave every room the connection is in. Returns the interview ids left.
    pub async fn leave_all(&self, connection_id: &str) -> Vec<String> {
        let mut rooms = self.rooms.write().await;
        let Some(joined) = rooms.joined.remove(connection_id) else {
            return Vec::new();
        };
        for interview_id in &joined {
            Self::remove_member(&mut rooms, interview_id, connection_id);
        }
        let mut left: Vec<String> = joined.into_iter().collect();
        left.sort();
        debug!(conn_id = %connection_id, rooms = left.len(), "Left all rooms");
        left
    }

    fn remove_member(rooms: &mut Rooms, interview_id: &str, connection_id: &str) {
        if let Some(set) = rooms.members.get_mut(interview_id) {
            set.remove(connection_id);
            if set.is_empty() {
                rooms.members.remove(interview_id);
            }
        }
    }

    /// Deliver to every current member, sender included. Never blocks on a
    /// slow recipient and never changes membership.
    pub async fn broadcast(&self, interview_id: &str, event: ServerEvent) -> BroadcastReport {
        let member_ids: Vec<String> = {
            let rooms = self.rooms.read().await;
            match rooms.members.get(interview_id) {
                Some(set) => set.iter().cloned().collect(),
                None => return BroadcastReport::default(),
            }
        };
        let targets: Vec<(String, Option<Arc<Connection>>)> = {
            let conns = self.connections.read().await;
            member_ids
                .into_iter()
                .map(|id| {
                    let conn = conns.get(&id).and_then(Weak::upgrade);
                    (id, conn)
                })
                .collect()
        };

        let event = Arc::new(event);
        let mut report = BroadcastReport {
            recipients: targets.len(),
            ..Default::default()
        };
        for (id, conn) in targets {
            let result = match conn {
                Some(conn) => conn.try_deliver(event.clone()),
                None => Err(RoomError::Transport {
                    connection_id: id.clone(),
                    reason: "connection gone".to_string(),
                }),
            };
            match result {
                Ok(()) => report.delivered += 1,
                Err(e) => {
                    report.dropped += 1;
                    warn!(
                        conn_id = %id,
                        interview = %interview_id,
                        event = event.name(),
                        "Broadcast delivery failed: {}",
                        e
                    );
                }
            }
        }
        debug!(
            interview = %interview_id,
            event = event.name(),
            delivered = report.delivered,
            dropped = report.dropped,
            "Broadcast"
        );
        report
    }

    /// Direct delivery to one connection; returns whether it was enqueued.
    pub async fn send_to(&self, connection_id: &str, event: ServerEvent) -> bool {
        let conn = self
            .connections
            .read()
            .await
            .get(connection_id)
            .and_then(Weak::upgrade);
        match conn {
            Some(conn) => match conn.try_deliver(Arc::new(event)) {
                Ok(()) => true,
                Err(e) => {
                    warn!(conn_id = %connection_id, "Direct delivery failed: {}", e);
                    false
                }
            },
            None => false,
        }
    }

    pub async fn members(&self, interview_id: &str) -> Vec<String> {
        let rooms = self.rooms.read().await;
        let mut ids: Vec<String> = rooms
            .members
            .get(interview_id)
            .map(|set| set.iter().cloned().collect())
            .unwrap_or_default();
        ids.sort();
        ids
    }

    pub async fn rooms_of(&self, connection_id: &str) -> Vec<String> {
        let rooms = self.rooms.read().await;
        let mut ids: Vec<String> = rooms
            .joined
            .get(connection_id)
            .map(|set| set.iter().cloned().collect())
            .unwrap_or_default();
        ids.sort();
        ids
    }

    pub async fn room_count(&self) -> usize {
        self.rooms.read().await.members.len()
    }

    pub async fn connection_count(&self) -> usize {
        self.connections.read().await.len()
    }
}
