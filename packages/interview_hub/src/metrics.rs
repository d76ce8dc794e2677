//! Server metrics for observability
//!
//! Provides runtime counters for connections, inbound events and room delivery.

use room_core::{DispatchReport, ErrorKind};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

/// Server-wide metrics
#[derive(Debug, Default)]
pub struct ServerMetrics {
    // Connection metrics
    /// Currently active WebSocket connections
    pub active_connections: AtomicU64,
    /// Total connections since server start
    pub total_connections: AtomicU64,

    // Event metrics
    /// Text frames received from clients
    pub events_received: AtomicU64,
    /// Events rejected before persistence
    pub validation_rejections: AtomicU64,
    /// Gateway NotFound / Storage failures
    pub persistence_failures: AtomicU64,

    // Delivery metrics
    pub broadcasts: AtomicU64,
    /// Events enqueued on a connection's outbound channel
    pub deliveries: AtomicU64,
    /// Enqueue failures (full or closed channel)
    pub delivery_drops: AtomicU64,
    /// Frames actually written to sockets
    pub messages_sent: AtomicU64,

    pub websocket_errors: AtomicU64,

    /// Server start time (for uptime calculation)
    start_time: Option<Instant>,
}

impl ServerMetrics {
    pub fn new() -> Self {
        Self {
            start_time: Some(Instant::now()),
            ..Default::default()
        }
    }

    pub fn connection_opened(&self) {
        self.active_connections.fetch_add(1, Ordering::Relaxed);
        self.total_connections.fetch_add(1, Ordering::Relaxed);
    }

    pub fn connection_closed(&self) {
        self.active_connections.fetch_sub(1, Ordering::Relaxed);
    }

    pub fn event_received(&self) {
        self.events_received.fetch_add(1, Ordering::Relaxed);
    }

    pub fn message_sent(&self) {
        self.messages_sent.fetch_add(1, Ordering::Relaxed);
    }

    pub fn websocket_error(&self) {
        self.websocket_errors.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_dispatch(&self, report: &DispatchReport) {
        self.broadcasts
            .fetch_add(report.broadcasts as u64, Ordering::Relaxed);
        self.deliveries
            .fetch_add(report.delivered as u64, Ordering::Relaxed);
        self.delivery_drops
            .fetch_add(report.dropped as u64, Ordering::Relaxed);
        match report.rejected {
            Some(ErrorKind::Validation) => {
                self.validation_rejections.fetch_add(1, Ordering::Relaxed);
            }
            Some(ErrorKind::NotFound | ErrorKind::Storage) => {
                self.persistence_failures.fetch_add(1, Ordering::Relaxed);
            }
            Some(ErrorKind::Transport) | None => {}
        }
    }

    /// Get uptime in seconds
    pub fn uptime_secs(&self) -> u64 {
        self.start_time.map(|t| t.elapsed().as_secs()).unwrap_or(0)
    }

    /// Create a snapshot of all metrics
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            uptime_secs: self.uptime_secs(),
            connections: ConnectionMetrics {
                active: self.active_connections.load(Ordering::Relaxed),
                total: self.total_connections.load(Ordering::Relaxed),
            },
            events: EventMetrics {
                received: self.events_received.load(Ordering::Relaxed),
                validation_rejections: self.validation_rejections.load(Ordering::Relaxed),
                persistence_failures: self.persistence_failures.load(Ordering::Relaxed),
            },
            delivery: DeliveryMetrics {
                broadcasts: self.broadcasts.load(Ordering::Relaxed),
                delivered: self.deliveries.load(Ordering::Relaxed),
                dropped: self.delivery_drops.load(Ordering::Relaxed),
                sent: self.messages_sent.load(Ordering::Relaxed),
            },
            errors: ErrorMetrics {
                websocket: self.websocket_errors.load(Ordering::Relaxed),
            },
        }
    }
}

/// Serializable snapshot of metrics
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricsSnapshot {
    pub uptime_secs: u64,
    pub connections: ConnectionMetrics,
    pub events: EventMetrics,
    pub delivery: DeliveryMetrics,
    pub errors: ErrorMetrics,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConnectionMetrics {
    pub active: u64,
    pub total: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventMetrics {
    pub received: u64,
    pub validation_rejections: u64,
    pub persistence_failures: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeliveryMetrics {
    pub broadcasts: u64,
    pub delivered: u64,
    pub dropped: u64,
    pub sent: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorMetrics {
    pub websocket: u64,
}

/// Health status
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthStatus {
    pub status: String,
    pub rooms: RoomHealth,
    pub connections: u64,
    pub uptime_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoomHealth {
    pub active: u64,
    pub agents: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_connection_tracking() {
        let metrics = ServerMetrics::new();

        metrics.connection_opened();
        metrics.connection_opened();
        assert_eq!(metrics.active_connections.load(Ordering::Relaxed), 2);
        assert_eq!(metrics.total_connections.load(Ordering::Relaxed), 2);

        metrics.connection_closed();
        assert_eq!(metrics.active_connections.load(Ordering::Relaxed), 1);
        assert_eq!(metrics.total_connections.load(Ordering::Relaxed), 2);
    }

    #[test]
    fn test_record_dispatch() {
        let metrics = ServerMetrics::new();
        metrics.record_dispatch(&DispatchReport {
            broadcasts: 1,
            delivered: 3,
            dropped: 1,
            rejected: None,
        });
        metrics.record_dispatch(&DispatchReport {
            delivered: 1,
            rejected: Some(ErrorKind::Validation),
            ..Default::default()
        });
        metrics.record_dispatch(&DispatchReport {
            delivered: 1,
            rejected: Some(ErrorKind::NotFound),
            ..Default::default()
        });

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.delivery.broadcasts, 1);
        assert_eq!(snapshot.delivery.delivered, 5);
        assert_eq!(snapshot.delivery.dropped, 1);
        assert_eq!(snapshot.events.validation_rejections, 1);
        assert_eq!(snapshot.events.persistence_failures, 1);
    }

    #[test]
    fn test_snapshot() {
        let metrics = ServerMetrics::new();
        metrics.connection_opened();
        metrics.event_received();
        metrics.message_sent();

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.connections.active, 1);
        assert_eq!(snapshot.events.received, 1);
        assert_eq!(snapshot.delivery.sent, 1);
        assert_eq!(snapshot.errors.websocket, 0);
    }
}
