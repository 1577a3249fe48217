use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::trace;
use uuid::Uuid;

use crate::types::DispatchStatus;

/// Domain events emitted as state changes move through the system.
///
/// Events are published on the [`EventBus`] and consumed by:
/// - the shell UI (history refresh, status indicator)
/// - the sink-registry reconciliation loop (configuration changes)
/// - the event log (debugging)
#[derive(Clone, Debug, Serialize, Deserialize)]
#[non_exhaustive]
pub enum DomainEvent {
    /// Activity reporting was enabled and monitoring started.
    ReportingEnabled { timestamp: DateTime<Utc> },

    /// Activity reporting was disabled and monitoring torn down.
    ReportingDisabled { timestamp: DateTime<Utc> },

    /// A snapshot completed its fan-out across the registered sinks.
    SnapshotDispatched {
        snapshot_id: Uuid,
        accepted: Vec<String>,
        failed: Vec<String>,
        status: DispatchStatus,
        timestamp: DateTime<Utc>,
    },

    /// A history record was written.
    HistorySaved {
        snapshot_id: Uuid,
        timestamp: DateTime<Utc>,
    },

    /// All history records were purged.
    HistoryCleared {
        records_deleted: u64,
        timestamp: DateTime<Utc>,
    },

    /// A sink joined the registry.
    SinkRegistered {
        name: String,
        timestamp: DateTime<Utc>,
    },

    /// A sink left the registry.
    SinkUnregistered {
        name: String,
        timestamp: DateTime<Utc>,
    },

    /// Configuration was updated at runtime.
    ConfigUpdated {
        changed_sections: Vec<String>,
        timestamp: DateTime<Utc>,
    },
}

impl DomainEvent {
    /// Returns the timestamp of the event.
    pub fn timestamp(&self) -> DateTime<Utc> {
        match self {
            DomainEvent::ReportingEnabled { timestamp }
            | DomainEvent::ReportingDisabled { timestamp }
            | DomainEvent::SnapshotDispatched { timestamp, .. }
            | DomainEvent::HistorySaved { timestamp, .. }
            | DomainEvent::HistoryCleared { timestamp, .. }
            | DomainEvent::SinkRegistered { timestamp, .. }
            | DomainEvent::SinkUnregistered { timestamp, .. }
            | DomainEvent::ConfigUpdated { timestamp, .. } => *timestamp,
        }
    }

    /// Returns a stable event name for logging.
    pub fn event_name(&self) -> &'static str {
        match self {
            DomainEvent::ReportingEnabled { .. } => "reporting_enabled",
            DomainEvent::ReportingDisabled { .. } => "reporting_disabled",
            DomainEvent::SnapshotDispatched { .. } => "snapshot_dispatched",
            DomainEvent::HistorySaved { .. } => "history_saved",
            DomainEvent::HistoryCleared { .. } => "history_cleared",
            DomainEvent::SinkRegistered { .. } => "sink_registered",
            DomainEvent::SinkUnregistered { .. } => "sink_unregistered",
            DomainEvent::ConfigUpdated { .. } => "config_updated",
        }
    }
}

/// Process-wide broadcast channel for [`DomainEvent`]s.
///
/// Cloning is cheap; every component that needs to publish or subscribe
/// holds its own handle. Publishing with no live subscribers is not an
/// error.
#[derive(Clone)]
pub struct EventBus {
    tx: tokio::sync::broadcast::Sender<DomainEvent>,
}

impl EventBus {
    pub fn new() -> Self {
        let (tx, _) = tokio::sync::broadcast::channel(256);
        Self { tx }
    }

    /// Publish an event to all current subscribers.
    pub fn publish(&self, event: DomainEvent) {
        trace!(event = event.event_name(), "publishing domain event");
        // A send error only means nobody is listening right now.
        let _ = self.tx.send(event);
    }

    /// Subscribe to all events published after this call.
    pub fn subscribe(&self) -> tokio::sync::broadcast::Receiver<DomainEvent> {
        self.tx.subscribe()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for EventBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventBus")
            .field("receivers", &self.tx.receiver_count())
            .finish()
    }
}
