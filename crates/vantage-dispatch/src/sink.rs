//! The uniform contract every reporting integration implements.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;

use vantage_core::config::VantageConfig;
use vantage_core::types::{SinkOutcome, Snapshot};

/// A reporting integration: a named, independently-configured destination
/// that accepts snapshots.
///
/// `deliver` must be safely callable concurrently with other sinks'
/// `deliver` and must never panic the dispatcher: every failure mode is
/// returned as a [`SinkOutcome`]. Timeouts are the sink's own
/// responsibility; the dispatcher imposes none.
#[async_trait]
pub trait Sink: Send + Sync {
    /// Unique human-readable name, used as the registry key and in the
    /// history accepted-set.
    fn name(&self) -> &str;

    /// Whether this sink should be registered, derived from its own
    /// section of the configuration.
    fn enabled(&self, config: &VantageConfig) -> bool;

    /// Handle one snapshot. A disabled sink called directly returns
    /// `Skipped(Disabled)`.
    async fn deliver(&self, snapshot: &Snapshot) -> SinkOutcome;
}

/// Scriptable sink for tests and wiring experiments: returns a fixed
/// outcome and records every snapshot it sees.
pub struct MockSink {
    name: String,
    enabled: bool,
    outcome: SinkOutcome,
    calls: AtomicUsize,
    seen: Mutex<Vec<Snapshot>>,
}

impl MockSink {
    pub fn new(name: &str, outcome: SinkOutcome) -> Self {
        Self {
            name: name.to_string(),
            enabled: true,
            outcome,
            calls: AtomicUsize::new(0),
            seen: Mutex::new(Vec::new()),
        }
    }

    /// Same as [`MockSink::new`] but reporting the given enabled state to
    /// registry reconciliation.
    pub fn with_enabled(name: &str, outcome: SinkOutcome, enabled: bool) -> Self {
        Self {
            enabled,
            ..Self::new(name, outcome)
        }
    }

    /// Number of deliveries attempted against this sink.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Snapshots delivered to this sink, in arrival order.
    pub fn seen(&self) -> Vec<Snapshot> {
        self.seen
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }
}

#[async_trait]
impl Sink for MockSink {
    fn name(&self) -> &str {
        &self.name
    }

    fn enabled(&self, _config: &VantageConfig) -> bool {
        self.enabled
    }

    async fn deliver(&self, snapshot: &Snapshot) -> SinkOutcome {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.seen
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(snapshot.clone());
        self.outcome.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use vantage_core::types::{SinkFailure, SkipReason};

    #[tokio::test]
    async fn test_mock_sink_returns_configured_outcome() {
        let sink = MockSink::new("mock", SinkOutcome::Delivered);
        let outcome = sink.deliver(&Snapshot::empty()).await;
        assert!(outcome.is_delivered());
        assert_eq!(sink.calls(), 1);
    }

    #[tokio::test]
    async fn test_mock_sink_records_snapshots() {
        let sink = MockSink::new(
            "mock",
            SinkOutcome::Failed(SinkFailure::Network("down".into())),
        );
        let snapshot = Snapshot::empty();
        sink.deliver(&snapshot).await;
        let seen = sink.seen();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].id, snapshot.id);
    }

    #[test]
    fn test_mock_sink_enabled_flag() {
        let config = VantageConfig::default();
        let on = MockSink::new("on", SinkOutcome::Delivered);
        let off = MockSink::with_enabled("off", SinkOutcome::Skipped(SkipReason::Disabled), false);
        assert!(on.enabled(&config));
        assert!(!off.enabled(&config));
    }
}
