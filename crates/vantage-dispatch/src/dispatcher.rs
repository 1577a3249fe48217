//! The fan-out engine.
//!
//! One dispatch takes a point-in-time copy of the registry, delivers the
//! snapshot to every entry concurrently, waits for all of them, classifies
//! the outcomes, and records the snapshot with its accepted-sink set in
//! history. Sink errors never propagate past this boundary; callers only
//! ever see the aggregated report.

use std::collections::BTreeSet;
use std::sync::Arc;

use chrono::Utc;
use tracing::{debug, warn};

use vantage_core::events::{DomainEvent, EventBus};
use vantage_core::types::{DispatchStatus, SinkFailure, SinkOutcome, Snapshot};
use vantage_storage::HistoryStore;

use crate::registry::SinkRegistry;

/// Aggregated result of one fan-out.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DispatchReport {
    /// Sinks that delivered the snapshot.
    pub accepted: BTreeSet<String>,
    /// Sinks that declined softly (disabled, not applicable, rate limited).
    /// Excluded from both the accepted and the failed set.
    pub skipped: BTreeSet<String>,
    /// Sinks that hard-failed.
    pub failed: BTreeSet<String>,
    pub status: DispatchStatus,
}

impl DispatchReport {
    fn status_for(accepted: &BTreeSet<String>, failed: &BTreeSet<String>) -> DispatchStatus {
        if failed.is_empty() {
            DispatchStatus::Success
        } else if accepted.is_empty() {
            DispatchStatus::AllFailed
        } else {
            DispatchStatus::Partial
        }
    }
}

/// Fan-out dispatcher over the sink registry.
pub struct Dispatcher {
    registry: Arc<SinkRegistry>,
    history: Arc<HistoryStore>,
    events: EventBus,
}

impl Dispatcher {
    pub fn new(registry: Arc<SinkRegistry>, history: Arc<HistoryStore>, events: EventBus) -> Self {
        Self {
            registry,
            history,
            events,
        }
    }

    /// Deliver one snapshot to every registered sink concurrently and
    /// record the outcome.
    ///
    /// Every sink runs in its own task: one sink panicking or hanging
    /// cannot corrupt the result for any other. The history write is
    /// attempted exactly once regardless of how many sinks failed; a
    /// persistence failure there is logged and swallowed without touching
    /// the report.
    pub async fn send(&self, mut snapshot: Snapshot) -> DispatchReport {
        let entries = self.registry.entries();
        let payload = Arc::new(snapshot.clone());

        let mut handles = Vec::with_capacity(entries.len());
        for (name, sink) in entries {
            let payload = Arc::clone(&payload);
            let handle = tokio::spawn(async move { sink.deliver(&payload).await });
            handles.push((name, handle));
        }

        let mut accepted = BTreeSet::new();
        let mut skipped = BTreeSet::new();
        let mut failed = BTreeSet::new();

        for (name, handle) in handles {
            let outcome = match handle.await {
                Ok(outcome) => outcome,
                Err(join_err) => SinkOutcome::Failed(SinkFailure::Other(format!(
                    "sink task did not complete: {join_err}"
                ))),
            };

            match outcome {
                SinkOutcome::Delivered => {
                    accepted.insert(name);
                }
                SinkOutcome::Skipped(reason) => {
                    debug!(sink = %name, ?reason, "sink skipped snapshot");
                    skipped.insert(name);
                }
                SinkOutcome::Failed(failure) => {
                    warn!(sink = %name, ?failure, "sink delivery failed");
                    failed.insert(name);
                }
            }
        }

        snapshot.mark_accepted(accepted.iter().cloned());
        self.persist(snapshot.clone()).await;

        let status = DispatchReport::status_for(&accepted, &failed);
        self.events.publish(DomainEvent::SnapshotDispatched {
            snapshot_id: snapshot.id,
            accepted: accepted.iter().cloned().collect(),
            failed: failed.iter().cloned().collect(),
            status,
            timestamp: Utc::now(),
        });

        debug!(
            snapshot = %snapshot.id,
            accepted = accepted.len(),
            skipped = skipped.len(),
            failed = failed.len(),
            ?status,
            "dispatch complete"
        );

        DispatchReport {
            accepted,
            skipped,
            failed,
            status,
        }
    }

    /// One history-write attempt per dispatch, off the dispatch control
    /// flow. Failure never reverses the sink outcomes already obtained.
    async fn persist(&self, snapshot: Snapshot) {
        let history = Arc::clone(&self.history);
        let snapshot_id = snapshot.id;
        let result = tokio::task::spawn_blocking(move || history.save(&snapshot)).await;

        match result {
            Ok(Ok(())) => {}
            Ok(Err(e)) => warn!(snapshot = %snapshot_id, error = %e, "history save failed"),
            Err(e) => warn!(snapshot = %snapshot_id, error = %e, "history save task failed"),
        }
    }
}

impl std::fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dispatcher").finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sink::{MockSink, Sink};
    use async_trait::async_trait;
    use vantage_core::config::VantageConfig;
    use vantage_core::types::{MediaInfo, ProcessInfo, SinkFailure, SkipReason};
    use vantage_storage::{Database, HistoryQuery};

    fn make_dispatcher() -> (Dispatcher, Arc<SinkRegistry>, Arc<HistoryStore>) {
        let bus = EventBus::new();
        let registry = Arc::new(SinkRegistry::new(bus.clone()));
        let history = Arc::new(HistoryStore::new(
            Arc::new(Database::in_memory().unwrap()),
            bus.clone(),
        ));
        let dispatcher = Dispatcher::new(Arc::clone(&registry), Arc::clone(&history), bus);
        (dispatcher, registry, history)
    }

    fn music_snapshot() -> Snapshot {
        Snapshot::new(
            Some(ProcessInfo {
                name: "Music".to_string(),
                window_title: None,
                bundle_id: Some("com.apple.Music".to_string()),
                icon: None,
            }),
            Some(MediaInfo {
                title: "Song A".to_string(),
                artist: Some("Artist X".to_string()),
                album: None,
                player_name: "Music".to_string(),
                player_bundle_id: Some("com.apple.Music".to_string()),
                duration_secs: 180.0,
                elapsed_secs: 10.0,
                artwork: None,
            }),
        )
    }

    struct PanickingSink;

    #[async_trait]
    impl Sink for PanickingSink {
        fn name(&self) -> &str {
            "panicky"
        }

        fn enabled(&self, _config: &VantageConfig) -> bool {
            true
        }

        async fn deliver(&self, _snapshot: &Snapshot) -> SinkOutcome {
            panic!("sink blew up");
        }
    }

    #[tokio::test]
    async fn test_all_sinks_succeed() {
        let (dispatcher, registry, history) = make_dispatcher();
        registry.register(Arc::new(MockSink::new("a", SinkOutcome::Delivered)));
        registry.register(Arc::new(MockSink::new("b", SinkOutcome::Delivered)));

        let report = dispatcher.send(music_snapshot()).await;

        assert_eq!(report.status, DispatchStatus::Success);
        assert_eq!(report.accepted.len(), 2);
        assert!(report.failed.is_empty());

        let records = history.fetch(&HistoryQuery::default()).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].accepted_sinks, vec!["a", "b"]);
    }

    #[tokio::test]
    async fn test_soft_failures_excluded_from_both_sets() {
        let (dispatcher, registry, _history) = make_dispatcher();
        registry.register(Arc::new(MockSink::new("ok", SinkOutcome::Delivered)));
        registry.register(Arc::new(MockSink::new(
            "throttled",
            SinkOutcome::Skipped(SkipReason::RateLimited),
        )));
        registry.register(Arc::new(MockSink::new(
            "off",
            SinkOutcome::Skipped(SkipReason::Disabled),
        )));

        let report = dispatcher.send(music_snapshot()).await;

        assert_eq!(report.status, DispatchStatus::Success);
        assert_eq!(report.accepted.iter().collect::<Vec<_>>(), vec!["ok"]);
        assert_eq!(report.skipped.len(), 2);
        assert!(report.failed.is_empty());
    }

    #[tokio::test]
    async fn test_mixed_outcomes_are_partial() {
        let (dispatcher, registry, history) = make_dispatcher();
        registry.register(Arc::new(MockSink::new("a", SinkOutcome::Delivered)));
        registry.register(Arc::new(MockSink::new(
            "b",
            SinkOutcome::Skipped(SkipReason::Disabled),
        )));
        registry.register(Arc::new(MockSink::new(
            "c",
            SinkOutcome::Failed(SinkFailure::Network("timed out".into())),
        )));

        let snapshot = music_snapshot();
        let report = dispatcher.send(snapshot).await;

        assert_eq!(report.status, DispatchStatus::Partial);
        assert_eq!(report.accepted.iter().collect::<Vec<_>>(), vec!["a"]);
        assert_eq!(report.skipped.iter().collect::<Vec<_>>(), vec!["b"]);
        assert_eq!(report.failed.iter().collect::<Vec<_>>(), vec!["c"]);

        // The history record carries exactly the accepted set.
        let records = history.fetch(&HistoryQuery::default()).unwrap();
        assert_eq!(records[0].accepted_sinks, vec!["a"]);
    }

    #[tokio::test]
    async fn test_every_sink_failing_is_all_failed() {
        let (dispatcher, registry, _history) = make_dispatcher();
        registry.register(Arc::new(MockSink::new(
            "a",
            SinkOutcome::Failed(SinkFailure::Network("down".into())),
        )));
        registry.register(Arc::new(MockSink::new(
            "b",
            SinkOutcome::Failed(SinkFailure::Other("boom".into())),
        )));

        let report = dispatcher.send(music_snapshot()).await;
        assert_eq!(report.status, DispatchStatus::AllFailed);
        assert!(report.accepted.is_empty());
        assert_eq!(report.failed.len(), 2);
    }

    #[tokio::test]
    async fn test_only_soft_outcomes_is_success() {
        let (dispatcher, registry, _history) = make_dispatcher();
        registry.register(Arc::new(MockSink::new(
            "off",
            SinkOutcome::Skipped(SkipReason::Disabled),
        )));

        let report = dispatcher.send(music_snapshot()).await;
        assert_eq!(report.status, DispatchStatus::Success);
        assert!(report.accepted.is_empty());
        assert!(report.failed.is_empty());
    }

    #[tokio::test]
    async fn test_empty_registry_dispatch() {
        let (dispatcher, _registry, history) = make_dispatcher();
        let report = dispatcher.send(music_snapshot()).await;

        assert_eq!(report.status, DispatchStatus::Success);
        assert!(report.accepted.is_empty());

        // The snapshot is still recorded.
        assert_eq!(history.count().unwrap(), 1);
    }

    #[tokio::test]
    async fn test_panicking_sink_is_isolated() {
        let (dispatcher, registry, history) = make_dispatcher();
        let ok = Arc::new(MockSink::new("ok", SinkOutcome::Delivered));
        registry.register(Arc::clone(&ok) as Arc<dyn Sink>);
        registry.register(Arc::new(PanickingSink));

        let report = dispatcher.send(music_snapshot()).await;

        // The panic is captured as a hard failure for that sink only.
        assert_eq!(report.status, DispatchStatus::Partial);
        assert!(report.accepted.contains("ok"));
        assert!(report.failed.contains("panicky"));
        assert_eq!(ok.calls(), 1);

        // The history write was still attempted.
        let records = history.fetch(&HistoryQuery::default()).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].accepted_sinks, vec!["ok"]);
    }

    #[tokio::test]
    async fn test_end_to_end_partial_scenario() {
        // Snapshot with processName="Music", mediaName="Song A",
        // artist="Artist X", sent to three sinks: A succeeds, B is
        // disabled (soft), C times out (hard).
        let (dispatcher, registry, history) = make_dispatcher();
        registry.register(Arc::new(MockSink::new("A", SinkOutcome::Delivered)));
        registry.register(Arc::new(MockSink::new(
            "B",
            SinkOutcome::Skipped(SkipReason::Disabled),
        )));
        registry.register(Arc::new(MockSink::new(
            "C",
            SinkOutcome::Failed(SinkFailure::Network("request timed out".into())),
        )));

        let report = dispatcher.send(music_snapshot()).await;

        assert_eq!(report.status, DispatchStatus::Partial);
        assert_eq!(report.accepted.iter().collect::<Vec<_>>(), vec!["A"]);

        let record = &history.fetch(&HistoryQuery::default()).unwrap()[0];
        assert_eq!(record.accepted_sinks, vec!["A"]);
        assert_eq!(record.process.as_ref().unwrap().name, "Music");
        assert_eq!(record.media.as_ref().unwrap().title, "Song A");
    }

    #[tokio::test]
    async fn test_dispatch_publishes_event() {
        let bus = EventBus::new();
        let registry = Arc::new(SinkRegistry::new(bus.clone()));
        let history = Arc::new(HistoryStore::new(
            Arc::new(Database::in_memory().unwrap()),
            bus.clone(),
        ));
        let dispatcher = Dispatcher::new(Arc::clone(&registry), history, bus.clone());
        registry.register(Arc::new(MockSink::new("a", SinkOutcome::Delivered)));

        let mut rx = bus.subscribe();
        let snapshot = music_snapshot();
        let expected_id = snapshot.id;
        dispatcher.send(snapshot).await;

        loop {
            match rx.recv().await.unwrap() {
                DomainEvent::SnapshotDispatched {
                    snapshot_id,
                    accepted,
                    status,
                    ..
                } => {
                    assert_eq!(snapshot_id, expected_id);
                    assert_eq!(accepted, vec!["a"]);
                    assert_eq!(status, DispatchStatus::Success);
                    break;
                }
                // HistorySaved and registration events share the bus.
                _ => continue,
            }
        }
    }
}
