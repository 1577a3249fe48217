//! Personal-blog API sink.
//!
//! Publishes the snapshot's identity fields to a blog's "now" endpoint.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;

use vantage_core::config::{ConfigStore, VantageConfig};
use vantage_core::types::{SinkOutcome, SkipReason, Snapshot};

use crate::sink::Sink;
use crate::sinks::TransportError;

/// Payload accepted by the blog endpoint.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct BlogEntry {
    pub timestamp: DateTime<Utc>,
    pub process_name: Option<String>,
    pub media_title: Option<String>,
    pub media_artist: Option<String>,
}

/// Wire-level collaborator for the blog sink.
#[async_trait]
pub trait BlogApi: Send + Sync {
    async fn publish(&self, entry: &BlogEntry) -> Result<(), TransportError>;
}

pub struct BlogSink {
    api: Arc<dyn BlogApi>,
    config: Arc<ConfigStore>,
}

impl BlogSink {
    pub const NAME: &'static str = "blog";

    pub fn new(api: Arc<dyn BlogApi>, config: Arc<ConfigStore>) -> Self {
        Self { api, config }
    }
}

#[async_trait]
impl Sink for BlogSink {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn enabled(&self, config: &VantageConfig) -> bool {
        config.sinks.blog.enabled
    }

    async fn deliver(&self, snapshot: &Snapshot) -> SinkOutcome {
        if !self.enabled(&self.config.get()) {
            return SinkOutcome::Skipped(SkipReason::Disabled);
        }
        if snapshot.is_empty() {
            return SinkOutcome::Skipped(SkipReason::NotApplicable);
        }

        let entry = BlogEntry {
            timestamp: snapshot.created_at,
            process_name: snapshot.process.as_ref().map(|p| p.name.clone()),
            media_title: snapshot.media.as_ref().map(|m| m.title.clone()),
            media_artist: snapshot.media.as_ref().and_then(|m| m.artist.clone()),
        };

        match self.api.publish(&entry).await {
            Ok(()) => SinkOutcome::Delivered,
            Err(e) => e.into_outcome(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sinks::testing::config_store_with;
    use std::sync::Mutex;
    use vantage_core::types::ProcessInfo;

    #[derive(Default)]
    struct RecordingApi {
        entries: Mutex<Vec<BlogEntry>>,
        fail_with: Mutex<Option<TransportError>>,
    }

    #[async_trait]
    impl BlogApi for RecordingApi {
        async fn publish(&self, entry: &BlogEntry) -> Result<(), TransportError> {
            if let Some(err) = self.fail_with.lock().unwrap().take() {
                return Err(err);
            }
            self.entries.lock().unwrap().push(entry.clone());
            Ok(())
        }
    }

    fn enabled_sink(api: Arc<RecordingApi>) -> BlogSink {
        let config = config_store_with(|c| c.sinks.blog.enabled = true);
        BlogSink::new(api as Arc<dyn BlogApi>, config)
    }

    fn focused_snapshot(name: &str) -> Snapshot {
        Snapshot::new(
            Some(ProcessInfo {
                name: name.to_string(),
                window_title: None,
                bundle_id: None,
                icon: None,
            }),
            None,
        )
    }

    #[tokio::test]
    async fn test_publishes_identity_fields() {
        let api = Arc::new(RecordingApi::default());
        let sink = enabled_sink(Arc::clone(&api));

        let outcome = sink.deliver(&focused_snapshot("Xcode")).await;
        assert!(outcome.is_delivered());

        let entries = api.entries.lock().unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].process_name.as_deref(), Some("Xcode"));
        assert!(entries[0].media_title.is_none());
    }

    #[tokio::test]
    async fn test_empty_snapshot_is_not_applicable() {
        let api = Arc::new(RecordingApi::default());
        let sink = enabled_sink(Arc::clone(&api));

        let outcome = sink.deliver(&Snapshot::empty()).await;
        assert_eq!(outcome, SinkOutcome::Skipped(SkipReason::NotApplicable));
        assert!(api.entries.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_disabled_sink_called_directly_skips() {
        let api = Arc::new(RecordingApi::default());
        let config = config_store_with(|_| {});
        let sink = BlogSink::new(Arc::clone(&api) as Arc<dyn BlogApi>, config);

        let outcome = sink.deliver(&focused_snapshot("Xcode")).await;
        assert_eq!(outcome, SinkOutcome::Skipped(SkipReason::Disabled));
        assert!(api.entries.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_network_error_is_hard_failure() {
        let api = Arc::new(RecordingApi::default());
        *api.fail_with.lock().unwrap() = Some(TransportError::Network("refused".into()));
        let sink = enabled_sink(Arc::clone(&api));

        let outcome = sink.deliver(&focused_snapshot("Safari")).await;
        assert!(outcome.is_failed());
    }

    #[test]
    fn test_enabled_follows_config() {
        let api = Arc::new(RecordingApi::default());
        let sink = enabled_sink(api);

        let mut config = VantageConfig::default();
        assert!(!sink.enabled(&config));
        config.sinks.blog.enabled = true;
        assert!(sink.enabled(&config));
    }
}
