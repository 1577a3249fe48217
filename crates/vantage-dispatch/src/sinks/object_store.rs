//! Object-storage sink.
//!
//! Uploads one JSON record per snapshot. Application icons are uploaded at
//! most once per identifier: the sink consults the icon cache first and
//! references the stored URL thereafter.

use std::sync::Arc;

use async_trait::async_trait;
use serde::Serialize;
use tracing::warn;

use vantage_core::config::{ConfigStore, VantageConfig};
use vantage_core::types::{SinkFailure, SinkOutcome, SkipReason, Snapshot, SnapshotExport};
use vantage_storage::IconStore;

use crate::sink::Sink;
use crate::sinks::TransportError;

/// Wire-level collaborator for the object-storage sink.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Store a record body under the given key.
    async fn put_record(&self, key: &str, body: Vec<u8>) -> Result<(), TransportError>;

    /// Upload icon bytes and return a stable public URL.
    async fn upload_icon(&self, bundle_id: &str, bytes: &[u8]) -> Result<String, TransportError>;
}

/// The JSON document written per snapshot.
#[derive(Debug, Serialize)]
struct StoredRecord {
    #[serde(flatten)]
    record: SnapshotExport,
    icon_url: Option<String>,
}

pub struct ObjectStoreSink {
    store: Arc<dyn ObjectStore>,
    icons: Arc<IconStore>,
    config: Arc<ConfigStore>,
}

impl ObjectStoreSink {
    pub const NAME: &'static str = "object_store";

    pub fn new(store: Arc<dyn ObjectStore>, icons: Arc<IconStore>, config: Arc<ConfigStore>) -> Self {
        Self {
            store,
            icons,
            config,
        }
    }

    /// Resolve the icon URL for the snapshot's application, uploading the
    /// bytes on first sight of an identifier.
    ///
    /// An upload failure is tolerated (the record goes out without an icon
    /// reference); a cache read/write failure is a persistence error and
    /// fails the delivery.
    async fn resolve_icon_url(&self, snapshot: &Snapshot) -> Result<Option<String>, SinkFailure> {
        let Some(process) = snapshot.process.as_ref() else {
            return Ok(None);
        };
        let Some(bundle_id) = process.bundle_id.as_deref() else {
            return Ok(None);
        };

        if let Some(record) = self
            .icons
            .find(bundle_id)
            .map_err(|e| SinkFailure::Persistence(e.to_string()))?
        {
            return Ok(Some(record.url));
        }

        let Some(icon_bytes) = process.icon.as_deref() else {
            return Ok(None);
        };

        match self.store.upload_icon(bundle_id, icon_bytes).await {
            Ok(url) => {
                self.icons
                    .upsert(bundle_id, &process.name, &url)
                    .map_err(|e| SinkFailure::Persistence(e.to_string()))?;
                Ok(Some(url))
            }
            Err(e) => {
                warn!(bundle_id = %bundle_id, error = %e, "icon upload failed");
                Ok(None)
            }
        }
    }
}

#[async_trait]
impl Sink for ObjectStoreSink {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn enabled(&self, config: &VantageConfig) -> bool {
        config.sinks.object_store.enabled
    }

    async fn deliver(&self, snapshot: &Snapshot) -> SinkOutcome {
        let config = self.config.get();
        if !self.enabled(&config) {
            return SinkOutcome::Skipped(SkipReason::Disabled);
        }
        if snapshot.is_empty() {
            return SinkOutcome::Skipped(SkipReason::NotApplicable);
        }

        let icon_url = match self.resolve_icon_url(snapshot).await {
            Ok(url) => url,
            Err(failure) => return SinkOutcome::Failed(failure),
        };

        let document = StoredRecord {
            record: snapshot.export(),
            icon_url,
        };
        let body = match serde_json::to_vec(&document) {
            Ok(body) => body,
            Err(e) => return SinkOutcome::Failed(SinkFailure::Other(e.to_string())),
        };

        let prefix = config.sinks.object_store.prefix.trim_end_matches('/');
        let key = if prefix.is_empty() {
            format!("{}.json", snapshot.id)
        } else {
            format!("{}/{}.json", prefix, snapshot.id)
        };

        match self.store.put_record(&key, body).await {
            Ok(()) => SinkOutcome::Delivered,
            Err(e) => e.into_outcome(),
        }
    }
}
