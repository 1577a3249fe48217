//! Game-presence sink.
//!
//! Maps the snapshot onto a rich-presence activity (details, state,
//! started-at) and pushes it through the presence SDK bridge. The SDK's
//! FFI concerns live entirely behind the [`PresenceClient`] trait.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use vantage_core::config::{ConfigStore, VantageConfig};
use vantage_core::types::{SinkOutcome, SkipReason, Snapshot};

use crate::sink::Sink;
use crate::sinks::TransportError;

/// The activity payload shown on the user's profile.
#[derive(Clone, Debug, PartialEq)]
pub struct PresenceActivity {
    /// Top line: what the user is doing.
    pub details: String,
    /// Second line: extra context (window title or artist).
    pub state: Option<String>,
    pub started_at: DateTime<Utc>,
}

/// SDK-bridge collaborator for the presence sink.
#[async_trait]
pub trait PresenceClient: Send + Sync {
    async fn set_activity(&self, activity: &PresenceActivity) -> Result<(), TransportError>;
    async fn clear_activity(&self) -> Result<(), TransportError>;
}

pub struct PresenceSink {
    client: Arc<dyn PresenceClient>,
    config: Arc<ConfigStore>,
}

impl PresenceSink {
    pub const NAME: &'static str = "presence";

    pub fn new(client: Arc<dyn PresenceClient>, config: Arc<ConfigStore>) -> Self {
        Self { client, config }
    }
}

fn activity_for(snapshot: &Snapshot) -> Option<PresenceActivity> {
    if let Some(media) = snapshot.media.as_ref() {
        return Some(PresenceActivity {
            details: media.title.clone(),
            state: media.artist.clone(),
            started_at: snapshot.created_at,
        });
    }
    snapshot.process.as_ref().map(|process| PresenceActivity {
        details: process.name.clone(),
        state: process.window_title.clone(),
        started_at: snapshot.created_at,
    })
}

#[async_trait]
impl Sink for PresenceSink {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn enabled(&self, config: &VantageConfig) -> bool {
        config.sinks.presence.enabled
    }

    async fn deliver(&self, snapshot: &Snapshot) -> SinkOutcome {
        if !self.enabled(&self.config.get()) {
            return SinkOutcome::Skipped(SkipReason::Disabled);
        }

        // An empty snapshot clears the remote presence rather than showing
        // stale activity; there is nothing to report, so it is a soft skip.
        let Some(activity) = activity_for(snapshot) else {
            return match self.client.clear_activity().await {
                Ok(()) => SinkOutcome::Skipped(SkipReason::NotApplicable),
                Err(e) => e.into_outcome(),
            };
        };

        match self.client.set_activity(&activity).await {
            Ok(()) => SinkOutcome::Delivered,
            Err(e) => e.into_outcome(),
        }
    }
}
