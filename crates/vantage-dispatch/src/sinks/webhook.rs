//! Team-chat webhook sink.
//!
//! Formats the snapshot as a one-line status message and posts it.

use std::sync::Arc;

use async_trait::async_trait;

use vantage_core::config::{ConfigStore, VantageConfig};
use vantage_core::types::{SinkOutcome, SkipReason, Snapshot};

use crate::sink::Sink;
use crate::sinks::TransportError;

/// Wire-level collaborator for the webhook sink.
#[async_trait]
pub trait WebhookPoster: Send + Sync {
    async fn post(&self, text: &str) -> Result<(), TransportError>;
}

pub struct WebhookSink {
    poster: Arc<dyn WebhookPoster>,
    config: Arc<ConfigStore>,
}

impl WebhookSink {
    pub const NAME: &'static str = "webhook";

    pub fn new(poster: Arc<dyn WebhookPoster>, config: Arc<ConfigStore>) -> Self {
        Self { poster, config }
    }
}

/// Render the snapshot as a single status line.
fn format_message(snapshot: &Snapshot) -> String {
    let mut parts = Vec::new();

    if let Some(process) = snapshot.process.as_ref() {
        match process.window_title.as_deref() {
            Some(title) => parts.push(format!("Focused on {} ({})", process.name, title)),
            None => parts.push(format!("Focused on {}", process.name)),
        }
    }

    if let Some(media) = snapshot.media.as_ref() {
        match media.artist.as_deref() {
            Some(artist) => parts.push(format!("listening to {} by {}", media.title, artist)),
            None => parts.push(format!("listening to {}", media.title)),
        }
    }

    parts.join("; ")
}

#[async_trait]
impl Sink for WebhookSink {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn enabled(&self, config: &VantageConfig) -> bool {
        config.sinks.webhook.enabled
    }

    async fn deliver(&self, snapshot: &Snapshot) -> SinkOutcome {
        if !self.enabled(&self.config.get()) {
            return SinkOutcome::Skipped(SkipReason::Disabled);
        }
        if snapshot.is_empty() {
            return SinkOutcome::Skipped(SkipReason::NotApplicable);
        }

        match self.poster.post(&format_message(snapshot)).await {
            Ok(()) => SinkOutcome::Delivered,
            Err(e) => e.into_outcome(),
        }
    }
}
