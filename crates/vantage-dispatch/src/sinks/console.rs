//! Local logging sink.
//!
//! Writes the snapshot to the application log. Useful headless and as a
//! smoke-test destination; it has no transport and never fails.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::info;

use vantage_core::config::{ConfigStore, VantageConfig};
use vantage_core::types::{SinkOutcome, SkipReason, Snapshot};

use crate::sink::Sink;

pub struct ConsoleSink {
    config: Arc<ConfigStore>,
}

impl ConsoleSink {
    pub const NAME: &'static str = "console";

    pub fn new(config: Arc<ConfigStore>) -> Self {
        Self { config }
    }
}

#[async_trait]
impl Sink for ConsoleSink {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn enabled(&self, config: &VantageConfig) -> bool {
        config.sinks.console.enabled
    }

    async fn deliver(&self, snapshot: &Snapshot) -> SinkOutcome {
        if !self.enabled(&self.config.get()) {
            return SinkOutcome::Skipped(SkipReason::Disabled);
        }

        let process = snapshot
            .process
            .as_ref()
            .map(|p| p.name.as_str())
            .unwrap_or("-");
        let media = snapshot
            .media
            .as_ref()
            .map(|m| m.title.as_str())
            .unwrap_or("-");
        info!(snapshot = %snapshot.id, process, media, "activity");
        SinkOutcome::Delivered
    }
}
