//! Stand-in sink transports for the headless binary.
//!
//! Each one writes the payload it would send to the application log. A
//! platform shell replaces these with its real HTTP/SDK clients when it
//! links against the library crates.

use async_trait::async_trait;
use tracing::info;

use vantage_dispatch::{
    BlogApi, BlogEntry, ObjectStore, PresenceActivity, PresenceClient, TransportError,
    WebhookPoster,
};

pub struct LogBlogApi;

#[async_trait]
impl BlogApi for LogBlogApi {
    async fn publish(&self, entry: &BlogEntry) -> Result<(), TransportError> {
        info!(
            process = entry.process_name.as_deref().unwrap_or("-"),
            media = entry.media_title.as_deref().unwrap_or("-"),
            "blog entry published"
        );
        Ok(())
    }
}

pub struct LogObjectStore;

#[async_trait]
impl ObjectStore for LogObjectStore {
    async fn put_record(&self, key: &str, body: Vec<u8>) -> Result<(), TransportError> {
        info!(key, bytes = body.len(), "object stored");
        Ok(())
    }

    async fn upload_icon(&self, bundle_id: &str, bytes: &[u8]) -> Result<String, TransportError> {
        info!(bundle_id, bytes = bytes.len(), "icon uploaded");
        Ok(format!("log://icons/{bundle_id}"))
    }
}

pub struct LogWebhookPoster;

#[async_trait]
impl WebhookPoster for LogWebhookPoster {
    async fn post(&self, text: &str) -> Result<(), TransportError> {
        info!(message = text, "webhook posted");
        Ok(())
    }
}

pub struct LogPresenceClient;

#[async_trait]
impl PresenceClient for LogPresenceClient {
    async fn set_activity(&self, activity: &PresenceActivity) -> Result<(), TransportError> {
        info!(
            details = %activity.details,
            state = activity.state.as_deref().unwrap_or("-"),
            "presence updated"
        );
        Ok(())
    }

    async fn clear_activity(&self) -> Result<(), TransportError> {
        info!("presence cleared");
        Ok(())
    }
}
