//! Vantage dispatch - the sink contract, the sink registry, the fan-out
//! dispatcher, and the bundled sink adapters.
//!
//! The central design property lives here: errors from individual sinks
//! never propagate past the dispatcher boundary. One badly-behaved
//! integration cannot take down reporting for the others.

pub mod dispatcher;
pub mod registry;
pub mod sink;
pub mod sinks;

pub use dispatcher::{DispatchReport, Dispatcher};
pub use registry::SinkRegistry;
pub use sink::{MockSink, Sink};
pub use sinks::blog::{BlogApi, BlogEntry, BlogSink};
pub use sinks::console::ConsoleSink;
pub use sinks::object_store::{ObjectStore, ObjectStoreSink};
pub use sinks::presence::{PresenceActivity, PresenceClient, PresenceSink};
pub use sinks::webhook::{WebhookPoster, WebhookSink};
pub use sinks::TransportError;
