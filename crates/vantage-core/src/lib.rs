//! Vantage core - snapshot model, mapping engine, configuration, domain
//! events, and the shared error type.
//!
//! This crate holds the value types that flow through the reporting
//! pipeline. It has no storage or network concerns of its own; those live
//! in `vantage-storage` and `vantage-dispatch`.

pub mod config;
pub mod error;
pub mod events;
pub mod mapping;
pub mod types;

pub use config::{ConfigStore, VantageConfig};
pub use error::{Result, VantageError};
pub use events::{DomainEvent, EventBus};
pub use mapping::{apply_rules, MappingKind, MappingRule};
pub use types::*;
