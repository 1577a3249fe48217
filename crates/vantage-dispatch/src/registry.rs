//! Bookkeeping for the currently-active sinks.
//!
//! The registry is the one piece of mutable state shared between the
//! monitor side (which registers and unregisters on configuration changes)
//! and the dispatcher (which reads a point-in-time copy every fan-out).
//! A single RwLock keeps those reads linearizable with mutations; a reader
//! never observes a half-constructed entry.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use chrono::Utc;
use tracing::debug;

use vantage_core::config::VantageConfig;
use vantage_core::events::{DomainEvent, EventBus};

use crate::sink::Sink;

/// Keyed mapping of sink name to sink handle.
pub struct SinkRegistry {
    entries: RwLock<HashMap<String, Arc<dyn Sink>>>,
    events: EventBus,
}

impl SinkRegistry {
    pub fn new(events: EventBus) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            events,
        }
    }

    /// Add a sink under its own name. Registering an already-registered
    /// name replaces the handle and is not an error.
    pub fn register(&self, sink: Arc<dyn Sink>) {
        let name = sink.name().to_string();
        let replaced = {
            let mut entries = self
                .entries
                .write()
                .unwrap_or_else(|poisoned| poisoned.into_inner());
            entries.insert(name.clone(), sink).is_some()
        };

        if !replaced {
            debug!(sink = %name, "sink registered");
            self.events.publish(DomainEvent::SinkRegistered {
                name,
                timestamp: Utc::now(),
            });
        }
    }

    /// Remove a sink by name. Unregistering an absent name is a no-op.
    pub fn unregister(&self, name: &str) {
        let removed = {
            let mut entries = self
                .entries
                .write()
                .unwrap_or_else(|poisoned| poisoned.into_inner());
            entries.remove(name).is_some()
        };

        if removed {
            debug!(sink = %name, "sink unregistered");
            self.events.publish(DomainEvent::SinkUnregistered {
                name: name.to_string(),
                timestamp: Utc::now(),
            });
        }
    }

    /// A point-in-time copy of the registered entries, sorted by name for
    /// deterministic iteration.
    pub fn entries(&self) -> Vec<(String, Arc<dyn Sink>)> {
        let entries = self
            .entries
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        let mut copy: Vec<_> = entries
            .iter()
            .map(|(name, sink)| (name.clone(), Arc::clone(sink)))
            .collect();
        copy.sort_by(|a, b| a.0.cmp(&b.0));
        copy
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.entries
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Bring the registry in line with configuration: every candidate sink
    /// that reports itself enabled is registered, every other one is
    /// unregistered. Running this twice with unchanged configuration leaves
    /// the registry contents identical.
    ///
    /// Invoked at startup and from the configuration-change subscription.
    pub fn reconcile(&self, candidates: &[Arc<dyn Sink>], config: &VantageConfig) {
        for sink in candidates {
            if sink.enabled(config) {
                if !self.contains(sink.name()) {
                    self.register(Arc::clone(sink));
                }
            } else {
                self.unregister(sink.name());
            }
        }
    }
}

impl std::fmt::Debug for SinkRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let names: Vec<String> = self.entries().into_iter().map(|(name, _)| name).collect();
        f.debug_struct("SinkRegistry").field("sinks", &names).finish()
    }
}
