use std::path::{Path, PathBuf};
use std::sync::RwLock;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::error::{Result, VantageError};
use crate::events::{DomainEvent, EventBus};
use crate::mapping::MappingRule;

/// Top-level configuration for the Vantage application.
///
/// Loaded from `~/.vantage/config.toml` by default. Sink sections are
/// opaque to the core beyond their `enabled` flag.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct VantageConfig {
    pub general: GeneralConfig,
    pub process: ProcessConfig,
    pub media: MediaConfig,
    /// Ordered rewrite rules applied to every snapshot before dispatch.
    pub mapping: Vec<MappingRule>,
    pub sinks: SinksConfig,
}

impl VantageConfig {
    /// Load configuration from a TOML file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: VantageConfig = toml::from_str(&content)?;
        info!("Configuration loaded from {}", path.display());
        Ok(config)
    }

    /// Load configuration, falling back to defaults if the file does not
    /// exist or cannot be parsed.
    pub fn load_or_default(path: &Path) -> Self {
        match Self::load(path) {
            Ok(config) => config,
            Err(e) => {
                warn!(
                    "Failed to load config from {}: {}. Using defaults.",
                    path.display(),
                    e
                );
                Self::default()
            }
        }
    }

    /// Save the current configuration to a TOML file.
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content =
            toml::to_string_pretty(self).map_err(|e| VantageError::Config(e.to_string()))?;
        std::fs::write(path, content)?;
        info!("Configuration saved to {}", path.display());
        Ok(())
    }
}

/// General application settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// Master switch for activity reporting.
    pub enabled: bool,
    /// Fixed dispatch interval in seconds.
    pub interval_secs: u64,
    /// Data directory for the history database.
    pub data_dir: String,
    /// Log level: trace, debug, info, warn, error.
    pub log_level: String,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            interval_secs: 60,
            data_dir: "~/.vantage/data".to_string(),
            log_level: "info".to_string(),
        }
    }
}

/// Frontmost-application tracking settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProcessConfig {
    /// Whether the process field group is populated on triggers.
    pub enabled: bool,
    /// Application display names to ignore (exact match).
    pub ignored_names: Vec<String>,
    /// Application identifiers to ignore (exact match).
    pub ignored_bundle_ids: Vec<String>,
}

impl Default for ProcessConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            ignored_names: vec![],
            ignored_bundle_ids: vec![],
        }
    }
}

/// Media-playback tracking settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MediaConfig {
    /// Whether the media field group is populated on triggers.
    pub enabled: bool,
    /// Player process names to ignore (exact match).
    pub ignored_player_names: Vec<String>,
    /// Player application identifiers to ignore (exact match).
    pub ignored_player_bundle_ids: Vec<String>,
}

impl Default for MediaConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            ignored_player_names: vec![],
            ignored_player_bundle_ids: vec![],
        }
    }
}

/// Per-sink configuration blobs.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SinksConfig {
    pub blog: BlogSinkConfig,
    pub object_store: ObjectStoreSinkConfig,
    pub webhook: WebhookSinkConfig,
    pub presence: PresenceSinkConfig,
    pub console: ConsoleSinkConfig,
}

/// Personal-blog API sink settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct BlogSinkConfig {
    pub enabled: bool,
    pub endpoint: String,
    pub token: String,
}

/// Object-storage sink settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ObjectStoreSinkConfig {
    pub enabled: bool,
    pub bucket: String,
    pub prefix: String,
}

/// Team-chat webhook sink settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct WebhookSinkConfig {
    pub enabled: bool,
    pub url: String,
}

/// Game-presence sink settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PresenceSinkConfig {
    pub enabled: bool,
    pub application_id: String,
}

/// Local logging sink settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ConsoleSinkConfig {
    pub enabled: bool,
}

impl Default for ConsoleSinkConfig {
    fn default() -> Self {
        Self { enabled: true }
    }
}

/// Shared, mutable view of the configuration with change notification.
///
/// Components read a point-in-time clone via [`ConfigStore::get`]; writers
/// go through [`ConfigStore::update`], which persists to disk and publishes
/// a `ConfigUpdated` event so observers (sink-registry reconciliation, the
/// monitor) can react.
pub struct ConfigStore {
    path: PathBuf,
    data: RwLock<VantageConfig>,
    events: EventBus,
}

impl ConfigStore {
    /// Open the store, loading the file at `path` or falling back to
    /// defaults.
    pub fn open(path: PathBuf, events: EventBus) -> Self {
        let data = VantageConfig::load_or_default(&path);
        Self {
            path,
            data: RwLock::new(data),
            events,
        }
    }

    /// Build a store around an already-constructed configuration. Used by
    /// tests and by shells that manage the file themselves.
    pub fn with_config(path: PathBuf, config: VantageConfig, events: EventBus) -> Self {
        Self {
            path,
            data: RwLock::new(config),
            events,
        }
    }

    /// A point-in-time clone of the current configuration.
    pub fn get(&self) -> VantageConfig {
        self.data
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    /// Mutate the configuration, persist it, and notify subscribers.
    ///
    /// `changed_sections` names the sections the caller touched; it is
    /// carried on the `ConfigUpdated` event for observers that only care
    /// about part of the configuration.
    pub fn update<F>(&self, changed_sections: &[&str], mutate: F) -> Result<()>
    where
        F: FnOnce(&mut VantageConfig),
    {
        let snapshot = {
            let mut guard = self
                .data
                .write()
                .unwrap_or_else(|poisoned| poisoned.into_inner());
            mutate(&mut guard);
            guard.clone()
        };

        snapshot.save(&self.path)?;
        self.events.publish(DomainEvent::ConfigUpdated {
            changed_sections: changed_sections.iter().map(|s| s.to_string()).collect(),
            timestamp: Utc::now(),
        });
        Ok(())
    }
}

impl std::fmt::Debug for ConfigStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConfigStore")
            .field("path", &self.path)
            .finish()
    }
}
