use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// =============================================================================
// Activity snapshot
// =============================================================================

/// Identity of the frontmost application at capture time.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ProcessInfo {
    /// Display name of the application (e.g. "Xcode").
    pub name: String,
    /// Title of the focused window, when the window reports one.
    pub window_title: Option<String>,
    /// Application identifier (reverse-DNS bundle id on macOS).
    pub bundle_id: Option<String>,
    /// Raw icon bytes for the application, when the focus provider supplies
    /// them. Not persisted to history; consumed by sinks that upload icons.
    #[serde(skip)]
    pub icon: Option<Vec<u8>>,
}

/// Currently-playing media at capture time.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct MediaInfo {
    /// Track title.
    pub title: String,
    pub artist: Option<String>,
    pub album: Option<String>,
    /// Process name of the player application.
    pub player_name: String,
    /// Application identifier of the player.
    pub player_bundle_id: Option<String>,
    /// Total track length in seconds.
    pub duration_secs: f64,
    /// Playback position in seconds at capture time.
    pub elapsed_secs: f64,
    /// Raw cover-art bytes, when the player exposes them.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub artwork: Option<Vec<u8>>,
}

/// One reportable activity moment.
///
/// Built by the monitor from currently-known detection state, rewritten by
/// the mapping engine, annotated with the accepted-sink set by the
/// dispatcher, and finally handed to the history store for a single insert.
///
/// Either field group (or both, or neither) may be populated; the model does
/// not enforce a minimum. The accepted-sink set is written exactly once at
/// dispatch time and is never retroactively edited.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    pub id: Uuid,
    pub created_at: DateTime<Utc>,
    pub process: Option<ProcessInfo>,
    pub media: Option<MediaInfo>,
    /// Names of the sinks that accepted this snapshot. Empty until dispatch.
    pub accepted_sinks: Vec<String>,
}

impl Snapshot {
    /// Create a snapshot from detection state, stamped with a fresh id and
    /// the current time.
    pub fn new(process: Option<ProcessInfo>, media: Option<MediaInfo>) -> Self {
        Self {
            id: Uuid::new_v4(),
            created_at: Utc::now(),
            process,
            media,
            accepted_sinks: Vec::new(),
        }
    }

    /// A snapshot with no populated field groups. Produced when every
    /// detection source is filtered out; still dispatched (sinks decide
    /// whether an empty snapshot is meaningful to them).
    pub fn empty() -> Self {
        Self::new(None, None)
    }

    /// True when neither field group is populated.
    pub fn is_empty(&self) -> bool {
        self.process.is_none() && self.media.is_none()
    }

    /// Record the set of sinks that accepted this snapshot.
    ///
    /// Names are sorted so the persisted set is deterministic regardless of
    /// fan-out completion order.
    pub fn mark_accepted(&mut self, names: impl IntoIterator<Item = String>) {
        let mut names: Vec<String> = names.into_iter().collect();
        names.sort();
        self.accepted_sinks = names;
    }

    /// Flat, serializable view of this record ("copy as structured record").
    pub fn export(&self) -> SnapshotExport {
        SnapshotExport {
            id: self.id,
            timestamp: self.created_at,
            process_name: self.process.as_ref().map(|p| p.name.clone()),
            window_title: self
                .process
                .as_ref()
                .and_then(|p| p.window_title.clone()),
            media_title: self.media.as_ref().map(|m| m.title.clone()),
            media_artist: self.media.as_ref().and_then(|m| m.artist.clone()),
            media_duration_secs: self.media.as_ref().map(|m| m.duration_secs),
            media_elapsed_secs: self.media.as_ref().map(|m| m.elapsed_secs),
            accepted_sinks: self.accepted_sinks.clone(),
        }
    }
}

/// The external shape of one history record.
///
/// This field set is part of the de facto export format; changing it breaks
/// compatibility with previously exported data.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SnapshotExport {
    pub id: Uuid,
    pub timestamp: DateTime<Utc>,
    pub process_name: Option<String>,
    pub window_title: Option<String>,
    pub media_title: Option<String>,
    pub media_artist: Option<String>,
    pub media_duration_secs: Option<f64>,
    pub media_elapsed_secs: Option<f64>,
    pub accepted_sinks: Vec<String>,
}

// =============================================================================
// Sink outcomes
// =============================================================================

/// Reason a sink declined a snapshot without that counting as a failure.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    /// The sink is disabled in configuration.
    Disabled,
    /// The snapshot carries nothing this sink reports on.
    NotApplicable,
    /// The remote side is throttling; trying now would be counterproductive.
    RateLimited,
}

/// A sink attempt that counts against the dispatch.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SinkFailure {
    /// Transport or connectivity error.
    Network(String),
    /// The sink's own local persistence failed (cache, staging file).
    Persistence(String),
    /// Anything that does not fit the other buckets, including panics.
    Other(String),
}

/// Result of one sink's attempt to handle one snapshot.
///
/// Sinks never raise across the dispatch boundary; every failure mode is
/// captured here as data and aggregated by the dispatcher.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SinkOutcome {
    Delivered,
    Skipped(SkipReason),
    Failed(SinkFailure),
}

impl SinkOutcome {
    pub fn is_delivered(&self) -> bool {
        matches!(self, SinkOutcome::Delivered)
    }

    /// Soft outcome: excluded from both the accepted and the failed set.
    pub fn is_skipped(&self) -> bool {
        matches!(self, SinkOutcome::Skipped(_))
    }

    /// Hard outcome: counts toward the failed set.
    pub fn is_failed(&self) -> bool {
        matches!(self, SinkOutcome::Failed(_))
    }
}

/// Aggregate health of one fan-out, driving the status indicator in the
/// shell UI.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DispatchStatus {
    /// No sink hard-failed.
    Success,
    /// Some sinks delivered, some hard-failed.
    Partial,
    /// At least one sink hard-failed and none delivered.
    AllFailed,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_snapshot() -> Snapshot {
        Snapshot::new(
            Some(ProcessInfo {
                name: "Xcode".to_string(),
                window_title: Some("main.rs".to_string()),
                bundle_id: Some("com.apple.dt.Xcode".to_string()),
                icon: None,
            }),
            Some(MediaInfo {
                title: "Song A".to_string(),
                artist: Some("Artist X".to_string()),
                album: None,
                player_name: "Music".to_string(),
                player_bundle_id: Some("com.apple.Music".to_string()),
                duration_secs: 240.0,
                elapsed_secs: 31.5,
                artwork: None,
            }),
        )
    }

    #[test]
    fn test_new_snapshot_has_empty_accepted_set() {
        let snapshot = sample_snapshot();
        assert!(snapshot.accepted_sinks.is_empty());
        assert!(!snapshot.is_empty());
    }

    #[test]
    fn test_empty_snapshot() {
        let snapshot = Snapshot::empty();
        assert!(snapshot.is_empty());
        assert!(snapshot.process.is_none());
        assert!(snapshot.media.is_none());
    }

    #[test]
    fn test_snapshot_ids_are_unique() {
        assert_ne!(Snapshot::empty().id, Snapshot::empty().id);
    }

    #[test]
    fn test_mark_accepted_sorts_names() {
        let mut snapshot = sample_snapshot();
        snapshot.mark_accepted(["webhook".to_string(), "blog".to_string()]);
        assert_eq!(snapshot.accepted_sinks, vec!["blog", "webhook"]);
    }

    #[test]
    fn test_export_field_set() {
        let mut snapshot = sample_snapshot();
        snapshot.mark_accepted(["blog".to_string()]);
        let export = snapshot.export();

        assert_eq!(export.id, snapshot.id);
        assert_eq!(export.process_name.as_deref(), Some("Xcode"));
        assert_eq!(export.window_title.as_deref(), Some("main.rs"));
        assert_eq!(export.media_title.as_deref(), Some("Song A"));
        assert_eq!(export.media_artist.as_deref(), Some("Artist X"));
        assert_eq!(export.media_duration_secs, Some(240.0));
        assert_eq!(export.media_elapsed_secs, Some(31.5));
        assert_eq!(export.accepted_sinks, vec!["blog"]);

        let json = serde_json::to_string(&export).unwrap();
        assert!(json.contains("Song A"));
    }

    #[test]
    fn test_export_of_empty_snapshot() {
        let export = Snapshot::empty().export();
        assert!(export.process_name.is_none());
        assert!(export.media_title.is_none());
        assert!(export.accepted_sinks.is_empty());
    }

    #[test]
    fn test_outcome_classification() {
        assert!(SinkOutcome::Delivered.is_delivered());
        assert!(SinkOutcome::Skipped(SkipReason::Disabled).is_skipped());
        assert!(SinkOutcome::Skipped(SkipReason::RateLimited).is_skipped());
        assert!(SinkOutcome::Failed(SinkFailure::Network("timeout".into())).is_failed());
        assert!(!SinkOutcome::Skipped(SkipReason::NotApplicable).is_failed());
    }

    #[test]
    fn test_outcome_serde_round_trip() {
        let outcomes = vec![
            SinkOutcome::Delivered,
            SinkOutcome::Skipped(SkipReason::RateLimited),
            SinkOutcome::Failed(SinkFailure::Persistence("disk full".into())),
        ];
        for outcome in &outcomes {
            let json = serde_json::to_string(outcome).unwrap();
            let back: SinkOutcome = serde_json::from_str(&json).unwrap();
            assert_eq!(*outcome, back);
        }
    }

    #[test]
    fn test_icon_bytes_not_serialized() {
        let mut snapshot = sample_snapshot();
        if let Some(process) = snapshot.process.as_mut() {
            process.icon = Some(vec![1, 2, 3]);
        }
        let json = serde_json::to_string(&snapshot).unwrap();
        assert!(!json.contains("icon"));
    }
}
