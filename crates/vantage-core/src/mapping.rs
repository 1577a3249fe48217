//! User-defined rewrite rules applied to a snapshot's identifying fields
//! before dispatch.
//!
//! Rules are evaluated in list order. Each rule kind targets one field
//! group; within a kind, the first rule whose source matches the live value
//! wins and the rest are not evaluated. Kinds touching the process group
//! never affect the media group and vice versa.

use serde::{Deserialize, Serialize};

use crate::types::Snapshot;

/// Which identifying field a rule matches against.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MappingKind {
    /// Match the frontmost application's bundle identifier.
    ProcessBundleId,
    /// Match the frontmost application's display name.
    ProcessName,
    /// Match the media player's bundle identifier.
    MediaPlayerBundleId,
    /// Match the media player's process name.
    MediaPlayerName,
}

/// One rewrite instruction: when the field selected by `kind` equals
/// `source`, substitute `target`.
///
/// A rule with an empty source never matches.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MappingRule {
    pub kind: MappingKind,
    pub source: String,
    pub target: String,
}

impl MappingRule {
    pub fn new(kind: MappingKind, source: impl Into<String>, target: impl Into<String>) -> Self {
        Self {
            kind,
            source: source.into(),
            target: target.into(),
        }
    }
}

/// Apply an ordered rule list to a snapshot, rewriting identifying fields
/// in place.
///
/// Matching is performed against the field values as they were before this
/// call, so the four groups are evaluated independently of one another. A
/// bundle-id rewrite also overwrites the denormalized display-name field
/// kept alongside it; an explicit name rule still wins the name field
/// because name rules are applied after bundle-id rules.
///
/// Never fails: an empty rule list or an unpopulated snapshot is a no-op.
pub fn apply_rules(rules: &[MappingRule], snapshot: &mut Snapshot) {
    if rules.is_empty() {
        return;
    }

    if let Some(process) = snapshot.process.as_mut() {
        let original_bundle_id = process.bundle_id.clone();
        let original_name = process.name.clone();

        if let Some(rule) = first_match(
            rules,
            MappingKind::ProcessBundleId,
            original_bundle_id.as_deref(),
        ) {
            process.bundle_id = Some(rule.target.clone());
            process.name = rule.target.clone();
        }
        if let Some(rule) = first_match(rules, MappingKind::ProcessName, Some(original_name.as_str()))
        {
            process.name = rule.target.clone();
        }
    }

    if let Some(media) = snapshot.media.as_mut() {
        let original_bundle_id = media.player_bundle_id.clone();
        let original_name = media.player_name.clone();

        if let Some(rule) = first_match(
            rules,
            MappingKind::MediaPlayerBundleId,
            original_bundle_id.as_deref(),
        ) {
            media.player_bundle_id = Some(rule.target.clone());
            media.player_name = rule.target.clone();
        }
        if let Some(rule) = first_match(rules, MappingKind::MediaPlayerName, Some(original_name.as_str()))
        {
            media.player_name = rule.target.clone();
        }
    }
}

fn first_match<'a>(
    rules: &'a [MappingRule],
    kind: MappingKind,
    live: Option<&str>,
) -> Option<&'a MappingRule> {
    let live = live?;
    rules
        .iter()
        .filter(|rule| rule.kind == kind && !rule.source.is_empty())
        .find(|rule| rule.source == live)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{MediaInfo, ProcessInfo};

    fn snapshot_with(process_name: &str, bundle_id: &str, player_name: &str) -> Snapshot {
        Snapshot::new(
            Some(ProcessInfo {
                name: process_name.to_string(),
                window_title: None,
                bundle_id: Some(bundle_id.to_string()),
                icon: None,
            }),
            Some(MediaInfo {
                title: "Track".to_string(),
                artist: None,
                album: None,
                player_name: player_name.to_string(),
                player_bundle_id: Some("com.apple.Music".to_string()),
                duration_secs: 100.0,
                elapsed_secs: 10.0,
                artwork: None,
            }),
        )
    }

    #[test]
    fn test_empty_rule_list_is_noop() {
        let mut snapshot = snapshot_with("Safari", "com.apple.Safari", "Music");
        let before = snapshot.clone();
        apply_rules(&[], &mut snapshot);
        assert_eq!(snapshot, before);
    }

    #[test]
    fn test_unpopulated_snapshot_is_noop() {
        let rules = vec![MappingRule::new(MappingKind::ProcessName, "Safari", "Browser")];
        let mut snapshot = Snapshot::empty();
        apply_rules(&rules, &mut snapshot);
        assert!(snapshot.is_empty());
    }

    #[test]
    fn test_name_rewrite_exact_target() {
        let rules = vec![MappingRule::new(
            MappingKind::ProcessName,
            "Code - Insiders",
            "VS Code",
        )];
        let mut snapshot = snapshot_with("Code - Insiders", "com.microsoft.VSCodeInsiders", "Music");
        apply_rules(&rules, &mut snapshot);
        assert_eq!(snapshot.process.as_ref().unwrap().name, "VS Code");
    }

    #[test]
    fn test_first_matching_rule_wins() {
        let rules = vec![
            MappingRule::new(MappingKind::ProcessName, "Safari", "First"),
            MappingRule::new(MappingKind::ProcessName, "Safari", "Second"),
        ];
        let mut snapshot = snapshot_with("Safari", "com.apple.Safari", "Music");
        apply_rules(&rules, &mut snapshot);
        assert_eq!(snapshot.process.as_ref().unwrap().name, "First");
    }

    #[test]
    fn test_bundle_id_rewrite_updates_denormalized_name() {
        let rules = vec![MappingRule::new(
            MappingKind::ProcessBundleId,
            "com.apple.dt.Xcode",
            "Xcode (beta)",
        )];
        let mut snapshot = snapshot_with("Xcode", "com.apple.dt.Xcode", "Music");
        apply_rules(&rules, &mut snapshot);
        let process = snapshot.process.as_ref().unwrap();
        assert_eq!(process.bundle_id.as_deref(), Some("Xcode (beta)"));
        assert_eq!(process.name, "Xcode (beta)");
    }

    #[test]
    fn test_explicit_name_rule_wins_name_field() {
        let rules = vec![
            MappingRule::new(MappingKind::ProcessBundleId, "com.apple.dt.Xcode", "IDE"),
            MappingRule::new(MappingKind::ProcessName, "Xcode", "Editor"),
        ];
        let mut snapshot = snapshot_with("Xcode", "com.apple.dt.Xcode", "Music");
        apply_rules(&rules, &mut snapshot);
        let process = snapshot.process.as_ref().unwrap();
        assert_eq!(process.bundle_id.as_deref(), Some("IDE"));
        // Name-kind rules are matched against the pre-apply name and applied
        // after the bundle-id group's denormalized write.
        assert_eq!(process.name, "Editor");
    }

    #[test]
    fn test_groups_are_independent() {
        let rules = vec![
            MappingRule::new(MappingKind::ProcessName, "Music", "ShouldNotTouchPlayer"),
            MappingRule::new(MappingKind::MediaPlayerName, "Music", "Apple Music"),
        ];
        let mut snapshot = snapshot_with("Safari", "com.apple.Safari", "Music");
        apply_rules(&rules, &mut snapshot);
        assert_eq!(snapshot.process.as_ref().unwrap().name, "Safari");
        assert_eq!(snapshot.media.as_ref().unwrap().player_name, "Apple Music");
    }

    #[test]
    fn test_media_player_bundle_id_rewrite() {
        let rules = vec![MappingRule::new(
            MappingKind::MediaPlayerBundleId,
            "com.apple.Music",
            "Music.app",
        )];
        let mut snapshot = snapshot_with("Safari", "com.apple.Safari", "Music");
        apply_rules(&rules, &mut snapshot);
        let media = snapshot.media.as_ref().unwrap();
        assert_eq!(media.player_bundle_id.as_deref(), Some("Music.app"));
        assert_eq!(media.player_name, "Music.app");
    }

    #[test]
    fn test_empty_source_never_matches() {
        let rules = vec![MappingRule::new(MappingKind::ProcessName, "", "Ghost")];
        let mut snapshot = snapshot_with("Safari", "com.apple.Safari", "Music");
        apply_rules(&rules, &mut snapshot);
        assert_eq!(snapshot.process.as_ref().unwrap().name, "Safari");
    }

    #[test]
    fn test_apply_twice_is_idempotent() {
        let rules = vec![
            MappingRule::new(MappingKind::ProcessName, "Safari", "Browser"),
            MappingRule::new(MappingKind::MediaPlayerName, "Music", "Apple Music"),
        ];
        let mut snapshot = snapshot_with("Safari", "com.apple.Safari", "Music");
        apply_rules(&rules, &mut snapshot);
        let once = snapshot.clone();
        apply_rules(&rules, &mut snapshot);
        assert_eq!(snapshot, once);
    }

    #[test]
    fn test_non_matching_rules_leave_snapshot_unchanged() {
        let rules = vec![
            MappingRule::new(MappingKind::ProcessName, "Terminal", "iTerm"),
            MappingRule::new(MappingKind::MediaPlayerBundleId, "com.spotify.client", "Spotify"),
        ];
        let mut snapshot = snapshot_with("Safari", "com.apple.Safari", "Music");
        let before = snapshot.clone();
        apply_rules(&rules, &mut snapshot);
        assert_eq!(snapshot, before);
    }
}
