//! Detection collaborator interfaces.
//!
//! The monitor consumes these; it never implements them. Platform shells
//! supply implementations backed by the OS window and media frameworks,
//! pushing change events into the monitor's trigger channel and answering
//! pull queries for the current state. The mocks let tests (and headless
//! shells) run without any OS integration.

use std::sync::Mutex;

use vantage_core::error::Result;

/// What is focused right now, as reported by the window provider.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct FocusSample {
    pub app_name: String,
    pub window_title: Option<String>,
    pub bundle_id: Option<String>,
    pub icon: Option<Vec<u8>>,
}

/// What is playing right now, as reported by the media provider.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct MediaSample {
    pub title: String,
    pub artist: Option<String>,
    pub album: Option<String>,
    pub player_name: String,
    pub player_bundle_id: Option<String>,
    pub duration_secs: f64,
    pub elapsed_secs: f64,
    pub playing: bool,
    pub artwork: Option<Vec<u8>>,
}

/// Pull interface of the window/focus detection collaborator.
pub trait FocusProvider: Send + Sync {
    /// The currently focused application, or None when nothing is focused
    /// (lock screen, desktop).
    fn current_focus(
        &self,
    ) -> impl std::future::Future<Output = Result<Option<FocusSample>>> + Send;
}

/// Pull interface of the media detection collaborator.
///
/// Implementations may be swapped per OS version but must present this
/// identical shape.
pub trait MediaProvider: Send + Sync {
    /// The current playback state, or None when no player is active.
    fn now_playing(&self) -> impl std::future::Future<Output = Result<Option<MediaSample>>> + Send;
}

/// A change pushed by a detection collaborator, or the fixed-interval tick
/// generated by the monitor itself.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TriggerEvent {
    FocusChanged,
    MediaChanged,
    Interval,
}

/// Focus provider returning a scripted sample.
#[derive(Default)]
pub struct MockFocusProvider {
    sample: Mutex<Option<FocusSample>>,
}

impl MockFocusProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn focused(app_name: &str, bundle_id: &str) -> Self {
        let provider = Self::new();
        provider.set(Some(FocusSample {
            app_name: app_name.to_string(),
            window_title: None,
            bundle_id: Some(bundle_id.to_string()),
            icon: None,
        }));
        provider
    }

    /// Replace the sample returned by future pulls.
    pub fn set(&self, sample: Option<FocusSample>) {
        *self
            .sample
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner()) = sample;
    }
}

impl FocusProvider for MockFocusProvider {
    async fn current_focus(&self) -> Result<Option<FocusSample>> {
        Ok(self
            .sample
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone())
    }
}

/// Media provider returning a scripted sample.
#[derive(Default)]
pub struct MockMediaProvider {
    sample: Mutex<Option<MediaSample>>,
}

impl MockMediaProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn playing(title: &str, artist: &str, player_name: &str) -> Self {
        let provider = Self::new();
        provider.set(Some(MediaSample {
            title: title.to_string(),
            artist: Some(artist.to_string()),
            album: None,
            player_name: player_name.to_string(),
            player_bundle_id: None,
            duration_secs: 0.0,
            elapsed_secs: 0.0,
            playing: true,
            artwork: None,
        }));
        provider
    }

    /// Replace the sample returned by future pulls.
    pub fn set(&self, sample: Option<MediaSample>) {
        *self
            .sample
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner()) = sample;
    }
}

impl MediaProvider for MockMediaProvider {
    async fn now_playing(&self) -> Result<Option<MediaSample>> {
        Ok(self
            .sample
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_mock_focus_provider_round_trip() {
        let provider = MockFocusProvider::focused("Safari", "com.apple.Safari");
        let sample = provider.current_focus().await.unwrap().unwrap();
        assert_eq!(sample.app_name, "Safari");
        assert_eq!(sample.bundle_id.as_deref(), Some("com.apple.Safari"));

        provider.set(None);
        assert!(provider.current_focus().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_mock_media_provider_round_trip() {
        let provider = MockMediaProvider::playing("Song A", "Artist X", "Music");
        let sample = provider.now_playing().await.unwrap().unwrap();
        assert_eq!(sample.title, "Song A");
        assert!(sample.playing);

        provider.set(None);
        assert!(provider.now_playing().await.unwrap().is_none());
    }
}
