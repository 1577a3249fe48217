//! The scheduling/trigger layer.
//!
//! Decides when a snapshot is produced: on a focus-change event, on a
//! media-change event, or on a fixed-interval tick. Assembles the snapshot
//! from currently-known detection state (honoring per-type enable flags and
//! filter lists), applies the mapping rules, and hands it to the
//! dispatcher.

use std::sync::{Arc, Mutex as StdMutex};

use chrono::Utc;
use tokio::sync::{mpsc, Mutex, Notify};
use tokio::task::JoinHandle;
use tokio::time::{Duration, Instant, MissedTickBehavior};
use tracing::{debug, info, trace, warn};

use vantage_core::config::{ConfigStore, MediaConfig, ProcessConfig, VantageConfig};
use vantage_core::error::{Result, VantageError};
use vantage_core::events::{DomainEvent, EventBus};
use vantage_core::mapping::apply_rules;
use vantage_core::types::{MediaInfo, ProcessInfo, Snapshot};
use vantage_dispatch::Dispatcher;

use crate::provider::{FocusProvider, FocusSample, MediaProvider, MediaSample, TriggerEvent};

/// Triggers arriving this soon after (re-)enabling are suppressed so a
/// dispatch cannot fire before configuration has finished loading.
const STARTUP_GRACE: Duration = Duration::from_secs(2);

/// Capacity of the provider trigger channel.
const TRIGGER_BUFFER: usize = 16;

/// Where the monitor currently is in its lifecycle.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MonitorStatus {
    /// No monitoring active.
    Disabled,
    /// Monitoring active, waiting for the next trigger.
    Idle,
    /// A snapshot is currently being built and sent.
    Dispatching,
}

/// Event-driven trigger layer over the dispatcher.
///
/// Generic over the two detection collaborators so tests substitute mocks.
pub struct Monitor<F, M> {
    inner: Arc<MonitorInner<F, M>>,
    handle: Mutex<Option<JoinHandle<()>>>,
}

struct MonitorInner<F, M> {
    config: Arc<ConfigStore>,
    dispatcher: Arc<Dispatcher>,
    focus: Arc<F>,
    media: Arc<M>,
    events: EventBus,
    status: StdMutex<MonitorStatus>,
    shutdown: Notify,
    enabled_at: StdMutex<Option<Instant>>,
}

impl<F, M> Monitor<F, M>
where
    F: FocusProvider + 'static,
    M: MediaProvider + 'static,
{
    pub fn new(
        config: Arc<ConfigStore>,
        dispatcher: Arc<Dispatcher>,
        focus: Arc<F>,
        media: Arc<M>,
        events: EventBus,
    ) -> Self {
        Self {
            inner: Arc::new(MonitorInner {
                config,
                dispatcher,
                focus,
                media,
                events,
                status: StdMutex::new(MonitorStatus::Disabled),
                shutdown: Notify::new(),
                enabled_at: StdMutex::new(None),
            }),
            handle: Mutex::new(None),
        }
    }

    pub fn status(&self) -> MonitorStatus {
        self.inner.status()
    }

    /// Start monitoring. Returns the sender the detection collaborators
    /// push their change events into.
    pub async fn enable(&self) -> Result<mpsc::Sender<TriggerEvent>> {
        let mut handle = self.handle.lock().await;
        if handle.is_some() {
            return Err(VantageError::Monitor("reporting already enabled".into()));
        }

        let (tx, rx) = mpsc::channel(TRIGGER_BUFFER);
        self.inner.set_status(MonitorStatus::Idle);
        *self
            .inner
            .enabled_at
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner()) = Some(Instant::now());

        *handle = Some(tokio::spawn(Arc::clone(&self.inner).run(rx)));

        self.inner.events.publish(DomainEvent::ReportingEnabled {
            timestamp: Utc::now(),
        });
        info!("activity reporting enabled");
        Ok(tx)
    }

    /// Stop monitoring. Tears down the trigger sources immediately; a
    /// dispatch that already started runs to completion before the loop
    /// exits.
    pub async fn disable(&self) -> Result<()> {
        let mut handle = self.handle.lock().await;
        let Some(task) = handle.take() else {
            return Ok(());
        };

        self.inner.shutdown.notify_one();
        task.await
            .map_err(|e| VantageError::Monitor(format!("monitor loop failed to join: {e}")))?;

        self.inner.set_status(MonitorStatus::Disabled);
        self.inner.events.publish(DomainEvent::ReportingDisabled {
            timestamp: Utc::now(),
        });
        info!("activity reporting disabled");
        Ok(())
    }
}

impl<F, M> MonitorInner<F, M>
where
    F: FocusProvider + 'static,
    M: MediaProvider + 'static,
{
    async fn run(self: Arc<Self>, mut triggers: mpsc::Receiver<TriggerEvent>) {
        let interval_secs = self.config.get().general.interval_secs.max(1);
        let mut ticker = tokio::time::interval(Duration::from_secs(interval_secs));
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = ticker.tick() => self.on_trigger(TriggerEvent::Interval).await,
                event = triggers.recv() => match event {
                    Some(event) => self.on_trigger(event).await,
                    // Every provider handle is gone; treat it as teardown.
                    None => break,
                },
                _ = self.shutdown.notified() => break,
            }
        }

        debug!("monitor loop stopped");
    }

    async fn on_trigger(&self, trigger: TriggerEvent) {
        if self.in_grace_period() {
            trace!(?trigger, "trigger suppressed during startup grace");
            return;
        }

        self.set_status(MonitorStatus::Dispatching);

        let config = self.config.get();
        let snapshot = self.build_snapshot(&config).await;
        let report = self.dispatcher.send(snapshot).await;

        debug!(
            ?trigger,
            status = ?report.status,
            accepted = report.accepted.len(),
            failed = report.failed.len(),
            "trigger dispatched"
        );

        self.set_status(MonitorStatus::Idle);
    }

    /// Assemble a snapshot from the providers' current state.
    ///
    /// Each field group is gated by its own enable flag and filter list; a
    /// filtered group contributes nothing while the other may still
    /// populate. Provider failures are logged and treated as "nothing
    /// detected". Mapping rules are applied before the snapshot leaves
    /// this layer.
    async fn build_snapshot(&self, config: &VantageConfig) -> Snapshot {
        let mut process = None;
        if config.process.enabled {
            match self.focus.current_focus().await {
                Ok(Some(sample)) => {
                    if process_filtered(&config.process, &sample) {
                        trace!(app = %sample.app_name, "focused app filtered out");
                    } else {
                        process = Some(process_info(sample));
                    }
                }
                Ok(None) => {}
                Err(e) => warn!(error = %e, "focus provider failed"),
            }
        }

        let mut media = None;
        if config.media.enabled {
            match self.media.now_playing().await {
                Ok(Some(sample)) if sample.playing => {
                    if media_filtered(&config.media, &sample) {
                        trace!(player = %sample.player_name, "media player filtered out");
                    } else {
                        media = Some(media_info(sample));
                    }
                }
                Ok(_) => {}
                Err(e) => warn!(error = %e, "media provider failed"),
            }
        }

        let mut snapshot = Snapshot::new(process, media);
        apply_rules(&config.mapping, &mut snapshot);
        snapshot
    }

    fn in_grace_period(&self) -> bool {
        self.enabled_at
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .map(|at| at.elapsed() < STARTUP_GRACE)
            .unwrap_or(false)
    }

    fn status(&self) -> MonitorStatus {
        *self
            .status
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn set_status(&self, status: MonitorStatus) {
        *self
            .status
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner()) = status;
    }
}

fn process_filtered(config: &ProcessConfig, sample: &FocusSample) -> bool {
    config.ignored_names.iter().any(|n| n == &sample.app_name)
        || sample
            .bundle_id
            .as_deref()
            .is_some_and(|id| config.ignored_bundle_ids.iter().any(|i| i == id))
}

fn media_filtered(config: &MediaConfig, sample: &MediaSample) -> bool {
    config
        .ignored_player_names
        .iter()
        .any(|n| n == &sample.player_name)
        || sample
            .player_bundle_id
            .as_deref()
            .is_some_and(|id| config.ignored_player_bundle_ids.iter().any(|i| i == id))
}

fn process_info(sample: FocusSample) -> ProcessInfo {
    ProcessInfo {
        name: sample.app_name,
        window_title: sample.window_title,
        bundle_id: sample.bundle_id,
        icon: sample.icon,
    }
}

fn media_info(sample: MediaSample) -> MediaInfo {
    MediaInfo {
        title: sample.title,
        artist: sample.artist,
        album: sample.album,
        player_name: sample.player_name,
        player_bundle_id: sample.player_bundle_id,
        duration_secs: sample.duration_secs,
        elapsed_secs: sample.elapsed_secs,
        artwork: sample.artwork,
    }
}
