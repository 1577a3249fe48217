//! Vantage binary - composition root.
//!
//! Ties the library crates together into a headless executable:
//! 1. Load configuration from TOML
//! 2. Open storage (SQLite history + icon cache)
//! 3. Build the sink registry and reconcile it against configuration
//! 4. Start the monitor (interval ticks + provider trigger channel)
//! 5. Re-reconcile sinks whenever the configuration changes
//!
//! The detection collaborators wired here are the mock providers; a
//! platform shell swaps in implementations backed by the OS window and
//! media frameworks and pushes change events into the trigger channel.

mod cli;
mod transports;

use std::sync::Arc;

use clap::Parser;
use tokio::sync::broadcast::error::RecvError;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use vantage_core::config::ConfigStore;
use vantage_core::events::{DomainEvent, EventBus};
use vantage_dispatch::{
    BlogApi, BlogSink, ConsoleSink, Dispatcher, ObjectStore, ObjectStoreSink, PresenceClient,
    PresenceSink, Sink, SinkRegistry, WebhookPoster, WebhookSink,
};
use vantage_monitor::{MockFocusProvider, MockMediaProvider, Monitor};
use vantage_storage::{Database, HistoryStore, IconStore};

use cli::CliArgs;
use transports::{LogBlogApi, LogObjectStore, LogPresenceClient, LogWebhookPoster};

#[tokio::main]
async fn main() {
    let args = CliArgs::parse();

    let bus = EventBus::new();
    let config_path = args.resolve_config_path();
    let config_store = Arc::new(ConfigStore::open(config_path, bus.clone()));
    let config = config_store.get();

    let log_level = args.resolve_log_level(&config.general.log_level);
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level)),
        )
        .init();

    info!("Vantage starting up");

    let data_dir = args.resolve_data_dir(&config.general.data_dir);
    let database = match Database::new(&data_dir.join("vantage.sqlite3")) {
        Ok(db) => Arc::new(db),
        Err(e) => {
            error!(error = %e, "failed to open history database");
            std::process::exit(1);
        }
    };
    let history = Arc::new(HistoryStore::new(Arc::clone(&database), bus.clone()));
    let icons = Arc::new(IconStore::new(Arc::clone(&database)));

    // Every known sink implementation, behind stand-in transports. The
    // registry only ever holds the enabled subset.
    let candidates: Vec<Arc<dyn Sink>> = vec![
        Arc::new(ConsoleSink::new(Arc::clone(&config_store))),
        Arc::new(BlogSink::new(
            Arc::new(LogBlogApi) as Arc<dyn BlogApi>,
            Arc::clone(&config_store),
        )),
        Arc::new(ObjectStoreSink::new(
            Arc::new(LogObjectStore) as Arc<dyn ObjectStore>,
            Arc::clone(&icons),
            Arc::clone(&config_store),
        )),
        Arc::new(WebhookSink::new(
            Arc::new(LogWebhookPoster) as Arc<dyn WebhookPoster>,
            Arc::clone(&config_store),
        )),
        Arc::new(PresenceSink::new(
            Arc::new(LogPresenceClient) as Arc<dyn PresenceClient>,
            Arc::clone(&config_store),
        )),
    ];

    let registry = Arc::new(SinkRegistry::new(bus.clone()));
    registry.reconcile(&candidates, &config);
    info!(sinks = registry.len(), "sink registry reconciled");

    // Keep the registry in line with configuration for the rest of the run.
    {
        let registry = Arc::clone(&registry);
        let config_store = Arc::clone(&config_store);
        let mut events = bus.subscribe();
        tokio::spawn(async move {
            loop {
                match events.recv().await {
                    Ok(DomainEvent::ConfigUpdated { .. }) => {
                        registry.reconcile(&candidates, &config_store.get());
                        info!(sinks = registry.len(), "sink registry reconciled");
                    }
                    Ok(_) => {}
                    // Missing a few events is fine; reconciliation is
                    // idempotent and the next change catches up.
                    Err(RecvError::Lagged(_)) => continue,
                    Err(RecvError::Closed) => break,
                }
            }
        });
    }

    let dispatcher = Arc::new(Dispatcher::new(
        Arc::clone(&registry),
        Arc::clone(&history),
        bus.clone(),
    ));

    let monitor = Arc::new(Monitor::new(
        Arc::clone(&config_store),
        dispatcher,
        Arc::new(MockFocusProvider::new()),
        Arc::new(MockMediaProvider::new()),
        bus.clone(),
    ));

    // The trigger sender stays alive for the platform shell's detection
    // callbacks; interval ticks drive dispatches meanwhile.
    let _triggers = if config.general.enabled {
        match monitor.enable().await {
            Ok(tx) => Some(tx),
            Err(e) => {
                error!(error = %e, "failed to enable reporting");
                None
            }
        }
    } else {
        info!("reporting disabled in configuration; waiting for shutdown");
        None
    };

    if let Err(e) = tokio::signal::ctrl_c().await {
        error!(error = %e, "failed to listen for shutdown signal");
    }

    info!("shutting down");
    if let Err(e) = monitor.disable().await {
        error!(error = %e, "monitor teardown failed");
    }
}
