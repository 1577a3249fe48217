//! Durable record of dispatched snapshots.
//!
//! Records are immutable once saved; the only write paths are a single
//! insert per dispatch and a user-initiated full purge. Reads are paginated
//! and optionally filtered by a case-insensitive substring over process
//! name, media title, and media artist.

use std::sync::Arc;

use chrono::{TimeZone, Utc};
use tracing::warn;
use uuid::Uuid;

use vantage_core::error::VantageError;
use vantage_core::events::{DomainEvent, EventBus};
use vantage_core::types::{MediaInfo, ProcessInfo, Snapshot};

use crate::db::Database;

/// Parameters for one page of history.
#[derive(Clone, Debug)]
pub struct HistoryQuery {
    /// Case-insensitive substring over process name, media title, artist.
    pub search: Option<String>,
    pub offset: u64,
    pub limit: u64,
    /// Oldest-first when true; newest-first (the default) otherwise.
    pub ascending: bool,
}

impl Default for HistoryQuery {
    fn default() -> Self {
        Self {
            search: None,
            offset: 0,
            limit: 50,
            ascending: false,
        }
    }
}

/// SQLite-backed history of dispatched snapshots.
pub struct HistoryStore {
    db: Arc<Database>,
    events: EventBus,
}

impl HistoryStore {
    pub fn new(db: Arc<Database>, events: EventBus) -> Self {
        Self { db, events }
    }

    /// Insert a snapshot with its accepted-sink set as a new record.
    ///
    /// Called exactly once per dispatch. Emits `HistorySaved` on success.
    pub fn save(&self, snapshot: &Snapshot) -> Result<(), VantageError> {
        let accepted = serde_json::to_string(&snapshot.accepted_sinks)?;

        self.db.with_conn(|conn| {
            conn.execute(
                "INSERT INTO snapshots (
                    id, created_at,
                    process_name, window_title, process_bundle_id,
                    media_title, media_artist, media_album,
                    media_player_name, media_player_bundle_id,
                    media_duration_secs, media_elapsed_secs, artwork,
                    accepted_sinks
                 ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14)",
                rusqlite::params![
                    snapshot.id.to_string(),
                    snapshot.created_at.timestamp_millis(),
                    snapshot.process.as_ref().map(|p| p.name.as_str()),
                    snapshot.process.as_ref().and_then(|p| p.window_title.as_deref()),
                    snapshot.process.as_ref().and_then(|p| p.bundle_id.as_deref()),
                    snapshot.media.as_ref().map(|m| m.title.as_str()),
                    snapshot.media.as_ref().and_then(|m| m.artist.as_deref()),
                    snapshot.media.as_ref().and_then(|m| m.album.as_deref()),
                    snapshot.media.as_ref().map(|m| m.player_name.as_str()),
                    snapshot.media.as_ref().and_then(|m| m.player_bundle_id.as_deref()),
                    snapshot.media.as_ref().map(|m| m.duration_secs),
                    snapshot.media.as_ref().map(|m| m.elapsed_secs),
                    snapshot.media.as_ref().and_then(|m| m.artwork.as_deref()),
                    accepted,
                ],
            )
            .map_err(|e| VantageError::Storage(format!("Failed to save snapshot: {}", e)))?;
            Ok(())
        })?;

        self.events.publish(DomainEvent::HistorySaved {
            snapshot_id: snapshot.id,
            timestamp: Utc::now(),
        });
        Ok(())
    }

    /// Fetch one page of records ordered by timestamp with a stable
    /// insertion-order tiebreak.
    pub fn fetch(&self, query: &HistoryQuery) -> Result<Vec<Snapshot>, VantageError> {
        let direction = if query.ascending { "ASC" } else { "DESC" };
        let order = format!("ORDER BY created_at {direction}, rowid {direction}");

        const COLUMNS: &str = "id, created_at,
            process_name, window_title, process_bundle_id,
            media_title, media_artist, media_album,
            media_player_name, media_player_bundle_id,
            media_duration_secs, media_elapsed_secs, artwork,
            accepted_sinks";

        self.db.with_conn(|conn| {
            let mut results = Vec::new();

            if let Some(term) = query.search.as_deref().filter(|t| !t.is_empty()) {
                let pattern = format!("%{}%", term);
                let sql = format!(
                    "SELECT {COLUMNS} FROM snapshots
                     WHERE process_name LIKE ?1
                        OR media_title LIKE ?1
                        OR media_artist LIKE ?1
                     {order} LIMIT ?2 OFFSET ?3"
                );
                let mut stmt = stmt_for(conn, &sql)?;
                let rows = stmt
                    .query_map(
                        rusqlite::params![pattern, query.limit, query.offset],
                        row_to_snapshot,
                    )
                    .map_err(|e| VantageError::Storage(format!("History query failed: {}", e)))?;
                for row in rows {
                    results.push(row.map_err(|e| VantageError::Storage(e.to_string()))??);
                }
            } else {
                let sql = format!("SELECT {COLUMNS} FROM snapshots {order} LIMIT ?1 OFFSET ?2");
                let mut stmt = stmt_for(conn, &sql)?;
                let rows = stmt
                    .query_map(
                        rusqlite::params![query.limit, query.offset],
                        row_to_snapshot,
                    )
                    .map_err(|e| VantageError::Storage(format!("History query failed: {}", e)))?;
                for row in rows {
                    results.push(row.map_err(|e| VantageError::Storage(e.to_string()))??);
                }
            }

            Ok(results)
        })
    }

    /// Lenient read surface for the history view: a failed fetch is logged
    /// and comes back as an empty page instead of propagating.
    pub fn page(&self, query: &HistoryQuery) -> Vec<Snapshot> {
        match self.fetch(query) {
            Ok(records) => records,
            Err(e) => {
                warn!(error = %e, "history fetch failed, returning empty page");
                Vec::new()
            }
        }
    }

    /// Purge all historical records. Emits `HistoryCleared`.
    pub fn delete_all(&self) -> Result<u64, VantageError> {
        let deleted = self.db.with_conn(|conn| {
            conn.execute("DELETE FROM snapshots", [])
                .map_err(|e| VantageError::Storage(format!("Failed to clear history: {}", e)))
                .map(|n| n as u64)
        })?;

        self.events.publish(DomainEvent::HistoryCleared {
            records_deleted: deleted,
            timestamp: Utc::now(),
        });
        Ok(deleted)
    }

    /// Total number of stored records.
    pub fn count(&self) -> Result<u64, VantageError> {
        self.db.with_conn(|conn| {
            let count: i64 = conn
                .query_row("SELECT COUNT(*) FROM snapshots", [], |row| row.get(0))
                .map_err(|e| VantageError::Storage(e.to_string()))?;
            Ok(count as u64)
        })
    }
}

impl std::fmt::Debug for HistoryStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HistoryStore").finish()
    }
}

fn stmt_for<'conn>(
    conn: &'conn rusqlite::Connection,
    sql: &str,
) -> Result<rusqlite::Statement<'conn>, VantageError> {
    conn.prepare(sql)
        .map_err(|e| VantageError::Storage(format!("History query prepare failed: {}", e)))
}

type SnapshotRow = Result<Snapshot, VantageError>;

fn row_to_snapshot(row: &rusqlite::Row<'_>) -> rusqlite::Result<SnapshotRow> {
    let id_str: String = row.get(0)?;
    let created_at_ms: i64 = row.get(1)?;
    let process_name: Option<String> = row.get(2)?;
    let window_title: Option<String> = row.get(3)?;
    let process_bundle_id: Option<String> = row.get(4)?;
    let media_title: Option<String> = row.get(5)?;
    let media_artist: Option<String> = row.get(6)?;
    let media_album: Option<String> = row.get(7)?;
    let media_player_name: Option<String> = row.get(8)?;
    let media_player_bundle_id: Option<String> = row.get(9)?;
    let media_duration_secs: Option<f64> = row.get(10)?;
    let media_elapsed_secs: Option<f64> = row.get(11)?;
    let artwork: Option<Vec<u8>> = row.get(12)?;
    let accepted_json: String = row.get(13)?;

    Ok(build_snapshot(
        id_str,
        created_at_ms,
        process_name,
        window_title,
        process_bundle_id,
        media_title,
        media_artist,
        media_album,
        media_player_name,
        media_player_bundle_id,
        media_duration_secs,
        media_elapsed_secs,
        artwork,
        accepted_json,
    ))
}

#[allow(clippy::too_many_arguments)]
fn build_snapshot(
    id_str: String,
    created_at_ms: i64,
    process_name: Option<String>,
    window_title: Option<String>,
    process_bundle_id: Option<String>,
    media_title: Option<String>,
    media_artist: Option<String>,
    media_album: Option<String>,
    media_player_name: Option<String>,
    media_player_bundle_id: Option<String>,
    media_duration_secs: Option<f64>,
    media_elapsed_secs: Option<f64>,
    artwork: Option<Vec<u8>>,
    accepted_json: String,
) -> SnapshotRow {
    let id = Uuid::parse_str(&id_str)
        .map_err(|e| VantageError::Storage(format!("Invalid snapshot id: {}", e)))?;

    let process = process_name.map(|name| ProcessInfo {
        name,
        window_title,
        bundle_id: process_bundle_id,
        icon: None,
    });

    let media = media_title.map(|title| MediaInfo {
        title,
        artist: media_artist,
        album: media_album,
        player_name: media_player_name.unwrap_or_default(),
        player_bundle_id: media_player_bundle_id,
        duration_secs: media_duration_secs.unwrap_or(0.0),
        elapsed_secs: media_elapsed_secs.unwrap_or(0.0),
        artwork,
    });

    let accepted_sinks: Vec<String> = serde_json::from_str(&accepted_json)
        .map_err(|e| VantageError::Storage(format!("Invalid accepted-sink set: {}", e)))?;

    Ok(Snapshot {
        id,
        created_at: Utc
            .timestamp_millis_opt(created_at_ms)
            .single()
            .unwrap_or_default(),
        process,
        media,
        accepted_sinks,
    })
}
