//! Database schema migrations.
//!
//! Version 1 creates the snapshots and app_icons tables plus the
//! schema_migrations tracking table.

use rusqlite::Connection;
use tracing::info;

use vantage_core::error::VantageError;

/// Run all pending database migrations.
pub fn run_migrations(conn: &Connection) -> Result<(), VantageError> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS schema_migrations (
            version     INTEGER PRIMARY KEY NOT NULL,
            name        TEXT NOT NULL,
            applied_at  INTEGER NOT NULL DEFAULT (strftime('%s', 'now'))
        );",
    )
    .map_err(|e| VantageError::Storage(format!("Failed to create migrations table: {}", e)))?;

    let current_version: i64 = conn
        .query_row(
            "SELECT COALESCE(MAX(version), 0) FROM schema_migrations",
            [],
            |row| row.get(0),
        )
        .map_err(|e| VantageError::Storage(format!("Failed to query migration version: {}", e)))?;

    if current_version < 1 {
        apply_v1(conn)?;
        record_migration(conn, 1, "initial_schema")?;
        info!("Applied migration v1: initial_schema");
    }

    Ok(())
}

fn record_migration(conn: &Connection, version: i64, name: &str) -> Result<(), VantageError> {
    conn.execute(
        "INSERT INTO schema_migrations (version, name) VALUES (?1, ?2)",
        rusqlite::params![version, name],
    )
    .map_err(|e| VantageError::Storage(format!("Failed to record migration: {}", e)))?;
    Ok(())
}

/// Version 1: snapshots history plus the icon-URL cache.
fn apply_v1(conn: &Connection) -> Result<(), VantageError> {
    conn.execute_batch(
        "
        -- One row per dispatched snapshot. Rows are immutable after insert;
        -- the only mutation ever applied to this table is a full purge.
        CREATE TABLE IF NOT EXISTS snapshots (
            id                      TEXT PRIMARY KEY NOT NULL,
            created_at              INTEGER NOT NULL,   -- unix millis
            process_name            TEXT,
            window_title            TEXT,
            process_bundle_id       TEXT,
            media_title             TEXT,
            media_artist            TEXT,
            media_album             TEXT,
            media_player_name       TEXT,
            media_player_bundle_id  TEXT,
            media_duration_secs     REAL,
            media_elapsed_secs      REAL,
            artwork                 BLOB,
            accepted_sinks          TEXT NOT NULL DEFAULT '[]'
        );

        -- rowid is the stable tiebreak for records sharing a timestamp.
        CREATE INDEX IF NOT EXISTS idx_snapshots_created_at
            ON snapshots (created_at DESC);

        CREATE INDEX IF NOT EXISTS idx_snapshots_process_name
            ON snapshots (process_name)
            WHERE process_name IS NOT NULL;

        -- Maps an application identifier to a previously-uploaded icon URL
        -- so sinks can reference icons without re-uploading bytes.
        CREATE TABLE IF NOT EXISTS app_icons (
            bundle_id     TEXT PRIMARY KEY NOT NULL,
            display_name  TEXT NOT NULL DEFAULT '',
            url           TEXT NOT NULL,
            created_at    INTEGER NOT NULL,
            updated_at    INTEGER NOT NULL
        );
        ",
    )
    .map_err(|e| VantageError::Storage(format!("Failed to apply v1 schema: {}", e)))?;
    Ok(())
}
