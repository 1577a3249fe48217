//! Icon-URL cache keyed by application identifier.
//!
//! Sinks that reference application icons by URL look an identifier up
//! here before uploading; the first successful upload creates the record
//! and later uploads reuse the stored URL instead of re-sending bytes.

use std::sync::Arc;

use chrono::{DateTime, TimeZone, Utc};

use vantage_core::error::VantageError;

use crate::db::Database;

/// One cached icon upload.
#[derive(Clone, Debug, PartialEq)]
pub struct IconRecord {
    pub bundle_id: String,
    pub display_name: String,
    pub url: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Repository for [`IconRecord`]s.
pub struct IconStore {
    db: Arc<Database>,
}

impl IconStore {
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    /// Look up the cached icon URL for an application identifier.
    pub fn find(&self, bundle_id: &str) -> Result<Option<IconRecord>, VantageError> {
        self.db.with_conn(|conn| {
            let mut stmt = conn
                .prepare(
                    "SELECT bundle_id, display_name, url, created_at, updated_at
                     FROM app_icons WHERE bundle_id = ?1",
                )
                .map_err(|e| VantageError::Storage(e.to_string()))?;

            let mut rows = stmt
                .query(rusqlite::params![bundle_id])
                .map_err(|e| VantageError::Storage(e.to_string()))?;

            match rows.next().map_err(|e| VantageError::Storage(e.to_string()))? {
                Some(row) => {
                    let created_ms: i64 =
                        row.get(3).map_err(|e| VantageError::Storage(e.to_string()))?;
                    let updated_ms: i64 =
                        row.get(4).map_err(|e| VantageError::Storage(e.to_string()))?;
                    Ok(Some(IconRecord {
                        bundle_id: row
                            .get(0)
                            .map_err(|e| VantageError::Storage(e.to_string()))?,
                        display_name: row
                            .get(1)
                            .map_err(|e| VantageError::Storage(e.to_string()))?,
                        url: row
                            .get(2)
                            .map_err(|e| VantageError::Storage(e.to_string()))?,
                        created_at: millis(created_ms),
                        updated_at: millis(updated_ms),
                    }))
                }
                None => Ok(None),
            }
        })
    }

    /// Insert or update the cached URL for an identifier.
    ///
    /// One row per identifier, always. `updated_at` only moves when the URL
    /// actually changes.
    pub fn upsert(
        &self,
        bundle_id: &str,
        display_name: &str,
        url: &str,
    ) -> Result<(), VantageError> {
        let now = Utc::now().timestamp_millis();
        self.db.with_conn(|conn| {
            conn.execute(
                "INSERT INTO app_icons (bundle_id, display_name, url, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?4)
                 ON CONFLICT(bundle_id) DO UPDATE SET
                     display_name = excluded.display_name,
                     url = excluded.url,
                     updated_at = CASE
                         WHEN app_icons.url <> excluded.url THEN excluded.updated_at
                         ELSE app_icons.updated_at
                     END",
                rusqlite::params![bundle_id, display_name, url, now],
            )
            .map_err(|e| VantageError::Storage(format!("Failed to upsert icon: {}", e)))?;
            Ok(())
        })
    }

    /// Total number of cached icons.
    pub fn count(&self) -> Result<u64, VantageError> {
        self.db.with_conn(|conn| {
            let count: i64 = conn
                .query_row("SELECT COUNT(*) FROM app_icons", [], |row| row.get(0))
                .map_err(|e| VantageError::Storage(e.to_string()))?;
            Ok(count as u64)
        })
    }
}

impl std::fmt::Debug for IconStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IconStore").finish()
    }
}

fn millis(ms: i64) -> DateTime<Utc> {
    Utc.timestamp_millis_opt(ms).single().unwrap_or_default()
}
