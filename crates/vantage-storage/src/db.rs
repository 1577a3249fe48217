//! Database connection management.
//!
//! Wraps a single rusqlite Connection in a Mutex. Callers never touch the
//! connection directly; all access goes through [`Database::with_conn`],
//! which serializes storage work as required by the history contract.

use std::path::Path;
use std::sync::Mutex;

use rusqlite::Connection;
use tracing::info;

use vantage_core::error::VantageError;

use crate::migrations;

/// Thread-safe SQLite database wrapper.
///
/// WAL mode is configured for concurrent read/write safety. The connection
/// is wrapped in a Mutex since rusqlite's Connection is not Sync.
pub struct Database {
    conn: Mutex<Connection>,
}

impl Database {
    /// Open (or create) a database at the given path.
    ///
    /// Configures WAL mode, synchronous=NORMAL, foreign keys, and runs all
    /// pending migrations.
    pub fn new(path: &Path) -> Result<Self, VantageError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let conn = Connection::open(path)
            .map_err(|e| VantageError::Storage(format!("Failed to open database: {}", e)))?;

        conn.execute_batch(
            "PRAGMA journal_mode = WAL;
             PRAGMA synchronous = NORMAL;
             PRAGMA foreign_keys = ON;",
        )
        .map_err(|e| VantageError::Storage(format!("Failed to set pragmas: {}", e)))?;

        info!("Database opened at {}", path.display());

        let db = Self {
            conn: Mutex::new(conn),
        };

        db.with_conn(migrations::run_migrations)?;

        Ok(db)
    }

    /// Open an in-memory database (for testing).
    pub fn in_memory() -> Result<Self, VantageError> {
        let conn = Connection::open_in_memory()
            .map_err(|e| VantageError::Storage(format!("Failed to open in-memory db: {}", e)))?;

        conn.execute_batch("PRAGMA foreign_keys = ON;")
            .map_err(|e| VantageError::Storage(format!("Failed to set pragmas: {}", e)))?;

        let db = Self {
            conn: Mutex::new(conn),
        };

        db.with_conn(migrations::run_migrations)?;

        Ok(db)
    }

    /// Execute a closure with a reference to the underlying connection.
    ///
    /// The mutex is held for the duration of the closure.
    pub fn with_conn<F, T>(&self, f: F) -> Result<T, VantageError>
    where
        F: FnOnce(&Connection) -> Result<T, VantageError>,
    {
        let conn = self
            .conn
            .lock()
            .map_err(|e| VantageError::Storage(format!("Database lock poisoned: {}", e)))?;
        f(&conn)
    }
}

impl std::fmt::Debug for Database {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Database").finish()
    }
}
