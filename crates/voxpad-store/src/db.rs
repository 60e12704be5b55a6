//! SQLite connection handling for the note store.
//!
//! A `Database` owns one rusqlite `Connection` guarded by a `Mutex` and is
//! shared behind an `Arc`. Opening configures the journal and applies any
//! pending migrations, so a constructed handle is always query-ready.

use std::path::Path;
use std::sync::Mutex;

use rusqlite::Connection;
use tracing::info;

use voxpad_core::error::VoxpadError;

use crate::migrations;

/// Handle to the notes database.
///
/// rusqlite's `Connection` is not `Sync`, so every access goes through the
/// mutex via `with_conn`.
pub struct Database {
    conn: Mutex<Connection>,
}

impl Database {
    /// Open the database file, creating it and any missing parent
    /// directories on first use.
    pub fn new(path: &Path) -> Result<Self, VoxpadError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let conn = Connection::open(path).map_err(|e| {
            VoxpadError::Storage(format!("Cannot open database at {}: {}", path.display(), e))
        })?;
        let db = Self::prepare(conn)?;
        info!("Database opened at {}", path.display());
        Ok(db)
    }

    /// Open a fresh in-memory database. Used by tests.
    pub fn in_memory() -> Result<Self, VoxpadError> {
        let conn = Connection::open_in_memory()
            .map_err(|e| VoxpadError::Storage(format!("Cannot open in-memory database: {}", e)))?;
        Self::prepare(conn)
    }

    /// Apply pragmas and migrations to a freshly opened connection.
    fn prepare(conn: Connection) -> Result<Self, VoxpadError> {
        conn.execute_batch(
            "PRAGMA journal_mode = WAL;
             PRAGMA synchronous = NORMAL;
             PRAGMA foreign_keys = ON;",
        )
        .map_err(|e| VoxpadError::Storage(format!("Cannot apply pragmas: {}", e)))?;

        let db = Self {
            conn: Mutex::new(conn),
        };
        db.with_conn(migrations::run_migrations)?;
        Ok(db)
    }

    /// Run a closure against the connection while holding the lock.
    pub fn with_conn<F, T>(&self, f: F) -> Result<T, VoxpadError>
    where
        F: FnOnce(&Connection) -> Result<T, VoxpadError>,
    {
        let conn = self
            .conn
            .lock()
            .map_err(|e| VoxpadError::Storage(format!("Database lock poisoned: {}", e)))?;
        f(&conn)
    }
}

impl std::fmt::Debug for Database {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Database").finish()
    }
}
