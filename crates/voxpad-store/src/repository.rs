//! Synchronous note persistence over SQLite.
//!
//! NoteRepository holds the row-level CRUD used by the store's writer
//! task. Mutating methods report affected-row counts so callers can
//! distinguish a committed change from a miss on an unknown id.

use std::sync::Arc;

use rusqlite::OptionalExtension;

use voxpad_core::error::VoxpadError;
use voxpad_core::types::{Note, NoteDraft, NoteId, TimestampMs};

use crate::db::Database;

/// Repository for note rows.
pub struct NoteRepository {
    db: Arc<Database>,
}

impl NoteRepository {
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    /// All notes, ordered by id ascending.
    pub fn list(&self) -> Result<Vec<Note>, VoxpadError> {
        self.db.with_conn(|conn| {
            let mut stmt = conn
                .prepare("SELECT id, title, content, timestamp FROM notes ORDER BY id ASC")
                .map_err(|e| VoxpadError::Storage(e.to_string()))?;

            let rows = stmt
                .query_map([], row_to_note)
                .map_err(|e| VoxpadError::Storage(e.to_string()))?;

            let mut notes = Vec::new();
            for row in rows {
                notes.push(row.map_err(|e| VoxpadError::Storage(e.to_string()))?);
            }
            Ok(notes)
        })
    }

    /// Find a note by id.
    pub fn find_by_id(&self, id: NoteId) -> Result<Option<Note>, VoxpadError> {
        self.db.with_conn(|conn| {
            conn.query_row(
                "SELECT id, title, content, timestamp FROM notes WHERE id = ?1",
                rusqlite::params![id.0],
                row_to_note,
            )
            .optional()
            .map_err(|e| VoxpadError::Storage(e.to_string()))
        })
    }

    /// Insert a draft as a new row, assigning a fresh id.
    ///
    /// A draft without a timestamp is stamped with the current time.
    /// Returns the stored note.
    pub fn insert(&self, draft: NoteDraft) -> Result<Note, VoxpadError> {
        let timestamp = draft.timestamp.unwrap_or_else(TimestampMs::now);

        self.db.with_conn(|conn| {
            conn.execute(
                "INSERT OR REPLACE INTO notes (title, content, timestamp)
                 VALUES (?1, ?2, ?3)",
                rusqlite::params![draft.title, draft.content, timestamp.0],
            )
            .map_err(|e| VoxpadError::Storage(format!("Failed to insert note: {}", e)))?;

            let id = NoteId(conn.last_insert_rowid());
            Ok(Note {
                id,
                title: draft.title,
                content: draft.content,
                timestamp,
            })
        })
    }

    /// Replace every field of the row matching `note.id`.
    ///
    /// Returns false when no such row exists.
    pub fn update(&self, note: &Note) -> Result<bool, VoxpadError> {
        self.db.with_conn(|conn| {
            let affected = conn
                .execute(
                    "UPDATE notes SET title = ?1, content = ?2, timestamp = ?3 WHERE id = ?4",
                    rusqlite::params![note.title, note.content, note.timestamp.0, note.id.0],
                )
                .map_err(|e| VoxpadError::Storage(format!("Failed to update note: {}", e)))?;
            Ok(affected > 0)
        })
    }

    /// Delete the row matching `id`.
    ///
    /// Returns false when no such row exists.
    pub fn delete(&self, id: NoteId) -> Result<bool, VoxpadError> {
        self.db.with_conn(|conn| {
            let affected = conn
                .execute("DELETE FROM notes WHERE id = ?1", rusqlite::params![id.0])
                .map_err(|e| VoxpadError::Storage(format!("Failed to delete note: {}", e)))?;
            Ok(affected > 0)
        })
    }

    /// Count stored notes.
    pub fn count(&self) -> Result<u64, VoxpadError> {
        self.db.with_conn(|conn| {
            let count: i64 = conn
                .query_row("SELECT COUNT(*) FROM notes", [], |row| row.get(0))
                .map_err(|e| VoxpadError::Storage(e.to_string()))?;
            Ok(count as u64)
        })
    }
}

fn row_to_note(row: &rusqlite::Row<'_>) -> rusqlite::Result<Note> {
    Ok(Note {
        id: NoteId(row.get(0)?),
        title: row.get(1)?,
        content: row.get(2)?,
        timestamp: TimestampMs(row.get(3)?),
    })
}
