//! Versioned schema migrations for the notes database.
//!
//! Applied versions are recorded in `schema_migrations`; running against an
//! already-migrated database is a no-op.

use rusqlite::Connection;
use tracing::info;

use voxpad_core::error::VoxpadError;

/// Bring the schema up to the latest version.
pub fn run_migrations(conn: &Connection) -> Result<(), VoxpadError> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS schema_migrations (
            version     INTEGER PRIMARY KEY NOT NULL,
            name        TEXT NOT NULL,
            applied_at  INTEGER NOT NULL DEFAULT (strftime('%s', 'now'))
        );",
    )
    .map_err(|e| VoxpadError::Storage(format!("Migration bookkeeping failed: {}", e)))?;

    let current_version: i64 = conn
        .query_row(
            "SELECT COALESCE(MAX(version), 0) FROM schema_migrations",
            [],
            |row| row.get(0),
        )
        .map_err(|e| VoxpadError::Storage(format!("Migration version query failed: {}", e)))?;

    if current_version < 1 {
        apply_v1(conn)?;
        info!(version = 1, "Migration applied: initial_schema");
    }

    Ok(())
}

/// Version 1: the notes table.
fn apply_v1(conn: &Connection) -> Result<(), VoxpadError> {
    conn.execute_batch(
        "
        -- AUTOINCREMENT keeps ids from being reused after deletes.
        CREATE TABLE IF NOT EXISTS notes (
            id          INTEGER PRIMARY KEY AUTOINCREMENT,
            title       TEXT NOT NULL DEFAULT '',
            content     TEXT NOT NULL DEFAULT '',
            timestamp   INTEGER NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_notes_timestamp
            ON notes (timestamp DESC);

        INSERT OR IGNORE INTO schema_migrations (version, name) VALUES (1, 'initial_schema');
        ",
    )
    .map_err(|e| VoxpadError::Storage(format!("Migration v1 failed: {}", e)))?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_conn() -> Connection {
        Connection::open_in_memory().unwrap()
    }

    #[test]
    fn test_rerunning_migrations_is_idempotent() {
        let conn = test_conn();
        run_migrations(&conn).unwrap();
        run_migrations(&conn).unwrap();

        let applied: i64 = conn
            .query_row("SELECT COUNT(*) FROM schema_migrations", [], |row| {
                row.get(0)
            })
            .unwrap();
        assert_eq!(applied, 1);
    }

    #[test]
    fn test_notes_table_accepts_rows() {
        let conn = test_conn();
        run_migrations(&conn).unwrap();

        conn.execute(
            "INSERT INTO notes (title, content, timestamp)
             VALUES ('Groceries', 'milk, eggs', 1700000000000)",
            [],
        )
        .unwrap();

        let content: String = conn
            .query_row(
                "SELECT content FROM notes WHERE title = 'Groceries'",
                [],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(content, "milk, eggs");
    }

    #[test]
    fn test_note_ids_start_at_one() {
        let conn = test_conn();
        run_migrations(&conn).unwrap();

        conn.execute(
            "INSERT INTO notes (title, content, timestamp) VALUES ('a', 'first', 0)",
            [],
        )
        .unwrap();
        conn.execute(
            "INSERT INTO notes (title, content, timestamp) VALUES ('b', 'second', 0)",
            [],
        )
        .unwrap();

        let ids: Vec<i64> = conn
            .prepare("SELECT id FROM notes ORDER BY id ASC")
            .unwrap()
            .query_map([], |row| row.get(0))
            .unwrap()
            .collect::<Result<_, _>>()
            .unwrap();
        assert_eq!(ids, vec![1, 2]);
    }

    #[test]
    fn test_deleted_ids_not_reused() {
        let conn = test_conn();
        run_migrations(&conn).unwrap();

        conn.execute(
            "INSERT INTO notes (title, content, timestamp) VALUES ('a', '', 0)",
            [],
        )
        .unwrap();
        conn.execute(
            "INSERT INTO notes (title, content, timestamp) VALUES ('b', '', 0)",
            [],
        )
        .unwrap();
        conn.execute("DELETE FROM notes WHERE id = 2", []).unwrap();
        conn.execute(
            "INSERT INTO notes (title, content, timestamp) VALUES ('c', '', 0)",
            [],
        )
        .unwrap();

        let new_id: i64 = conn
            .query_row("SELECT id FROM notes WHERE title = 'c'", [], |row| {
                row.get(0)
            })
            .unwrap();
        assert_eq!(new_id, 3);
    }
}
