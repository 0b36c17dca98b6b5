//! Database migrations

use crate::error::Result;
use rusqlite::Connection;

/// Current schema version
const CURRENT_VERSION: i32 = 2;

/// Run all pending migrations
pub fn run(conn: &Connection) -> Result<()> {
    let version = get_version(conn)?;

    if version < 1 {
        migrate_v1(conn)?;
    }
    if version < 2 {
        migrate_v2(conn)?;
    }

    Ok(())
}

/// Get the current schema version
fn get_version(conn: &Connection) -> Result<i32> {
    let exists: bool = conn.query_row(
        "SELECT EXISTS(SELECT 1 FROM sqlite_master WHERE type='table' AND name='schema_version')",
        [],
        |row| row.get::<_, i32>(0).map(|value| value != 0),
    )?;

    if !exists {
        return Ok(0);
    }

    let version = conn.query_row(
        "SELECT COALESCE(MAX(version), 0) FROM schema_version",
        [],
        |row| row.get(0),
    )?;

    Ok(version)
}

/// Migration to version 1: tags and work sessions
fn migrate_v1(conn: &Connection) -> Result<()> {
    let tx = conn.unchecked_transaction()?;

    tx.execute_batch(
        "CREATE TABLE IF NOT EXISTS schema_version (
            version INTEGER PRIMARY KEY
        );
        CREATE TABLE IF NOT EXISTS tags (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            owner_id INTEGER NOT NULL,
            name TEXT NOT NULL,
            updated_at INTEGER NOT NULL
        );
        CREATE INDEX IF NOT EXISTS idx_tags_owner_name ON tags(owner_id, name);
        CREATE TABLE IF NOT EXISTS work_sessions (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            owner_id INTEGER NOT NULL,
            session_date TEXT NOT NULL,
            hours REAL NOT NULL,
            description TEXT NOT NULL,
            notes TEXT,
            next_stage TEXT,
            tag_id INTEGER REFERENCES tags(id) ON DELETE SET NULL,
            created_at INTEGER NOT NULL,
            updated_at INTEGER NOT NULL
        );
        CREATE INDEX IF NOT EXISTS idx_sessions_owner_date ON work_sessions(owner_id, session_date);
        INSERT INTO schema_version (version) VALUES (1);",
    )?;

    tx.commit()?;
    tracing::info!("Migrated database to version 1");
    Ok(())
}

/// Migration to version 2: stable ids, tombstones, and sync metadata
fn migrate_v2(conn: &Connection) -> Result<()> {
    let tx = conn.unchecked_transaction()?;

    tx.execute_batch(
        "ALTER TABLE tags ADD COLUMN cloud_id TEXT;
        ALTER TABLE tags ADD COLUMN is_deleted INTEGER NOT NULL DEFAULT 0;
        ALTER TABLE work_sessions ADD COLUMN cloud_id TEXT;
        ALTER TABLE work_sessions ADD COLUMN tag_cloud_id TEXT;
        ALTER TABLE work_sessions ADD COLUMN is_deleted INTEGER NOT NULL DEFAULT 0;
        CREATE UNIQUE INDEX IF NOT EXISTS idx_tags_cloud_id
            ON tags(owner_id, cloud_id) WHERE cloud_id IS NOT NULL;
        CREATE UNIQUE INDEX IF NOT EXISTS idx_sessions_cloud_id
            ON work_sessions(owner_id, cloud_id) WHERE cloud_id IS NOT NULL;
        CREATE TABLE IF NOT EXISTS sync_metadata (
            key TEXT PRIMARY KEY,
            value TEXT NOT NULL
        );
        INSERT INTO schema_version (version) VALUES (2);",
    )?;

    tx.commit()?;
    tracing::info!("Migrated database to version {CURRENT_VERSION}");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn setup() -> Connection {
        Connection::open_in_memory().unwrap()
    }

    fn column_names(conn: &Connection, table: &str) -> Vec<String> {
        let mut stmt = conn
            .prepare(&format!("SELECT name FROM pragma_table_info('{table}')"))
            .unwrap();
        stmt.query_map([], |row| row.get(0))
            .unwrap()
            .collect::<rusqlite::Result<Vec<String>>>()
            .unwrap()
    }

    #[test]
    fn test_migrations() {
        let conn = setup();
        run(&conn).unwrap();

        let version = get_version(&conn).unwrap();
        assert_eq!(version, CURRENT_VERSION);
    }

    #[test]
    fn test_migrations_idempotent() {
        let conn = setup();
        run(&conn).unwrap();
        run(&conn).unwrap(); // Should not fail

        let version = get_version(&conn).unwrap();
        assert_eq!(version, CURRENT_VERSION);
    }

    #[test]
    fn test_migration_v2_adds_sync_columns() {
        let conn = setup();
        run(&conn).unwrap();

        let tag_columns = column_names(&conn, "tags");
        assert!(tag_columns.contains(&"cloud_id".to_string()));
        assert!(tag_columns.contains(&"is_deleted".to_string()));

        let session_columns = column_names(&conn, "work_sessions");
        assert!(session_columns.contains(&"tag_cloud_id".to_string()));
        assert!(session_columns.contains(&"cloud_id".to_string()));

        let exists: i32 = conn
            .query_row(
                "SELECT EXISTS(
                    SELECT 1 FROM sqlite_master
                    WHERE type = 'table' AND name = 'sync_metadata'
                )",
                [],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(exists, 1);
    }

    #[test]
    fn test_migration_v2_upgrades_existing_v1_rows() {
        let conn = setup();
        migrate_v1(&conn).unwrap();
        conn.execute(
            "INSERT INTO tags (owner_id, name, updated_at) VALUES (1, 'Eng', 5)",
            [],
        )
        .unwrap();

        run(&conn).unwrap();

        let (cloud_id, is_deleted): (Option<String>, i32) = conn
            .query_row("SELECT cloud_id, is_deleted FROM tags", [], |row| {
                Ok((row.get(0)?, row.get(1)?))
            })
            .unwrap();
        assert_eq!(cloud_id, None);
        assert_eq!(is_deleted, 0);
    }
}
