//! Cache schema and migrations
//!
//! Uses SQLite with embedded migrations managed via PRAGMA user_version.

use crate::error::StoreError;
use rusqlite::Connection;

/// Current schema version
pub const SCHEMA_VERSION: i32 = 1;

/// SQL migrations, indexed by version number
const MIGRATIONS: &[&str] = &[
    // Version 1: one row per dataset
    r#"
    CREATE TABLE IF NOT EXISTS cache_records (
        dataset          TEXT PRIMARY KEY,

        -- Document as fetched
        payload          JSON NOT NULL,
        payload_hash     TEXT NOT NULL,

        -- Provenance
        last_synced_at   DATETIME,
        updated_at       DATETIME NOT NULL
    );
    "#,
];

/// Run all pending migrations
pub fn run_migrations(conn: &Connection) -> Result<(), StoreError> {
    let current_version = get_schema_version(conn)?;

    if current_version > SCHEMA_VERSION {
        tracing::warn!(
            current_version,
            known_version = SCHEMA_VERSION,
            "Cache schema is newer than this build"
        );
        return Ok(());
    }

    for (i, migration) in MIGRATIONS.iter().enumerate() {
        let version = (i + 1) as i32;
        if version > current_version {
            tracing::info!(version, "Running cache migration");
            conn.execute_batch(migration)?;
            conn.pragma_update(None, "user_version", version)?;
        }
    }

    if current_version < SCHEMA_VERSION {
        tracing::debug!(
            from = current_version,
            to = SCHEMA_VERSION,
            "Cache migrations complete"
        );
    }

    Ok(())
}

/// Get the current schema version from the database
pub fn get_schema_version(conn: &Connection) -> Result<i32, StoreError> {
    let version: i32 = conn.query_row("PRAGMA user_version", [], |r| r.get(0))?;
    Ok(version)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_migrations_idempotent() {
        let conn = Connection::open_in_memory().unwrap();

        run_migrations(&conn).unwrap();
        run_migrations(&conn).unwrap();

        assert_eq!(get_schema_version(&conn).unwrap(), SCHEMA_VERSION);
    }

    #[test]
    fn test_cache_table_created() {
        let conn = Connection::open_in_memory().unwrap();
        run_migrations(&conn).unwrap();

        let columns: Vec<String> = conn
            .prepare("PRAGMA table_info(cache_records)")
            .unwrap()
            .query_map([], |row| row.get::<_, String>(1))
            .unwrap()
            .filter_map(|r| r.ok())
            .collect();

        assert_eq!(
            columns,
            vec![
                "dataset",
                "payload",
                "payload_hash",
                "last_synced_at",
                "updated_at"
            ]
        );
    }

    #[test]
    fn test_newer_schema_is_left_alone() {
        let conn = Connection::open_in_memory().unwrap();
        conn.pragma_update(None, "user_version", SCHEMA_VERSION + 1)
            .unwrap();
        run_migrations(&conn).unwrap();
        assert_eq!(get_schema_version(&conn).unwrap(), SCHEMA_VERSION + 1);
    }
}
