//! Versioned schema changes for the SQLite store.
//!
//! The database records the last applied migration in `schema_version`.
//! Opening a store applies every migration with a higher version, in order,
//! inside one transaction.
//!
//! To change the schema, append a new entry to [`MIGRATIONS`] with the next
//! version number. Never edit a migration that has already shipped.

use super::StorageError;
use rusqlite::{Connection, Transaction};

/// A schema change identified by its version number.
#[derive(Debug)]
pub struct Migration {
    pub version: i32,
    pub up: &'static str,
}

pub const MIGRATIONS: &[Migration] = &[Migration {
    version: 1,
    up: r#"
        CREATE TABLE IF NOT EXISTS categories (
            id INTEGER PRIMARY KEY,
            name TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS todos (
            id INTEGER PRIMARY KEY,
            name TEXT NOT NULL,
            status TEXT NOT NULL,
            category_id INTEGER NOT NULL,
            FOREIGN KEY (category_id) REFERENCES categories(id)
        );

        CREATE INDEX IF NOT EXISTS idx_todos_category_id ON todos(category_id);
    "#,
}];

fn ensure_version_table(conn: &Connection) -> Result<(), StorageError> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS schema_version (version INTEGER NOT NULL);
         INSERT INTO schema_version (version)
             SELECT 0 WHERE NOT EXISTS (SELECT 1 FROM schema_version);",
    )
    .map_err(|e| StorageError::Storage(format!("Failed to create schema_version table: {}", e)))
}

pub fn get_current_version(conn: &Connection) -> Result<i32, StorageError> {
    let version: i32 = conn
        .query_row("SELECT version FROM schema_version", [], |row| row.get(0))
        .map_err(|e| StorageError::Storage(format!("Failed to get schema version: {}", e)))?;
    Ok(version)
}

pub fn latest_version() -> i32 {
    MIGRATIONS.last().map(|m| m.version).unwrap_or(0)
}

/// Brings the schema up to [`latest_version`].
pub fn apply_migrations(conn: &mut Connection) -> Result<(), StorageError> {
    ensure_version_table(conn)?;
    let current_version = get_current_version(conn)?;

    if current_version < latest_version() {
        let tx = conn
            .transaction()
            .map_err(|e| StorageError::Storage(format!("Failed to start transaction: {}", e)))?;

        for migration in MIGRATIONS.iter().filter(|m| m.version > current_version) {
            apply_migration(&tx, migration)?;
            tracing::debug!(version = migration.version, "applied schema migration");
        }

        tx.commit()
            .map_err(|e| StorageError::Storage(format!("Failed to commit transaction: {}", e)))?;
    }

    Ok(())
}

fn apply_migration(tx: &Transaction, migration: &Migration) -> Result<(), StorageError> {
    tx.execute_batch(migration.up).map_err(|e| {
        StorageError::Storage(format!(
            "Failed to apply migration {}: {}",
            migration.version, e
        ))
    })?;

    tx.execute("UPDATE schema_version SET version = ?1", [migration.version])
        .map_err(|e| {
            StorageError::Storage(format!(
                "Failed to update schema version to {}: {}",
                migration.version, e
            ))
        })?;

    Ok(())
}
