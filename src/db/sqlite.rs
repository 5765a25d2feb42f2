use std::path::Path;

use rusqlite::{Connection, OptionalExtension};

use super::DatabaseError;

/// Ordered schema migrations. Each script records its own version.
const MIGRATIONS: &[(i64, &str)] = &[
    (1, include_str!("../../resources/migrations/001_initial.sql")),
];

/// Tables the goal-setting workflow reads and writes.
pub const WORKFLOW_TABLES: &[&str] = &["patients", "assessments", "ai_recommendations", "goals"];

/// Open the goal database at `path`, migrated to the latest schema.
pub fn open_database(path: &Path) -> Result<Connection, DatabaseError> {
    prepare(Connection::open(path)?)
}

/// Open an in-memory database (for testing)
pub fn open_memory_database() -> Result<Connection, DatabaseError> {
    prepare(Connection::open_in_memory()?)
}

fn prepare(conn: Connection) -> Result<Connection, DatabaseError> {
    configure_pragmas(&conn)?;
    run_migrations(&conn)?;
    Ok(conn)
}

fn configure_pragmas(conn: &Connection) -> Result<(), DatabaseError> {
    // The webhook and the pollers hit the same file from different
    // connections; WAL keeps readers from blocking on the writer.
    conn.execute_batch(
        "PRAGMA journal_mode=WAL;
         PRAGMA busy_timeout=5000;
         PRAGMA foreign_keys=ON;",
    )?;
    Ok(())
}

/// Apply every migration newer than the stored schema version, then check
/// that the workflow tables exist.
pub fn run_migrations(conn: &Connection) -> Result<(), DatabaseError> {
    let current = schema_version(conn)?;

    for &(version, sql) in MIGRATIONS.iter().filter(|(v, _)| *v > current) {
        tracing::info!(from = current, to = version, "Migrating goal database");
        conn.execute_batch(sql).map_err(|e| DatabaseError::MigrationFailed {
            version,
            reason: e.to_string(),
        })?;
    }

    let missing = missing_tables(conn)?;
    if let Some(table) = missing.first() {
        return Err(DatabaseError::MigrationFailed {
            version: schema_version(conn)?,
            reason: format!("table {table} is missing after migration"),
        });
    }
    Ok(())
}

/// Stored schema version, 0 for a fresh database.
pub fn schema_version(conn: &Connection) -> Result<i64, DatabaseError> {
    if !table_exists(conn, "schema_version")? {
        return Ok(0);
    }
    let version: Option<i64> =
        conn.query_row("SELECT MAX(version) FROM schema_version", [], |row| row.get(0))?;
    Ok(version.unwrap_or(0))
}

/// Workflow tables absent from the database.
pub fn missing_tables(conn: &Connection) -> Result<Vec<&'static str>, DatabaseError> {
    let mut missing = Vec::new();
    for table in WORKFLOW_TABLES {
        if !table_exists(conn, table)? {
            missing.push(*table);
        }
    }
    Ok(missing)
}

fn table_exists(conn: &Connection, name: &str) -> Result<bool, DatabaseError> {
    let found = conn
        .query_row(
            "SELECT 1 FROM sqlite_master WHERE type = 'table' AND name = ?1",
            [name],
            |_| Ok(()),
        )
        .optional()?;
    Ok(found.is_some())
}
