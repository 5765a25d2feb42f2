pub mod sqlite;
pub mod repository;

pub use sqlite::*;
pub use repository::*;

use chrono::{Local, NaiveDateTime};
use thiserror::Error;

/// Storage format for every timestamp column.
pub const DATETIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

#[derive(Error, Debug)]
pub enum DatabaseError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("Entity not found: {entity_type} with id {id}")]
    NotFound { entity_type: String, id: String },

    #[error("Invalid enum value for {field}: {value}")]
    InvalidEnum { field: String, value: String },

    #[error("Migration failed at version {version}: {reason}")]
    MigrationFailed { version: i64, reason: String },

    #[error("Constraint violated: {0}")]
    ConstraintViolation(String),

    #[error("Stored JSON is malformed: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Current local time truncated to the storage resolution.
pub fn now_naive() -> NaiveDateTime {
    let formatted = Local::now().naive_local().format(DATETIME_FORMAT).to_string();
    parse_datetime(&formatted).unwrap_or_default()
}

pub(crate) fn format_datetime(value: &NaiveDateTime) -> String {
    value.format(DATETIME_FORMAT).to_string()
}

pub(crate) fn parse_datetime(value: &str) -> Option<NaiveDateTime> {
    NaiveDateTime::parse_from_str(value, DATETIME_FORMAT).ok()
}
