//! Repository layer: entity-scoped database operations.
//!
//! One sub-module per table; all public functions are re-exported here.

mod assessment;
mod goal;
mod patient;
mod recommendation;

pub use assessment::*;
pub use goal::*;
pub use patient::*;
pub use recommendation::*;

use uuid::Uuid;

use super::DatabaseError;

/// Parse a stored UUID column, surfacing corruption as a constraint error.
pub(crate) fn parse_uuid(value: &str) -> Result<Uuid, DatabaseError> {
    Uuid::parse_str(value).map_err(|e| DatabaseError::ConstraintViolation(e.to_string()))
}

/// Parse a stored timestamp column.
pub(crate) fn parse_timestamp(value: &str) -> chrono::NaiveDateTime {
    super::parse_datetime(value).unwrap_or_default()
}
