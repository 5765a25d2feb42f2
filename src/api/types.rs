//! Shared types for the API layer.

use std::sync::Arc;

use rusqlite::Connection;
use uuid::Uuid;

use crate::api::error::ApiError;
use crate::core_state::CoreState;

// ═══════════════════════════════════════════════════════════
// API context: shared state for the router
// ═══════════════════════════════════════════════════════════

/// Shared context for all API routes.
#[derive(Clone)]
pub struct ApiContext {
    pub core: Arc<CoreState>,
}

impl ApiContext {
    pub fn new(core: Arc<CoreState>) -> Self {
        Self { core }
    }

    /// Per-request database connection.
    pub fn open_db(&self) -> Result<Connection, ApiError> {
        self.core.open_db().map_err(ApiError::from)
    }
}

/// Parse a UUID path or body field, naming it in the 400 message.
pub fn parse_id(field: &str, raw: &str) -> Result<Uuid, ApiError> {
    Uuid::parse_str(raw.trim())
        .map_err(|_| ApiError::BadRequest(format!("Invalid {field}: {raw}")))
}

/// Required, non-blank string field.
pub fn require_text(field: &str, value: Option<&str>) -> Result<String, ApiError> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
        .ok_or_else(|| ApiError::BadRequest(format!("{field} is required")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_id_accepts_uuid() {
        let id = Uuid::new_v4();
        assert_eq!(parse_id("assessmentId", &id.to_string()).unwrap(), id);
    }

    #[test]
    fn parse_id_rejects_garbage() {
        let err = parse_id("assessmentId", "abc").unwrap_err();
        assert!(matches!(err, ApiError::BadRequest(msg) if msg.contains("assessmentId")));
    }

    #[test]
    fn require_text_trims_and_rejects_blank() {
        assert_eq!(require_text("name", Some("  김민수 ")).unwrap(), "김민수");
        assert!(require_text("name", Some("   ")).is_err());
        assert!(require_text("name", None).is_err());
    }
}
