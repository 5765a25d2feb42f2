//! API error types with structured JSON responses.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

use crate::assessment::SubmitError;
use crate::core_state::CoreError;
use crate::db::DatabaseError;
use crate::selection::SelectionError;

/// Structured error response body.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: ErrorDetail,
}

#[derive(Debug, Serialize)]
pub struct ErrorDetail {
    pub code: &'static str,
    pub message: String,
}

/// API-level errors with HTTP status mapping.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("Invalid request: {0}")]
    BadRequest(String),
    #[error("Conflict: {0}")]
    Conflict(String),
    #[error("Internal error: {0}")]
    Internal(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code, message) = match self {
            ApiError::NotFound(detail) => (StatusCode::NOT_FOUND, "NOT_FOUND", detail),
            ApiError::BadRequest(detail) => (StatusCode::BAD_REQUEST, "BAD_REQUEST", detail),
            ApiError::Conflict(detail) => (StatusCode::CONFLICT, "CONFLICT", detail),
            ApiError::Internal(detail) => {
                tracing::error!(detail, "API internal error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "INTERNAL",
                    "An internal error occurred".to_string(),
                )
            }
        };

        let body = ErrorBody {
            error: ErrorDetail { code, message },
        };
        (status, Json(body)).into_response()
    }
}

impl From<CoreError> for ApiError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::Database(e) => e.into(),
            other => ApiError::Internal(other.to_string()),
        }
    }
}

impl From<DatabaseError> for ApiError {
    fn from(err: DatabaseError) -> Self {
        match err {
            DatabaseError::NotFound { entity_type, id } => {
                ApiError::NotFound(format!("{entity_type} not found: {id}"))
            }
            other => ApiError::Internal(other.to_string()),
        }
    }
}

impl From<SubmitError> for ApiError {
    fn from(err: SubmitError) -> Self {
        match err {
            SubmitError::Persistence(e) => e.into(),
            invalid => ApiError::BadRequest(invalid.to_string()),
        }
    }
}

impl From<SelectionError> for ApiError {
    fn from(err: SelectionError) -> Self {
        match err {
            SelectionError::Database(e) => e.into(),
            not_ready @ (SelectionError::NotReady(_) | SelectionError::NoPlans) => {
                ApiError::Conflict(not_ready.to_string())
            }
            invalid @ (SelectionError::InvalidIndex { .. } | SelectionError::NothingSelected) => {
                ApiError::BadRequest(invalid.to_string())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::to_bytes;

    use crate::models::enums::RecommendationStatus;

    async fn body_json(response: Response) -> serde_json::Value {
        let body = to_bytes(response.into_body(), 4096).await.unwrap();
        serde_json::from_slice(&body).unwrap()
    }

    #[tokio::test]
    async fn not_found_returns_404() {
        let response = ApiError::NotFound("Assessment not found".into()).into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        let json = body_json(response).await;
        assert_eq!(json["error"]["code"], "NOT_FOUND");
        assert_eq!(json["error"]["message"], "Assessment not found");
    }

    #[tokio::test]
    async fn bad_request_returns_400() {
        let response = ApiError::BadRequest("Invalid ID format".into()).into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn internal_returns_500() {
        let response = ApiError::Internal("disk I/O error".into()).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let json = body_json(response).await;
        // Internal errors hide details from client
        assert_eq!(json["error"]["message"], "An internal error occurred");
    }

    #[test]
    fn database_not_found_maps_to_404() {
        let err: ApiError = DatabaseError::NotFound {
            entity_type: "Patient".into(),
            id: "p-1".into(),
        }
        .into();
        assert!(matches!(err, ApiError::NotFound(msg) if msg.contains("p-1")));
    }

    #[test]
    fn database_failure_maps_to_internal() {
        let err: ApiError = DatabaseError::ConstraintViolation("CHECK failed".into()).into();
        assert!(matches!(err, ApiError::Internal(_)));
    }

    #[test]
    fn submit_validation_maps_to_400() {
        let err: ApiError = SubmitError::Validation("motivation out of range".into()).into();
        assert!(matches!(err, ApiError::BadRequest(_)));

        let err: ApiError = SubmitError::UnknownTag {
            group: "constraint",
            code: "weather".into(),
        }
        .into();
        assert!(matches!(err, ApiError::BadRequest(msg) if msg.contains("weather")));
    }

    #[test]
    fn selection_errors_map_by_kind() {
        let err: ApiError = SelectionError::NotReady(RecommendationStatus::Pending).into();
        assert!(matches!(err, ApiError::Conflict(_)));

        let err: ApiError = SelectionError::InvalidIndex { index: 5, count: 2 }.into();
        assert!(matches!(err, ApiError::BadRequest(_)));
    }
}
