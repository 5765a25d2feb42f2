//! AI recommendation webhook.
//!
//! The external job runner reports the outcome of a processing run here:
//! - `POST /api/webhook/ai-recommendation`: completion or failure
//! - `GET /api/webhook/ai-recommendation`: liveness payload
//!
//! Status codes: 200 completed, 400 malformed body, missing fields or
//! failure acknowledgment, 404 unknown recommendation, 500 persistence error.

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::api::error::ApiError;
use crate::api::types::{parse_id, require_text, ApiContext};
use crate::db;
use crate::models::enums::AssessmentStatus;

/// Stored when the runner reports a failure without a reason.
pub const DEFAULT_FAILURE_REASON: &str = "AI processing failed";

/// Every field is optional so missing ones surface as 400, not as a
/// deserialization rejection.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WebhookPayload {
    pub status: Option<String>,
    pub assessment_id: Option<String>,
    pub recommendation_id: Option<String>,
    pub error: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct WebhookAck {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Serialize)]
pub struct WebhookLiveness {
    pub status: &'static str,
    pub message: &'static str,
}

/// `GET /api/webhook/ai-recommendation`
pub async fn liveness() -> Json<WebhookLiveness> {
    Json(WebhookLiveness {
        status: "ok",
        message: "AI recommendation webhook is running",
    })
}

/// `POST /api/webhook/ai-recommendation`
pub async fn receive(
    State(ctx): State<ApiContext>,
    payload: Result<Json<WebhookPayload>, JsonRejection>,
) -> Result<Response, ApiError> {
    let Json(payload) =
        payload.map_err(|rejection| ApiError::BadRequest(rejection.body_text()))?;
    let status = require_text("status", payload.status.as_deref())?;
    let assessment_id = parse_id(
        "assessmentId",
        &require_text("assessmentId", payload.assessment_id.as_deref())?,
    )?;

    match status.as_str() {
        "completed" => {
            let raw = require_text("recommendationId", payload.recommendation_id.as_deref())
                .map_err(|_| {
                    ApiError::BadRequest("recommendationId is required when status is completed".into())
                })?;
            let recommendation_id = parse_id("recommendationId", &raw)?;
            complete(&ctx, assessment_id, recommendation_id)?;

            Ok(Json(WebhookAck {
                success: true,
                message: Some("Recommendation marked as completed".into()),
                error: None,
            })
            .into_response())
        }
        "failed" => {
            let reason = payload
                .error
                .map(|e| e.trim().to_string())
                .filter(|e| !e.is_empty())
                .unwrap_or_else(|| DEFAULT_FAILURE_REASON.to_string());
            fail(&ctx, assessment_id, &reason)?;

            Ok((
                StatusCode::BAD_REQUEST,
                Json(WebhookAck {
                    success: false,
                    message: None,
                    error: Some(reason),
                }),
            )
                .into_response())
        }
        other => Err(ApiError::BadRequest(format!(
            "status must be 'completed' or 'failed', got '{other}'"
        ))),
    }
}

fn complete(ctx: &ApiContext, assessment_id: Uuid, recommendation_id: Uuid) -> Result<(), ApiError> {
    let mut conn = ctx.open_db()?;
    let tx = conn.transaction().map_err(db::DatabaseError::from)?;
    db::mark_recommendation_completed(&tx, &recommendation_id, &assessment_id)?;
    db::update_assessment_status(&tx, &assessment_id, AssessmentStatus::Completed)?;
    tx.commit().map_err(db::DatabaseError::from)?;

    tracing::info!(%assessment_id, %recommendation_id, "AI recommendation completed");
    Ok(())
}

fn fail(ctx: &ApiContext, assessment_id: Uuid, reason: &str) -> Result<(), ApiError> {
    let mut conn = ctx.open_db()?;
    let tx = conn.transaction().map_err(db::DatabaseError::from)?;
    let failed = db::mark_recommendations_failed(&tx, &assessment_id, reason)?;
    db::update_assessment_status(&tx, &assessment_id, AssessmentStatus::Failed)?;
    tx.commit().map_err(db::DatabaseError::from)?;

    tracing::warn!(%assessment_id, failed, reason, "AI recommendation failed");
    Ok(())
}
