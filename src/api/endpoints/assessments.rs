//! Assessment endpoints.
//!
//! - `GET /api/assessments/tags`: tag codes and labels for the form
//! - `POST /api/assessments`: submit an assessment, trigger AI processing
//! - `GET /api/assessments/:id`: one assessment
//! - `GET /api/assessments/:id/recommendation`: latest recommendation
//!   (the polling query)

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use serde::Deserialize;
use uuid::Uuid;

use crate::api::error::ApiError;
use crate::api::types::{require_text, ApiContext};
use crate::assessment::{self, AssessmentDraft, TagCatalog};
use crate::db;
use crate::models::{Assessment, Recommendation};

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitAssessmentRequest {
    pub patient_id: Uuid,
    pub assessed_by: Option<String>,
    #[serde(default)]
    pub draft: AssessmentDraft,
}

/// `GET /api/assessments/tags`
pub async fn tags() -> Json<TagCatalog> {
    Json(assessment::tag_catalog())
}

/// `POST /api/assessments`
pub async fn submit(
    State(ctx): State<ApiContext>,
    Json(request): Json<SubmitAssessmentRequest>,
) -> Result<(StatusCode, Json<Assessment>), ApiError> {
    let assessed_by = require_text("assessedBy", request.assessed_by.as_deref())?;
    let conn = ctx.open_db()?;

    let created = assessment::submit_assessment(
        conn,
        ctx.core.ai_trigger.as_ref(),
        request.patient_id,
        &assessed_by,
        &request.draft,
    )
    .await?;

    Ok((StatusCode::CREATED, Json(created)))
}

/// `GET /api/assessments/:id`
pub async fn detail(
    State(ctx): State<ApiContext>,
    Path(id): Path<Uuid>,
) -> Result<Json<Assessment>, ApiError> {
    let conn = ctx.open_db()?;
    db::get_assessment(&conn, &id)?
        .map(Json)
        .ok_or_else(|| ApiError::NotFound(format!("Assessment not found: {id}")))
}

/// `GET /api/assessments/:id/recommendation`
///
/// 404 while the job has not written a recommendation yet.
pub async fn latest_recommendation(
    State(ctx): State<ApiContext>,
    Path(id): Path<Uuid>,
) -> Result<Json<Recommendation>, ApiError> {
    let conn = ctx.open_db()?;
    db::get_latest_recommendation_for_assessment(&conn, &id)?
        .map(Json)
        .ok_or_else(|| ApiError::NotFound(format!("No recommendation for assessment {id}")))
}
