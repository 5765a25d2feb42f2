//! Recommendation endpoints.
//!
//! - `POST /api/recommendations`: the AI job registers its output
//! - `GET /api/recommendations/:id`: full recommendation
//! - `GET /api/recommendations/:id/plans`: plan comparison rows
//! - `POST /api/recommendations/:id/selection`: pick a plan, create goals

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::api::error::ApiError;
use crate::api::types::ApiContext;
use crate::db;
use crate::models::enums::{AssessmentStatus, RecommendationStatus};
use crate::models::{Recommendation, RecommendationPlan};
use crate::selection::{self, PlanSummary, RecommendationSelector, SavedSelection};

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateRecommendationRequest {
    pub assessment_id: Uuid,
    pub status: Option<RecommendationStatus>,
    #[serde(default)]
    pub plans: Vec<RecommendationPlan>,
    pub error_message: Option<String>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatedResponse {
    pub id: Uuid,
    pub status: RecommendationStatus,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SelectionRequest {
    pub patient_id: Uuid,
    pub plan_index: usize,
}

/// `POST /api/recommendations`
///
/// The assessment follows the recommendation status: `processing` while
/// pending, then `completed` or `failed`.
pub async fn create(
    State(ctx): State<ApiContext>,
    Json(request): Json<CreateRecommendationRequest>,
) -> Result<(StatusCode, Json<CreatedResponse>), ApiError> {
    let status = request.status.unwrap_or(RecommendationStatus::Pending);

    if status == RecommendationStatus::Completed && request.plans.is_empty() {
        return Err(ApiError::BadRequest(
            "A completed recommendation needs at least one plan".into(),
        ));
    }
    if let Some(plan) = request
        .plans
        .iter()
        .find(|p| p.title.trim().is_empty() || p.six_month_goal.trim().is_empty())
    {
        return Err(ApiError::BadRequest(format!(
            "Plan '{}' is missing a title or six-month goal",
            plan.title
        )));
    }

    let mut conn = ctx.open_db()?;
    if db::get_assessment(&conn, &request.assessment_id)?.is_none() {
        return Err(ApiError::NotFound(format!(
            "Assessment not found: {}",
            request.assessment_id
        )));
    }

    let now = db::now_naive();
    let recommendation = Recommendation {
        id: Uuid::new_v4(),
        assessment_id: request.assessment_id,
        status,
        plans: request.plans,
        error_message: request.error_message.filter(|_| status == RecommendationStatus::Failed),
        selected_plan_index: None,
        created_at: now,
        updated_at: now,
    };
    let assessment_status = match status {
        RecommendationStatus::Pending => AssessmentStatus::Processing,
        RecommendationStatus::Completed => AssessmentStatus::Completed,
        RecommendationStatus::Failed => AssessmentStatus::Failed,
    };

    let tx = conn.transaction().map_err(db::DatabaseError::from)?;
    db::insert_recommendation(&tx, &recommendation)?;
    db::update_assessment_status(&tx, &recommendation.assessment_id, assessment_status)?;
    tx.commit().map_err(db::DatabaseError::from)?;

    tracing::info!(
        recommendation_id = %recommendation.id,
        assessment_id = %recommendation.assessment_id,
        status = %status,
        plans = recommendation.plans.len(),
        "Recommendation registered"
    );

    Ok((
        StatusCode::CREATED,
        Json(CreatedResponse {
            id: recommendation.id,
            status,
        }),
    ))
}

/// `GET /api/recommendations/:id`
pub async fn detail(
    State(ctx): State<ApiContext>,
    Path(id): Path<Uuid>,
) -> Result<Json<Recommendation>, ApiError> {
    let conn = ctx.open_db()?;
    Ok(Json(load(&conn, &id)?))
}

/// `GET /api/recommendations/:id/plans`
pub async fn plans(
    State(ctx): State<ApiContext>,
    Path(id): Path<Uuid>,
) -> Result<Json<Vec<PlanSummary>>, ApiError> {
    let conn = ctx.open_db()?;
    let selector = RecommendationSelector::new(load(&conn, &id)?)?;
    Ok(Json(selector.summaries()))
}

/// `POST /api/recommendations/:id/selection`
pub async fn select(
    State(ctx): State<ApiContext>,
    Path(id): Path<Uuid>,
    Json(request): Json<SelectionRequest>,
) -> Result<(StatusCode, Json<SavedSelection>), ApiError> {
    let mut conn = ctx.open_db()?;
    let recommendation = load(&conn, &id)?;

    let owner = db::get_assessment(&conn, &recommendation.assessment_id)?
        .map(|a| a.patient_id)
        .ok_or_else(|| ApiError::NotFound(format!("Assessment not found: {}", recommendation.assessment_id)))?;
    if owner != request.patient_id {
        return Err(ApiError::BadRequest(
            "Recommendation belongs to a different patient".into(),
        ));
    }

    let mut selector = RecommendationSelector::new(recommendation)?;
    selector.select(request.plan_index)?;
    let saved = selection::save_selection(&mut conn, &selector, request.patient_id)?;

    ctx.core
        .notifications
        .success("목표가 저장되었습니다", Some(format!("{}개 목표 생성", saved.goals.len())));

    Ok((StatusCode::CREATED, Json(saved)))
}

fn load(conn: &rusqlite::Connection, id: &Uuid) -> Result<Recommendation, ApiError> {
    db::get_recommendation(conn, id)?
        .ok_or_else(|| ApiError::NotFound(format!("Recommendation not found: {id}")))
}
