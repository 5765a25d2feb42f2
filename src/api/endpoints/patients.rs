//! Patient endpoints.
//!
//! - `POST /api/patients`: register a patient
//! - `GET /api/patients`: list, optionally by social worker
//! - `GET /api/patients/:id`: one patient
//! - `GET /api/patients/:id/assessments`: assessments, newest first

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use chrono::NaiveDate;
use serde::Deserialize;
use uuid::Uuid;

use crate::api::error::ApiError;
use crate::api::types::{require_text, ApiContext};
use crate::db;
use crate::models::enums::PatientStatus;
use crate::models::{Assessment, Patient};

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatePatientRequest {
    pub name: Option<String>,
    pub birth_date: Option<NaiveDate>,
    pub diagnosis: Option<String>,
    pub social_worker_id: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PatientListQuery {
    pub social_worker_id: Option<String>,
}

/// `POST /api/patients`
pub async fn create(
    State(ctx): State<ApiContext>,
    Json(request): Json<CreatePatientRequest>,
) -> Result<(StatusCode, Json<Patient>), ApiError> {
    let name = require_text("name", request.name.as_deref())?;

    let patient = Patient {
        id: Uuid::new_v4(),
        name,
        birth_date: request.birth_date,
        diagnosis: request.diagnosis.filter(|d| !d.trim().is_empty()),
        social_worker_id: request.social_worker_id.filter(|s| !s.trim().is_empty()),
        status: PatientStatus::Active,
        created_at: db::now_naive(),
    };

    let conn = ctx.open_db()?;
    db::insert_patient(&conn, &patient)?;
    tracing::info!(patient_id = %patient.id, "Patient registered");

    Ok((StatusCode::CREATED, Json(patient)))
}

/// `GET /api/patients`
pub async fn list(
    State(ctx): State<ApiContext>,
    Query(query): Query<PatientListQuery>,
) -> Result<Json<Vec<Patient>>, ApiError> {
    let conn = ctx.open_db()?;
    let patients = db::list_patients(&conn, query.social_worker_id.as_deref())?;
    Ok(Json(patients))
}

/// `GET /api/patients/:id`
pub async fn detail(
    State(ctx): State<ApiContext>,
    Path(id): Path<Uuid>,
) -> Result<Json<Patient>, ApiError> {
    let conn = ctx.open_db()?;
    db::get_patient(&conn, &id)?
        .map(Json)
        .ok_or_else(|| ApiError::NotFound(format!("Patient not found: {id}")))
}

/// `GET /api/patients/:id/assessments`
pub async fn assessments(
    State(ctx): State<ApiContext>,
    Path(id): Path<Uuid>,
) -> Result<Json<Vec<Assessment>>, ApiError> {
    let conn = ctx.open_db()?;
    if !db::patient_exists(&conn, &id)? {
        return Err(ApiError::NotFound(format!("Patient not found: {id}")));
    }
    Ok(Json(db::list_assessments_for_patient(&conn, &id)?))
}
