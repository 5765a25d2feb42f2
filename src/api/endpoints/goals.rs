//! `GET /api/patients/:id/goals`: a patient's goal tree, flattened.

use axum::extract::{Path, State};
use axum::Json;
use uuid::Uuid;

use crate::api::error::ApiError;
use crate::api::types::ApiContext;
use crate::db;
use crate::models::Goal;

pub async fn list(
    State(ctx): State<ApiContext>,
    Path(patient_id): Path<Uuid>,
) -> Result<Json<Vec<Goal>>, ApiError> {
    let conn = ctx.open_db()?;
    if !db::patient_exists(&conn, &patient_id)? {
        return Err(ApiError::NotFound(format!("Patient not found: {patient_id}")));
    }
    Ok(Json(db::list_goals_for_patient(&conn, &patient_id)?))
}
