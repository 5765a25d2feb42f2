use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::enums::PatientStatus;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Patient {
    pub id: Uuid,
    pub name: String,
    pub birth_date: Option<NaiveDate>,
    pub diagnosis: Option<String>,
    pub social_worker_id: Option<String>,
    pub status: PatientStatus,
    pub created_at: NaiveDateTime,
}
