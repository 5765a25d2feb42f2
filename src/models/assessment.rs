use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::enums::{AssessmentStatus, FocusTime, SocialPreference};

/// Stored intake record. Tag lists hold normalized storage labels.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Assessment {
    pub id: Uuid,
    pub patient_id: Uuid,
    pub focus_time: FocusTime,
    pub motivation_level: u8,
    pub past_successes: Vec<String>,
    pub constraints: Vec<String>,
    pub social_preference: SocialPreference,
    pub notes: Option<String>,
    pub assessed_by: String,
    pub status: AssessmentStatus,
    pub created_at: NaiveDateTime,
}
