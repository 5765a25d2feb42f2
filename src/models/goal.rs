use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::enums::{GoalStatus, GoalType};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Goal {
    pub id: Uuid,
    pub patient_id: Uuid,
    pub parent_goal_id: Option<Uuid>,
    pub goal_type: GoalType,
    pub title: String,
    pub sequence: i32,
    pub status: GoalStatus,
    pub source_recommendation_id: Option<Uuid>,
    pub created_at: NaiveDateTime,
}
