use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::enums::RecommendationStatus;

/// One month of the coarse plan outline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MonthlyGoal {
    pub month: u8,
    pub goal: String,
}

/// A candidate goal plan produced by the AI job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecommendationPlan {
    pub title: String,
    #[serde(default)]
    pub purpose: Option<String>,
    pub six_month_goal: String,
    #[serde(default)]
    pub monthly_goals: Vec<MonthlyGoal>,
    #[serde(default)]
    pub weekly_goals: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Recommendation {
    pub id: Uuid,
    pub assessment_id: Uuid,
    pub status: RecommendationStatus,
    pub plans: Vec<RecommendationPlan>,
    pub error_message: Option<String>,
    pub selected_plan_index: Option<usize>,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

/// Status-only view of a recommendation, as seen by the poller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecommendationSnapshot {
    pub id: Uuid,
    pub status: RecommendationStatus,
    pub error_message: Option<String>,
}

impl From<&Recommendation> for RecommendationSnapshot {
    fn from(rec: &Recommendation) -> Self {
        Self {
            id: rec.id,
            status: rec.status,
            error_message: rec.error_message.clone(),
        }
    }
}
