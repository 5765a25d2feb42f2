//! Recommendation selection: the last step of the goal-setting session.
//!
//! Presents the candidate plans of a completed recommendation side by side,
//! tracks the single plan the social worker picks, and turns that plan into
//! stored goals (six-month → monthly → weekly).

use rusqlite::Connection;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::db::{self, DatabaseError};
use crate::models::enums::{GoalStatus, GoalType, RecommendationStatus};
use crate::models::{Goal, Recommendation, RecommendationPlan};

#[derive(Error, Debug)]
pub enum SelectionError {
    #[error("Recommendation is not ready (status: {0})")]
    NotReady(RecommendationStatus),

    #[error("Recommendation has no plans")]
    NoPlans,

    #[error("Plan index {index} out of range ({count} plans)")]
    InvalidIndex { index: usize, count: usize },

    #[error("No plan selected")]
    NothingSelected,

    #[error("Database error: {0}")]
    Database(#[from] DatabaseError),
}

/// One row of the plan comparison view.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlanSummary {
    pub index: usize,
    pub title: String,
    pub purpose: Option<String>,
    pub six_month_goal: String,
    pub monthly_goal_count: usize,
    pub weekly_goal_count: usize,
    pub selected: bool,
}

/// Goals created from a selection.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SavedSelection {
    pub recommendation_id: Uuid,
    pub plan_index: usize,
    pub goals: Vec<Goal>,
}

#[derive(Debug, Clone)]
pub struct RecommendationSelector {
    recommendation: Recommendation,
    selected: Option<usize>,
}

impl RecommendationSelector {
    /// Only completed recommendations with at least one plan can be shown.
    /// A previously saved selection is restored.
    pub fn new(recommendation: Recommendation) -> Result<Self, SelectionError> {
        if recommendation.status != RecommendationStatus::Completed {
            return Err(SelectionError::NotReady(recommendation.status));
        }
        if recommendation.plans.is_empty() {
            return Err(SelectionError::NoPlans);
        }
        let selected = recommendation
            .selected_plan_index
            .filter(|i| *i < recommendation.plans.len());
        Ok(Self {
            recommendation,
            selected,
        })
    }

    pub fn recommendation_id(&self) -> Uuid {
        self.recommendation.id
    }

    pub fn plans(&self) -> &[RecommendationPlan] {
        &self.recommendation.plans
    }

    pub fn summaries(&self) -> Vec<PlanSummary> {
        self.recommendation
            .plans
            .iter()
            .enumerate()
            .map(|(index, plan)| PlanSummary {
                index,
                title: plan.title.clone(),
                purpose: plan.purpose.clone(),
                six_month_goal: plan.six_month_goal.clone(),
                monthly_goal_count: plan.monthly_goals.len(),
                weekly_goal_count: plan.weekly_goals.len(),
                selected: self.selected == Some(index),
            })
            .collect()
    }

    /// Select a plan. A new selection replaces the previous one.
    pub fn select(&mut self, index: usize) -> Result<&RecommendationPlan, SelectionError> {
        let count = self.recommendation.plans.len();
        let plan = self
            .recommendation
            .plans
            .get(index)
            .ok_or(SelectionError::InvalidIndex { index, count })?;
        self.selected = Some(index);
        Ok(plan)
    }

    pub fn clear(&mut self) {
        self.selected = None;
    }

    pub fn selected_index(&self) -> Option<usize> {
        self.selected
    }

    pub fn selected_plan(&self) -> Option<&RecommendationPlan> {
        self.selected.and_then(|i| self.recommendation.plans.get(i))
    }
}

/// Build the goal tree for a plan. Monthly goals hang off the six-month
/// goal; weekly goals hang off the first monthly goal, or the six-month
/// goal when the plan has no monthly outline.
pub fn goals_for_plan(
    plan: &RecommendationPlan,
    patient_id: Uuid,
    recommendation_id: Uuid,
) -> Vec<Goal> {
    let created_at = db::now_naive();
    let make = |goal_type, title: &str, sequence: i32, parent, status| Goal {
        id: Uuid::new_v4(),
        patient_id,
        parent_goal_id: parent,
        goal_type,
        title: title.trim().to_string(),
        sequence,
        status,
        source_recommendation_id: Some(recommendation_id),
        created_at,
    };

    let top = make(GoalType::SixMonth, &plan.six_month_goal, 0, None, GoalStatus::Active);
    let top_id = top.id;
    let mut goals = vec![top];

    let mut monthly: Vec<_> = plan.monthly_goals.iter().collect();
    monthly.sort_by_key(|m| m.month);
    for m in &monthly {
        goals.push(make(
            GoalType::Monthly,
            &m.goal,
            i32::from(m.month),
            Some(top_id),
            GoalStatus::Pending,
        ));
    }

    let weekly_parent = goals.get(1).map(|g| g.id).unwrap_or(top_id);
    for (i, title) in plan.weekly_goals.iter().enumerate() {
        goals.push(make(
            GoalType::Weekly,
            title,
            i as i32 + 1,
            Some(weekly_parent),
            GoalStatus::Pending,
        ));
    }

    goals
}

/// Persist the selection and materialize its goals in one transaction.
/// Goals from an earlier selection of the same recommendation are replaced.
pub fn save_selection(
    conn: &mut Connection,
    selector: &RecommendationSelector,
    patient_id: Uuid,
) -> Result<SavedSelection, SelectionError> {
    let plan_index = selector.selected_index().ok_or(SelectionError::NothingSelected)?;
    let plan = selector.selected_plan().ok_or(SelectionError::NothingSelected)?;
    let recommendation_id = selector.recommendation_id();

    let goals = goals_for_plan(plan, patient_id, recommendation_id);

    let tx = conn.transaction().map_err(DatabaseError::from)?;
    let replaced = db::delete_goals_from_recommendation(&tx, &recommendation_id)?;
    db::set_selected_plan(&tx, &recommendation_id, plan_index)?;
    for goal in &goals {
        db::insert_goal(&tx, goal)?;
    }
    tx.commit().map_err(DatabaseError::from)?;

    tracing::info!(
        %recommendation_id,
        %patient_id,
        plan_index,
        goals = goals.len(),
        replaced,
        "Recommendation plan selected"
    );

    Ok(SavedSelection {
        recommendation_id,
        plan_index,
        goals,
    })
}
