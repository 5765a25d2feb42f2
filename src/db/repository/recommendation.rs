use std::str::FromStr;

use rusqlite::{params, Connection, OptionalExtension};
use uuid::Uuid;

use super::{parse_timestamp, parse_uuid};
use crate::db::{format_datetime, now_naive, DatabaseError};
use crate::models::enums::RecommendationStatus;
use crate::models::{Recommendation, RecommendationSnapshot};

pub fn insert_recommendation(
    conn: &Connection,
    rec: &Recommendation,
) -> Result<(), DatabaseError> {
    conn.execute(
        "INSERT INTO ai_recommendations (id, assessment_id, status, plans, error_message,
         selected_plan_index, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
        params![
            rec.id.to_string(),
            rec.assessment_id.to_string(),
            rec.status.as_str(),
            serde_json::to_string(&rec.plans)?,
            rec.error_message,
            rec.selected_plan_index.map(|i| i as i64),
            format_datetime(&rec.created_at),
            format_datetime(&rec.updated_at),
        ],
    )?;
    Ok(())
}

const RECOMMENDATION_COLUMNS: &str = "id, assessment_id, status, plans, error_message,
     selected_plan_index, created_at, updated_at";

type RecommendationRow = (
    String, String, String, String,
    Option<String>, Option<i64>, String, String,
);

fn read_recommendation_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<RecommendationRow> {
    Ok((
        row.get(0)?,
        row.get(1)?,
        row.get(2)?,
        row.get(3)?,
        row.get(4)?,
        row.get(5)?,
        row.get(6)?,
        row.get(7)?,
    ))
}

fn recommendation_from_row(row: RecommendationRow) -> Result<Recommendation, DatabaseError> {
    let (id, assessment_id, status, plans, error_message, selected, created_at, updated_at) = row;
    Ok(Recommendation {
        id: parse_uuid(&id)?,
        assessment_id: parse_uuid(&assessment_id)?,
        status: RecommendationStatus::from_str(&status)?,
        plans: serde_json::from_str(&plans)?,
        error_message,
        selected_plan_index: selected.and_then(|i| usize::try_from(i).ok()),
        created_at: parse_timestamp(&created_at),
        updated_at: parse_timestamp(&updated_at),
    })
}

pub fn get_recommendation(
    conn: &Connection,
    id: &Uuid,
) -> Result<Option<Recommendation>, DatabaseError> {
    let row = conn
        .query_row(
            &format!("SELECT {RECOMMENDATION_COLUMNS} FROM ai_recommendations WHERE id = ?1"),
            params![id.to_string()],
            read_recommendation_row,
        )
        .optional()?;
    row.map(recommendation_from_row).transpose()
}

/// Latest recommendation written for an assessment (polling query contract).
pub fn get_latest_recommendation_for_assessment(
    conn: &Connection,
    assessment_id: &Uuid,
) -> Result<Option<Recommendation>, DatabaseError> {
    let row = conn
        .query_row(
            &format!(
                "SELECT {RECOMMENDATION_COLUMNS} FROM ai_recommendations
                 WHERE assessment_id = ?1
                 ORDER BY created_at DESC, rowid DESC LIMIT 1"
            ),
            params![assessment_id.to_string()],
            read_recommendation_row,
        )
        .optional()?;
    row.map(recommendation_from_row).transpose()
}

/// Status-only variant of the polling query; skips decoding the plans.
pub fn get_recommendation_snapshot(
    conn: &Connection,
    assessment_id: &Uuid,
) -> Result<Option<RecommendationSnapshot>, DatabaseError> {
    let row = conn
        .query_row(
            "SELECT id, status, error_message FROM ai_recommendations
             WHERE assessment_id = ?1
             ORDER BY created_at DESC, rowid DESC LIMIT 1",
            params![assessment_id.to_string()],
            |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, Option<String>>(2)?,
                ))
            },
        )
        .optional()?;

    row.map(|(id, status, error_message)| {
        Ok(RecommendationSnapshot {
            id: parse_uuid(&id)?,
            status: RecommendationStatus::from_str(&status)?,
            error_message,
        })
    })
    .transpose()
}

/// Mark one recommendation of an assessment as completed.
pub fn mark_recommendation_completed(
    conn: &Connection,
    recommendation_id: &Uuid,
    assessment_id: &Uuid,
) -> Result<(), DatabaseError> {
    let updated = conn.execute(
        "UPDATE ai_recommendations SET status = 'completed', error_message = NULL, updated_at = ?1
         WHERE id = ?2 AND assessment_id = ?3",
        params![
            format_datetime(&now_naive()),
            recommendation_id.to_string(),
            assessment_id.to_string(),
        ],
    )?;
    if updated == 0 {
        return Err(DatabaseError::NotFound {
            entity_type: "Recommendation".into(),
            id: recommendation_id.to_string(),
        });
    }
    Ok(())
}

/// Fail every still-pending recommendation of an assessment.
/// Returns the number of rows changed.
pub fn mark_recommendations_failed(
    conn: &Connection,
    assessment_id: &Uuid,
    error_message: &str,
) -> Result<usize, DatabaseError> {
    let updated = conn.execute(
        "UPDATE ai_recommendations SET status = 'failed', error_message = ?1, updated_at = ?2
         WHERE assessment_id = ?3 AND status = 'pending'",
        params![
            error_message,
            format_datetime(&now_naive()),
            assessment_id.to_string(),
        ],
    )?;
    Ok(updated)
}

pub fn set_selected_plan(
    conn: &Connection,
    recommendation_id: &Uuid,
    plan_index: usize,
) -> Result<(), DatabaseError> {
    let updated = conn.execute(
        "UPDATE ai_recommendations SET selected_plan_index = ?1, updated_at = ?2 WHERE id = ?3",
        params![
            plan_index as i64,
            format_datetime(&now_naive()),
            recommendation_id.to_string(),
        ],
    )?;
    if updated == 0 {
        return Err(DatabaseError::NotFound {
            entity_type: "Recommendation".into(),
            id: recommendation_id.to_string(),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::repository::fixtures::*;
    use crate::db::sqlite::open_memory_database;

    fn seeded() -> (Connection, Uuid) {
        let conn = open_memory_database().unwrap();
        let patient_id = make_patient(&conn);
        let assessment_id = make_assessment(&conn, patient_id);
        (conn, assessment_id)
    }

    #[test]
    fn plans_survive_storage() {
        let (conn, assessment_id) = seeded();
        let id = make_recommendation(&conn, assessment_id, RecommendationStatus::Completed);

        let rec = get_recommendation(&conn, &id).unwrap().unwrap();
        assert_eq!(rec.plans.len(), 2);
        assert_eq!(rec.plans[0], sample_plan("A안"));
        assert_eq!(rec.selected_plan_index, None);
    }

    #[test]
    fn no_recommendation_yet_is_none() {
        let (conn, assessment_id) = seeded();
        assert!(get_latest_recommendation_for_assessment(&conn, &assessment_id)
            .unwrap()
            .is_none());
        assert!(get_recommendation_snapshot(&conn, &assessment_id).unwrap().is_none());
    }

    #[test]
    fn latest_recommendation_wins() {
        let (conn, assessment_id) = seeded();
        make_recommendation(&conn, assessment_id, RecommendationStatus::Failed);
        let newer = make_recommendation(&conn, assessment_id, RecommendationStatus::Pending);

        let snapshot = get_recommendation_snapshot(&conn, &assessment_id).unwrap().unwrap();
        assert_eq!(snapshot.id, newer);
        assert_eq!(snapshot.status, RecommendationStatus::Pending);
    }

    #[test]
    fn mark_completed_updates_matching_row() {
        let (conn, assessment_id) = seeded();
        let id = make_recommendation(&conn, assessment_id, RecommendationStatus::Pending);

        mark_recommendation_completed(&conn, &id, &assessment_id).unwrap();
        let snapshot = get_recommendation_snapshot(&conn, &assessment_id).unwrap().unwrap();
        assert_eq!(snapshot.status, RecommendationStatus::Completed);
    }

    #[test]
    fn mark_completed_rejects_wrong_assessment() {
        let (conn, assessment_id) = seeded();
        let id = make_recommendation(&conn, assessment_id, RecommendationStatus::Pending);

        let result = mark_recommendation_completed(&conn, &id, &Uuid::new_v4());
        assert!(matches!(result, Err(DatabaseError::NotFound { .. })));
    }

    #[test]
    fn mark_failed_only_touches_pending_rows() {
        let (conn, assessment_id) = seeded();
        let done = make_recommendation(&conn, assessment_id, RecommendationStatus::Completed);
        make_recommendation(&conn, assessment_id, RecommendationStatus::Pending);

        let changed = mark_recommendations_failed(&conn, &assessment_id, "model crashed").unwrap();
        assert_eq!(changed, 1);
        let untouched = get_recommendation(&conn, &done).unwrap().unwrap();
        assert_eq!(untouched.status, RecommendationStatus::Completed);

        let snapshot = get_recommendation_snapshot(&conn, &assessment_id).unwrap().unwrap();
        assert_eq!(snapshot.status, RecommendationStatus::Failed);
        assert_eq!(snapshot.error_message.as_deref(), Some("model crashed"));
    }

    #[test]
    fn selected_plan_is_recorded() {
        let (conn, assessment_id) = seeded();
        let id = make_recommendation(&conn, assessment_id, RecommendationStatus::Completed);

        set_selected_plan(&conn, &id, 1).unwrap();
        let rec = get_recommendation(&conn, &id).unwrap().unwrap();
        assert_eq!(rec.selected_plan_index, Some(1));
    }
}
