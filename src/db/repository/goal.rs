use std::str::FromStr;

use rusqlite::{params, Connection};
use uuid::Uuid;

use super::{parse_timestamp, parse_uuid};
use crate::db::{format_datetime, DatabaseError};
use crate::models::enums::{GoalStatus, GoalType};
use crate::models::Goal;

pub fn insert_goal(conn: &Connection, goal: &Goal) -> Result<(), DatabaseError> {
    conn.execute(
        "INSERT INTO goals (id, patient_id, parent_goal_id, goal_type, title, sequence, status,
         source_recommendation_id, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
        params![
            goal.id.to_string(),
            goal.patient_id.to_string(),
            goal.parent_goal_id.map(|id| id.to_string()),
            goal.goal_type.as_str(),
            goal.title,
            goal.sequence,
            goal.status.as_str(),
            goal.source_recommendation_id.map(|id| id.to_string()),
            format_datetime(&goal.created_at),
        ],
    )?;
    Ok(())
}

/// Goals of a patient: six-month first, then monthly, then weekly, each by sequence.
pub fn list_goals_for_patient(
    conn: &Connection,
    patient_id: &Uuid,
) -> Result<Vec<Goal>, DatabaseError> {
    let mut stmt = conn.prepare(
        "SELECT id, patient_id, parent_goal_id, goal_type, title, sequence, status,
         source_recommendation_id, created_at
         FROM goals WHERE patient_id = ?1
         ORDER BY CASE goal_type WHEN 'six_month' THEN 0 WHEN 'monthly' THEN 1 ELSE 2 END,
                  sequence, rowid",
    )?;

    let rows = stmt.query_map(params![patient_id.to_string()], |row| {
        Ok((
            row.get::<_, String>(0)?,
            row.get::<_, String>(1)?,
            row.get::<_, Option<String>>(2)?,
            row.get::<_, String>(3)?,
            row.get::<_, String>(4)?,
            row.get::<_, i32>(5)?,
            row.get::<_, String>(6)?,
            row.get::<_, Option<String>>(7)?,
            row.get::<_, String>(8)?,
        ))
    })?;

    let mut goals = Vec::new();
    for row in rows {
        let (id, patient_id, parent, goal_type, title, sequence, status, source, created_at) =
            row?;
        goals.push(Goal {
            id: parse_uuid(&id)?,
            patient_id: parse_uuid(&patient_id)?,
            parent_goal_id: parent.and_then(|s| Uuid::parse_str(&s).ok()),
            goal_type: GoalType::from_str(&goal_type)?,
            title,
            sequence,
            status: GoalStatus::from_str(&status)?,
            source_recommendation_id: source.and_then(|s| Uuid::parse_str(&s).ok()),
            created_at: parse_timestamp(&created_at),
        });
    }
    Ok(goals)
}

/// Remove goals previously materialized from a recommendation.
pub fn delete_goals_from_recommendation(
    conn: &Connection,
    recommendation_id: &Uuid,
) -> Result<usize, DatabaseError> {
    let deleted = conn.execute(
        "DELETE FROM goals WHERE source_recommendation_id = ?1",
        params![recommendation_id.to_string()],
    )?;
    Ok(deleted)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::repository::fixtures::*;
    use crate::db::sqlite::open_memory_database;

    fn goal(patient_id: Uuid, goal_type: GoalType, sequence: i32, parent: Option<Uuid>) -> Goal {
        Goal {
            id: Uuid::new_v4(),
            patient_id,
            parent_goal_id: parent,
            goal_type,
            title: format!("{} #{sequence}", goal_type.as_str()),
            sequence,
            status: GoalStatus::Pending,
            source_recommendation_id: None,
            created_at: fixed_time(),
        }
    }

    #[test]
    fn goals_listed_by_level_then_sequence() {
        let conn = open_memory_database().unwrap();
        let patient_id = make_patient(&conn);
        let top = goal(patient_id, GoalType::SixMonth, 0, None);
        insert_goal(&conn, &top).unwrap();
        insert_goal(&conn, &goal(patient_id, GoalType::Weekly, 0, Some(top.id))).unwrap();
        insert_goal(&conn, &goal(patient_id, GoalType::Monthly, 2, Some(top.id))).unwrap();
        insert_goal(&conn, &goal(patient_id, GoalType::Monthly, 1, Some(top.id))).unwrap();

        let goals = list_goals_for_patient(&conn, &patient_id).unwrap();
        let order: Vec<_> = goals.iter().map(|g| (g.goal_type, g.sequence)).collect();
        assert_eq!(
            order,
            vec![
                (GoalType::SixMonth, 0),
                (GoalType::Monthly, 1),
                (GoalType::Monthly, 2),
                (GoalType::Weekly, 0),
            ]
        );
    }

    #[test]
    fn delete_by_recommendation_leaves_other_goals() {
        let conn = open_memory_database().unwrap();
        let patient_id = make_patient(&conn);
        let assessment_id = make_assessment(&conn, patient_id);
        let rec_id = make_recommendation(
            &conn,
            assessment_id,
            crate::models::enums::RecommendationStatus::Completed,
        );

        let mut from_rec = goal(patient_id, GoalType::SixMonth, 0, None);
        from_rec.source_recommendation_id = Some(rec_id);
        insert_goal(&conn, &from_rec).unwrap();
        insert_goal(&conn, &goal(patient_id, GoalType::SixMonth, 1, None)).unwrap();

        assert_eq!(delete_goals_from_recommendation(&conn, &rec_id).unwrap(), 1);
        assert_eq!(list_goals_for_patient(&conn, &patient_id).unwrap().len(), 1);
    }
}
