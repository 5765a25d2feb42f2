use std::str::FromStr;

use rusqlite::{params, Connection, OptionalExtension};
use uuid::Uuid;

use super::{parse_timestamp, parse_uuid};
use crate::db::{format_datetime, DatabaseError};
use crate::models::enums::*;
use crate::models::Assessment;

pub fn insert_assessment(conn: &Connection, assessment: &Assessment) -> Result<(), DatabaseError> {
    conn.execute(
        "INSERT INTO assessments (id, patient_id, focus_time, motivation_level, past_successes,
         constraints, social_preference, notes, assessed_by, status, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
        params![
            assessment.id.to_string(),
            assessment.patient_id.to_string(),
            assessment.focus_time.as_str(),
            assessment.motivation_level as i32,
            serde_json::to_string(&assessment.past_successes)?,
            serde_json::to_string(&assessment.constraints)?,
            assessment.social_preference.as_str(),
            assessment.notes,
            assessment.assessed_by,
            assessment.status.as_str(),
            format_datetime(&assessment.created_at),
        ],
    )?;
    Ok(())
}

const ASSESSMENT_COLUMNS: &str = "id, patient_id, focus_time, motivation_level, past_successes,
     constraints, social_preference, notes, assessed_by, status, created_at";

type AssessmentRow = (
    String, String, String, i32,
    String, String, String,
    Option<String>, String, String, String,
);

fn read_assessment_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<AssessmentRow> {
    Ok((
        row.get(0)?,
        row.get(1)?,
        row.get(2)?,
        row.get(3)?,
        row.get(4)?,
        row.get(5)?,
        row.get(6)?,
        row.get(7)?,
        row.get(8)?,
        row.get(9)?,
        row.get(10)?,
    ))
}

fn assessment_from_row(row: AssessmentRow) -> Result<Assessment, DatabaseError> {
    let (
        id, patient_id, focus_time, motivation_level, past_successes,
        constraints, social_preference, notes, assessed_by, status, created_at,
    ) = row;
    Ok(Assessment {
        id: parse_uuid(&id)?,
        patient_id: parse_uuid(&patient_id)?,
        focus_time: FocusTime::from_str(&focus_time)?,
        motivation_level: motivation_level.clamp(0, u8::MAX as i32) as u8,
        past_successes: serde_json::from_str(&past_successes)?,
        constraints: serde_json::from_str(&constraints)?,
        social_preference: SocialPreference::from_str(&social_preference)?,
        notes,
        assessed_by,
        status: AssessmentStatus::from_str(&status)?,
        created_at: parse_timestamp(&created_at),
    })
}

pub fn get_assessment(conn: &Connection, id: &Uuid) -> Result<Option<Assessment>, DatabaseError> {
    let row = conn
        .query_row(
            &format!("SELECT {ASSESSMENT_COLUMNS} FROM assessments WHERE id = ?1"),
            params![id.to_string()],
            read_assessment_row,
        )
        .optional()?;
    row.map(assessment_from_row).transpose()
}

/// Assessments for one patient, newest first.
pub fn list_assessments_for_patient(
    conn: &Connection,
    patient_id: &Uuid,
) -> Result<Vec<Assessment>, DatabaseError> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {ASSESSMENT_COLUMNS} FROM assessments
         WHERE patient_id = ?1 ORDER BY created_at DESC, rowid DESC"
    ))?;
    let rows = stmt.query_map(params![patient_id.to_string()], read_assessment_row)?;

    let mut assessments = Vec::new();
    for row in rows {
        assessments.push(assessment_from_row(row?)?);
    }
    Ok(assessments)
}

/// The status column is the only mutable part of an assessment.
pub fn update_assessment_status(
    conn: &Connection,
    id: &Uuid,
    status: AssessmentStatus,
) -> Result<(), DatabaseError> {
    let updated = conn.execute(
        "UPDATE assessments SET status = ?1 WHERE id = ?2",
        params![status.as_str(), id.to_string()],
    )?;
    if updated == 0 {
        return Err(DatabaseError::NotFound {
            entity_type: "Assessment".into(),
            id: id.to_string(),
        });
    }
    Ok(())
}
