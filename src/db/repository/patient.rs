use std::str::FromStr;

use chrono::NaiveDate;
use rusqlite::{params, Connection, OptionalExtension};
use uuid::Uuid;

use super::{parse_timestamp, parse_uuid};
use crate::db::{format_datetime, DatabaseError};
use crate::models::enums::PatientStatus;
use crate::models::Patient;

pub fn insert_patient(conn: &Connection, patient: &Patient) -> Result<(), DatabaseError> {
    conn.execute(
        "INSERT INTO patients (id, name, birth_date, diagnosis, social_worker_id, status, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        params![
            patient.id.to_string(),
            patient.name,
            patient.birth_date.map(|d| d.to_string()),
            patient.diagnosis,
            patient.social_worker_id,
            patient.status.as_str(),
            format_datetime(&patient.created_at),
        ],
    )?;
    Ok(())
}

type PatientRow = (String, String, Option<String>, Option<String>, Option<String>, String, String);

fn patient_from_row(row: PatientRow) -> Result<Patient, DatabaseError> {
    let (id, name, birth_date, diagnosis, social_worker_id, status, created_at) = row;
    Ok(Patient {
        id: parse_uuid(&id)?,
        name,
        birth_date: birth_date.and_then(|d| NaiveDate::parse_from_str(&d, "%Y-%m-%d").ok()),
        diagnosis,
        social_worker_id,
        status: PatientStatus::from_str(&status)?,
        created_at: parse_timestamp(&created_at),
    })
}

const PATIENT_COLUMNS: &str =
    "id, name, birth_date, diagnosis, social_worker_id, status, created_at";

fn read_patient_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<PatientRow> {
    Ok((
        row.get(0)?,
        row.get(1)?,
        row.get(2)?,
        row.get(3)?,
        row.get(4)?,
        row.get(5)?,
        row.get(6)?,
    ))
}

pub fn get_patient(conn: &Connection, id: &Uuid) -> Result<Option<Patient>, DatabaseError> {
    let row = conn
        .query_row(
            &format!("SELECT {PATIENT_COLUMNS} FROM patients WHERE id = ?1"),
            params![id.to_string()],
            read_patient_row,
        )
        .optional()?;
    row.map(patient_from_row).transpose()
}

pub fn patient_exists(conn: &Connection, id: &Uuid) -> Result<bool, DatabaseError> {
    let count: i64 = conn.query_row(
        "SELECT COUNT(*) FROM patients WHERE id = ?1",
        params![id.to_string()],
        |row| row.get(0),
    )?;
    Ok(count > 0)
}

/// Patients ordered by name, optionally restricted to one social worker.
pub fn list_patients(
    conn: &Connection,
    social_worker_id: Option<&str>,
) -> Result<Vec<Patient>, DatabaseError> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {PATIENT_COLUMNS} FROM patients
         WHERE (?1 IS NULL OR social_worker_id = ?1)
         ORDER BY name"
    ))?;
    let rows = stmt.query_map(params![social_worker_id], read_patient_row)?;

    let mut patients = Vec::new();
    for row in rows {
        patients.push(patient_from_row(row?)?);
    }
    Ok(patients)
}
