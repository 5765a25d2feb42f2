//! Assessment submission: the first step of the goal-setting session.
//!
//! Takes the in-progress intake form, normalizes multi-select tag codes to
//! their storage labels, inserts one `assessments` row and hands the new
//! record to the AI job runner.

use rusqlite::Connection;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::ai_trigger::AiJobTrigger;
use crate::db::{self, DatabaseError};
use crate::models::enums::{AssessmentStatus, FocusTime, SocialPreference};
use crate::models::Assessment;

// ═══════════════════════════════════════════
// Constants: tag catalogs
// ═══════════════════════════════════════════

/// Code that unlocks the free-text field of a multi-select group.
pub const OTHER_CODE: &str = "other";

/// Prefix of the label built from free text.
pub const OTHER_LABEL_PREFIX: &str = "기타";

pub const PAST_SUCCESS_TAGS: &[(&str, &str)] = &[
    ("cooking", "요리/베이킹"),
    ("exercise", "운동/산책"),
    ("art", "그림/만들기"),
    ("music", "음악 감상/악기"),
    ("reading", "독서/글쓰기"),
    ("gardening", "원예/식물 키우기"),
    ("volunteering", "봉사활동"),
    ("work", "직업 훈련/아르바이트"),
    ("other", "기타"),
];

pub const CONSTRAINT_TAGS: &[(&str, &str)] = &[
    ("transportation", "교통편 부족"),
    ("financial", "경제적 부담"),
    ("time", "시간 부족"),
    ("health", "신체 건강 문제"),
    ("anxiety", "대인관계 불안"),
    ("family", "가족 지지 부족"),
    ("information", "정보 부족"),
    ("other", "기타"),
];

pub const MOTIVATION_MIN: u8 = 1;
pub const MOTIVATION_MAX: u8 = 10;

// ═══════════════════════════════════════════
// Types
// ═══════════════════════════════════════════

#[derive(Error, Debug)]
pub enum SubmitError {
    #[error("Invalid assessment: {0}")]
    Validation(String),

    #[error("Unknown {group} tag: {code}")]
    UnknownTag { group: &'static str, code: String },

    #[error("Persistence error: {0}")]
    Persistence(#[from] DatabaseError),
}

/// In-progress form data, as the wizard holds it before submission.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssessmentDraft {
    pub focus_time: Option<FocusTime>,
    pub motivation_level: Option<u8>,
    #[serde(default)]
    pub past_successes: Vec<String>,
    pub past_success_other: Option<String>,
    #[serde(default)]
    pub constraints: Vec<String>,
    pub constraint_other: Option<String>,
    pub social_preference: Option<SocialPreference>,
    pub notes: Option<String>,
}

/// Code/label pair for building the form.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TagOption {
    pub code: String,
    pub label: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TagCatalog {
    pub past_successes: Vec<TagOption>,
    pub constraints: Vec<TagOption>,
}

pub fn tag_catalog() -> TagCatalog {
    fn options(table: &[(&str, &str)]) -> Vec<TagOption> {
        table
            .iter()
            .map(|(code, label)| TagOption {
                code: (*code).to_string(),
                label: (*label).to_string(),
            })
            .collect()
    }
    TagCatalog {
        past_successes: options(PAST_SUCCESS_TAGS),
        constraints: options(CONSTRAINT_TAGS),
    }
}

// ═══════════════════════════════════════════
// Normalization
// ═══════════════════════════════════════════

/// Map tag codes to storage labels.
///
/// Duplicates collapse, first occurrence wins. The `other` code itself is
/// not stored; when selected with non-empty free text, `기타: <text>` is
/// appended instead.
pub fn normalize_tags(
    group: &'static str,
    table: &[(&str, &str)],
    codes: &[String],
    other_text: Option<&str>,
) -> Result<Vec<String>, SubmitError> {
    let mut labels: Vec<String> = Vec::with_capacity(codes.len() + 1);
    let mut other_selected = false;

    for code in codes {
        let code = code.trim();
        if code == OTHER_CODE {
            other_selected = true;
            continue;
        }
        let label = table
            .iter()
            .find(|(c, _)| *c == code)
            .map(|(_, label)| (*label).to_string())
            .ok_or_else(|| SubmitError::UnknownTag {
                group,
                code: code.to_string(),
            })?;
        if !labels.contains(&label) {
            labels.push(label);
        }
    }

    if other_selected {
        if let Some(text) = other_text.map(str::trim).filter(|t| !t.is_empty()) {
            labels.push(format!("{OTHER_LABEL_PREFIX}: {text}"));
        }
    }

    Ok(labels)
}

/// Validate a draft and build the record to insert.
pub fn build_assessment(
    patient_id: Uuid,
    assessed_by: &str,
    draft: &AssessmentDraft,
) -> Result<Assessment, SubmitError> {
    if assessed_by.trim().is_empty() {
        return Err(SubmitError::Validation("Assessor is required".into()));
    }
    let focus_time = draft
        .focus_time
        .ok_or_else(|| SubmitError::Validation("Focus time is required".into()))?;
    let social_preference = draft
        .social_preference
        .ok_or_else(|| SubmitError::Validation("Social preference is required".into()))?;
    let motivation_level = draft
        .motivation_level
        .ok_or_else(|| SubmitError::Validation("Motivation level is required".into()))?;
    if !(MOTIVATION_MIN..=MOTIVATION_MAX).contains(&motivation_level) {
        return Err(SubmitError::Validation(format!(
            "Motivation level must be between {MOTIVATION_MIN} and {MOTIVATION_MAX}"
        )));
    }

    let past_successes = normalize_tags(
        "past success",
        PAST_SUCCESS_TAGS,
        &draft.past_successes,
        draft.past_success_other.as_deref(),
    )?;
    let constraints = normalize_tags(
        "constraint",
        CONSTRAINT_TAGS,
        &draft.constraints,
        draft.constraint_other.as_deref(),
    )?;

    Ok(Assessment {
        id: Uuid::new_v4(),
        patient_id,
        focus_time,
        motivation_level,
        past_successes,
        constraints,
        social_preference,
        notes: draft
            .notes
            .as_deref()
            .map(str::trim)
            .filter(|n| !n.is_empty())
            .map(String::from),
        assessed_by: assessed_by.trim().to_string(),
        status: AssessmentStatus::Submitted,
        created_at: db::now_naive(),
    })
}

// ═══════════════════════════════════════════
// Submission
// ═══════════════════════════════════════════

/// Validate, normalize and insert one assessment.
pub fn record_assessment(
    conn: &Connection,
    patient_id: Uuid,
    assessed_by: &str,
    draft: &AssessmentDraft,
) -> Result<Assessment, SubmitError> {
    if !db::patient_exists(conn, &patient_id)? {
        return Err(SubmitError::Persistence(DatabaseError::NotFound {
            entity_type: "Patient".into(),
            id: patient_id.to_string(),
        }));
    }

    let assessment = build_assessment(patient_id, assessed_by, draft)?;
    db::insert_assessment(conn, &assessment)?;

    tracing::info!(
        assessment_id = %assessment.id,
        patient_id = %patient_id,
        motivation = assessment.motivation_level,
        "Assessment recorded"
    );
    Ok(assessment)
}

/// Record the assessment, then ask the AI job runner to process it.
///
/// The connection is released before the network call. A trigger failure
/// is logged and does not undo the insert.
pub async fn submit_assessment(
    conn: Connection,
    trigger: &dyn AiJobTrigger,
    patient_id: Uuid,
    assessed_by: &str,
    draft: &AssessmentDraft,
) -> Result<Assessment, SubmitError> {
    let assessment = record_assessment(&conn, patient_id, assessed_by, draft)?;
    drop(conn);

    if let Err(e) = trigger.request_processing(&assessment).await {
        tracing::warn!(
            assessment_id = %assessment.id,
            error = %e,
            "AI processing trigger failed; waiting on the job runner"
        );
    }

    Ok(assessment)
}

// ═══════════════════════════════════════════
// Tests
// ═══════════════════════════════════════════

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;

    use super::*;
    use crate::ai_trigger::TriggerError;
    use crate::db::repository::fixtures::make_patient;
    use crate::db::sqlite::open_memory_database;

    fn complete_draft() -> AssessmentDraft {
        AssessmentDraft {
            focus_time: Some(FocusTime::From15To30Min),
            motivation_level: Some(7),
            past_successes: vec!["cooking".into(), "exercise".into()],
            past_success_other: None,
            constraints: vec!["transportation".into()],
            constraint_other: None,
            social_preference: Some(SocialPreference::SmallGroup),
            notes: Some("  주말에 가족 방문  ".into()),
        }
    }

    struct CountingTrigger {
        calls: AtomicUsize,
        fail: bool,
    }

    #[async_trait]
    impl AiJobTrigger for CountingTrigger {
        async fn request_processing(&self, _: &Assessment) -> Result<(), TriggerError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                Err(TriggerError::Rejected(503))
            } else {
                Ok(())
            }
        }
    }

    // ───────────────────────────────────────
    // normalize_tags
    // ───────────────────────────────────────

    #[test]
    fn codes_map_to_labels_in_order() {
        let labels = normalize_tags(
            "past success",
            PAST_SUCCESS_TAGS,
            &["music".into(), "cooking".into()],
            None,
        )
        .unwrap();
        assert_eq!(labels, vec!["음악 감상/악기", "요리/베이킹"]);
    }

    #[test]
    fn duplicate_codes_collapse() {
        let labels = normalize_tags(
            "constraint",
            CONSTRAINT_TAGS,
            &["time".into(), "time".into(), "financial".into()],
            None,
        )
        .unwrap();
        assert_eq!(labels, vec!["시간 부족", "경제적 부담"]);
    }

    #[test]
    fn other_text_appended_when_selected() {
        let labels = normalize_tags(
            "constraint",
            CONSTRAINT_TAGS,
            &["other".into(), "health".into()],
            Some("  야간 근무 "),
        )
        .unwrap();
        assert_eq!(labels, vec!["신체 건강 문제", "기타: 야간 근무"]);
    }

    #[test]
    fn other_text_ignored_without_other_code() {
        let labels =
            normalize_tags("constraint", CONSTRAINT_TAGS, &["health".into()], Some("야간 근무"))
                .unwrap();
        assert_eq!(labels, vec!["신체 건강 문제"]);
    }

    #[test]
    fn other_code_with_blank_text_adds_nothing() {
        let labels =
            normalize_tags("constraint", CONSTRAINT_TAGS, &["other".into()], Some("   ")).unwrap();
        assert!(labels.is_empty());
    }

    #[test]
    fn unknown_code_is_rejected() {
        let result = normalize_tags("past success", PAST_SUCCESS_TAGS, &["skydiving".into()], None);
        assert!(matches!(
            result,
            Err(SubmitError::UnknownTag { code, .. }) if code == "skydiving"
        ));
    }

    #[test]
    fn catalog_lists_every_code() {
        let catalog = tag_catalog();
        assert_eq!(catalog.past_successes.len(), PAST_SUCCESS_TAGS.len());
        assert!(catalog.constraints.iter().any(|t| t.code == OTHER_CODE));
    }

    // ───────────────────────────────────────
    // build / record
    // ───────────────────────────────────────

    #[test]
    fn missing_fields_fail_validation() {
        let patient = Uuid::new_v4();
        let mut draft = complete_draft();
        draft.focus_time = None;
        assert!(matches!(
            build_assessment(patient, "sw-01", &draft),
            Err(SubmitError::Validation(_))
        ));

        let mut draft = complete_draft();
        draft.motivation_level = Some(0);
        assert!(matches!(
            build_assessment(patient, "sw-01", &draft),
            Err(SubmitError::Validation(_))
        ));

        assert!(matches!(
            build_assessment(patient, "  ", &complete_draft()),
            Err(SubmitError::Validation(_))
        ));
    }

    #[test]
    fn record_inserts_one_submitted_assessment() {
        let conn = open_memory_database().unwrap();
        let patient_id = make_patient(&conn);

        let created = record_assessment(&conn, patient_id, "sw-01", &complete_draft()).unwrap();
        assert_eq!(created.status, AssessmentStatus::Submitted);
        assert_eq!(created.notes.as_deref(), Some("주말에 가족 방문"));

        let stored = db::get_assessment(&conn, &created.id).unwrap().unwrap();
        assert_eq!(stored.past_successes, vec!["요리/베이킹", "운동/산책"]);
        assert_eq!(stored.constraints, vec!["교통편 부족"]);

        let count: i64 = conn
            .query_row("SELECT COUNT(*) FROM assessments", [], |r| r.get(0))
            .unwrap();
        assert_eq!(count, 1);
    }

    #[test]
    fn record_for_unknown_patient_is_persistence_error() {
        let conn = open_memory_database().unwrap();
        let result = record_assessment(&conn, Uuid::new_v4(), "sw-01", &complete_draft());
        assert!(matches!(
            result,
            Err(SubmitError::Persistence(DatabaseError::NotFound { .. }))
        ));
    }

    #[tokio::test]
    async fn submit_triggers_ai_once() {
        let conn = open_memory_database().unwrap();
        let patient_id = make_patient(&conn);
        let trigger = CountingTrigger { calls: AtomicUsize::new(0), fail: false };

        submit_assessment(conn, &trigger, patient_id, "sw-01", &complete_draft())
            .await
            .unwrap();
        assert_eq!(trigger.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn trigger_failure_keeps_the_assessment() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("goals.db");
        let conn = db::open_database(&path).unwrap();
        let patient_id = make_patient(&conn);
        let trigger = CountingTrigger { calls: AtomicUsize::new(0), fail: true };

        let created = submit_assessment(conn, &trigger, patient_id, "sw-01", &complete_draft())
            .await
            .unwrap();

        let conn = db::open_database(&path).unwrap();
        assert!(db::get_assessment(&conn, &created.id).unwrap().is_some());
    }

    #[tokio::test]
    async fn invalid_draft_does_not_trigger() {
        let conn = open_memory_database().unwrap();
        let patient_id = make_patient(&conn);
        let trigger = CountingTrigger { calls: AtomicUsize::new(0), fail: false };
        let mut draft = complete_draft();
        draft.past_successes.push("skydiving".into());

        let result = submit_assessment(conn, &trigger, patient_id, "sw-01", &draft).await;
        assert!(result.is_err());
        assert_eq!(trigger.calls.load(Ordering::SeqCst), 0);
    }
}
