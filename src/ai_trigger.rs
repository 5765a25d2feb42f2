//! Hand-off of freshly submitted assessments to the external AI job runner.
//!
//! The runner is expected to write an `ai_recommendations` row and later
//! report completion through the webhook. This module only fires the
//! request; it never waits for the result.

use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;
use thiserror::Error;
use uuid::Uuid;

use crate::models::Assessment;

#[derive(Error, Debug)]
pub enum TriggerError {
    #[error("AI job runner unreachable: {0}")]
    Connection(String),

    #[error("AI job runner rejected the request with HTTP {0}")]
    Rejected(u16),
}

/// Something that can ask the AI job runner to process an assessment.
#[async_trait]
pub trait AiJobTrigger: Send + Sync {
    async fn request_processing(&self, assessment: &Assessment) -> Result<(), TriggerError>;
}

/// Used when no job runner URL is configured.
pub struct NoopTrigger;

#[async_trait]
impl AiJobTrigger for NoopTrigger {
    async fn request_processing(&self, assessment: &Assessment) -> Result<(), TriggerError> {
        tracing::debug!(assessment_id = %assessment.id, "No AI job runner configured, skipping trigger");
        Ok(())
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct TriggerRequest {
    assessment_id: Uuid,
    patient_id: Uuid,
}

/// POSTs `{assessmentId, patientId}` to the job runner.
pub struct HttpAiJobTrigger {
    url: String,
    client: reqwest::Client,
}

impl HttpAiJobTrigger {
    pub fn new(url: &str, timeout: Duration) -> Result<Self, TriggerError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| TriggerError::Connection(e.to_string()))?;
        Ok(Self {
            url: url.trim_end_matches('/').to_string(),
            client,
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait]
impl AiJobTrigger for HttpAiJobTrigger {
    async fn request_processing(&self, assessment: &Assessment) -> Result<(), TriggerError> {
        let body = TriggerRequest {
            assessment_id: assessment.id,
            patient_id: assessment.patient_id,
        };

        let response = self
            .client
            .post(&self.url)
            .json(&body)
            .send()
            .await
            .map_err(|e| TriggerError::Connection(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(TriggerError::Rejected(status.as_u16()));
        }

        tracing::info!(assessment_id = %assessment.id, "AI processing requested");
        Ok(())
    }
}
