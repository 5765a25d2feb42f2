//! Where the poller reads recommendation status from.

use std::path::PathBuf;
use std::time::Duration;

use async_trait::async_trait;
use uuid::Uuid;

use super::PollError;
use crate::db;
use crate::models::RecommendationSnapshot;

/// Latest recommendation status for an assessment, `None` while the AI
/// job has not written anything yet.
#[async_trait]
pub trait StatusSource: Send + Sync {
    async fn fetch_status(
        &self,
        assessment_id: &Uuid,
    ) -> Result<Option<RecommendationSnapshot>, PollError>;
}

/// Reads the local database, one short-lived connection per check.
pub struct SqliteStatusSource {
    db_path: PathBuf,
}

impl SqliteStatusSource {
    pub fn new(db_path: PathBuf) -> Self {
        Self { db_path }
    }
}

#[async_trait]
impl StatusSource for SqliteStatusSource {
    async fn fetch_status(
        &self,
        assessment_id: &Uuid,
    ) -> Result<Option<RecommendationSnapshot>, PollError> {
        let path = self.db_path.clone();
        let assessment_id = *assessment_id;

        tokio::task::spawn_blocking(move || {
            let conn = db::open_database(&path)?;
            db::get_recommendation_snapshot(&conn, &assessment_id)
        })
        .await
        .map_err(|e| PollError::Persistence(format!("status query task failed: {e}")))?
        .map_err(|e| PollError::Persistence(e.to_string()))
    }
}

/// Calls `GET /api/assessments/:id/recommendation` on a running server.
pub struct HttpStatusSource {
    base_url: String,
    client: reqwest::Client,
}

impl HttpStatusSource {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, PollError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| PollError::Network(e.to_string()))?;
        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client,
        })
    }

    fn url_for(&self, assessment_id: &Uuid) -> String {
        format!("{}/api/assessments/{assessment_id}/recommendation", self.base_url)
    }
}

#[async_trait]
impl StatusSource for HttpStatusSource {
    async fn fetch_status(
        &self,
        assessment_id: &Uuid,
    ) -> Result<Option<RecommendationSnapshot>, PollError> {
        let response = self
            .client
            .get(self.url_for(assessment_id))
            .send()
            .await
            .map_err(|e| PollError::Network(e.to_string()))?;

        match response.status() {
            reqwest::StatusCode::NOT_FOUND => Ok(None),
            status if status.is_success() => response
                .json::<RecommendationSnapshot>()
                .await
                .map(Some)
                .map_err(|e| PollError::Network(format!("malformed status response: {e}"))),
            status => Err(PollError::Network(format!("status check returned HTTP {status}"))),
        }
    }
}
