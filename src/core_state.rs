//! Shared application state.
//!
//! `CoreState` is built once at startup from `AppConfig`, wrapped in `Arc`
//! and handed to the HTTP layer and to every `StatusPoller`. It carries the
//! notification center and the AI trigger as explicit context instead of
//! process-wide singletons.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use rusqlite::Connection;

use crate::ai_trigger::{AiJobTrigger, HttpAiJobTrigger, NoopTrigger, TriggerError};
use crate::config::{self, AppConfig};
use crate::db;
use crate::notifications::NotificationCenter;
use crate::polling::{PollObserver, PollerConfig, SqliteStatusSource, StatusPoller};

// ═══════════════════════════════════════════════════════════
// CoreState
// ═══════════════════════════════════════════════════════════

pub struct CoreState {
    db_path: PathBuf,
    pub notifications: NotificationCenter,
    pub ai_trigger: Arc<dyn AiJobTrigger>,
    pub poller_config: PollerConfig,
}

impl CoreState {
    /// Build state from configuration. Creates the data directory and
    /// brings the schema up to date.
    pub fn from_config(app: &AppConfig) -> Result<Self, CoreError> {
        let ai_trigger: Arc<dyn AiJobTrigger> = match &app.ai_job_url {
            Some(url) => {
                let trigger = HttpAiJobTrigger::new(
                    url,
                    Duration::from_secs(config::DEFAULT_AI_TRIGGER_TIMEOUT_SECS),
                )?;
                tracing::info!(url = trigger.url(), "AI job trigger configured");
                Arc::new(trigger)
            }
            None => {
                tracing::warn!("No AI job runner URL set; submissions will not be forwarded");
                Arc::new(NoopTrigger)
            }
        };

        Self::with_trigger(
            app.db_path.clone(),
            ai_trigger,
            PollerConfig::from_app_config(app),
        )
    }

    pub fn with_trigger(
        db_path: PathBuf,
        ai_trigger: Arc<dyn AiJobTrigger>,
        poller_config: PollerConfig,
    ) -> Result<Self, CoreError> {
        if let Some(parent) = db_path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        // Run migrations once up front so the first request does not.
        db::open_database(&db_path)?;

        tracing::info!(path = %db_path.display(), "Database ready");

        Ok(Self {
            db_path,
            notifications: NotificationCenter::new(),
            ai_trigger,
            poller_config,
        })
    }

    pub fn db_path(&self) -> &Path {
        &self.db_path
    }

    /// Open a fresh connection. Handlers hold it for one request only.
    pub fn open_db(&self) -> Result<Connection, CoreError> {
        db::open_database(&self.db_path).map_err(CoreError::Database)
    }

    /// A poller that reads this database and reports to the notification
    /// center, plus `observer` when given.
    pub fn new_poller(&self, observer: Option<Arc<dyn PollObserver>>) -> StatusPoller {
        let mut observers: Vec<Arc<dyn PollObserver>> =
            vec![Arc::new(self.notifications.clone())];
        observers.extend(observer);

        StatusPoller::new(
            self.poller_config,
            Arc::new(SqliteStatusSource::new(self.db_path.clone())),
            Arc::new(observers),
        )
    }
}

// ═══════════════════════════════════════════════════════════
// Errors
// ═══════════════════════════════════════════════════════════

#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("Database error: {0}")]
    Database(#[from] db::DatabaseError),
    #[error("Cannot prepare data directory: {0}")]
    Io(#[from] std::io::Error),
    #[error("AI trigger setup failed: {0}")]
    Trigger(#[from] TriggerError),
}

// ═══════════════════════════════════════════════════════════
// Tests
// ═══════════════════════════════════════════════════════════
