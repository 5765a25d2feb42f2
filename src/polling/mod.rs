//! AI recommendation status polling.
//!
//! After an assessment is submitted the external AI job runs out of band.
//! The wizard's waiting step owns a `StatusPoller` that checks the latest
//! recommendation for the assessment on a fixed interval, bounded by an
//! attempt budget, and reports exactly one outcome per cycle:
//!
//! ```text
//! idle ──start──▶ polling ──completed──▶ success
//!                    │ ───failed─────▶ error
//!                    └───budget spent─▶ timeout
//! ```
//!
//! - `session`: the pure state machine (attempt counting, generations)
//! - `source`: where status comes from (local SQLite or the HTTP API)
//! - `observer`: callbacks for outcomes
//! - `poller`: the timer task and its lifecycle

pub mod observer;
pub mod poller;
pub mod session;
pub mod source;

use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config;

pub use observer::{PollEvent, PollObserver};
pub use poller::StatusPoller;
pub use session::{PollSession, PollStatus};
pub use source::{HttpStatusSource, SqliteStatusSource, StatusSource};

/// Shown when the AI job reports failure.
pub const FAILURE_MESSAGE: &str = "AI 추천 생성에 실패했습니다";

/// Shown when the attempt budget runs out.
pub const TIMEOUT_MESSAGE: &str = "AI 추천 시간 초과";

/// Shown when a status check itself fails.
pub const NETWORK_ERROR_MESSAGE: &str = "AI 추천 상태 확인 중 오류가 발생했습니다";

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PollError {
    #[error("Status query failed: {0}")]
    Persistence(String),

    #[error("AI processing failed: {}", .0.as_deref().unwrap_or("no detail"))]
    AiProcessingFailed(Option<String>),

    #[error("AI processing timed out after {attempts} attempts")]
    AiProcessingTimeout { attempts: u32 },

    #[error("Network error during status check: {0}")]
    Network(String),
}

impl PollError {
    /// Fixed user-facing message for this error.
    pub fn user_message(&self) -> &'static str {
        match self {
            PollError::AiProcessingFailed(_) => FAILURE_MESSAGE,
            PollError::AiProcessingTimeout { .. } => TIMEOUT_MESSAGE,
            PollError::Persistence(_) | PollError::Network(_) => NETWORK_ERROR_MESSAGE,
        }
    }
}

/// Poll timing and budget.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollerConfig {
    pub interval: Duration,
    pub max_attempts: u32,
    /// Consecutive failed checks tolerated before the cycle errors out.
    /// 0 means the first failed check is terminal.
    pub network_retry_limit: u32,
}

impl Default for PollerConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(config::DEFAULT_POLL_INTERVAL_SECS),
            max_attempts: config::DEFAULT_POLL_MAX_ATTEMPTS,
            network_retry_limit: 0,
        }
    }
}

/// Shortest interval a poller will run with. `tokio::time::interval`
/// rejects a zero period.
pub const MIN_POLL_INTERVAL: Duration = Duration::from_millis(100);

impl PollerConfig {
    /// Clamp the interval and attempt budget to usable values.
    pub fn normalized(self) -> Self {
        Self {
            interval: self.interval.max(MIN_POLL_INTERVAL),
            max_attempts: self.max_attempts.max(1),
            ..self
        }
    }

    pub fn from_app_config(app: &config::AppConfig) -> Self {
        Self {
            interval: app.poll_interval,
            max_attempts: app.poll_max_attempts,
            ..Self::default()
        }
    }

    /// Upper bound on how long a cycle waits before timing out.
    pub fn budget(&self) -> Duration {
        self.interval * self.max_attempts
    }
}

/// Steps of the goal-setting wizard. Polling only runs while the wizard
/// sits on `AwaitingRecommendation`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GoalSettingStep {
    SelectPatient,
    Assessment,
    AwaitingRecommendation,
    SelectRecommendation,
    Confirm,
}
