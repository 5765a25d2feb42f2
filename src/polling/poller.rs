//! Status poller lifecycle.
//!
//! One `StatusPoller` per waiting view. `start` spawns a tokio task that
//! checks immediately and then once per interval. The task awaits each
//! check before waiting for the next tick and skips ticks it missed, so at
//! most one status query is ever in flight. Cancellation goes through a
//! `CancellationToken`; the session generation discards anything a
//! cancelled task still produces.

use std::sync::{Arc, Mutex, MutexGuard};

use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use super::observer::PollObserver;
use super::session::{Observation, PollOutcome, PollSession, PollStatus, Transition};
use super::source::StatusSource;
use super::{GoalSettingStep, PollerConfig};

pub struct StatusPoller {
    config: PollerConfig,
    source: Arc<dyn StatusSource>,
    observer: Arc<dyn PollObserver>,
    session: Arc<Mutex<PollSession>>,
    assessment_id: Option<Uuid>,
    cancel: Option<CancellationToken>,
    task: Option<JoinHandle<()>>,
}

impl StatusPoller {
    pub fn new(
        config: PollerConfig,
        source: Arc<dyn StatusSource>,
        observer: Arc<dyn PollObserver>,
    ) -> Self {
        Self {
            config: config.normalized(),
            source,
            observer,
            session: Arc::new(Mutex::new(PollSession::new())),
            assessment_id: None,
            cancel: None,
            task: None,
        }
    }

    pub fn status(&self) -> PollStatus {
        lock(&self.session).status()
    }

    pub fn attempts(&self) -> u32 {
        lock(&self.session).attempts()
    }

    pub fn assessment_id(&self) -> Option<Uuid> {
        self.assessment_id
    }

    pub fn is_running(&self) -> bool {
        self.status() == PollStatus::Polling
    }

    /// Start a fresh cycle for `assessment_id`, replacing any running one.
    /// Must be called from within a tokio runtime.
    pub fn start(&mut self, assessment_id: Uuid) {
        self.stop();

        let generation = lock(&self.session).begin();
        let token = CancellationToken::new();

        tracing::info!(
            %assessment_id,
            generation,
            interval_ms = self.config.interval.as_millis() as u64,
            max_attempts = self.config.max_attempts,
            "Recommendation polling started"
        );

        let task = tokio::spawn(run_cycle(
            generation,
            assessment_id,
            self.config,
            Arc::clone(&self.source),
            Arc::clone(&self.observer),
            Arc::clone(&self.session),
            token.clone(),
        ));

        self.assessment_id = Some(assessment_id);
        self.cancel = Some(token);
        self.task = Some(task);
    }

    /// Cancel the running cycle. Safe to call any number of times; only the
    /// call that actually stops a running cycle reports `on_complete`.
    pub fn stop(&mut self) {
        if let Some(token) = self.cancel.take() {
            token.cancel();
        }
        self.task.take();

        let was_running = lock(&self.session).cancel();
        if was_running {
            tracing::info!(assessment_id = ?self.assessment_id, "Recommendation polling stopped");
            self.observer.on_complete();
        }
    }

    /// Restart polling for the current assessment (retry button).
    /// Returns false when there is nothing to retry.
    pub fn retry(&mut self) -> bool {
        match self.assessment_id {
            Some(id) => {
                tracing::info!(assessment_id = %id, "Recommendation polling retried");
                self.start(id);
                true
            }
            None => false,
        }
    }

    /// Follow the wizard: poll while waiting on a recommendation for a
    /// known assessment, stop everywhere else.
    pub fn sync_step(&mut self, step: GoalSettingStep, assessment_id: Option<Uuid>) {
        match (step, assessment_id) {
            (GoalSettingStep::AwaitingRecommendation, Some(id)) => {
                let same_assessment = self.assessment_id == Some(id);
                if !same_assessment || self.status() == PollStatus::Idle {
                    self.start(id);
                }
            }
            _ => self.stop(),
        }
    }
}

impl Drop for StatusPoller {
    fn drop(&mut self) {
        self.stop();
    }
}

fn lock(session: &Mutex<PollSession>) -> MutexGuard<'_, PollSession> {
    // Session updates are single assignments; a poisoned guard still holds
    // consistent state.
    session.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

async fn run_cycle(
    generation: u64,
    assessment_id: Uuid,
    config: PollerConfig,
    source: Arc<dyn StatusSource>,
    observer: Arc<dyn PollObserver>,
    session: Arc<Mutex<PollSession>>,
    cancel: CancellationToken,
) {
    let mut ticker = tokio::time::interval(config.interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            _ = cancel.cancelled() => break,
            _ = ticker.tick() => {}
        }

        let observation: Observation = tokio::select! {
            _ = cancel.cancelled() => break,
            result = source.fetch_status(&assessment_id) => result.into(),
        };

        if let Observation::FetchFailed(ref e) = observation {
            tracing::warn!(%assessment_id, error = %e, "Recommendation status check failed");
        }

        let transition = lock(&session).apply(generation, observation, &config);

        match transition {
            Transition::Stale => break,
            Transition::Continue { attempts } => {
                tracing::debug!(%assessment_id, attempts, "Recommendation still pending");
            }
            Transition::Terminal(outcome) => {
                match outcome {
                    PollOutcome::Succeeded { recommendation_id } => {
                        tracing::info!(%assessment_id, %recommendation_id, "Recommendation ready");
                        observer.on_success(recommendation_id);
                    }
                    PollOutcome::Failed(error) => {
                        tracing::warn!(%assessment_id, error = %error, "Recommendation polling ended");
                        observer.on_error(&error);
                    }
                }
                observer.on_complete();
                break;
            }
        }
    }
}
