//! Polling session state machine.
//!
//! Pure state: no timers, no I/O. The poller task feeds it one
//! `Observation` per check and acts on the returned `Transition`.
//! Every started cycle gets a new generation; observations tagged with an
//! older generation are stale and ignored, which is what keeps a cancelled
//! cycle from reporting after a restart.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{PollError, PollerConfig};
use crate::models::enums::RecommendationStatus;
use crate::models::RecommendationSnapshot;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PollStatus {
    #[default]
    Idle,
    Polling,
    Success,
    Error,
    Timeout,
}

impl PollStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Success | Self::Error | Self::Timeout)
    }
}

/// Result of one status check.
#[derive(Debug, Clone)]
pub enum Observation {
    Found(RecommendationSnapshot),
    NotFound,
    FetchFailed(PollError),
}

impl From<Result<Option<RecommendationSnapshot>, PollError>> for Observation {
    fn from(result: Result<Option<RecommendationSnapshot>, PollError>) -> Self {
        match result {
            Ok(Some(snapshot)) => Observation::Found(snapshot),
            Ok(None) => Observation::NotFound,
            Err(e) => Observation::FetchFailed(e),
        }
    }
}

/// How a cycle ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PollOutcome {
    Succeeded { recommendation_id: Uuid },
    Failed(PollError),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Transition {
    /// Observation belongs to a cancelled or finished cycle.
    Stale,
    /// Still unresolved; `attempts` checks used so far.
    Continue { attempts: u32 },
    /// The cycle just ended.
    Terminal(PollOutcome),
}

#[derive(Debug, Clone, Default)]
pub struct PollSession {
    status: PollStatus,
    attempts: u32,
    consecutive_fetch_errors: u32,
    generation: u64,
}

impl PollSession {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn status(&self) -> PollStatus {
        self.status
    }

    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Start a new cycle from any state. Returns its generation.
    pub fn begin(&mut self) -> u64 {
        self.generation += 1;
        self.status = PollStatus::Polling;
        self.attempts = 0;
        self.consecutive_fetch_errors = 0;
        self.generation
    }

    /// Abandon the running cycle, if any. Returns true when a cycle was
    /// running (the caller owes it a completion notice).
    pub fn cancel(&mut self) -> bool {
        self.generation += 1;
        if self.status == PollStatus::Polling {
            self.status = PollStatus::Idle;
            true
        } else {
            false
        }
    }

    /// Apply the result of a check made for `generation`.
    pub fn apply(
        &mut self,
        generation: u64,
        observation: Observation,
        config: &PollerConfig,
    ) -> Transition {
        if generation != self.generation || self.status != PollStatus::Polling {
            return Transition::Stale;
        }

        match observation {
            Observation::Found(snapshot) if snapshot.status == RecommendationStatus::Completed => {
                self.status = PollStatus::Success;
                Transition::Terminal(PollOutcome::Succeeded {
                    recommendation_id: snapshot.id,
                })
            }
            Observation::Found(snapshot) if snapshot.status == RecommendationStatus::Failed => {
                self.status = PollStatus::Error;
                Transition::Terminal(PollOutcome::Failed(PollError::AiProcessingFailed(
                    snapshot.error_message,
                )))
            }
            Observation::Found(_) | Observation::NotFound => {
                self.consecutive_fetch_errors = 0;
                self.count_unresolved(config)
            }
            Observation::FetchFailed(error) => {
                self.consecutive_fetch_errors += 1;
                if self.consecutive_fetch_errors > config.network_retry_limit {
                    self.status = PollStatus::Error;
                    return Transition::Terminal(PollOutcome::Failed(error));
                }
                self.count_unresolved(config)
            }
        }
    }

    fn count_unresolved(&mut self, config: &PollerConfig) -> Transition {
        self.attempts += 1;
        if self.attempts >= config.max_attempts {
            self.status = PollStatus::Timeout;
            return Transition::Terminal(PollOutcome::Failed(PollError::AiProcessingTimeout {
                attempts: self.attempts,
            }));
        }
        Transition::Continue {
            attempts: self.attempts,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    fn config(max_attempts: u32, network_retry_limit: u32) -> PollerConfig {
        PollerConfig {
            interval: Duration::from_secs(3),
            max_attempts,
            network_retry_limit,
        }
    }

    fn snapshot(status: RecommendationStatus) -> Observation {
        Observation::Found(RecommendationSnapshot {
            id: Uuid::nil(),
            status,
            error_message: None,
        })
    }

    #[test]
    fn new_session_is_idle() {
        let session = PollSession::new();
        assert_eq!(session.status(), PollStatus::Idle);
        assert_eq!(session.attempts(), 0);
    }

    #[test]
    fn unresolved_checks_increment_by_one() {
        let cfg = config(20, 0);
        let mut session = PollSession::new();
        let gen = session.begin();

        for expected in 1..20 {
            let observation = if expected % 2 == 0 {
                Observation::NotFound
            } else {
                snapshot(RecommendationStatus::Pending)
            };
            assert_eq!(
                session.apply(gen, observation, &cfg),
                Transition::Continue { attempts: expected }
            );
            assert_eq!(session.status(), PollStatus::Polling);
        }
    }

    #[test]
    fn budget_exhaustion_times_out_once() {
        let cfg = config(20, 0);
        let mut session = PollSession::new();
        let gen = session.begin();

        for _ in 0..19 {
            session.apply(gen, Observation::NotFound, &cfg);
        }
        assert_eq!(
            session.apply(gen, Observation::NotFound, &cfg),
            Transition::Terminal(PollOutcome::Failed(PollError::AiProcessingTimeout {
                attempts: 20
            }))
        );
        assert_eq!(session.status(), PollStatus::Timeout);
        assert_eq!(session.apply(gen, Observation::NotFound, &cfg), Transition::Stale);
    }

    #[test]
    fn completed_is_success() {
        let cfg = config(20, 0);
        let mut session = PollSession::new();
        let gen = session.begin();
        let id = Uuid::new_v4();

        let transition = session.apply(
            gen,
            Observation::Found(RecommendationSnapshot {
                id,
                status: RecommendationStatus::Completed,
                error_message: None,
            }),
            &cfg,
        );
        assert_eq!(
            transition,
            Transition::Terminal(PollOutcome::Succeeded { recommendation_id: id })
        );
        assert_eq!(session.status(), PollStatus::Success);
        // A second completed observation does not fire again.
        assert_eq!(
            session.apply(gen, snapshot(RecommendationStatus::Completed), &cfg),
            Transition::Stale
        );
    }

    #[test]
    fn failed_is_error_with_detail() {
        let cfg = config(20, 0);
        let mut session = PollSession::new();
        let gen = session.begin();

        let transition = session.apply(
            gen,
            Observation::Found(RecommendationSnapshot {
                id: Uuid::nil(),
                status: RecommendationStatus::Failed,
                error_message: Some("quota".into()),
            }),
            &cfg,
        );
        assert_eq!(
            transition,
            Transition::Terminal(PollOutcome::Failed(PollError::AiProcessingFailed(Some(
                "quota".into()
            ))))
        );
        assert_eq!(session.status(), PollStatus::Error);
    }

    #[test]
    fn fetch_error_is_terminal_by_default() {
        let cfg = config(20, 0);
        let mut session = PollSession::new();
        let gen = session.begin();

        let transition = session.apply(
            gen,
            Observation::FetchFailed(PollError::Network("connection reset".into())),
            &cfg,
        );
        assert!(matches!(
            transition,
            Transition::Terminal(PollOutcome::Failed(PollError::Network(_)))
        ));
        assert_eq!(session.status(), PollStatus::Error);
    }

    #[test]
    fn fetch_errors_within_retry_limit_consume_attempts() {
        let cfg = config(20, 2);
        let mut session = PollSession::new();
        let gen = session.begin();
        let fail = || Observation::FetchFailed(PollError::Network("reset".into()));

        assert_eq!(session.apply(gen, fail(), &cfg), Transition::Continue { attempts: 1 });
        assert_eq!(session.apply(gen, fail(), &cfg), Transition::Continue { attempts: 2 });
        // A clean check resets the consecutive counter.
        assert_eq!(
            session.apply(gen, Observation::NotFound, &cfg),
            Transition::Continue { attempts: 3 }
        );
        assert_eq!(session.apply(gen, fail(), &cfg), Transition::Continue { attempts: 4 });
        assert_eq!(session.apply(gen, fail(), &cfg), Transition::Continue { attempts: 5 });
        assert!(matches!(
            session.apply(gen, fail(), &cfg),
            Transition::Terminal(PollOutcome::Failed(PollError::Network(_)))
        ));
    }

    #[test]
    fn restart_resets_attempts_and_fences_old_generation() {
        let cfg = config(3, 0);
        let mut session = PollSession::new();
        let old = session.begin();
        for _ in 0..3 {
            session.apply(old, Observation::NotFound, &cfg);
        }
        assert_eq!(session.status(), PollStatus::Timeout);

        let new = session.begin();
        assert_ne!(old, new);
        assert_eq!(session.status(), PollStatus::Polling);
        assert_eq!(session.attempts(), 0);
        assert_eq!(
            session.apply(old, snapshot(RecommendationStatus::Completed), &cfg),
            Transition::Stale
        );
        assert_eq!(
            session.apply(new, Observation::NotFound, &cfg),
            Transition::Continue { attempts: 1 }
        );
    }

    #[test]
    fn cancel_reports_running_cycle_once() {
        let mut session = PollSession::new();
        assert!(!session.cancel());

        let gen = session.begin();
        assert!(session.cancel());
        assert!(!session.cancel());
        assert_eq!(session.status(), PollStatus::Idle);
        assert_eq!(
            session.apply(gen, Observation::NotFound, &config(20, 0)),
            Transition::Stale
        );
    }

    #[test]
    fn cancel_after_terminal_keeps_terminal_status() {
        let cfg = config(1, 0);
        let mut session = PollSession::new();
        let gen = session.begin();
        session.apply(gen, Observation::NotFound, &cfg);
        assert!(!session.cancel());
        assert_eq!(session.status(), PollStatus::Timeout);
    }
}
