//! Outcome callbacks for a polling cycle.
//!
//! Per cycle the poller calls exactly one of `on_success` / `on_error`
//! (or neither, when the cycle is stopped first), followed by exactly one
//! `on_complete`.

use tokio::sync::mpsc;
use uuid::Uuid;

use super::PollError;
use crate::notifications::NotificationCenter;

pub trait PollObserver: Send + Sync {
    fn on_success(&self, recommendation_id: Uuid);

    /// `error.user_message()` is the fixed text to show.
    fn on_error(&self, error: &PollError);

    /// The cycle ended for any reason, including an explicit stop.
    fn on_complete(&self);
}

/// Poll callbacks as values, for channel-based consumers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PollEvent {
    Success { recommendation_id: Uuid },
    Error { message: String, error: PollError },
    Complete,
}

impl PollObserver for mpsc::UnboundedSender<PollEvent> {
    fn on_success(&self, recommendation_id: Uuid) {
        let _ = self.send(PollEvent::Success { recommendation_id });
    }

    fn on_error(&self, error: &PollError) {
        let _ = self.send(PollEvent::Error {
            message: error.user_message().to_string(),
            error: error.clone(),
        });
    }

    fn on_complete(&self) {
        let _ = self.send(PollEvent::Complete);
    }
}

/// Surfaces poll outcomes as toasts.
impl PollObserver for NotificationCenter {
    fn on_success(&self, _recommendation_id: Uuid) {
        self.success("AI 추천이 준비되었습니다", None);
    }

    fn on_error(&self, error: &PollError) {
        self.error(error.user_message(), Some(error.to_string()));
    }

    fn on_complete(&self) {}
}

/// Fan out to several observers in order.
impl PollObserver for Vec<std::sync::Arc<dyn PollObserver>> {
    fn on_success(&self, recommendation_id: Uuid) {
        for observer in self {
            observer.on_success(recommendation_id);
        }
    }

    fn on_error(&self, error: &PollError) {
        for observer in self {
            observer.on_error(error);
        }
    }

    fn on_complete(&self) {
        for observer in self {
            observer.on_complete();
        }
    }
}
