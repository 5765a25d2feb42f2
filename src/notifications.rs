//! User-facing notifications (toasts).
//!
//! `NotificationCenter` is an explicit, cloneable context object. Each
//! holder (application state, a poller, a test) gets its own handle; there
//! is no process-wide registry. Subscribers receive toasts over a tokio
//! broadcast channel, and the most recent toasts are kept for late readers.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use uuid::Uuid;

/// Toasts retained for `recent()`.
const HISTORY_CAPACITY: usize = 50;

/// Broadcast buffer per subscriber.
const CHANNEL_CAPACITY: usize = 64;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ToastKind {
    Success,
    Error,
    Info,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Toast {
    pub id: Uuid,
    pub kind: ToastKind,
    pub title: String,
    pub message: Option<String>,
    pub created_at: NaiveDateTime,
}

impl Toast {
    pub fn new(kind: ToastKind, title: impl Into<String>, message: Option<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            kind,
            title: title.into(),
            message,
            created_at: crate::db::now_naive(),
        }
    }
}

#[derive(Clone)]
pub struct NotificationCenter {
    sender: broadcast::Sender<Toast>,
    history: Arc<Mutex<VecDeque<Toast>>>,
}

impl Default for NotificationCenter {
    fn default() -> Self {
        Self::new()
    }
}

impl NotificationCenter {
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(CHANNEL_CAPACITY);
        Self {
            sender,
            history: Arc::new(Mutex::new(VecDeque::with_capacity(HISTORY_CAPACITY))),
        }
    }

    /// Publish a toast. Returns its id.
    pub fn push(&self, toast: Toast) -> Uuid {
        let id = toast.id;
        if let Ok(mut history) = self.history.lock() {
            if history.len() == HISTORY_CAPACITY {
                history.pop_front();
            }
            history.push_back(toast.clone());
        }
        // No subscribers is fine; the toast stays in history.
        let _ = self.sender.send(toast);
        id
    }

    pub fn success(&self, title: impl Into<String>, message: Option<String>) -> Uuid {
        self.push(Toast::new(ToastKind::Success, title, message))
    }

    pub fn error(&self, title: impl Into<String>, message: Option<String>) -> Uuid {
        self.push(Toast::new(ToastKind::Error, title, message))
    }

    pub fn info(&self, title: impl Into<String>, message: Option<String>) -> Uuid {
        self.push(Toast::new(ToastKind::Info, title, message))
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Toast> {
        self.sender.subscribe()
    }

    /// Retained toasts, oldest first.
    pub fn recent(&self) -> Vec<Toast> {
        self.history
            .lock()
            .map(|h| h.iter().cloned().collect())
            .unwrap_or_default()
    }

    /// Drop a toast from history. Returns whether it was present.
    pub fn dismiss(&self, id: &Uuid) -> bool {
        match self.history.lock() {
            Ok(mut history) => {
                let before = history.len();
                history.retain(|t| &t.id != id);
                history.len() != before
            }
            Err(_) => false,
        }
    }
}
