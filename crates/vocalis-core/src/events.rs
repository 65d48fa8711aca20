use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

use crate::types::{ListeningState, Timestamp};

/// Notifications emitted by the dispatch engine and the listening supervisor.
///
/// Delivered over a [`NotificationBus`], which any thread may publish to.
/// Consumers that need a particular thread (a tray icon, a dialog) subscribe
/// and marshal the notification themselves.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[non_exhaustive]
pub enum Notification {
    /// A confirmation prompt is about to block for `phrase`.
    ConfirmationBegin { phrase: String, at: Timestamp },

    /// The confirmation prompt for `phrase` has resolved.
    ConfirmationEnd {
        phrase: String,
        confirmed: bool,
        at: Timestamp,
    },

    /// The listening supervisor moved to `state`.
    ListeningStateChanged { state: ListeningState, at: Timestamp },

    /// A dispatch failure the user asked to see (`display_errors`).
    ErrorRaised { message: String, at: Timestamp },
}

impl Notification {
    pub fn confirmation_begin(phrase: impl Into<String>) -> Self {
        Notification::ConfirmationBegin {
            phrase: phrase.into(),
            at: Timestamp::now(),
        }
    }

    pub fn confirmation_end(phrase: impl Into<String>, confirmed: bool) -> Self {
        Notification::ConfirmationEnd {
            phrase: phrase.into(),
            confirmed,
            at: Timestamp::now(),
        }
    }

    pub fn listening_state_changed(state: ListeningState) -> Self {
        Notification::ListeningStateChanged {
            state,
            at: Timestamp::now(),
        }
    }

    pub fn error_raised(message: impl Into<String>) -> Self {
        Notification::ErrorRaised {
            message: message.into(),
            at: Timestamp::now(),
        }
    }

    pub fn at(&self) -> Timestamp {
        match self {
            Notification::ConfirmationBegin { at, .. }
            | Notification::ConfirmationEnd { at, .. }
            | Notification::ListeningStateChanged { at, .. }
            | Notification::ErrorRaised { at, .. } => *at,
        }
    }
}

/// Thread-safe broadcast of [`Notification`]s.
///
/// Cloning is cheap; all clones publish to the same subscribers. Publishing
/// with no subscribers is not an error.
#[derive(Clone, Debug)]
pub struct NotificationBus {
    tx: broadcast::Sender<Notification>,
}

impl Default for NotificationBus {
    fn default() -> Self {
        Self::new(256)
    }
}

impl NotificationBus {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx }
    }

    /// Publish to every current subscriber. Returns how many received it.
    pub fn publish(&self, notification: Notification) -> usize {
        tracing::trace!(?notification, "Notification published");
        self.tx.send(notification).unwrap_or(0)
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Notification> {
        self.tx.subscribe()
    }

    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }
}
