//! User-facing notices.
//!
//! Where the browser showed a toast or a nudge animation, the engine
//! publishes a [`Notice`] on a broadcast channel. Any number of
//! renderers can subscribe.

use tokio::sync::broadcast;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToastLevel {
    Success,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notice {
    Toast { level: ToastLevel, message: String },
    /// Shown to the sender as soon as a nudge is sent.
    NudgeSent { message: String },
    /// Shown once per nudge found unseen in the profile.
    NudgeReceived { message: String, from: String },
}

impl Notice {
    pub fn success(message: impl Into<String>) -> Self {
        Notice::Toast {
            level: ToastLevel::Success,
            message: message.into(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Notice::Toast {
            level: ToastLevel::Error,
            message: message.into(),
        }
    }
}

/// Default buffer capacity for the broadcast channel.
const DEFAULT_CAPACITY: usize = 64;

/// Fan-out publisher for [`Notice`]s. Cheap to clone.
#[derive(Clone)]
pub struct Notifier {
    sender: broadcast::Sender<Notice>,
}

impl Notifier {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Publish to all current subscribers. Dropped if there are none.
    pub fn publish(&self, notice: Notice) {
        tracing::debug!(?notice, "Notice");
        let _ = self.sender.send(notice);
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Notice> {
        self.sender.subscribe()
    }
}

impl Default for Notifier {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}
