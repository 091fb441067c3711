use std::sync::Arc;

use duotrack_client::{ApiError, Backend};

use crate::notice::{Notice, Notifier};
use crate::seq::RequestSequencer;
use crate::store::Store;

/// The shared handles every feature module works with.
#[derive(Clone)]
pub struct SyncContext {
    pub backend: Arc<dyn Backend>,
    pub store: Arc<Store>,
    pub notices: Notifier,
    pub seq: Arc<RequestSequencer>,
}

impl SyncContext {
    pub fn new(backend: Arc<dyn Backend>, store: Arc<Store>, notices: Notifier) -> Self {
        Self {
            backend,
            store,
            notices,
            seq: Arc::new(RequestSequencer::new()),
        }
    }

    pub fn toast_success(&self, message: impl Into<String>) {
        self.notices.publish(Notice::success(message));
    }

    /// Log `err` and surface it as an error toast, preferring the
    /// backend's own message over `fallback`.
    pub fn toast_failure(&self, err: &ApiError, fallback: &str) {
        tracing::warn!(error = %err, "{fallback}");
        self.notices.publish(Notice::error(err.user_message(fallback)));
    }
}
