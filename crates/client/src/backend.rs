use async_trait::async_trait;
use chrono::NaiveDate;

use duotrack_core::dashboard::{DashboardSnapshot, WorkSession};
use duotrack_core::task::NewTask;
use duotrack_core::user::{Credentials, Registration, User};

use crate::error::ApiError;

/// Every backend operation the client performs.
///
/// [`DuoTrackApi`](crate::DuoTrackApi) implements this over HTTP. The sync
/// engine holds an `Arc<dyn Backend>` and never sees `reqwest` directly.
#[async_trait]
pub trait Backend: Send + Sync {
    // ---- account ----

    /// Create an account and sign in with it.
    async fn register(&self, registration: &Registration) -> Result<User, ApiError>;

    /// Sign in. Implementations store the returned token.
    async fn login(&self, credentials: &Credentials) -> Result<User, ApiError>;

    /// Sign out. Implementations clear the stored token even on failure.
    async fn logout(&self) -> Result<(), ApiError>;

    async fn profile(&self) -> Result<User, ApiError>;

    // ---- partner ----

    async fn link_partner(&self, email: &str) -> Result<(), ApiError>;
    async fn unlink_partner(&self) -> Result<(), ApiError>;
    async fn send_nudge(&self, message: &str) -> Result<(), ApiError>;
    async fn mark_nudge_seen(&self) -> Result<(), ApiError>;

    // ---- tasks ----

    async fn dashboard(&self, date: NaiveDate) -> Result<DashboardSnapshot, ApiError>;
    async fn create_task(&self, task: &NewTask) -> Result<(), ApiError>;
    async fn update_task_content(&self, task_id: &str, content: &str) -> Result<(), ApiError>;
    async fn set_task_status(&self, task_id: &str, is_completed: bool) -> Result<(), ApiError>;
    async fn delete_task(&self, task_id: &str) -> Result<(), ApiError>;
    async fn add_comment(&self, task_id: &str, text: &str) -> Result<(), ApiError>;
    async fn add_subtask(&self, task_id: &str, content: &str) -> Result<(), ApiError>;
    async fn toggle_subtask(&self, task_id: &str, subtask_id: &str) -> Result<(), ApiError>;

    // ---- work sessions ----

    async fn work_session(&self, date: NaiveDate) -> Result<WorkSession, ApiError>;
    async fn start_timer(&self, date: NaiveDate) -> Result<(), ApiError>;
    async fn pause_timer(&self, date: NaiveDate) -> Result<(), ApiError>;
    async fn reset_timer(&self, date: NaiveDate) -> Result<(), ApiError>;
}
