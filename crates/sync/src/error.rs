use duotrack_client::ApiError;
use duotrack_core::error::CoreError;

/// Errors returned by the user-facing sync operations.
///
/// Every variant has already been surfaced as a toast where the user would
/// have seen one; callers only need the value for control flow.
#[derive(Debug, thiserror::Error)]
pub enum SyncError {
    #[error(transparent)]
    Api(#[from] ApiError),

    #[error(transparent)]
    Invalid(#[from] CoreError),

    #[error("Task {0} is not in the current list")]
    TaskNotFound(String),

    /// Partner tasks are read-only for this user.
    #[error("Task {0} belongs to the partner")]
    NotOwner(String),

    #[error("No partner is linked")]
    NoPartner,
}
