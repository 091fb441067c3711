//! Sign-in, sign-up and sign-out.
//!
//! The [`Backend`] owns the bearer token: it stores it on login and
//! clears it on logout even when the request fails.

use std::sync::Arc;

use duotrack_client::{ApiError, Backend};
use duotrack_core::user::{Credentials, Registration, User};

use crate::error::SyncError;
use crate::notice::{Notice, Notifier};
use crate::reducer::{Change, Update};
use crate::store::Store;

#[derive(Clone)]
pub struct Session {
    backend: Arc<dyn Backend>,
    notices: Notifier,
}

impl Session {
    pub fn new(backend: Arc<dyn Backend>, notices: Notifier) -> Self {
        Self { backend, notices }
    }

    pub async fn login(&self, credentials: &Credentials) -> Result<User, SyncError> {
        credentials.validate()?;
        match self.backend.login(credentials).await {
            Ok(user) => {
                self.notices.publish(Notice::success("Welcome back! 🎉"));
                Ok(user)
            }
            Err(e) => Err(self.auth_failed(e)),
        }
    }

    pub async fn register(&self, registration: &Registration) -> Result<User, SyncError> {
        registration.validate()?;
        match self.backend.register(registration).await {
            Ok(user) => {
                tracing::info!(user_id = %user.id, "Account created");
                self.notices.publish(Notice::success("Welcome to DuoTrack! 🎉"));
                Ok(user)
            }
            Err(e) => Err(self.auth_failed(e)),
        }
    }

    /// Load the profile for an already stored token.
    ///
    /// Returns `Ok(None)` when the token is rejected.
    pub async fn resume(&self) -> Result<Option<User>, SyncError> {
        match self.backend.profile().await {
            Ok(user) => {
                tracing::info!(user_id = %user.id, "Session resumed");
                Ok(Some(user))
            }
            Err(e) if e.is_unauthorized() => {
                tracing::info!("Stored token rejected");
                Ok(None)
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Sign out and reset `store`. The local session ends even if the
    /// request fails.
    pub async fn logout(&self, store: &Store) -> Result<(), SyncError> {
        let result = self.backend.logout().await;
        store.apply(Update::local(Change::SignedOut));
        match result {
            Ok(()) => {
                self.notices.publish(Notice::success("Logged out successfully"));
                Ok(())
            }
            Err(e) => {
                tracing::warn!(error = %e, "Logout request failed");
                self.notices.publish(Notice::error("Failed to logout"));
                Err(e.into())
            }
        }
    }

    fn auth_failed(&self, err: ApiError) -> SyncError {
        tracing::warn!(error = %err, "Authentication failed");
        self.notices
            .publish(Notice::error(err.user_message("Something went wrong!")));
        err.into()
    }
}
