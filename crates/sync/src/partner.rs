//! Partner linking and nudges.

use duotrack_core::user::{normalize_email, validate_email};

use crate::context::SyncContext;
use crate::dashboard::{DashboardSync, Loader};
use crate::error::SyncError;
use crate::notice::Notice;
use crate::seq::ResourceKey;

#[derive(Clone)]
pub struct PartnerLink {
    ctx: SyncContext,
    dashboard: DashboardSync,
}

impl PartnerLink {
    pub fn new(ctx: SyncContext, dashboard: DashboardSync) -> Self {
        Self { ctx, dashboard }
    }

    /// Link to the account registered under `email`.
    ///
    /// On failure the state is left untouched and the backend's message
    /// is shown.
    pub async fn link(&self, email: &str) -> Result<(), SyncError> {
        let email = normalize_email(email);
        if let Err(e) = validate_email(&email) {
            self.ctx.notices.publish(Notice::error(e.to_string()));
            return Err(e.into());
        }

        match self.ctx.backend.link_partner(&email).await {
            Ok(()) => {
                tracing::info!(email = %email, "Partner linked");
                self.ctx.toast_success("Partner linked successfully! 🎉");
                self.settle().await;
                Ok(())
            }
            Err(e) => {
                self.ctx.toast_failure(&e, "Failed to link partner");
                Err(e.into())
            }
        }
    }

    pub async fn unlink(&self) -> Result<(), SyncError> {
        match self.ctx.backend.unlink_partner().await {
            Ok(()) => {
                tracing::info!("Partner unlinked");
                self.ctx.toast_success("Partner unlinked successfully");
                self.settle().await;
                Ok(())
            }
            Err(e) => {
                self.ctx.toast_failure(&e, "Failed to unlink partner");
                Err(e.into())
            }
        }
    }

    /// Send a nudge. Fire-and-forget: [`Notice::NudgeSent`] is published
    /// before the request is even issued and is never withdrawn.
    pub fn send_nudge(&self, message: &str) -> Result<(), SyncError> {
        if !self.ctx.store.read(|s| s.has_partner()) {
            return Err(SyncError::NoPartner);
        }
        let message = message.trim().to_string();

        self.ctx.notices.publish(Notice::NudgeSent {
            message: message.clone(),
        });

        let ctx = self.ctx.clone();
        tokio::spawn(async move {
            match ctx.backend.send_nudge(&message).await {
                Ok(()) => tracing::info!("Nudge delivered"),
                Err(e) => ctx.toast_failure(&e, "Failed to send nudge"),
            }
        });
        Ok(())
    }

    async fn settle(&self) {
        self.ctx.seq.invalidate(ResourceKey::Dashboard);
        self.dashboard.refresh(Loader::Silent).await;
    }
}
