//! Dashboard synchroniser: selected date, loud fetches and the silent poll.
//!
//! A fetch loads the dashboard and the profile concurrently. Each response
//! passes through the [`RequestSequencer`](crate::seq::RequestSequencer)
//! before it reaches the store, so a slow response for a date the user has
//! already left can never overwrite the newer one.

use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use chrono::NaiveDate;
use tokio::sync::Notify;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

use duotrack_core::dates::format_date;
use duotrack_core::user::{NudgeRecord, User};

use crate::context::SyncContext;
use crate::notice::Notice;
use crate::reducer::{Change, Update};
use crate::seq::ResourceKey;

/// Whether a fetch shows the blocking loader.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Loader {
    Show,
    Silent,
}

#[derive(Clone)]
pub struct DashboardSync {
    ctx: SyncContext,
    date_changed: Arc<Notify>,
    /// The last nudge surfaced, so each one is shown once.
    last_nudge: Arc<Mutex<Option<NudgeRecord>>>,
}

impl DashboardSync {
    pub fn new(ctx: SyncContext) -> Self {
        Self {
            ctx,
            date_changed: Arc::new(Notify::new()),
            last_nudge: Arc::new(Mutex::new(None)),
        }
    }

    pub fn selected_date(&self) -> NaiveDate {
        self.ctx.store.read(|s| s.selected_date)
    }

    /// Switch to `date` and load it with the blocking loader.
    ///
    /// Responses still in flight for the previous date are discarded.
    pub async fn select_date(&self, date: NaiveDate) {
        let outcome = self.ctx.store.apply(Update::local(Change::DateSelected(date)));
        if !outcome.is_applied() {
            return;
        }
        tracing::info!(date = %format_date(date), "Date selected");
        self.ctx.seq.invalidate(ResourceKey::Dashboard);
        self.date_changed.notify_one();
        self.refresh(Loader::Show).await;
    }

    /// Fetch the dashboard and the profile for the selected date.
    pub async fn refresh(&self, loader: Loader) {
        let date = self.selected_date();
        let dashboard_ticket = self.ctx.seq.issue(ResourceKey::Dashboard);
        let profile_ticket = self.ctx.seq.issue(ResourceKey::Profile);

        let loader_ticket = (loader == Loader::Show).then(|| {
            self.ctx.store.apply(Update::local(Change::LoadingChanged(true)));
            self.ctx.seq.issue(ResourceKey::Loader)
        });

        let backend = &self.ctx.backend;
        let (dashboard, profile) = tokio::join!(backend.dashboard(date), backend.profile());

        match dashboard {
            Ok(snapshot) => {
                if self.ctx.seq.try_apply(dashboard_ticket) {
                    self.ctx
                        .store
                        .apply(Update::poll(Change::DashboardLoaded { date, snapshot }));
                } else {
                    tracing::debug!(
                        date = %format_date(date),
                        seq = dashboard_ticket.seq(),
                        "Discarding stale dashboard response",
                    );
                }
            }
            Err(e) => {
                if self.ctx.seq.is_latest(dashboard_ticket) {
                    self.ctx.toast_failure(&e, "Failed to load dashboard");
                } else {
                    tracing::debug!(error = %e, "Stale dashboard request failed");
                }
            }
        }

        match profile {
            Ok(user) => {
                if self.ctx.seq.try_apply(profile_ticket) {
                    self.surface_nudge(&user).await;
                    self.ctx.store.apply(Update::poll(Change::ProfileLoaded(user)));
                }
            }
            Err(e) => tracing::warn!(error = %e, "Failed to refresh profile"),
        }

        // Silent refreshes never touch the loader, so only a newer loud
        // fetch can take over hiding it.
        if loader_ticket.is_some_and(|ticket| self.ctx.seq.is_latest(ticket)) {
            self.ctx.store.apply(Update::local(Change::LoadingChanged(false)));
        }
    }

    /// Load the selected date, then refresh silently every `poll_interval`
    /// until `cancel` fires. A date change restarts the interval.
    pub async fn run(&self, poll_interval: Duration, cancel: CancellationToken) {
        tokio::select! {
            _ = cancel.cancelled() => return,
            _ = self.refresh(Loader::Show) => {}
        }

        let mut ticker = tokio::time::interval(poll_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        ticker.tick().await;

        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = self.date_changed.notified() => ticker.reset(),
                _ = ticker.tick() => {
                    tokio::select! {
                        _ = cancel.cancelled() => break,
                        _ = self.refresh(Loader::Silent) => {}
                    }
                }
            }
        }
        tracing::debug!("Dashboard poll stopped");
    }

    /// Publish an unseen nudge once and mark it seen. Marking is not
    /// retried; the same nudge is not surfaced twice while the server
    /// still reports it unseen. Once a profile shows no unseen nudge, an
    /// identical later nudge is surfaced again.
    async fn surface_nudge(&self, user: &User) {
        let Some(nudge) = user.unseen_nudge() else {
            self.last_nudge
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .take();
            return;
        };
        {
            let mut last = self.last_nudge.lock().unwrap_or_else(PoisonError::into_inner);
            if last.as_ref() == Some(nudge) {
                return;
            }
            *last = Some(nudge.clone());
        }

        tracing::info!(from = %nudge.from, "Nudge received");
        self.ctx.notices.publish(Notice::NudgeReceived {
            message: nudge.message.clone(),
            from: nudge.from.clone(),
        });
        if let Err(e) = self.ctx.backend.mark_nudge_seen().await {
            tracing::warn!(error = %e, "Failed to mark nudge as seen");
        }
    }
}
