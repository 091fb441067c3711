//! Local mirror of the server-side work session.
//!
//! Start and pause go to the backend first; local state only flips once
//! the call succeeds. Each change is relayed to the partner over the
//! socket, stamped with `sentAt` so stale snapshots can be dropped.

use std::time::Duration;

use chrono::Utc;
use tokio::sync::mpsc;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

use duotrack_client::ApiError;
use duotrack_core::dates::format_date;
use duotrack_realtime::messages::{ClientEvent, TimerUpdateData};

use crate::context::SyncContext;
use crate::error::SyncError;
use crate::reducer::{Change, Update};
use crate::seq::ResourceKey;
use crate::store::TimerState;

#[derive(Clone)]
pub struct WorkTimer {
    ctx: SyncContext,
    outbound: Option<mpsc::UnboundedSender<ClientEvent>>,
}

impl WorkTimer {
    /// `outbound` is the socket sender; `None` when there is no partner
    /// channel to relay to.
    pub fn new(ctx: SyncContext, outbound: Option<mpsc::UnboundedSender<ClientEvent>>) -> Self {
        Self { ctx, outbound }
    }

    pub fn current(&self) -> TimerState {
        self.ctx.store.read(|s| s.my_timer)
    }

    /// Load the session for the selected date.
    pub async fn load(&self) -> Result<(), SyncError> {
        let date = self.ctx.store.read(|s| s.selected_date);
        let ticket = self.ctx.seq.issue(ResourceKey::WorkSession);

        let session = self.ctx.backend.work_session(date).await.map_err(|e| {
            tracing::warn!(date = %format_date(date), error = %e, "Failed to fetch work session");
            e
        })?;

        let still_selected = self.ctx.store.read(|s| s.selected_date == date);
        if still_selected && self.ctx.seq.try_apply(ticket) {
            self.ctx
                .store
                .apply(Update::poll(Change::MyTimer(session.into())));
        }
        Ok(())
    }

    pub async fn start(&self) -> Result<(), SyncError> {
        let date = self.ctx.store.read(|s| s.selected_date);
        let result = self.ctx.backend.start_timer(date).await;
        self.settle(result, true, "Timer started! ⏱️", "Failed to start timer")
    }

    pub async fn pause(&self) -> Result<(), SyncError> {
        let date = self.ctx.store.read(|s| s.selected_date);
        let result = self.ctx.backend.pause_timer(date).await;
        self.settle(result, false, "Timer paused", "Failed to pause timer")
    }

    pub async fn reset(&self) -> Result<(), SyncError> {
        let date = self.ctx.store.read(|s| s.selected_date);
        match self.ctx.backend.reset_timer(date).await {
            Ok(()) => {
                self.ctx.seq.invalidate(ResourceKey::WorkSession);
                let zero = TimerState::default();
                self.ctx.store.apply(Update::local(Change::MyTimer(zero)));
                self.relay(zero);
                self.ctx.toast_success("Timer reset");
                Ok(())
            }
            Err(e) => {
                self.ctx.toast_failure(&e, "Failed to reset timer");
                Err(e.into())
            }
        }
    }

    /// Tick the local counter once per second until `cancel` fires.
    pub async fn run_ticker(&self, cancel: CancellationToken) {
        let mut ticker = tokio::time::interval(Duration::from_secs(1));
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        ticker.tick().await;

        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = ticker.tick() => {
                    self.ctx.store.apply(Update::local(Change::TimerTick));
                }
            }
        }
    }

    /// Load the session now and again whenever the selected date changes.
    pub async fn follow_selected_date(&self, cancel: CancellationToken) {
        let mut state = self.ctx.store.subscribe();
        let mut date = state.borrow_and_update().selected_date;
        let _ = self.load().await;

        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                changed = state.changed() => {
                    if changed.is_err() {
                        break;
                    }
                    let selected = state.borrow_and_update().selected_date;
                    if selected != date {
                        date = selected;
                        let _ = self.load().await;
                    }
                }
            }
        }
    }

    fn settle(
        &self,
        result: Result<(), ApiError>,
        running: bool,
        success: &str,
        failure: &str,
    ) -> Result<(), SyncError> {
        match result {
            Ok(()) => {
                self.ctx.seq.invalidate(ResourceKey::WorkSession);
                let timer = TimerState {
                    total_seconds: self.current().total_seconds,
                    is_running: running,
                };
                self.ctx.store.apply(Update::local(Change::MyTimer(timer)));
                tracing::info!(running, total_seconds = timer.total_seconds, "Timer changed");
                self.relay(timer);
                self.ctx.toast_success(success);
                Ok(())
            }
            Err(e) => {
                self.ctx.toast_failure(&e, failure);
                Err(e.into())
            }
        }
    }

    /// Send the local timer to the partner, if there is one.
    fn relay(&self, timer: TimerState) {
        let Some(outbound) = &self.outbound else {
            return;
        };
        let Some(partner_id) = self.ctx.store.read(|s| s.partner_id().map(str::to_string)) else {
            return;
        };
        let event = ClientEvent::TimerUpdate(TimerUpdateData {
            partner_id,
            total_seconds: timer.total_seconds,
            is_running: timer.is_running,
            sent_at: Some(Utc::now().timestamp_millis()),
        });
        if outbound.send(event).is_err() {
            tracing::debug!("Socket channel closed, timer update not relayed");
        }
    }
}
