//! Single entry point for socket events.
//!
//! [`dispatch`] maps every [`ServerEvent`] to at most one [`Change`];
//! [`run_dispatcher`] feeds the results into the store and owns the typing
//! expiry so a lost `partner_stop_typing` cannot leave the indicator on.

use std::time::Duration;

use tokio::sync::broadcast;
use tokio::sync::broadcast::error::RecvError;
use tokio_util::sync::CancellationToken;

use duotrack_realtime::{ChannelEvent, ServerEvent};

use crate::presence::TypingExpiry;
use crate::reducer::{Change, Update};
use crate::store::{Store, TimerState};

/// Translate a socket event for the current partner into a state change.
///
/// Presence events about anyone other than `partner_id` are ignored.
pub fn dispatch(event: &ServerEvent, partner_id: &str) -> Option<Change> {
    match event {
        ServerEvent::UserOnline(p) if p.user_id == partner_id => {
            Some(Change::PartnerPresence { online: true })
        }
        ServerEvent::UserOffline(p) if p.user_id == partner_id => {
            Some(Change::PartnerPresence { online: false })
        }
        ServerEvent::UserOnline(_) | ServerEvent::UserOffline(_) => None,
        ServerEvent::PartnerTyping(n) if is_other(n.sender_id.as_deref(), partner_id) => None,
        ServerEvent::PartnerTyping(_) => Some(Change::PartnerTyping { typing: true }),
        ServerEvent::PartnerStopTyping(n) if is_other(n.sender_id.as_deref(), partner_id) => None,
        ServerEvent::PartnerStopTyping(_) => Some(Change::PartnerTyping { typing: false }),
        ServerEvent::PartnerTimerUpdate(snap) => Some(Change::PartnerTimer {
            snapshot: TimerState {
                total_seconds: snap.total_seconds,
                is_running: snap.is_running,
            },
            sent_at: snap.sent_at,
        }),
    }
}

fn is_other(sender_id: Option<&str>, partner_id: &str) -> bool {
    sender_id.is_some_and(|id| id != partner_id)
}

/// Apply channel events to `store` until `cancel` fires or the channel
/// closes.
pub async fn run_dispatcher(
    mut events: broadcast::Receiver<ChannelEvent>,
    store: &Store,
    partner_id: String,
    typing_expiry: Duration,
    cancel: CancellationToken,
) {
    let mut typing = TypingExpiry::new(typing_expiry);

    loop {
        tokio::select! {
            _ = cancel.cancelled() => break,
            _ = typing.expired() => {
                typing.disarm();
                tracing::debug!("Partner typing indicator expired");
                store.apply(Update::socket(Change::PartnerTyping { typing: false }));
            }
            received = events.recv() => match received {
                Ok(ChannelEvent::Event(event)) => {
                    let Some(change) = dispatch(&event, &partner_id) else {
                        tracing::debug!(?event, "Ignoring socket event for another user");
                        continue;
                    };
                    match &change {
                        Change::PartnerTyping { typing: true } => typing.arm(),
                        Change::PartnerTyping { typing: false }
                        | Change::PartnerPresence { online: false } => typing.disarm(),
                        _ => {}
                    }
                    store.apply(Update::socket(change));
                }
                Ok(ChannelEvent::Connected) => {
                    tracing::debug!("Socket channel connected");
                }
                Ok(ChannelEvent::Disconnected) => {
                    // Presence is unknown until the server reports it again.
                    typing.disarm();
                    store.apply(Update::socket(Change::PartnerPresence { online: false }));
                }
                Err(RecvError::Lagged(skipped)) => {
                    tracing::warn!(skipped, "Dispatcher lagged behind socket events");
                }
                Err(RecvError::Closed) => break,
            },
        }
    }
    tracing::debug!("Dispatcher stopped");
}
