//! The single client-side state container.
//!
//! [`Store`] wraps a [`tokio::sync::watch`] channel: writers go through
//! [`Store::apply`], readers either take a snapshot or subscribe and
//! await changes. Subscribers are only woken when the reducer reports
//! that the state actually changed.

use std::collections::HashMap;

use chrono::NaiveDate;
use tokio::sync::watch;

use duotrack_core::dashboard::WorkSession;
use duotrack_core::task::{partition, Task};
use duotrack_core::types::EntityId;
use duotrack_core::user::{Partner, User};

use crate::reducer::{reduce, Outcome, Update};

/// Display-only flags driven by socket events.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Presence {
    pub partner_online: bool,
    pub partner_typing: bool,
}

/// A locally mirrored work-session counter.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TimerState {
    pub total_seconds: u64,
    pub is_running: bool,
}

impl From<WorkSession> for TimerState {
    fn from(session: WorkSession) -> Self {
        Self {
            total_seconds: session.total_seconds,
            is_running: session.is_running,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct AppState {
    pub user: Option<User>,
    pub selected_date: NaiveDate,
    /// Blocking loader shown during explicit fetches.
    pub loading: bool,
    pub my_tasks: Vec<Task>,
    pub partner_tasks: Vec<Task>,
    pub shared_tasks: Vec<Task>,
    pub partner: Option<Partner>,
    pub presence: Presence,
    pub my_timer: TimerState,
    pub partner_timer: TimerState,
    /// `sentAt` of the last applied partner timer snapshot.
    pub partner_timer_sent_at: Option<i64>,
    /// Local drag order of active task ids. Never sent to the backend.
    pub active_order: Vec<EntityId>,
    /// Optimistic completion values of toggles still awaiting the backend.
    pub pending_toggles: HashMap<EntityId, bool>,
}

impl AppState {
    pub fn new(user: Option<User>, selected_date: NaiveDate) -> Self {
        Self {
            user,
            selected_date,
            loading: false,
            my_tasks: Vec::new(),
            partner_tasks: Vec::new(),
            shared_tasks: Vec::new(),
            partner: None,
            presence: Presence::default(),
            my_timer: TimerState::default(),
            partner_timer: TimerState::default(),
            partner_timer_sent_at: None,
            active_order: Vec::new(),
            pending_toggles: HashMap::new(),
        }
    }

    pub fn my_task(&self, task_id: &str) -> Option<&Task> {
        self.my_tasks.iter().find(|t| t.id == task_id)
    }

    pub fn shared_task(&self, task_id: &str) -> Option<&Task> {
        self.shared_tasks.iter().find(|t| t.id == task_id)
    }

    pub fn is_partner_task(&self, task_id: &str) -> bool {
        self.partner_tasks.iter().any(|t| t.id == task_id)
    }

    /// The partner's id, from the dashboard payload or the profile.
    pub fn partner_id(&self) -> Option<&str> {
        self.partner
            .as_ref()
            .map(|p| p.id.as_str())
            .or_else(|| self.user.as_ref().and_then(|u| u.partner_id.as_deref()))
            .filter(|id| !id.is_empty())
    }

    pub fn has_partner(&self) -> bool {
        self.partner_id().is_some()
    }

    /// Active own tasks in display order: dragged ids first in their local
    /// order, then the rest in server order.
    pub fn active_tasks(&self) -> Vec<&Task> {
        let (mut active, _) = partition(&self.my_tasks);
        if self.active_order.is_empty() {
            return active;
        }
        let rank = |task: &&Task| {
            self.active_order
                .iter()
                .position(|id| *id == task.id)
                .unwrap_or(usize::MAX)
        };
        active.sort_by_key(rank);
        active
    }

    pub fn completed_tasks(&self) -> Vec<&Task> {
        partition(&self.my_tasks).1
    }
}

pub struct Store {
    tx: watch::Sender<AppState>,
}

impl Store {
    pub fn new(initial: AppState) -> Self {
        let (tx, _) = watch::channel(initial);
        Self { tx }
    }

    /// Run one update through the reducer. Subscribers are notified only
    /// when the outcome is [`Outcome::Applied`].
    pub fn apply(&self, update: Update) -> Outcome {
        let source = update.source;
        let mut outcome = Outcome::Ignored;
        self.tx.send_if_modified(|state| {
            outcome = reduce(state, update);
            outcome.is_applied()
        });
        tracing::trace!(?source, ?outcome, "State update");
        outcome
    }

    /// Read from the current state without cloning it.
    pub fn read<R>(&self, f: impl FnOnce(&AppState) -> R) -> R {
        f(&self.tx.borrow())
    }

    pub fn snapshot(&self) -> AppState {
        self.tx.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<AppState> {
        self.tx.subscribe()
    }
}
