//! Pure update contract for [`AppState`].
//!
//! Every write names its [`Source`] so the merge policy per source is
//! visible in one place:
//!
//! - `Poll` responses replace collections wholesale, then pending
//!   optimistic toggles are laid back on top.
//! - `Optimistic` changes apply immediately and are either confirmed or
//!   reverted once the backend answers.
//! - `Socket` changes only touch presence and the partner timer.
//! - `Local` changes are user actions that need no confirmation.

use chrono::NaiveDate;

use duotrack_core::dashboard::DashboardSnapshot;
use duotrack_core::types::EntityId;
use duotrack_core::user::User;

use crate::store::{AppState, TimerState};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Source {
    Poll,
    Optimistic,
    Socket,
    Local,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Change {
    /// A dashboard response for `date`.
    DashboardLoaded {
        date: NaiveDate,
        snapshot: DashboardSnapshot,
    },
    ProfileLoaded(User),
    LoadingChanged(bool),
    DateSelected(NaiveDate),
    TaskToggled {
        task_id: EntityId,
    },
    TaskToggleConfirmed {
        task_id: EntityId,
    },
    TaskToggleReverted {
        task_id: EntityId,
    },
    TaskContentEdited {
        task_id: EntityId,
        content: String,
    },
    ActiveReordered(Vec<EntityId>),
    PartnerPresence {
        online: bool,
    },
    PartnerTyping {
        typing: bool,
    },
    MyTimer(TimerState),
    PartnerTimer {
        snapshot: TimerState,
        sent_at: Option<i64>,
    },
    /// One second elapsed on the local timer.
    TimerTick,
    SignedOut,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Update {
    pub source: Source,
    pub change: Change,
}

impl Update {
    pub fn poll(change: Change) -> Self {
        Self {
            source: Source::Poll,
            change,
        }
    }

    pub fn optimistic(change: Change) -> Self {
        Self {
            source: Source::Optimistic,
            change,
        }
    }

    pub fn socket(change: Change) -> Self {
        Self {
            source: Source::Socket,
            change,
        }
    }

    pub fn local(change: Change) -> Self {
        Self {
            source: Source::Local,
            change,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Applied,
    Ignored,
}

impl Outcome {
    pub fn is_applied(self) -> bool {
        self == Outcome::Applied
    }
}

fn applied_if(changed: bool) -> Outcome {
    if changed {
        Outcome::Applied
    } else {
        Outcome::Ignored
    }
}

/// Apply `update` to `state`.
pub fn reduce(state: &mut AppState, update: Update) -> Outcome {
    match update.change {
        Change::DashboardLoaded { date, snapshot } => {
            if date != state.selected_date {
                return Outcome::Ignored;
            }
            let mut my_tasks = snapshot.my_tasks;
            for task in my_tasks.iter_mut() {
                if let Some(value) = state.pending_toggles.get(&task.id) {
                    task.is_completed = *value;
                }
            }

            let changed = state.my_tasks != my_tasks
                || state.partner_tasks != snapshot.partner_tasks
                || state.shared_tasks != snapshot.shared_tasks
                || state.partner != snapshot.partner;
            state.my_tasks = my_tasks;
            state.partner_tasks = snapshot.partner_tasks;
            state.shared_tasks = snapshot.shared_tasks;
            state.partner = snapshot.partner;

            let before = state.active_order.len();
            let my_tasks = &state.my_tasks;
            state
                .active_order
                .retain(|id| my_tasks.iter().any(|t| t.id == *id && !t.is_completed));
            applied_if(changed || state.active_order.len() != before)
        }

        Change::ProfileLoaded(user) => {
            let changed = state.user.as_ref() != Some(&user);
            state.user = Some(user);
            applied_if(changed)
        }

        Change::LoadingChanged(loading) => {
            let changed = state.loading != loading;
            state.loading = loading;
            applied_if(changed)
        }

        Change::DateSelected(date) => {
            if state.selected_date == date {
                return Outcome::Ignored;
            }
            state.selected_date = date;
            state.active_order.clear();
            Outcome::Applied
        }

        Change::TaskToggled { task_id } => {
            if state.pending_toggles.contains_key(&task_id) {
                return Outcome::Ignored;
            }
            let Some(task) = state.my_tasks.iter_mut().find(|t| t.id == task_id) else {
                return Outcome::Ignored;
            };
            task.is_completed = !task.is_completed;
            let value = task.is_completed;
            state.pending_toggles.insert(task_id, value);
            Outcome::Applied
        }

        Change::TaskToggleConfirmed { task_id } => {
            applied_if(state.pending_toggles.remove(&task_id).is_some())
        }

        Change::TaskToggleReverted { task_id } => {
            let Some(optimistic) = state.pending_toggles.remove(&task_id) else {
                return Outcome::Ignored;
            };
            if let Some(task) = state.my_tasks.iter_mut().find(|t| t.id == task_id) {
                task.is_completed = !optimistic;
            }
            Outcome::Applied
        }

        Change::TaskContentEdited { task_id, content } => {
            let task = state
                .my_tasks
                .iter_mut()
                .chain(state.shared_tasks.iter_mut())
                .find(|t| t.id == task_id);
            match task {
                Some(task) if task.content != content => {
                    task.content = content;
                    Outcome::Applied
                }
                _ => Outcome::Ignored,
            }
        }

        Change::ActiveReordered(order) => {
            let my_tasks = &state.my_tasks;
            let order: Vec<EntityId> = order
                .into_iter()
                .filter(|id| my_tasks.iter().any(|t| t.id == *id && !t.is_completed))
                .collect();
            let changed = state.active_order != order;
            state.active_order = order;
            applied_if(changed)
        }

        Change::PartnerPresence { online } => {
            let before = state.presence;
            state.presence.partner_online = online;
            if !online {
                state.presence.partner_typing = false;
            }
            applied_if(state.presence != before)
        }

        Change::PartnerTyping { typing } => {
            let changed = state.presence.partner_typing != typing;
            state.presence.partner_typing = typing;
            applied_if(changed)
        }

        Change::MyTimer(timer) => {
            let changed = state.my_timer != timer;
            state.my_timer = timer;
            applied_if(changed)
        }

        Change::PartnerTimer { snapshot, sent_at } => {
            if let (Some(incoming), Some(last)) = (sent_at, state.partner_timer_sent_at) {
                if incoming < last {
                    return Outcome::Ignored;
                }
            }
            if sent_at.is_some() {
                state.partner_timer_sent_at = sent_at;
            }
            let changed = state.partner_timer != snapshot;
            state.partner_timer = snapshot;
            applied_if(changed)
        }

        Change::TimerTick => {
            if !state.my_timer.is_running {
                return Outcome::Ignored;
            }
            state.my_timer.total_seconds += 1;
            Outcome::Applied
        }

        Change::SignedOut => {
            *state = AppState::new(None, state.selected_date);
            Outcome::Applied
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::Presence;
    use duotrack_core::task::Task;
    use duotrack_core::user::Partner;

    fn date(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 6, d).unwrap()
    }

    fn task(id: &str, done: bool) -> Task {
        serde_json::from_value(serde_json::json!({
            "_id": id,
            "content": format!("task {id}"),
            "isCompleted": done,
        }))
        .unwrap()
    }

    fn state_with(tasks: Vec<Task>) -> AppState {
        let mut state = AppState::new(None, date(1));
        state.my_tasks = tasks;
        state
    }

    fn loaded(d: NaiveDate, tasks: Vec<Task>) -> Update {
        Update::poll(Change::DashboardLoaded {
            date: d,
            snapshot: DashboardSnapshot {
                my_tasks: tasks,
                ..Default::default()
            },
        })
    }

    #[test]
    fn dashboard_replaces_collections() {
        let mut state = state_with(vec![task("a", false), task("b", false)]);
        state.partner = Some(Partner {
            id: "u2".into(),
            name: "Bob".into(),
            email: "bob@example.com".into(),
        });

        let outcome = reduce(&mut state, loaded(date(1), vec![task("c", false)]));

        assert_eq!(outcome, Outcome::Applied);
        let ids: Vec<_> = state.my_tasks.iter().map(|t| t.id.as_str()).collect();
        assert_eq!(ids, ["c"]);
        assert!(state.partner.is_none());
    }

    #[test]
    fn dashboard_for_another_date_is_ignored() {
        let mut state = state_with(vec![task("a", false)]);
        let outcome = reduce(&mut state, loaded(date(2), vec![task("z", false)]));
        assert_eq!(outcome, Outcome::Ignored);
        assert_eq!(state.my_tasks[0].id, "a");
    }

    #[test]
    fn pending_toggle_survives_poll() {
        let mut state = state_with(vec![task("a", false)]);
        reduce(
            &mut state,
            Update::optimistic(Change::TaskToggled {
                task_id: "a".into(),
            }),
        );
        assert!(state.my_tasks[0].is_completed);

        // A poll issued before the toggle still reports the old value.
        reduce(&mut state, loaded(date(1), vec![task("a", false)]));
        assert!(state.my_tasks[0].is_completed);

        reduce(
            &mut state,
            Update::local(Change::TaskToggleConfirmed {
                task_id: "a".into(),
            }),
        );
        reduce(&mut state, loaded(date(1), vec![task("a", false)]));
        assert!(!state.my_tasks[0].is_completed);
    }

    #[test]
    fn toggle_twice_while_pending_is_ignored() {
        let mut state = state_with(vec![task("a", false)]);
        let toggle = Update::optimistic(Change::TaskToggled {
            task_id: "a".into(),
        });
        assert_eq!(reduce(&mut state, toggle.clone()), Outcome::Applied);
        assert_eq!(reduce(&mut state, toggle), Outcome::Ignored);
        assert!(state.my_tasks[0].is_completed);
    }

    #[test]
    fn revert_restores_previous_value() {
        let mut state = state_with(vec![task("a", true)]);
        reduce(
            &mut state,
            Update::optimistic(Change::TaskToggled {
                task_id: "a".into(),
            }),
        );
        assert!(!state.my_tasks[0].is_completed);

        reduce(
            &mut state,
            Update::local(Change::TaskToggleReverted {
                task_id: "a".into(),
            }),
        );
        assert!(state.my_tasks[0].is_completed);
        assert!(state.pending_toggles.is_empty());
    }

    #[test]
    fn toggle_unknown_task_is_ignored() {
        let mut state = state_with(vec![task("a", false)]);
        let outcome = reduce(
            &mut state,
            Update::optimistic(Change::TaskToggled {
                task_id: "nope".into(),
            }),
        );
        assert_eq!(outcome, Outcome::Ignored);
        assert!(state.pending_toggles.is_empty());
    }

    #[test]
    fn reorder_keeps_only_active_ids_and_poll_prunes() {
        let mut state = state_with(vec![task("a", false), task("b", false), task("c", true)]);
        reduce(
            &mut state,
            Update::local(Change::ActiveReordered(vec![
                "b".into(),
                "c".into(),
                "a".into(),
            ])),
        );
        assert_eq!(state.active_order, ["b", "a"]);
        let active: Vec<_> = state.active_tasks().iter().map(|t| t.id.as_str()).collect();
        assert_eq!(active, ["b", "a"]);

        reduce(&mut state, loaded(date(1), vec![task("a", false), task("d", false)]));
        assert_eq!(state.active_order, ["a"]);
        let active: Vec<_> = state.active_tasks().iter().map(|t| t.id.as_str()).collect();
        assert_eq!(active, ["a", "d"]);
    }

    #[test]
    fn date_change_clears_local_order() {
        let mut state = state_with(vec![task("a", false), task("b", false)]);
        reduce(
            &mut state,
            Update::local(Change::ActiveReordered(vec!["b".into(), "a".into()])),
        );
        assert_eq!(
            reduce(&mut state, Update::local(Change::DateSelected(date(2)))),
            Outcome::Applied
        );
        assert!(state.active_order.is_empty());
        assert_eq!(
            reduce(&mut state, Update::local(Change::DateSelected(date(2)))),
            Outcome::Ignored
        );
    }

    #[test]
    fn older_partner_timer_snapshot_is_rejected() {
        let mut state = state_with(vec![]);
        let snap = |secs, sent_at| {
            Update::socket(Change::PartnerTimer {
                snapshot: TimerState {
                    total_seconds: secs,
                    is_running: true,
                },
                sent_at,
            })
        };

        assert_eq!(reduce(&mut state, snap(120, Some(2_000))), Outcome::Applied);
        assert_eq!(reduce(&mut state, snap(60, Some(1_000))), Outcome::Ignored);
        assert_eq!(state.partner_timer.total_seconds, 120);

        // Peers that do not stamp snapshots are applied as received.
        assert_eq!(reduce(&mut state, snap(30, None)), Outcome::Applied);
        assert_eq!(state.partner_timer.total_seconds, 30);
        assert_eq!(state.partner_timer_sent_at, Some(2_000));
    }

    #[test]
    fn tick_only_counts_while_running() {
        let mut state = state_with(vec![]);
        assert_eq!(reduce(&mut state, Update::local(Change::TimerTick)), Outcome::Ignored);

        reduce(
            &mut state,
            Update::local(Change::MyTimer(TimerState {
                total_seconds: 59,
                is_running: true,
            })),
        );
        assert_eq!(reduce(&mut state, Update::local(Change::TimerTick)), Outcome::Applied);
        assert_eq!(state.my_timer.total_seconds, 60);
    }

    #[test]
    fn going_offline_clears_typing() {
        let mut state = state_with(vec![]);
        reduce(&mut state, Update::socket(Change::PartnerPresence { online: true }));
        reduce(&mut state, Update::socket(Change::PartnerTyping { typing: true }));
        reduce(&mut state, Update::socket(Change::PartnerPresence { online: false }));
        assert_eq!(state.presence, Presence::default());
    }

    #[test]
    fn sign_out_keeps_only_the_date() {
        let mut state = state_with(vec![task("a", false)]);
        state.my_timer.total_seconds = 10;
        reduce(&mut state, Update::local(Change::SignedOut));
        assert_eq!(state, AppState::new(None, date(1)));
    }
}
