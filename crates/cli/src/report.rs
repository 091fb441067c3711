//! Log output for notices and state changes.

use chrono::NaiveDate;
use tokio::sync::{broadcast, watch};
use tokio_util::sync::CancellationToken;

use duotrack_core::dates::format_date;
use duotrack_core::task::Progress;
use duotrack_core::timer::format_hms;
use duotrack_sync::{AppState, Notice, ToastLevel};

/// The parts of [`AppState`] worth a log line when they change.
///
/// Timer seconds are left out so the per-second tick stays quiet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Summary {
    pub signed_in: bool,
    pub date: NaiveDate,
    pub active: usize,
    pub completed: usize,
    /// Open subtasks across the active tasks.
    pub open_subtasks: usize,
    pub goals_done: usize,
    pub goals_total: usize,
    pub partner: Option<String>,
    pub partner_tasks: usize,
    pub partner_online: bool,
    pub partner_typing: bool,
    pub timer_running: bool,
    pub partner_timer_running: bool,
}

impl Summary {
    pub fn of(state: &AppState) -> Self {
        let goals = Progress::of(&state.shared_tasks);
        Self {
            signed_in: state.user.is_some(),
            date: state.selected_date,
            active: state.active_tasks().len(),
            open_subtasks: state
                .active_tasks()
                .iter()
                .map(|t| t.pending_subtasks())
                .sum(),
            completed: state.completed_tasks().len(),
            goals_done: goals.completed,
            goals_total: goals.total,
            partner: state.partner.as_ref().map(|p| p.name.clone()),
            partner_tasks: state.partner_tasks.len(),
            partner_online: state.presence.partner_online,
            partner_typing: state.presence.partner_typing,
            timer_running: state.my_timer.is_running,
            partner_timer_running: state.partner_timer.is_running,
        }
    }

    pub fn goals_percent(&self) -> f64 {
        Progress {
            completed: self.goals_done,
            total: self.goals_total,
        }
        .percent()
    }

    /// `timer_seconds` is the local timer at the time of logging.
    pub fn log(&self, timer_seconds: u64) {
        tracing::info!(
            date = %format_date(self.date),
            active = self.active,
            completed = self.completed,
            open_subtasks = self.open_subtasks,
            goals = %format!("{}/{}", self.goals_done, self.goals_total),
            goals_percent = %format!("{:.0}", self.goals_percent()),
            partner = self.partner.as_deref().unwrap_or("-"),
            partner_tasks = self.partner_tasks,
            partner_online = self.partner_online,
            partner_typing = self.partner_typing,
            timer_running = self.timer_running,
            timer = %format_hms(timer_seconds),
            partner_timer_running = self.partner_timer_running,
            "Dashboard",
        );
    }
}

/// One log line per notice.
pub fn log_notice(notice: &Notice) {
    match notice {
        Notice::Toast {
            level: ToastLevel::Success,
            message,
        } => tracing::info!(%message, "Toast"),
        Notice::Toast {
            level: ToastLevel::Error,
            message,
        } => tracing::warn!(%message, "Toast"),
        Notice::NudgeSent { message } => tracing::info!(%message, "Nudge sent"),
        Notice::NudgeReceived { message, from } => {
            tracing::info!(%message, %from, "Nudge received")
        }
    }
}

/// Log notices until `cancel` fires or the channel closes.
pub async fn follow_notices(mut notices: broadcast::Receiver<Notice>, cancel: CancellationToken) {
    loop {
        tokio::select! {
            _ = cancel.cancelled() => break,
            received = notices.recv() => match received {
                Ok(notice) => log_notice(&notice),
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    tracing::warn!(skipped, "Notice log lagged");
                }
                Err(broadcast::error::RecvError::Closed) => break,
            },
        }
    }
}

/// Log a [`Summary`] whenever it differs from the last one logged.
pub async fn follow_state(mut state: watch::Receiver<AppState>, cancel: CancellationToken) {
    let mut last = {
        let current = state.borrow_and_update();
        let summary = Summary::of(&current);
        summary.log(current.my_timer.total_seconds);
        summary
    };

    loop {
        tokio::select! {
            _ = cancel.cancelled() => break,
            changed = state.changed() => {
                if changed.is_err() {
                    break;
                }
                let (summary, seconds) = {
                    let current = state.borrow_and_update();
                    (Summary::of(&current), current.my_timer.total_seconds)
                };
                if summary != last {
                    summary.log(seconds);
                    last = summary;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use duotrack_core::task::Task;
    use duotrack_sync::store::TimerState;

    fn task(id: &str, done: bool, shared: bool) -> Task {
        serde_json::from_value(serde_json::json!({
            "_id": id,
            "content": id,
            "isCompleted": done,
            "isShared": shared,
        }))
        .unwrap()
    }

    fn state() -> AppState {
        AppState::new(None, NaiveDate::from_ymd_opt(2024, 6, 1).unwrap())
    }

    #[test]
    fn summary_counts_tasks_and_goals() {
        let mut s = state();
        s.my_tasks = vec![task("a", false, false), task("b", true, false)];
        s.shared_tasks = vec![task("g1", true, true), task("g2", false, true)];

        let summary = Summary::of(&s);
        assert_eq!(summary.active, 1);
        assert_eq!(summary.completed, 1);
        assert_eq!((summary.goals_done, summary.goals_total), (1, 2));
        assert_eq!(summary.goals_percent(), 50.0);
        assert!(!summary.signed_in);
    }

    #[test]
    fn timer_seconds_do_not_change_the_summary() {
        let mut s = state();
        s.my_timer = TimerState {
            total_seconds: 10,
            is_running: true,
        };
        let before = Summary::of(&s);
        s.my_timer.total_seconds += 1;
        assert_eq!(Summary::of(&s), before);
    }
}
