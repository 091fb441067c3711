//! The per-day dashboard payload and the work-session counter.

use serde::{Deserialize, Serialize};

use crate::task::Task;
use crate::types::null_as_empty;
use crate::user::Partner;

/// Everything `GET /tasks/dashboard?date=...` returns for one day.
///
/// Missing or `null` collections decode as empty; the client replaces its
/// whole task state with this snapshot on every successful fetch.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardSnapshot {
    #[serde(default, deserialize_with = "null_as_empty")]
    pub my_tasks: Vec<Task>,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub partner_tasks: Vec<Task>,
    #[serde(default)]
    pub partner: Option<Partner>,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub shared_tasks: Vec<Task>,
}

/// Accumulated work time for one user on one date.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkSession {
    #[serde(default)]
    pub total_seconds: u64,
    #[serde(default)]
    pub is_running: bool,
}
