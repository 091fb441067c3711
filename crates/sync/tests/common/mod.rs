#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::NaiveDate;
use tokio::sync::Semaphore;

use duotrack_client::{ApiError, Backend};
use duotrack_core::dashboard::{DashboardSnapshot, WorkSession};
use duotrack_core::task::{NewTask, Task};
use duotrack_core::user::{Credentials, Registration, User};
use duotrack_sync::notice::Notifier;
use duotrack_sync::store::{AppState, Store};
use duotrack_sync::SyncContext;

pub fn date(day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 6, day).unwrap()
}

pub fn user(partner_id: Option<&str>) -> User {
    serde_json::from_value(serde_json::json!({
        "_id": "u1",
        "name": "Alice",
        "email": "alice@example.com",
        "partnerId": partner_id,
        "xp": 10,
        "streak": 2,
    }))
    .unwrap()
}

pub fn task(id: &str, done: bool) -> Task {
    serde_json::from_value(serde_json::json!({
        "_id": id,
        "content": format!("task {id}"),
        "isCompleted": done,
    }))
    .unwrap()
}

pub fn shared(id: &str, done: bool) -> Task {
    Task {
        is_shared: true,
        ..task(id, done)
    }
}

pub fn snapshot(my_tasks: Vec<Task>) -> DashboardSnapshot {
    DashboardSnapshot {
        my_tasks,
        ..Default::default()
    }
}

pub fn api_error(status: u16, message: Option<&str>) -> ApiError {
    ApiError::Api {
        status,
        message: message.map(str::to_string),
        body: String::new(),
    }
}

/// Scriptable in-memory [`Backend`].
///
/// Responses come from the configured fields; calls are recorded in
/// order. Dashboard requests for a gated date wait until the test
/// releases them, so response order can be controlled.
pub struct FakeBackend {
    pub profile: Mutex<Option<User>>,
    pub dashboards: Mutex<HashMap<NaiveDate, DashboardSnapshot>>,
    pub session: Mutex<WorkSession>,
    pub calls: Mutex<Vec<String>>,
    /// Operation names that fail with the paired error.
    pub failures: Mutex<HashMap<&'static str, (u16, Option<String>)>>,
    gates: Mutex<HashMap<NaiveDate, Arc<Semaphore>>>,
    gated_ops: Mutex<HashSet<&'static str>>,
    op_gate: Arc<Semaphore>,
}

impl Default for FakeBackend {
    fn default() -> Self {
        Self {
            profile: Mutex::new(None),
            dashboards: Mutex::new(HashMap::new()),
            session: Mutex::new(WorkSession::default()),
            calls: Mutex::new(Vec::new()),
            failures: Mutex::new(HashMap::new()),
            gates: Mutex::new(HashMap::new()),
            gated_ops: Mutex::new(HashSet::new()),
            op_gate: Arc::new(Semaphore::new(0)),
        }
    }
}

impl FakeBackend {
    pub fn new(user: User) -> Arc<Self> {
        let backend = Self::default();
        *backend.profile.lock().unwrap() = Some(user);
        Arc::new(backend)
    }

    pub fn set_dashboard(&self, date: NaiveDate, snapshot: DashboardSnapshot) {
        self.dashboards.lock().unwrap().insert(date, snapshot);
    }

    pub fn fail(&self, op: &'static str, status: u16, message: Option<&str>) {
        self.failures
            .lock()
            .unwrap()
            .insert(op, (status, message.map(str::to_string)));
    }

    /// Hold dashboard responses for `date` until [`release`](Self::release).
    pub fn gate(&self, date: NaiveDate) -> Arc<Semaphore> {
        let gate = Arc::new(Semaphore::new(0));
        self.gates.lock().unwrap().insert(date, Arc::clone(&gate));
        gate
    }

    /// Hold every call to `op` until [`release_op`](Self::release_op).
    pub fn gate_op(&self, op: &'static str) {
        self.gated_ops.lock().unwrap().insert(op);
    }

    pub fn release_op(&self) {
        self.op_gate.add_permits(1);
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn count(&self, prefix: &str) -> usize {
        self.calls().iter().filter(|c| c.starts_with(prefix)).count()
    }

    async fn record(&self, op: &'static str, call: String) -> Result<(), ApiError> {
        self.calls.lock().unwrap().push(call);
        let gated = self.gated_ops.lock().unwrap().contains(op);
        if gated {
            self.op_gate.acquire().await.unwrap().forget();
        }
        match self.failures.lock().unwrap().get(op) {
            Some((status, message)) => Err(ApiError::Api {
                status: *status,
                message: message.clone(),
                body: String::new(),
            }),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl Backend for FakeBackend {
    async fn register(&self, registration: &Registration) -> Result<User, ApiError> {
        self.record("register", format!("register {}", registration.email))
            .await?;
        Ok(self.profile.lock().unwrap().clone().unwrap())
    }

    async fn login(&self, credentials: &Credentials) -> Result<User, ApiError> {
        self.record("login", format!("login {}", credentials.email))
            .await?;
        Ok(self.profile.lock().unwrap().clone().unwrap())
    }

    async fn logout(&self) -> Result<(), ApiError> {
        self.record("logout", "logout".into()).await
    }

    async fn profile(&self) -> Result<User, ApiError> {
        self.record("profile", "profile".into()).await?;
        Ok(self.profile.lock().unwrap().clone().unwrap())
    }

    async fn link_partner(&self, email: &str) -> Result<(), ApiError> {
        self.record("link_partner", format!("link_partner {email}"))
            .await
    }

    async fn unlink_partner(&self) -> Result<(), ApiError> {
        self.record("unlink_partner", "unlink_partner".into()).await
    }

    async fn send_nudge(&self, message: &str) -> Result<(), ApiError> {
        self.record("send_nudge", format!("send_nudge {message}"))
            .await
    }

    async fn mark_nudge_seen(&self) -> Result<(), ApiError> {
        self.record("mark_nudge_seen", "mark_nudge_seen".into())
            .await
    }

    async fn dashboard(&self, date: NaiveDate) -> Result<DashboardSnapshot, ApiError> {
        self.record("dashboard", format!("dashboard {date}")).await?;
        let gate = self.gates.lock().unwrap().get(&date).cloned();
        if let Some(gate) = gate {
            gate.acquire().await.unwrap().forget();
        }
        Ok(self
            .dashboards
            .lock()
            .unwrap()
            .get(&date)
            .cloned()
            .unwrap_or_default())
    }

    async fn create_task(&self, task: &NewTask) -> Result<(), ApiError> {
        let date = task.date.map(|d| d.to_string()).unwrap_or_default();
        self.record(
            "create_task",
            format!("create_task {} shared={} {date}", task.content, task.is_shared),
        )
        .await
    }

    async fn update_task_content(&self, task_id: &str, content: &str) -> Result<(), ApiError> {
        self.record("update_task_content", format!("update_task_content {task_id} {content}"))
            .await
    }

    async fn set_task_status(&self, task_id: &str, is_completed: bool) -> Result<(), ApiError> {
        self.record("set_task_status", format!("set_task_status {task_id} {is_completed}"))
            .await
    }

    async fn delete_task(&self, task_id: &str) -> Result<(), ApiError> {
        self.record("delete_task", format!("delete_task {task_id}"))
            .await
    }

    async fn add_comment(&self, task_id: &str, text: &str) -> Result<(), ApiError> {
        self.record("add_comment", format!("add_comment {task_id} {text}"))
            .await
    }

    async fn add_subtask(&self, task_id: &str, content: &str) -> Result<(), ApiError> {
        self.record("add_subtask", format!("add_subtask {task_id} {content}"))
            .await
    }

    async fn toggle_subtask(&self, task_id: &str, subtask_id: &str) -> Result<(), ApiError> {
        self.record("toggle_subtask", format!("toggle_subtask {task_id} {subtask_id}"))
            .await
    }

    async fn work_session(&self, date: NaiveDate) -> Result<WorkSession, ApiError> {
        self.record("work_session", format!("work_session {date}"))
            .await?;
        Ok(*self.session.lock().unwrap())
    }

    async fn start_timer(&self, date: NaiveDate) -> Result<(), ApiError> {
        self.record("start_timer", format!("start_timer {date}")).await
    }

    async fn pause_timer(&self, date: NaiveDate) -> Result<(), ApiError> {
        self.record("pause_timer", format!("pause_timer {date}")).await
    }

    async fn reset_timer(&self, date: NaiveDate) -> Result<(), ApiError> {
        self.record("reset_timer", format!("reset_timer {date}")).await
    }
}

/// A context over `backend` with the store on `date` for `user`.
pub fn context(backend: &Arc<FakeBackend>, user: User, date: NaiveDate) -> SyncContext {
    let backend: Arc<dyn Backend> = backend.clone();
    SyncContext::new(
        backend,
        Arc::new(Store::new(AppState::new(Some(user), date))),
        Notifier::default(),
    )
}

/// Drain every notice currently buffered on `rx`.
pub fn drain(
    rx: &mut tokio::sync::broadcast::Receiver<duotrack_sync::Notice>,
) -> Vec<duotrack_sync::Notice> {
    let mut out = Vec::new();
    while let Ok(notice) = rx.try_recv() {
        out.push(notice);
    }
    out
}
