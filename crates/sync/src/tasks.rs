//! Personal task panel.
//!
//! Each action is an independent REST call followed by a silent refetch.
//! Toggling is optimistic: the flag flips in the store at once and is
//! reverted if the backend rejects it.

use duotrack_core::error::CoreError;
use duotrack_core::task::{partition, NewTask, Progress, Task};
use duotrack_core::types::EntityId;

use crate::context::SyncContext;
use crate::dashboard::{DashboardSync, Loader};
use crate::error::SyncError;
use crate::reducer::{Change, Update};
use crate::seq::ResourceKey;

/// Result of an inline edit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditOutcome {
    Saved,
    /// Blank or identical content; nothing was sent.
    Unchanged,
}

/// A task list split the way the panel shows it.
#[derive(Debug, Clone, PartialEq)]
pub struct TaskPanelView {
    pub active: Vec<Task>,
    pub completed: Vec<Task>,
    pub progress: Progress,
}

#[derive(Clone)]
pub struct TaskPanel {
    ctx: SyncContext,
    dashboard: DashboardSync,
}

impl TaskPanel {
    pub fn new(ctx: SyncContext, dashboard: DashboardSync) -> Self {
        Self { ctx, dashboard }
    }

    /// The signed-in user's tasks, active ones in local drag order.
    pub fn view(&self) -> TaskPanelView {
        self.ctx.store.read(|s| TaskPanelView {
            active: s.active_tasks().into_iter().cloned().collect(),
            completed: s.completed_tasks().into_iter().cloned().collect(),
            progress: Progress::of(&s.my_tasks),
        })
    }

    /// The partner's tasks, read-only.
    pub fn partner_view(&self) -> TaskPanelView {
        self.ctx.store.read(|s| {
            let (active, completed) = partition(&s.partner_tasks);
            TaskPanelView {
                active: active.into_iter().cloned().collect(),
                completed: completed.into_iter().cloned().collect(),
                progress: Progress::of(&s.partner_tasks),
            }
        })
    }

    /// Create a task on the selected date.
    pub async fn create(&self, task: NewTask) -> Result<(), SyncError> {
        let task = task.on(self.dashboard.selected_date()).normalized();
        task.validate()?;

        match self.ctx.backend.create_task(&task).await {
            Ok(()) => {
                tracing::info!(category = %task.category, "Task created");
                self.ctx.toast_success("Task added! 🚀");
                self.settle().await;
                Ok(())
            }
            Err(e) => {
                self.ctx.toast_failure(&e, "Failed to add task");
                Err(e.into())
            }
        }
    }

    /// Flip completion optimistically and confirm with the backend.
    ///
    /// A second toggle of the same task while the first is in flight is
    /// ignored. Partner tasks cannot be toggled.
    pub async fn toggle(&self, task_id: &str) -> Result<(), SyncError> {
        let target = self.ctx.store.read(|s| {
            if let Some(task) = s.my_task(task_id) {
                Ok(!task.is_completed)
            } else if s.is_partner_task(task_id) {
                Err(SyncError::NotOwner(task_id.to_string()))
            } else {
                Err(SyncError::TaskNotFound(task_id.to_string()))
            }
        })?;

        let flipped = self.ctx.store.apply(Update::optimistic(Change::TaskToggled {
            task_id: task_id.to_string(),
        }));
        if !flipped.is_applied() {
            tracing::debug!(task_id, "Toggle already in flight");
            return Ok(());
        }

        match self.ctx.backend.set_task_status(task_id, target).await {
            Ok(()) => {
                self.ctx.seq.invalidate(ResourceKey::Dashboard);
                self.ctx.store.apply(Update::local(Change::TaskToggleConfirmed {
                    task_id: task_id.to_string(),
                }));
                tracing::info!(task_id, completed = target, "Task toggled");
                self.ctx
                    .toast_success(if target { "Task completed! 🎉" } else { "Task reopened!" });
                self.dashboard.refresh(Loader::Silent).await;
                Ok(())
            }
            Err(e) => {
                self.ctx.store.apply(Update::local(Change::TaskToggleReverted {
                    task_id: task_id.to_string(),
                }));
                self.ctx.toast_failure(&e, "Failed to update task");
                Err(e.into())
            }
        }
    }

    /// Save new content. Blank or unchanged content is a no-op.
    pub async fn edit(&self, task_id: &str, content: &str) -> Result<EditOutcome, SyncError> {
        let content = content.trim();
        let current = self
            .ctx
            .store
            .read(|s| s.my_task(task_id).map(|t| t.content.clone()))
            .ok_or_else(|| SyncError::TaskNotFound(task_id.to_string()))?;
        if content.is_empty() || content == current {
            return Ok(EditOutcome::Unchanged);
        }

        match self.ctx.backend.update_task_content(task_id, content).await {
            Ok(()) => {
                self.ctx.store.apply(Update::local(Change::TaskContentEdited {
                    task_id: task_id.to_string(),
                    content: content.to_string(),
                }));
                self.ctx.toast_success("Task updated!");
                self.settle().await;
                Ok(EditOutcome::Saved)
            }
            Err(e) => {
                self.ctx.toast_failure(&e, "Failed to update task");
                Err(e.into())
            }
        }
    }

    pub async fn delete(&self, task_id: &str) -> Result<(), SyncError> {
        match self.ctx.backend.delete_task(task_id).await {
            Ok(()) => {
                tracing::info!(task_id, "Task deleted");
                self.ctx.toast_success("Task deleted!");
                self.settle().await;
                Ok(())
            }
            Err(e) => {
                self.ctx.toast_failure(&e, "Failed to delete task");
                Err(e.into())
            }
        }
    }

    /// Add a comment. Blank text is ignored.
    pub async fn comment(&self, task_id: &str, text: &str) -> Result<(), SyncError> {
        let text = text.trim();
        if text.is_empty() {
            return Ok(());
        }
        match self.ctx.backend.add_comment(task_id, text).await {
            Ok(()) => {
                self.ctx.toast_success("Message sent! 💬");
                self.settle().await;
                Ok(())
            }
            Err(e) => {
                self.ctx.toast_failure(&e, "Failed to add message");
                Err(e.into())
            }
        }
    }

    /// Add a subtask. Blank content is ignored.
    pub async fn add_subtask(&self, task_id: &str, content: &str) -> Result<(), SyncError> {
        let content = content.trim();
        if content.is_empty() {
            return Ok(());
        }
        match self.ctx.backend.add_subtask(task_id, content).await {
            Ok(()) => {
                self.ctx.toast_success("Subtask added");
                self.settle().await;
                Ok(())
            }
            Err(e) => {
                self.ctx.toast_failure(&e, "Failed to add subtask");
                Err(e.into())
            }
        }
    }

    pub async fn toggle_subtask(&self, task_id: &str, subtask_id: &str) -> Result<(), SyncError> {
        let known = self.ctx.store.read(|s| {
            s.my_task(task_id)
                .or_else(|| s.shared_task(task_id))
                .is_some_and(|t| t.subtask(subtask_id).is_some())
        });
        if !known {
            return Err(CoreError::NotFound {
                entity: "subtask",
                id: subtask_id.to_string(),
            }
            .into());
        }

        match self.ctx.backend.toggle_subtask(task_id, subtask_id).await {
            Ok(()) => {
                self.settle().await;
                Ok(())
            }
            Err(e) => {
                self.ctx.toast_failure(&e, "Failed update");
                Err(e.into())
            }
        }
    }

    /// Record a local drag order for the active tasks. Not persisted.
    pub fn reorder_active(&self, order: Vec<EntityId>) {
        self.ctx
            .store
            .apply(Update::local(Change::ActiveReordered(order)));
    }

    /// After a confirmed mutation: drop older in-flight polls and refetch.
    async fn settle(&self) {
        self.ctx.seq.invalidate(ResourceKey::Dashboard);
        self.dashboard.refresh(Loader::Silent).await;
    }
}
