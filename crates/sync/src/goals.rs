//! Common goals: shared tasks both partners can complete.
//!
//! Unlike the personal panel, toggling a goal is not optimistic: the
//! inverse of the current flag is sent and the refetch shows the result.

use duotrack_core::task::{NewTask, Progress, Task};

use crate::context::SyncContext;
use crate::dashboard::{DashboardSync, Loader};
use crate::error::SyncError;
use crate::seq::ResourceKey;

#[derive(Debug, Clone, PartialEq)]
pub struct GoalsView {
    pub goals: Vec<Task>,
    pub progress: Progress,
}

#[derive(Clone)]
pub struct CommonGoals {
    ctx: SyncContext,
    dashboard: DashboardSync,
}

impl CommonGoals {
    pub fn new(ctx: SyncContext, dashboard: DashboardSync) -> Self {
        Self { ctx, dashboard }
    }

    pub fn view(&self) -> GoalsView {
        self.ctx.store.read(|s| GoalsView {
            goals: s.shared_tasks.clone(),
            progress: Progress::of(&s.shared_tasks),
        })
    }

    /// Add a goal on the selected date. Blank content is ignored.
    pub async fn add(&self, content: &str) -> Result<(), SyncError> {
        self.require_partner()?;
        if content.trim().is_empty() {
            return Ok(());
        }
        let goal = NewTask::shared_goal(content)
            .on(self.dashboard.selected_date())
            .normalized();

        match self.ctx.backend.create_task(&goal).await {
            Ok(()) => {
                self.ctx.toast_success("Common goal added! 🎯");
                self.settle().await;
                Ok(())
            }
            Err(e) => {
                self.ctx.toast_failure(&e, "Failed to add common goal");
                Err(e.into())
            }
        }
    }

    pub async fn toggle(&self, task_id: &str) -> Result<(), SyncError> {
        self.require_partner()?;
        let current = self
            .ctx
            .store
            .read(|s| s.shared_task(task_id).map(|t| t.is_completed))
            .ok_or_else(|| SyncError::TaskNotFound(task_id.to_string()))?;

        match self.ctx.backend.set_task_status(task_id, !current).await {
            Ok(()) => {
                self.ctx
                    .toast_success(if current { "Goal reopened!" } else { "Goal completed! 🎉" });
                self.settle().await;
                Ok(())
            }
            Err(e) => {
                self.ctx.toast_failure(&e, "Failed to update goal");
                Err(e.into())
            }
        }
    }

    pub async fn remove(&self, task_id: &str) -> Result<(), SyncError> {
        self.require_partner()?;
        match self.ctx.backend.delete_task(task_id).await {
            Ok(()) => {
                self.ctx.toast_success("Goal removed!");
                self.settle().await;
                Ok(())
            }
            Err(e) => {
                self.ctx.toast_failure(&e, "Failed to delete goal");
                Err(e.into())
            }
        }
    }

    fn require_partner(&self) -> Result<(), SyncError> {
        if self.ctx.store.read(|s| s.has_partner()) {
            Ok(())
        } else {
            Err(SyncError::NoPartner)
        }
    }

    async fn settle(&self) {
        self.ctx.seq.invalidate(ResourceKey::Dashboard);
        self.dashboard.refresh(Loader::Silent).await;
    }
}
