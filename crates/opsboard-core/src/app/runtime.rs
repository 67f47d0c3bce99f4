//! Runtime - core の公開 API
//!
//! 外側（HTTP 層など）が呼ぶ操作はすべてここに集まります。
//! 明示操作の書き込みは `save_task(task, 直前の status)` で行うので、
//! タイマー発火と競合した場合は `Conflict` になります。

use std::sync::Arc;

use tracing::{info, warn};

use super::lifecycle::TaskLifecycleScheduler;
use super::materializer::{CreateProject, CreatedProject, ProjectMaterializer};
use super::notify::NotificationDispatcher;
use crate::domain::{
    Comment, NewTask, Notification, OpsError, Project, ProjectId, Task, TaskFilter, TaskId,
    TaskUpdate, UserId,
};
use crate::impls::InMemoryTimer;
use crate::ports::{Clock, IdGenerator, ProjectStore, TaskStore};

/// Core operations, wired by [`AppBuilder`](super::AppBuilder).
pub struct Runtime {
    pub(super) tasks: Arc<dyn TaskStore>,
    pub(super) projects: Arc<dyn ProjectStore>,
    pub(super) ids: Arc<dyn IdGenerator>,
    pub(super) clock: Arc<dyn Clock>,
    pub(super) scheduler: TaskLifecycleScheduler,
    pub(super) materializer: ProjectMaterializer,
    pub(super) dispatcher: NotificationDispatcher,
    /// Set when the builder started its own timer.
    pub(super) owned_timer: Option<Arc<InMemoryTimer>>,
}

impl Runtime {
    pub fn scheduler(&self) -> &TaskLifecycleScheduler {
        &self.scheduler
    }

    pub async fn create_recurring_project(
        &self,
        request: CreateProject,
    ) -> Result<CreatedProject, OpsError> {
        self.materializer.create_recurring_project(request).await
    }

    /// Create one task, optionally inside an existing project.
    pub async fn create_task(&self, new: NewTask) -> Result<Task, OpsError> {
        let now = self.clock.now();
        let mut task = Task::new(self.ids.generate_task_id(), new, now)?;

        match task.project {
            Some(project_id) => {
                let project = self.require_project(project_id).await?;
                task.team.get_or_insert(project.team);
                self.projects.attach_task(project_id, task.clone()).await?;
            }
            None => self.tasks.insert_task(task.clone()).await?,
        }
        if let Err(err) = self.scheduler.schedule(&task).await {
            warn!(task_id = %task.id, error = %err, "task timers not armed");
        }

        info!(task_id = %task.id, project_id = ?task.project.map(|p| p.to_string()), "task created");
        Ok(task)
    }

    /// Edit a task; moving its dates re-registers its timers.
    pub async fn update_task(&self, id: TaskId, update: TaskUpdate) -> Result<Task, OpsError> {
        let mut task = self.require_task(id).await?;
        let before = task.status;
        let moved = task.apply(update, self.clock.now())?;
        self.tasks.save_task(&task, before).await?;
        if moved {
            match self.scheduler.schedule(&task).await {
                Ok(_) => info!(task_id = %id, due_date = %task.due_date, "task rescheduled"),
                Err(err) => warn!(task_id = %id, error = %err, "task timers not rearmed"),
            }
        }
        Ok(task)
    }

    /// Active -> InProgress.
    pub async fn start_task(&self, id: TaskId) -> Result<Task, OpsError> {
        let mut task = self.require_task(id).await?;
        let before = task.status;
        task.start(self.clock.now())?;
        if task.status != before {
            self.tasks.save_task(&task, before).await?;
            info!(task_id = %id, "task started");
        }
        Ok(task)
    }

    /// Mark completed and cancel the remaining timers.
    ///
    /// Completing an already completed task returns it unchanged.
    pub async fn complete_task(&self, id: TaskId, by: UserId) -> Result<Task, OpsError> {
        let mut task = self.require_task(id).await?;
        let before = task.status;
        let now = self.clock.now();
        if !task.complete(by, now)? {
            return Ok(task);
        }

        self.tasks.save_task(&task, before).await?;
        self.scheduler.cancel(id).await?;
        if let Some(project) = task.project
            && let Err(err) = self.projects.record_closed(project, now).await
        {
            warn!(task_id = %id, project_id = %project, error = %err, "closed count not updated");
        }

        info!(task_id = %id, submitted_by = %by, "task completed");
        let _ = self
            .dispatcher
            .notify_detached(task.clone(), Notification::Completed, Vec::new());
        Ok(task)
    }

    /// Soft delete. Pending timers are cancelled.
    pub async fn delete_task(&self, id: TaskId) -> Result<Task, OpsError> {
        let mut task = self.require_task(id).await?;
        let before = task.status;
        if task.mark_deleted(self.clock.now()) {
            self.tasks.save_task(&task, before).await?;
            info!(task_id = %id, "task deleted");
        }
        self.scheduler.cancel(id).await?;
        Ok(task)
    }

    pub async fn list_tasks(&self, filter: &TaskFilter) -> Result<Vec<Task>, OpsError> {
        Ok(self.tasks.list_tasks(filter).await?)
    }

    /// Append a comment and notify participants plus `notify_extra`.
    pub async fn add_comment(
        &self,
        id: TaskId,
        author: UserId,
        text: &str,
        notify_extra: &[UserId],
    ) -> Result<Comment, OpsError> {
        let mut task = self.require_task(id).await?;
        let before = task.status;
        let comment = task.add_comment(author, text, self.clock.now())?.clone();
        self.tasks.save_task(&task, before).await?;

        let author_name = self.dispatcher.display_name(author).await;
        let _ = self.dispatcher.notify_detached(
            task,
            Notification::CommentAdded {
                author: author_name,
                text: comment.text.clone(),
            },
            notify_extra.to_vec(),
        );
        Ok(comment)
    }

    pub async fn get_task(&self, id: TaskId) -> Result<Task, OpsError> {
        self.require_task(id).await
    }

    pub async fn get_project(&self, id: ProjectId) -> Result<Project, OpsError> {
        self.require_project(id).await
    }

    /// Stop the timer the builder started (no-op for an injected timer).
    pub async fn shutdown(&self) {
        if let Some(timer) = &self.owned_timer {
            timer.shutdown_and_join().await;
        }
        info!("runtime stopped");
    }

    async fn require_task(&self, id: TaskId) -> Result<Task, OpsError> {
        self.tasks
            .get_task(id)
            .await?
            .ok_or_else(|| OpsError::not_found("task", id))
    }

    async fn require_project(&self, id: ProjectId) -> Result<Project, OpsError> {
        self.projects
            .get_project(id)
            .await?
            .ok_or_else(|| OpsError::not_found("project", id))
    }
}
