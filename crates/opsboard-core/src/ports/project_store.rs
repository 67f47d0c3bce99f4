//! ProjectStore port - プロジェクトとその束ね書き込み
//!
//! 親子プロジェクトとタスク一式は `commit_group` で一度に書き込みます。
//! 途中まで見える状態は作りません（all-or-nothing）。

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use super::task_store::StoreError;
use crate::domain::{Project, ProjectGroup, ProjectId, Task};

#[async_trait]
pub trait ProjectStore: Send + Sync {
    /// Write every task and project of `group`, or nothing.
    async fn commit_group(&self, group: ProjectGroup) -> Result<(), StoreError>;

    async fn get_project(&self, id: ProjectId) -> Result<Option<Project>, StoreError>;

    /// Insert `task` and append it to `project` (and to that project's parent).
    ///
    /// Returns the updated project.
    async fn attach_task(&self, project: ProjectId, task: Task) -> Result<Project, StoreError>;

    /// Bump `no_of_tasks_closed` on `project` and its parent.
    async fn record_closed(&self, project: ProjectId, at: DateTime<Utc>)
    -> Result<(), StoreError>;
}
