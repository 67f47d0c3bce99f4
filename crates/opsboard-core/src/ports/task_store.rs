//! TaskStore port - タスクの正本（source of truth）
//!
//! # 設計原則
//! - 状態遷移の書き込みはすべてここを通る
//! - `save_task` は期待する status を受け取り、食い違えば `StoreError::Stale`
//!   （タイマー発火と明示操作の競合を検出するため）

use async_trait::async_trait;
use thiserror::Error;

use crate::domain::{OpsError, Task, TaskFilter, TaskId, TaskStatus};

/// Store 層のエラー
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("{entity} {id} already exists")]
    Duplicate { entity: &'static str, id: String },

    #[error("{entity} not found: {id}")]
    Missing { entity: &'static str, id: String },

    #[error("{entity} {id} was modified concurrently")]
    Stale { entity: &'static str, id: String },

    #[error("store unavailable: {0}")]
    Unavailable(String),
}

impl From<StoreError> for OpsError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Missing { entity, id } => OpsError::NotFound { entity, id },
            StoreError::Stale { .. } => OpsError::Conflict(err.to_string()),
            StoreError::Duplicate { .. } | StoreError::Unavailable(_) => {
                OpsError::Storage(err.to_string())
            }
        }
    }
}

#[async_trait]
pub trait TaskStore: Send + Sync {
    async fn insert_task(&self, task: Task) -> Result<(), StoreError>;

    async fn get_task(&self, id: TaskId) -> Result<Option<Task>, StoreError>;

    /// Replace the stored task if its current status is still `expected`.
    async fn save_task(&self, task: &Task, expected: TaskStatus) -> Result<(), StoreError>;

    /// Tasks matching `filter`, oldest first.
    async fn list_tasks(&self, filter: &TaskFilter) -> Result<Vec<Task>, StoreError>;
}
