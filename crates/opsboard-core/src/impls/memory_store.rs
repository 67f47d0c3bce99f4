//! InMemoryStore - 開発用・テスト用の正本
//!
//! TaskStore / ProjectStore / TransitionStore をひとつのロックの下で実装します。
//! 1 つの Mutex にまとめているので、`commit_group` や `attach_task` の
//! 複数レコード書き込みは外から見て原子的です。

use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::Mutex;

use crate::domain::{
    Project, ProjectGroup, ProjectId, ScheduledTransition, Task, TaskFilter, TaskId, TaskStatus,
    TimerKey,
};
use crate::ports::{ProjectStore, StoreError, TaskStore, TransitionStore};

#[derive(Default)]
struct StoreState {
    tasks: HashMap<TaskId, Task>,
    /// Insertion order, for stable listing.
    task_order: Vec<TaskId>,
    projects: HashMap<ProjectId, Project>,
    transitions: BTreeMap<TimerKey, ScheduledTransition>,
}

impl StoreState {
    fn insert_task(&mut self, task: Task) {
        self.task_order.push(task.id);
        self.tasks.insert(task.id, task);
    }

    fn project_mut(&mut self, id: ProjectId) -> Result<&mut Project, StoreError> {
        self.projects.get_mut(&id).ok_or_else(|| StoreError::Missing {
            entity: "project",
            id: id.to_string(),
        })
    }
}

/// In-memory implementation of every store port.
#[derive(Default)]
pub struct InMemoryStore {
    state: Mutex<StoreState>,
    unavailable: AtomicBool,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent call fail with `StoreError::Unavailable`.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    fn check(&self) -> Result<(), StoreError> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("in-memory store switched off".into()));
        }
        Ok(())
    }

    pub async fn task_count(&self) -> usize {
        self.state.lock().await.tasks.len()
    }

    pub async fn project_count(&self) -> usize {
        self.state.lock().await.projects.len()
    }
}

#[async_trait]
impl TaskStore for InMemoryStore {
    async fn insert_task(&self, task: Task) -> Result<(), StoreError> {
        self.check()?;
        let mut state = self.state.lock().await;
        if state.tasks.contains_key(&task.id) {
            return Err(StoreError::Duplicate {
                entity: "task",
                id: task.id.to_string(),
            });
        }
        state.insert_task(task);
        Ok(())
    }

    async fn get_task(&self, id: TaskId) -> Result<Option<Task>, StoreError> {
        self.check()?;
        Ok(self.state.lock().await.tasks.get(&id).cloned())
    }

    async fn save_task(&self, task: &Task, expected: TaskStatus) -> Result<(), StoreError> {
        self.check()?;
        let mut state = self.state.lock().await;
        let Some(stored) = state.tasks.get_mut(&task.id) else {
            return Err(StoreError::Missing {
                entity: "task",
                id: task.id.to_string(),
            });
        };
        if stored.status != expected {
            return Err(StoreError::Stale {
                entity: "task",
                id: task.id.to_string(),
            });
        }
        *stored = task.clone();
        Ok(())
    }

    async fn list_tasks(&self, filter: &TaskFilter) -> Result<Vec<Task>, StoreError> {
        self.check()?;
        let state = self.state.lock().await;
        Ok(state
            .task_order
            .iter()
            .filter_map(|id| state.tasks.get(id))
            .filter(|task| filter.matches(task))
            .cloned()
            .collect())
    }
}

#[async_trait]
impl ProjectStore for InMemoryStore {
    async fn commit_group(&self, group: ProjectGroup) -> Result<(), StoreError> {
        self.check()?;
        let mut state = self.state.lock().await;

        // 先に重複を全部確認してから書く（途中失敗で半端な状態を残さない）
        if let Some(task) = group.tasks.iter().find(|t| state.tasks.contains_key(&t.id)) {
            return Err(StoreError::Duplicate {
                entity: "task",
                id: task.id.to_string(),
            });
        }
        if let Some(project) = group.projects().find(|p| state.projects.contains_key(&p.id)) {
            return Err(StoreError::Duplicate {
                entity: "project",
                id: project.id.to_string(),
            });
        }

        let ProjectGroup {
            root,
            children,
            tasks,
        } = group;
        for task in tasks {
            state.insert_task(task);
        }
        for project in root.into_iter().chain(children) {
            state.projects.insert(project.id, project);
        }
        Ok(())
    }

    async fn get_project(&self, id: ProjectId) -> Result<Option<Project>, StoreError> {
        self.check()?;
        Ok(self.state.lock().await.projects.get(&id).cloned())
    }

    async fn attach_task(&self, project: ProjectId, task: Task) -> Result<Project, StoreError> {
        self.check()?;
        let mut state = self.state.lock().await;
        if state.tasks.contains_key(&task.id) {
            return Err(StoreError::Duplicate {
                entity: "task",
                id: task.id.to_string(),
            });
        }

        let now = task.created_at;
        let task_id = task.id;
        let owner = state.project_mut(project)?;
        owner.add_task(task_id, now);
        let updated = owner.clone();
        if let Some(parent) = updated.parent_project
            && let Some(parent) = state.projects.get_mut(&parent)
        {
            parent.add_task(task_id, now);
        }
        state.insert_task(task);
        Ok(updated)
    }

    async fn record_closed(&self, project: ProjectId, at: DateTime<Utc>) -> Result<(), StoreError> {
        self.check()?;
        let mut state = self.state.lock().await;
        let owner = state.project_mut(project)?;
        owner.record_closed(at);
        if let Some(parent) = owner.parent_project
            && let Some(parent) = state.projects.get_mut(&parent)
        {
            parent.record_closed(at);
        }
        Ok(())
    }
}

#[async_trait]
impl TransitionStore for InMemoryStore {
    async fn put_transitions(&self, rows: &[ScheduledTransition]) -> Result<(), StoreError> {
        self.check()?;
        let mut state = self.state.lock().await;
        for row in rows {
            state.transitions.insert(row.key(), *row);
        }
        Ok(())
    }

    async fn remove_transition(&self, key: TimerKey) -> Result<(), StoreError> {
        self.check()?;
        self.state.lock().await.transitions.remove(&key);
        Ok(())
    }

    async fn remove_fired(&self, row: &ScheduledTransition) -> Result<bool, StoreError> {
        self.check()?;
        let mut state = self.state.lock().await;
        if state.transitions.get(&row.key()) != Some(row) {
            return Ok(false);
        }
        state.transitions.remove(&row.key());
        Ok(true)
    }

    async fn remove_task_transitions(&self, task: TaskId) -> Result<(), StoreError> {
        self.check()?;
        self.state
            .lock()
            .await
            .transitions
            .retain(|key, _| key.task_id != task);
        Ok(())
    }

    async fn pending_transitions(&self) -> Result<Vec<ScheduledTransition>, StoreError> {
        self.check()?;
        let state = self.state.lock().await;
        let mut rows: Vec<_> = state.transitions.values().copied().collect();
        rows.sort_by_key(|row| row.fire_at);
        Ok(rows)
    }
}
