//! Task entity: one concrete occurrence assigned to people at a location.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::errors::OpsError;
use super::ids::{LocationId, ProjectId, TaskId, TeamId, UserId};
use super::status::TaskStatus;

/// A comment on a task, in posting order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Comment {
    pub author: UserId,
    pub text: String,
    pub created_at: DateTime<Utc>,
}

/// Fields a caller provides to create a task.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewTask {
    pub title: String,
    pub description: String,
    pub assignees: Vec<UserId>,
    pub creator: UserId,
    #[serde(default)]
    pub followers: Vec<UserId>,
    pub location: LocationId,
    #[serde(default)]
    pub team: Option<TeamId>,
    #[serde(default)]
    pub project: Option<ProjectId>,
    pub date_start: DateTime<Utc>,
    pub due_date: DateTime<Utc>,
}

/// Partial update. `None` leaves a field untouched.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TaskUpdate {
    pub title: Option<String>,
    pub description: Option<String>,
    pub assignees: Option<Vec<UserId>>,
    pub followers: Option<Vec<UserId>>,
    pub date_start: Option<DateTime<Utc>>,
    pub due_date: Option<DateTime<Utc>>,
}

/// Task record.
///
/// - Status changes go through methods, never direct field writes.
/// - Never physically removed; `Deleted` is a soft delete.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    pub id: TaskId,
    pub title: String,
    pub description: String,
    pub assignees: Vec<UserId>,
    pub creator: UserId,
    pub followers: Vec<UserId>,
    pub location: LocationId,
    pub team: Option<TeamId>,
    pub project: Option<ProjectId>,
    pub status: TaskStatus,
    pub date_start: DateTime<Utc>,
    pub due_date: DateTime<Utc>,
    pub comments: Vec<Comment>,
    pub submitted_by: Option<UserId>,
    pub date_completed: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Task {
    pub fn new(id: TaskId, new: NewTask, now: DateTime<Utc>) -> Result<Self, OpsError> {
        if new.title.trim().is_empty() {
            return Err(OpsError::validation("task title must not be empty"));
        }
        let assignees = dedup(new.assignees);
        if assignees.is_empty() {
            return Err(OpsError::validation("task needs at least one assignee"));
        }
        if new.date_start > new.due_date {
            return Err(OpsError::validation("task starts after it is due"));
        }

        Ok(Self {
            id,
            title: new.title.trim().to_string(),
            description: new.description,
            assignees,
            creator: new.creator,
            followers: dedup(new.followers),
            location: new.location,
            team: new.team,
            project: new.project,
            status: TaskStatus::Active,
            date_start: new.date_start,
            due_date: new.due_date,
            comments: Vec::new(),
            submitted_by: None,
            date_completed: None,
            created_at: now,
            updated_at: now,
        })
    }

    /// Active -> InProgress.
    pub fn start(&mut self, now: DateTime<Utc>) -> Result<(), OpsError> {
        match self.status {
            TaskStatus::Active => {
                self.status = TaskStatus::InProgress;
                self.updated_at = now;
                Ok(())
            }
            TaskStatus::InProgress => Ok(()),
            other => Err(OpsError::conflict(format!(
                "task {} is {other} and cannot be started",
                self.id
            ))),
        }
    }

    /// Mark as completed. Returns `false` if it already was.
    pub fn complete(&mut self, by: UserId, now: DateTime<Utc>) -> Result<bool, OpsError> {
        if self.status == TaskStatus::Completed {
            return Ok(false);
        }
        if !self.status.can_complete() {
            return Err(OpsError::conflict(format!(
                "task {} is {} and cannot be completed",
                self.id, self.status
            )));
        }
        self.status = TaskStatus::Completed;
        self.submitted_by = Some(by);
        self.date_completed = Some(now);
        self.updated_at = now;
        Ok(true)
    }

    /// Due date passed without completion. Returns whether anything changed.
    pub fn mark_missed(&mut self, now: DateTime<Utc>) -> bool {
        if !self.status.is_open() {
            return false;
        }
        self.status = TaskStatus::Missed;
        self.updated_at = now;
        true
    }

    /// Soft delete. Returns whether anything changed.
    pub fn mark_deleted(&mut self, now: DateTime<Utc>) -> bool {
        if self.status == TaskStatus::Deleted {
            return false;
        }
        self.status = TaskStatus::Deleted;
        self.updated_at = now;
        true
    }

    pub fn add_comment(
        &mut self,
        author: UserId,
        text: &str,
        now: DateTime<Utc>,
    ) -> Result<&Comment, OpsError> {
        let text = text.trim();
        if text.is_empty() {
            return Err(OpsError::validation("comment must not be empty"));
        }
        if self.status == TaskStatus::Deleted {
            return Err(OpsError::conflict(format!("task {} is deleted", self.id)));
        }
        self.comments.push(Comment {
            author,
            text: text.to_string(),
            created_at: now,
        });
        self.updated_at = now;
        Ok(&self.comments[self.comments.len() - 1])
    }

    /// Apply an update. Returns `true` when the schedule (start or due) moved.
    pub fn apply(&mut self, update: TaskUpdate, now: DateTime<Utc>) -> Result<bool, OpsError> {
        if self.status == TaskStatus::Deleted {
            return Err(OpsError::conflict(format!("task {} is deleted", self.id)));
        }

        let date_start = update.date_start.unwrap_or(self.date_start);
        let due_date = update.due_date.unwrap_or(self.due_date);
        if date_start > due_date {
            return Err(OpsError::validation("task starts after it is due"));
        }
        if let Some(title) = &update.title
            && title.trim().is_empty()
        {
            return Err(OpsError::validation("task title must not be empty"));
        }
        let assignees = update.assignees.map(dedup);
        if assignees.as_ref().is_some_and(Vec::is_empty) {
            return Err(OpsError::validation("task needs at least one assignee"));
        }

        let moved = date_start != self.date_start || due_date != self.due_date;

        if let Some(title) = update.title {
            self.title = title.trim().to_string();
        }
        if let Some(description) = update.description {
            self.description = description;
        }
        if let Some(assignees) = assignees {
            self.assignees = assignees;
        }
        if let Some(followers) = update.followers {
            self.followers = dedup(followers);
        }
        self.date_start = date_start;
        self.due_date = due_date;
        self.updated_at = now;
        Ok(moved)
    }

    /// Assignees, creator and followers, each once, in that order.
    pub fn participants(&self) -> Vec<UserId> {
        let mut out = self.assignees.clone();
        out.push(self.creator);
        out.extend(self.followers.iter().copied());
        dedup(out)
    }
}

/// Query over tasks. Every `Some` field must match.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskFilter {
    pub assignee: Option<UserId>,
    pub location: Option<LocationId>,
    pub team: Option<TeamId>,
    pub project: Option<ProjectId>,
}

impl TaskFilter {
    pub fn project(project: ProjectId) -> Self {
        Self {
            project: Some(project),
            ..Self::default()
        }
    }

    pub fn matches(&self, task: &Task) -> bool {
        self.assignee.is_none_or(|u| task.assignees.contains(&u))
            && self.location.is_none_or(|l| task.location == l)
            && self.team.is_none_or(|t| task.team == Some(t))
            && self.project.is_none_or(|p| task.project == Some(p))
    }
}

fn dedup<T: PartialEq + Copy>(items: Vec<T>) -> Vec<T> {
    let mut out: Vec<T> = Vec::with_capacity(items.len());
    for item in items {
        if !out.contains(&item) {
            out.push(item);
        }
    }
    out
}
