//! Project record: a recurrence applied to a team, owning its tasks.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::ids::{LocationId, ProjectId, RoleId, TaskId, TeamId, UserId};
use super::recurrence::RecurrenceRule;

/// Project record.
///
/// - `no_of_tasks` is always recomputed from `tasks`, never incremented.
/// - A project with children is a parent: its tasks and locations are the
///   union of its children's.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Project {
    pub id: ProjectId,
    pub title: String,
    pub instruction: String,
    pub team: TeamId,
    pub assigned_role: RoleId,
    pub locations_at: Vec<LocationId>,
    pub recurrence: RecurrenceRule,
    pub followers: Vec<UserId>,
    pub created_by: UserId,
    pub tasks: Vec<TaskId>,
    pub no_of_tasks: usize,
    pub no_of_tasks_closed: usize,
    pub parent_project: Option<ProjectId>,
    pub child_projects: Vec<ProjectId>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Project fields shared by every project of one creation request.
#[derive(Debug, Clone)]
pub struct ProjectTemplate {
    pub instruction: String,
    pub assigned_role: RoleId,
    pub recurrence: RecurrenceRule,
    pub followers: Vec<UserId>,
    pub created_by: UserId,
}

impl Project {
    pub fn new(
        id: ProjectId,
        title: String,
        team: TeamId,
        template: &ProjectTemplate,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            title,
            instruction: template.instruction.clone(),
            team,
            assigned_role: template.assigned_role,
            locations_at: Vec::new(),
            recurrence: template.recurrence.clone(),
            followers: template.followers.clone(),
            created_by: template.created_by,
            tasks: Vec::new(),
            no_of_tasks: 0,
            no_of_tasks_closed: 0,
            parent_project: None,
            child_projects: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }

    pub fn is_parent(&self) -> bool {
        !self.child_projects.is_empty()
    }

    /// Append a task (ignored if already present).
    pub fn add_task(&mut self, task_id: TaskId, now: DateTime<Utc>) {
        if !self.tasks.contains(&task_id) {
            self.tasks.push(task_id);
        }
        self.no_of_tasks = self.tasks.len();
        self.updated_at = now;
    }

    pub fn add_location(&mut self, location: LocationId) {
        if !self.locations_at.contains(&location) {
            self.locations_at.push(location);
        }
    }

    /// Link `child` under this project and absorb its tasks and locations.
    pub fn adopt(&mut self, child: &mut Project, now: DateTime<Utc>) {
        child.parent_project = Some(self.id);
        child.updated_at = now;
        if !self.child_projects.contains(&child.id) {
            self.child_projects.push(child.id);
        }
        for task in &child.tasks {
            self.add_task(*task, now);
        }
        for location in &child.locations_at {
            self.add_location(*location);
        }
        self.updated_at = now;
    }

    pub fn record_closed(&mut self, now: DateTime<Utc>) {
        self.no_of_tasks_closed = (self.no_of_tasks_closed + 1).min(self.no_of_tasks);
        self.updated_at = now;
    }
}

/// Everything one creation request produces, committed as a unit.
#[derive(Debug, Clone, Default)]
pub struct ProjectGroup {
    /// The top-level project (the only one when the team has no children).
    pub root: Option<Project>,
    pub children: Vec<Project>,
    pub tasks: Vec<super::task::Task>,
}

impl ProjectGroup {
    pub fn projects(&self) -> impl Iterator<Item = &Project> {
        self.root.iter().chain(self.children.iter())
    }
}
