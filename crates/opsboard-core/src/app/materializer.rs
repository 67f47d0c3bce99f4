//! ProjectMaterializer - 繰り返しプロジェクトの実体化
//!
//! # 手順
//! 1. recurrence を検証（書き込み前）
//! 2. TeamLocationResolver でチーム・子チーム・ロケーションを解決
//! 3. 子チームがなければルートチームだけで 1 プロジェクト
//! 4. 子チームごとに: ロケーションごとに展開 → タスク → 子プロジェクト（どちらも並行）
//! 5. 親プロジェクトは子のタスクとロケーションの和集合
//! 6. グループをまとめて commit し、成功後にだけタイマーを登録
//!
//! commit は all-or-nothing です。途中で失敗すれば何も見えません。

use std::sync::Arc;

use futures::future::try_join_all;
use serde::{Deserialize, Serialize};
use tracing::{info, instrument};

use super::lifecycle::TaskLifecycleScheduler;
use super::resolver::{TeamLocationResolver, TeamScope};
use crate::domain::{
    LocationId, NewTask, OpsError, Project, ProjectGroup, ProjectId, ProjectTemplate,
    RecurrenceExpander, RecurrenceInput, RecurrenceRule, RoleId, Task, TaskId, Team, TeamId,
    UserId,
};
use crate::ports::{Clock, IdGenerator, ProjectStore, TeamDirectory, UserDirectory};

/// A request to create a recurrence-backed project.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateProject {
    pub title: String,
    #[serde(default)]
    pub instruction: String,
    pub team: TeamId,
    pub assigned_role: RoleId,
    pub recurrence: RecurrenceInput,
    #[serde(default)]
    pub followers: Vec<UserId>,
    /// Narrow every team to these locations. `None` means all of them.
    #[serde(default)]
    pub locations: Option<Vec<LocationId>>,
    pub created_by: UserId,
}

/// What `create_recurring_project` produced.
#[derive(Debug, Clone, Serialize)]
pub struct CreatedProject {
    /// The top-level project: the parent, or the only project when the team
    /// has no children.
    pub parent: Project,
    pub children: Vec<Project>,
    pub tasks: Vec<TaskId>,
}

pub struct ProjectMaterializer {
    resolver: TeamLocationResolver,
    teams: Arc<dyn TeamDirectory>,
    users: Arc<dyn UserDirectory>,
    projects: Arc<dyn ProjectStore>,
    ids: Arc<dyn IdGenerator>,
    clock: Arc<dyn Clock>,
    expander: RecurrenceExpander,
    scheduler: TaskLifecycleScheduler,
}

/// Shared inputs for building the tasks of one team.
struct Batch<'a> {
    title: &'a str,
    rule: &'a RecurrenceRule,
    template: &'a ProjectTemplate,
    assignees: &'a [UserId],
}

impl ProjectMaterializer {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        resolver: TeamLocationResolver,
        teams: Arc<dyn TeamDirectory>,
        users: Arc<dyn UserDirectory>,
        projects: Arc<dyn ProjectStore>,
        ids: Arc<dyn IdGenerator>,
        clock: Arc<dyn Clock>,
        expander: RecurrenceExpander,
        scheduler: TaskLifecycleScheduler,
    ) -> Self {
        Self {
            resolver,
            teams,
            users,
            projects,
            ids,
            clock,
            expander,
            scheduler,
        }
    }

    #[instrument(skip_all, fields(title = %request.title, team_id = %request.team))]
    pub async fn create_recurring_project(
        &self,
        request: CreateProject,
    ) -> Result<CreatedProject, OpsError> {
        let title = request.title.trim();
        if title.is_empty() {
            return Err(OpsError::validation("project title must not be empty"));
        }
        let rule = RecurrenceRule::parse(&request.recurrence)?;

        let scope = self
            .resolver
            .resolve(request.team, request.locations.as_deref())
            .await?;

        let assignees = self.users.find_by_role(request.assigned_role).await?;
        if assignees.is_empty() {
            return Err(OpsError::validation(format!(
                "no users hold role {}",
                request.assigned_role
            )));
        }

        let template = ProjectTemplate {
            instruction: request.instruction.clone(),
            assigned_role: request.assigned_role,
            recurrence: rule.clone(),
            followers: request.followers.clone(),
            created_by: request.created_by,
        };
        let batch = Batch {
            title,
            rule: &rule,
            template: &template,
            assignees: &assignees,
        };

        let group = if scope.children.is_empty() {
            let (project, tasks) = self
                .build_team(&batch, &scope.team, title.to_string(), &scope)
                .await?;
            ProjectGroup {
                root: Some(project),
                children: Vec::new(),
                tasks,
            }
        } else {
            // 子チームごとの作業は並行に走らせ、ここで合流する
            let built = try_join_all(scope.children.iter().map(|child| {
                self.build_team(&batch, child, format!("{title} - {}", child.name), &scope)
            }))
            .await?;

            let now = self.clock.now();
            let mut parent = Project::new(
                self.ids.generate_project_id(),
                format!("{title} - Parent Project"),
                scope.team.id,
                &template,
                now,
            );
            let mut children = Vec::with_capacity(built.len());
            let mut tasks = Vec::new();
            for (mut child, child_tasks) in built {
                parent.adopt(&mut child, now);
                children.push(child);
                tasks.extend(child_tasks);
            }
            ProjectGroup {
                root: Some(parent),
                children,
                tasks,
            }
        };

        let created = CreatedProject {
            parent: group
                .root
                .clone()
                .ok_or_else(|| OpsError::Storage("project group without root".into()))?,
            children: group.children.clone(),
            tasks: group.tasks.iter().map(|t| t.id).collect(),
        };
        let tasks = group.tasks.clone();

        self.projects.commit_group(group).await?;
        // タイマーは commit 後にだけ張る。ここからの失敗は作成を取り消さない
        let armed = self.scheduler.schedule_all(&tasks).await;

        info!(
            project_id = %created.parent.id,
            children = created.children.len(),
            tasks = created.tasks.len(),
            timers = armed,
            "recurring project created"
        );
        Ok(created)
    }

    /// One project for `team` with a task per (location, occurrence).
    async fn build_team(
        &self,
        batch: &Batch<'_>,
        team: &Team,
        project_title: String,
        scope: &TeamScope,
    ) -> Result<(Project, Vec<Task>), OpsError> {
        let location_ids = scope.locations_of(team.id);
        let locations = self.teams.find_locations(location_ids).await?;

        let mut project = Project::new(
            self.ids.generate_project_id(),
            project_title,
            team.id,
            batch.template,
            self.clock.now(),
        );

        // ロケーションごとの展開も並行に走らせ、要求順で合流する
        let per_location = try_join_all(location_ids.iter().map(|location| {
            let name = locations
                .iter()
                .find(|l| l.id == *location)
                .map(|l| l.name.clone())
                .unwrap_or_else(|| location.to_string());
            self.build_location(batch, team, project.id, *location, name)
        }))
        .await?;

        let mut tasks = Vec::new();
        for (location, location_tasks) in location_ids.iter().zip(per_location) {
            for task in &location_tasks {
                project.add_task(task.id, task.created_at);
            }
            project.add_location(*location);
            tasks.extend(location_tasks);
        }

        Ok((project, tasks))
    }

    /// Tasks for one location, expanded from that location's creation time.
    async fn build_location(
        &self,
        batch: &Batch<'_>,
        team: &Team,
        project: ProjectId,
        location: LocationId,
        location_name: String,
    ) -> Result<Vec<Task>, OpsError> {
        let anchor = self.clock.now();
        self.expander
            .expand(batch.rule, anchor)?
            .into_iter()
            .map(|occurrence| {
                Task::new(
                    self.ids.generate_task_id(),
                    NewTask {
                        title: format!(
                            "{} - Task for {} at {location_name}",
                            batch.title, team.name
                        ),
                        description: format!(
                            "Task for project: {} at {location_name}",
                            batch.title
                        ),
                        assignees: batch.assignees.to_vec(),
                        creator: batch.template.created_by,
                        followers: batch.template.followers.clone(),
                        location,
                        team: Some(team.id),
                        project: Some(project),
                        date_start: occurrence.start,
                        due_date: occurrence.due,
                    },
                    anchor,
                )
            })
            .collect()
    }
}
