//! AppBuilder - アプリケーションの構築とワイヤリング
//!
//! # 設計
//! - Builder パターンで ports を注入
//! - 起動時検証（Fail-fast）: 足りない port はまとめて `BuildError` で報告
//! - `build()` の最後に永続化済みの遷移からタイマーを張り直す

use std::sync::Arc;

use super::config::Settings;
use super::lifecycle::TaskLifecycleScheduler;
use super::materializer::ProjectMaterializer;
use super::notify::NotificationDispatcher;
use super::resolver::TeamLocationResolver;
use super::runtime::Runtime;
use super::templates::MessageTemplates;
use crate::domain::OpsError;
use crate::impls::InMemoryTimer;
use crate::ports::{
    Clock, IdGenerator, NotificationSink, ProjectStore, SystemClock, TaskStore, TeamDirectory,
    Timer, TransitionStore, UlidGenerator, UserDirectory,
};

/// BuildError はアプリケーション構築時のエラー
#[derive(Debug, thiserror::Error)]
pub enum BuildError {
    #[error("Missing ports: {0:?}. These must be provided before build().")]
    MissingPorts(Vec<&'static str>),

    #[error("restoring lifecycle timers failed: {0}")]
    Restore(#[source] OpsError),
}

/// AppBuilder は Runtime を構築
///
/// # 使用例
/// ```ignore
/// let store = Arc::new(InMemoryStore::new());
/// let directory = Arc::new(InMemoryDirectory::new());
/// let runtime = AppBuilder::new()
///     .settings(settings)
///     .store(store)
///     .directory(directory)
///     .notification_sink(Arc::new(RecordingSink::new()))
///     .build()
///     .await?;
/// ```
#[derive(Default)]
pub struct AppBuilder {
    settings: Settings,
    clock: Option<Arc<dyn Clock>>,
    ids: Option<Arc<dyn IdGenerator>>,
    tasks: Option<Arc<dyn TaskStore>>,
    projects: Option<Arc<dyn ProjectStore>>,
    transitions: Option<Arc<dyn TransitionStore>>,
    teams: Option<Arc<dyn TeamDirectory>>,
    users: Option<Arc<dyn UserDirectory>>,
    sink: Option<Arc<dyn NotificationSink>>,
    timer: Option<Arc<dyn Timer>>,
}

impl AppBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn settings(mut self, settings: Settings) -> Self {
        self.settings = settings;
        self
    }

    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }

    pub fn id_generator(mut self, ids: Arc<dyn IdGenerator>) -> Self {
        self.ids = Some(ids);
        self
    }

    pub fn task_store(mut self, tasks: Arc<dyn TaskStore>) -> Self {
        self.tasks = Some(tasks);
        self
    }

    pub fn project_store(mut self, projects: Arc<dyn ProjectStore>) -> Self {
        self.projects = Some(projects);
        self
    }

    pub fn transition_store(mut self, transitions: Arc<dyn TransitionStore>) -> Self {
        self.transitions = Some(transitions);
        self
    }

    /// Use one backend for every store port.
    pub fn store<S>(self, store: Arc<S>) -> Self
    where
        S: TaskStore + ProjectStore + TransitionStore + 'static,
    {
        self.task_store(store.clone())
            .project_store(store.clone())
            .transition_store(store)
    }

    pub fn team_directory(mut self, teams: Arc<dyn TeamDirectory>) -> Self {
        self.teams = Some(teams);
        self
    }

    pub fn user_directory(mut self, users: Arc<dyn UserDirectory>) -> Self {
        self.users = Some(users);
        self
    }

    /// Use one backend for both directory ports.
    pub fn directory<D>(self, directory: Arc<D>) -> Self
    where
        D: TeamDirectory + UserDirectory + 'static,
    {
        self.team_directory(directory.clone()).user_directory(directory)
    }

    pub fn notification_sink(mut self, sink: Arc<dyn NotificationSink>) -> Self {
        self.sink = Some(sink);
        self
    }

    /// Inject a timer. Without one, `build()` starts an [`InMemoryTimer`].
    pub fn timer(mut self, timer: Arc<dyn Timer>) -> Self {
        self.timer = Some(timer);
        self
    }

    /// Wire everything and restore persisted timers.
    ///
    /// Must be called inside a tokio runtime.
    pub async fn build(self) -> Result<Runtime, BuildError> {
        let mut missing = Vec::new();
        if self.tasks.is_none() {
            missing.push("task_store");
        }
        if self.projects.is_none() {
            missing.push("project_store");
        }
        if self.transitions.is_none() {
            missing.push("transition_store");
        }
        if self.teams.is_none() {
            missing.push("team_directory");
        }
        if self.users.is_none() {
            missing.push("user_directory");
        }
        if self.sink.is_none() {
            missing.push("notification_sink");
        }
        let (Some(tasks), Some(projects), Some(transitions), Some(teams), Some(users), Some(sink)) = (
            self.tasks,
            self.projects,
            self.transitions,
            self.teams,
            self.users,
            self.sink,
        ) else {
            return Err(BuildError::MissingPorts(missing));
        };

        let settings = self.settings;
        let clock = self.clock.unwrap_or_else(|| Arc::new(SystemClock));
        let ids = self
            .ids
            .unwrap_or_else(|| Arc::new(UlidGenerator::new(clock.clone())));
        let (timer, owned_timer) = match self.timer {
            Some(timer) => (timer, None),
            None => {
                let owned = Arc::new(InMemoryTimer::start(clock.clone(), settings.workers));
                (owned.clone() as Arc<dyn Timer>, Some(owned))
            }
        };

        let dispatcher = NotificationDispatcher::new(
            users.clone(),
            sink,
            MessageTemplates::new(settings.timezone, settings.signature.clone()),
        );
        let scheduler = TaskLifecycleScheduler::new(
            tasks.clone(),
            transitions,
            timer,
            clock.clone(),
            dispatcher.clone(),
            settings.reminder_lead,
        );
        let materializer = ProjectMaterializer::new(
            TeamLocationResolver::new(teams.clone()),
            teams,
            users,
            projects.clone(),
            ids.clone(),
            clock.clone(),
            settings.expander(),
            scheduler.clone(),
        );

        scheduler.restore().await.map_err(BuildError::Restore)?;

        Ok(Runtime {
            tasks,
            projects,
            ids,
            clock,
            scheduler,
            materializer,
            dispatcher,
            owned_timer,
        })
    }
}
