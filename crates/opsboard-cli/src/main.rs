use std::error::Error;
use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use clap::Parser;
use serde::Serialize;
use tracing::info;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};
use ulid::Ulid;

use opsboard_core::app::{AppBuilder, Config, CreateProject, Runtime};
use opsboard_core::domain::{
    Location, LocationId, OpsError, ProjectId, RecurrenceInput, RoleId, Team, TeamId, User,
    UserId,
};
use opsboard_core::impls::{InMemoryDirectory, InMemoryStore};
use opsboard_core::ports::{NotificationSink, SinkError};

/// Seed an in-memory organization, create a recurring project and print it.
#[derive(Debug, Parser)]
#[command(name = "opsboard", version)]
struct Cli {
    /// TOML config file
    #[arg(long)]
    config: Option<PathBuf>,

    /// Override the timer worker count
    #[arg(long)]
    workers: Option<usize>,

    #[arg(long, default_value = "Safety Check")]
    title: String,

    /// once, daily, weekly, monthly or yearly
    #[arg(long, default_value = "daily")]
    frequency: String,

    /// Number of occurrences
    #[arg(long, default_value_t = 3)]
    after: u32,

    /// Complete the first task before printing
    #[arg(long)]
    complete_first: bool,
}

/// Sink that only logs what it would send.
struct LogSink;

#[async_trait]
impl NotificationSink for LogSink {
    async fn send(&self, address: &str, subject: &str, _body: &str) -> Result<(), SinkError> {
        info!(%address, %subject, "notification");
        Ok(())
    }
}

#[derive(Serialize)]
struct Summary {
    parent: ProjectSummary,
    children: Vec<ProjectSummary>,
    tasks: Vec<TaskSummary>,
}

#[derive(Serialize)]
struct ProjectSummary {
    id: String,
    title: String,
    no_of_tasks: usize,
    no_of_tasks_closed: usize,
    locations: usize,
}

#[derive(Serialize)]
struct TaskSummary {
    id: String,
    title: String,
    status: String,
    date_start: String,
    due_date: String,
}

async fn project_summary(runtime: &Runtime, id: ProjectId) -> Result<ProjectSummary, OpsError> {
    let project = runtime.get_project(id).await?;
    Ok(ProjectSummary {
        id: project.id.to_string(),
        title: project.title,
        no_of_tasks: project.no_of_tasks,
        no_of_tasks_closed: project.no_of_tasks_closed,
        locations: project.locations_at.len(),
    })
}

fn seed() -> (InMemoryDirectory, TeamId, RoleId, UserId) {
    let location = |name: &str| Location {
        id: LocationId::from_ulid(Ulid::new()),
        name: name.to_string(),
    };
    let (gate, dock, yard) = (location("Gate"), location("Dock"), location("Yard"));

    let hq = Team {
        id: TeamId::from_ulid(Ulid::new()),
        name: "HQ".into(),
        parent: None,
        children: vec![],
        locations: vec![],
    };
    let north = Team {
        id: TeamId::from_ulid(Ulid::new()),
        name: "North".into(),
        parent: Some(hq.id),
        children: vec![],
        locations: vec![gate.id, dock.id],
    };
    let south = Team {
        id: TeamId::from_ulid(Ulid::new()),
        name: "South".into(),
        parent: Some(hq.id),
        children: vec![],
        locations: vec![yard.id],
    };

    let role = RoleId::from_ulid(Ulid::new());
    let person = |first: &str, role: Option<RoleId>| User {
        id: UserId::from_ulid(Ulid::new()),
        email: format!("{}@example.com", first.to_lowercase()),
        first_name: Some(first.to_string()),
        last_name: None,
        role,
    };
    let manager = person("Mia", None);
    let hq_id = hq.id;
    let manager_id = manager.id;

    let directory = InMemoryDirectory::new()
        .with_team(hq)
        .with_team(north)
        .with_team(south)
        .with_location(gate)
        .with_location(dock)
        .with_location(yard)
        .with_user(person("Ana", Some(role)))
        .with_user(person("Bo", Some(role)))
        .with_user(manager);
    (directory, hq_id, role, manager_id)
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(filter)
        .init();

    let cli = Cli::parse();
    let config = match &cli.config {
        Some(path) => Config::load(path)?,
        None => Config::default(),
    };
    let mut settings = config.validate()?;
    if let Some(workers) = cli.workers {
        settings.workers = workers.max(1);
    }

    let (directory, team, role, manager) = seed();
    let runtime = AppBuilder::new()
        .settings(settings)
        .store(Arc::new(InMemoryStore::new()))
        .directory(Arc::new(directory))
        .notification_sink(Arc::new(LogSink))
        .build()
        .await?;

    let created = runtime
        .create_recurring_project(CreateProject {
            title: cli.title.clone(),
            instruction: "Walk every location and log findings".into(),
            team,
            assigned_role: role,
            recurrence: RecurrenceInput::after(&cli.frequency, 1, cli.after),
            followers: vec![],
            locations: None,
            created_by: manager,
        })
        .await
        .map_err(|err| err.public_message())?;

    if cli.complete_first
        && let Some(first) = created.tasks.first()
    {
        runtime.complete_task(*first, manager).await?;
    }

    let mut children = Vec::with_capacity(created.children.len());
    for child in &created.children {
        children.push(project_summary(&runtime, child.id).await?);
    }
    let mut tasks = Vec::with_capacity(created.tasks.len());
    for id in &created.tasks {
        let task = runtime.get_task(*id).await?;
        tasks.push(TaskSummary {
            id: task.id.to_string(),
            title: task.title,
            status: task.status.to_string(),
            date_start: task.date_start.to_rfc3339(),
            due_date: task.due_date.to_rfc3339(),
        });
    }
    let summary = Summary {
        parent: project_summary(&runtime, created.parent.id).await?,
        children,
        tasks,
    };
    println!("{}", serde_json::to_string_pretty(&summary)?);

    runtime.shutdown().await;
    Ok(())
}
