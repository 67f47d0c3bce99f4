//! Scenario tests across the whole runtime, using the in-memory adapters.

mod lifecycle;
mod restart;

use std::sync::Arc;
use std::time::Duration as StdDuration;

use chrono::{DateTime, TimeZone, Utc};
use ulid::Ulid;

use crate::app::{AppBuilder, CreateProject, Runtime, Settings};
use crate::domain::{
    Location, LocationId, RecurrenceInput, RoleId, Team, TeamId, User, UserId,
};
use crate::impls::{InMemoryDirectory, InMemoryStore, RecordingSink};
use crate::ports::FixedClock;

pub(crate) const WAIT: StdDuration = StdDuration::from_secs(1);

/// Wednesday 2025-01-15 09:00 UTC.
pub(crate) fn start_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 1, 15, 9, 0, 0).unwrap()
}

pub(crate) fn team(name: &str, parent: Option<TeamId>, locations: &[LocationId]) -> Team {
    Team {
        id: TeamId::from_ulid(Ulid::new()),
        name: name.into(),
        parent,
        children: vec![],
        locations: locations.to_vec(),
    }
}

pub(crate) fn location(name: &str) -> Location {
    Location {
        id: LocationId::from_ulid(Ulid::new()),
        name: name.into(),
    }
}

pub(crate) fn user(first: &str, role: Option<RoleId>) -> User {
    User {
        id: UserId::from_ulid(Ulid::new()),
        email: format!("{}@example.com", first.to_lowercase()),
        first_name: Some(first.into()),
        last_name: None,
        role,
    }
}

/// A small organization:
///
/// - "Operations": no children, locations Lobby and Warehouse
/// - "HQ": location Roof, children "North" (Gate, Dock) and "South" (Yard)
/// - two workers holding `role`, a manager without it
pub(crate) struct Org {
    pub clock: Arc<FixedClock>,
    pub store: Arc<InMemoryStore>,
    pub directory: Arc<InMemoryDirectory>,
    pub sink: Arc<RecordingSink>,
    pub runtime: Runtime,
    pub operations: Team,
    pub lobby: Location,
    pub warehouse: Location,
    pub hq: Team,
    pub north: Team,
    pub south: Team,
    pub role: RoleId,
    pub workers: [User; 2],
    pub manager: User,
}

impl Org {
    pub async fn new() -> Self {
        let clock = Arc::new(FixedClock::new(start_time()));
        Self::with_store(clock, Arc::new(InMemoryStore::new())).await
    }

    pub async fn with_store(clock: Arc<FixedClock>, store: Arc<InMemoryStore>) -> Self {
        let lobby = location("Lobby");
        let warehouse = location("Warehouse");
        let roof = location("Roof");
        let gate = location("Gate");
        let dock = location("Dock");
        let yard = location("Yard");

        let operations = team("Operations", None, &[lobby.id, warehouse.id]);
        let hq = team("HQ", None, &[roof.id]);
        let north = team("North", Some(hq.id), &[gate.id, dock.id]);
        let south = team("South", Some(hq.id), &[yard.id]);

        let role = RoleId::from_ulid(Ulid::new());
        let workers = [user("Ana", Some(role)), user("Bo", Some(role))];
        let manager = user("Mia", None);

        let mut directory = InMemoryDirectory::new()
            .with_team(operations.clone())
            .with_team(hq.clone())
            .with_team(north.clone())
            .with_team(south.clone());
        for l in [&lobby, &warehouse, &roof, &gate, &dock, &yard] {
            directory = directory.with_location(l.clone());
        }
        for u in workers.iter().chain([&manager]) {
            directory = directory.with_user(u.clone());
        }
        let directory = Arc::new(directory);
        let sink = Arc::new(RecordingSink::new());

        let runtime = AppBuilder::new()
            .settings(Settings::default())
            .clock(clock.clone())
            .store(store.clone())
            .directory(directory.clone())
            .notification_sink(sink.clone())
            .build()
            .await
            .unwrap();

        Self {
            clock,
            store,
            directory,
            sink,
            runtime,
            operations,
            lobby,
            warehouse,
            hq,
            north,
            south,
            role,
            workers,
            manager,
        }
    }

    pub fn request(&self, title: &str, team: TeamId, recurrence: RecurrenceInput) -> CreateProject {
        CreateProject {
            title: title.into(),
            instruction: "Walk the floor".into(),
            team,
            assigned_role: self.role,
            recurrence,
            followers: vec![],
            locations: None,
            created_by: self.manager.id,
        }
    }

    /// The "Safety Check" request: daily, three occurrences, both locations.
    pub fn safety_check(&self) -> CreateProject {
        CreateProject {
            locations: Some(vec![self.lobby.id, self.warehouse.id]),
            ..self.request(
                "Safety Check",
                self.operations.id,
                RecurrenceInput::after("daily", 1, 3),
            )
        }
    }
}
