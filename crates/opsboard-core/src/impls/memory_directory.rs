//! InMemoryDirectory - 開発用のチーム・ロケーション・ユーザー台帳
//!
//! 構築時にだけ書き込み、その後は読み取り専用です。

use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;

use crate::domain::{Location, LocationId, RoleId, Team, TeamId, User, UserId};
use crate::ports::{DirectoryError, TeamDirectory, UserDirectory};

#[derive(Default)]
pub struct InMemoryDirectory {
    teams: Vec<Team>,
    locations: Vec<Location>,
    users: Vec<User>,
    unavailable: AtomicBool,
}

impl InMemoryDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a team. If its parent is already known, the parent's child list is
    /// updated too.
    pub fn with_team(mut self, team: Team) -> Self {
        if let Some(parent) = team.parent
            && let Some(parent) = self.teams.iter_mut().find(|t| t.id == parent)
            && !parent.children.contains(&team.id)
        {
            parent.children.push(team.id);
        }
        self.teams.push(team);
        self
    }

    pub fn with_location(mut self, location: Location) -> Self {
        self.locations.push(location);
        self
    }

    pub fn with_user(mut self, user: User) -> Self {
        self.users.push(user);
        self
    }

    /// Make every lookup fail with `DirectoryError::Unavailable`.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    fn check(&self) -> Result<(), DirectoryError> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(DirectoryError::Unavailable("in-memory directory switched off".into()));
        }
        Ok(())
    }
}

#[async_trait]
impl TeamDirectory for InMemoryDirectory {
    async fn get(&self, team: TeamId) -> Result<Option<Team>, DirectoryError> {
        self.check()?;
        Ok(self.teams.iter().find(|t| t.id == team).cloned())
    }

    async fn find_children(&self, team: TeamId) -> Result<Vec<Team>, DirectoryError> {
        self.check()?;
        Ok(self
            .teams
            .iter()
            .filter(|t| t.parent == Some(team))
            .cloned()
            .collect())
    }

    async fn find_locations(&self, ids: &[LocationId]) -> Result<Vec<Location>, DirectoryError> {
        self.check()?;
        Ok(self
            .locations
            .iter()
            .filter(|l| ids.contains(&l.id))
            .cloned()
            .collect())
    }
}

#[async_trait]
impl UserDirectory for InMemoryDirectory {
    async fn find_by_role(&self, role: RoleId) -> Result<Vec<UserId>, DirectoryError> {
        self.check()?;
        Ok(self
            .users
            .iter()
            .filter(|u| u.role == Some(role))
            .map(|u| u.id)
            .collect())
    }

    async fn find_by_ids(&self, ids: &[UserId]) -> Result<Vec<User>, DirectoryError> {
        self.check()?;
        Ok(self
            .users
            .iter()
            .filter(|u| ids.contains(&u.id))
            .cloned()
            .collect())
    }
}
