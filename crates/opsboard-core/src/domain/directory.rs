//! Records owned by the external directory (teams, locations, users).
//!
//! core はこれらを読むだけで、作成・更新はしません。

use serde::{Deserialize, Serialize};

use super::ids::{LocationId, RoleId, TeamId, UserId};

/// A team in the hierarchy (a forest of parent pointers).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Team {
    pub id: TeamId,
    pub name: String,
    pub parent: Option<TeamId>,
    pub children: Vec<TeamId>,
    /// Locations this team owns. A location is assumed to belong to at most
    /// one team.
    pub locations: Vec<LocationId>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Location {
    pub id: LocationId,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub email: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub role: Option<RoleId>,
}

impl User {
    /// "First Last", falling back to the email address.
    pub fn display_name(&self) -> String {
        let name = [self.first_name.as_deref(), self.last_name.as_deref()]
            .into_iter()
            .flatten()
            .filter(|s| !s.trim().is_empty())
            .collect::<Vec<_>>()
            .join(" ");
        if name.is_empty() {
            self.email.clone()
        } else {
            name
        }
    }
}
