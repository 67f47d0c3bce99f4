//! TeamLocationResolver - チームと子チーム、それぞれの対象ロケーションを決める
//!
//! ルートも子も同じ規則を独立に適用します。
//! - 要求リストあり: 要求 ∩ 自チームのロケーション（要求順、未知の id は無視）
//! - 要求リストなし: 自チームのロケーション全部
//!
//! 子チームは親の絞り込みに縛られません（自分の集合との交差だけ）。

use std::collections::HashMap;
use std::sync::Arc;

use tracing::debug;

use crate::domain::{LocationId, OpsError, Team, TeamId};
use crate::ports::TeamDirectory;

/// Result of resolving a team.
#[derive(Debug, Clone)]
pub struct TeamScope {
    pub team: Team,
    /// Direct children, in directory order.
    pub children: Vec<Team>,
    pub locations: HashMap<TeamId, Vec<LocationId>>,
}

impl TeamScope {
    pub fn locations_of(&self, team: TeamId) -> &[LocationId] {
        self.locations.get(&team).map(Vec::as_slice).unwrap_or_default()
    }
}

#[derive(Clone)]
pub struct TeamLocationResolver {
    teams: Arc<dyn TeamDirectory>,
}

impl TeamLocationResolver {
    pub fn new(teams: Arc<dyn TeamDirectory>) -> Self {
        Self { teams }
    }

    pub async fn resolve(
        &self,
        team_id: TeamId,
        requested: Option<&[LocationId]>,
    ) -> Result<TeamScope, OpsError> {
        let team = self
            .teams
            .get(team_id)
            .await?
            .ok_or_else(|| OpsError::not_found("team", team_id))?;
        let children = self.teams.find_children(team_id).await?;

        let mut locations = HashMap::with_capacity(children.len() + 1);
        locations.insert(team.id, scope_locations(&team.locations, requested));
        for child in &children {
            locations.insert(child.id, scope_locations(&child.locations, requested));
        }

        debug!(
            team_id = %team.id,
            children = children.len(),
            "team scope resolved"
        );
        Ok(TeamScope {
            team,
            children,
            locations,
        })
    }
}

fn scope_locations(own: &[LocationId], requested: Option<&[LocationId]>) -> Vec<LocationId> {
    let Some(requested) = requested else {
        return own.to_vec();
    };
    let mut out = Vec::new();
    for id in requested {
        if own.contains(id) && !out.contains(id) {
            out.push(*id);
        }
    }
    out
}
