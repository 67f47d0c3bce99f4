//! Directory ports - 外部が所有するチーム・ユーザー情報の参照
//!
//! ディレクトリの失敗は操作を中断させます（通知と違い、結果に効くため）。

use async_trait::async_trait;
use thiserror::Error;

use crate::domain::{Location, LocationId, OpsError, RoleId, Team, TeamId, User, UserId};

#[derive(Debug, Error)]
pub enum DirectoryError {
    #[error("directory unavailable: {0}")]
    Unavailable(String),
}

impl From<DirectoryError> for OpsError {
    fn from(err: DirectoryError) -> Self {
        OpsError::Dependency(err.to_string())
    }
}

#[async_trait]
pub trait TeamDirectory: Send + Sync {
    async fn get(&self, team: TeamId) -> Result<Option<Team>, DirectoryError>;

    /// Direct children only.
    async fn find_children(&self, team: TeamId) -> Result<Vec<Team>, DirectoryError>;

    /// Known locations among `ids`; unknown ids are left out.
    async fn find_locations(&self, ids: &[LocationId]) -> Result<Vec<Location>, DirectoryError>;
}

#[async_trait]
pub trait UserDirectory: Send + Sync {
    async fn find_by_role(&self, role: RoleId) -> Result<Vec<UserId>, DirectoryError>;

    /// Known users among `ids`; unknown ids are left out.
    async fn find_by_ids(&self, ids: &[UserId]) -> Result<Vec<User>, DirectoryError>;
}
