//! Domain identifiers (strongly-typed IDs).
//!
//! すべての ID は ULID を内包した `Id<T>` で表現します。
//! `T` は PhantomData のマーカー型で、実行時コストはゼロですが、
//! `TaskId` と `ProjectId` のような取り違えをコンパイル時に防ぎます。
//!
//! Team / Location / User / Role の ID は外部ディレクトリが払い出すものですが、
//! 同じ表現を使うことで core 側では区別なく扱えます。

use serde::{Deserialize, Serialize};
use std::fmt;
use std::marker::PhantomData;
use std::str::FromStr;
use ulid::Ulid;

/// IdMarker は各 ID 型のマーカー trait
///
/// Display で使うプレフィックス（"task-", "project-" など）を提供します。
pub trait IdMarker: Send + Sync + 'static {
    fn prefix() -> &'static str;
}

/// ジェネリック ID 型
#[repr(transparent)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Id<T: IdMarker> {
    ulid: Ulid,
    #[serde(skip)]
    _marker: PhantomData<T>,
}

impl<T: IdMarker> Id<T> {
    /// ULID から Id を作成
    pub fn from_ulid(ulid: Ulid) -> Self {
        Self {
            ulid,
            _marker: PhantomData,
        }
    }

    /// 内部の ULID を取得
    pub fn as_ulid(&self) -> Ulid {
        self.ulid
    }
}

impl<T: IdMarker> From<Ulid> for Id<T> {
    fn from(ulid: Ulid) -> Self {
        Self::from_ulid(ulid)
    }
}

impl<T: IdMarker> fmt::Display for Id<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", T::prefix(), self.ulid)
    }
}

/// Error returned when a string is not `<prefix><ulid>`.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid identifier '{0}'")]
pub struct ParseIdError(String);

impl<T: IdMarker> FromStr for Id<T> {
    type Err = ParseIdError;

    /// Accepts both the prefixed display form and a bare ULID.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let raw = s.strip_prefix(T::prefix()).unwrap_or(s);
        Ulid::from_string(raw)
            .map(Self::from_ulid)
            .map_err(|_| ParseIdError(s.to_string()))
    }
}

// ========================================
// マーカー型の定義
// ========================================

macro_rules! id_marker {
    ($marker:ident, $prefix:literal) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub enum $marker {}

        impl IdMarker for $marker {
            fn prefix() -> &'static str {
                $prefix
            }
        }
    };
}

id_marker!(TaskMarker, "task-");
id_marker!(ProjectMarker, "project-");
id_marker!(TeamMarker, "team-");
id_marker!(LocationMarker, "loc-");
id_marker!(UserMarker, "user-");
id_marker!(RoleMarker, "role-");

/// Identifier of a task occurrence.
pub type TaskId = Id<TaskMarker>;

/// Identifier of a project (parent or child).
pub type ProjectId = Id<ProjectMarker>;

/// Identifier of a team in the hierarchy.
pub type TeamId = Id<TeamMarker>;

/// Identifier of a location owned by a team.
pub type LocationId = Id<LocationMarker>;

/// Identifier of a user in the directory.
pub type UserId = Id<UserMarker>;

/// Identifier of a role (the "assigned role" of a project).
pub type RoleId = Id<RoleMarker>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_are_distinct_types() {
        let ulid1 = Ulid::new();
        let ulid2 = Ulid::new();

        let task = TaskId::from_ulid(ulid1);
        let project = ProjectId::from_ulid(ulid2);

        assert_eq!(task.as_ulid(), ulid1);
        assert_eq!(project.as_ulid(), ulid2);

        assert!(task.to_string().starts_with("task-"));
        assert!(project.to_string().starts_with("project-"));
        // let _: TaskId = project; // <- does not compile
    }

    #[test]
    fn display_form_parses_back() {
        let id = LocationId::from_ulid(Ulid::new());
        let parsed: LocationId = id.to_string().parse().unwrap();
        assert_eq!(parsed, id);

        let bare: LocationId = id.as_ulid().to_string().parse().unwrap();
        assert_eq!(bare, id);
    }

    #[test]
    fn garbage_does_not_parse() {
        assert!("team-not-a-ulid".parse::<TeamId>().is_err());
    }

    #[test]
    fn ids_serialize_as_plain_ulid_strings() {
        let id = UserId::from_ulid(Ulid::new());
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, format!("\"{}\"", id.as_ulid()));

        let back: UserId = serde_json::from_str(&json).unwrap();
        assert_eq!(back, id);
    }

    #[test]
    fn phantom_data_does_not_consume_memory() {
        use std::mem::size_of;
        assert_eq!(size_of::<TaskId>(), size_of::<Ulid>());
        assert_eq!(size_of::<RoleId>(), 16);
    }
}
