//! `Reference<I, T>`: an id that may or may not have been joined with its
//! record.
//!
//! Recipient collection pattern-matches on this instead of probing whether a
//! field "looks populated".

use serde::{Deserialize, Serialize};

use super::directory::User;
use super::ids::UserId;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Reference<I, T> {
    /// Only the identity is known.
    Id(I),
    /// The directory record was joined in.
    Resolved(T),
}

pub type UserRef = Reference<UserId, User>;

impl<I, T> Reference<I, T> {
    pub fn resolved(&self) -> Option<&T> {
        match self {
            Reference::Id(_) => None,
            Reference::Resolved(record) => Some(record),
        }
    }

    pub fn is_resolved(&self) -> bool {
        matches!(self, Reference::Resolved(_))
    }
}

impl UserRef {
    pub fn id(&self) -> UserId {
        match self {
            Reference::Id(id) => *id,
            Reference::Resolved(user) => user.id,
        }
    }

    /// Join `ids` against `users`; ids without a record stay unresolved.
    pub fn join(ids: &[UserId], users: &[User]) -> Vec<UserRef> {
        ids.iter()
            .map(|id| match users.iter().find(|u| u.id == *id) {
                Some(user) => Reference::Resolved(user.clone()),
                None => Reference::Id(*id),
            })
            .collect()
    }
}
