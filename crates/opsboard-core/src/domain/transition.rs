//! Time-triggered lifecycle transitions and their timer keys.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::ids::TaskId;

/// The three timers a task can have.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransitionKind {
    /// `date_start` reached on a forward-dated task.
    Activate,
    /// `due_date - reminder lead` reached.
    Remind,
    /// `due_date` reached; open tasks become Missed.
    Expire,
}

impl TransitionKind {
    pub const ALL: [TransitionKind; 3] = [
        TransitionKind::Activate,
        TransitionKind::Remind,
        TransitionKind::Expire,
    ];
}

/// Timer identity: one per (task, kind).
///
/// Display gives `{id}` for the reminder, `{id}-active` and `{id}-missed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TimerKey {
    pub task_id: TaskId,
    pub kind: TransitionKind,
}

impl TimerKey {
    pub fn new(task_id: TaskId, kind: TransitionKind) -> Self {
        Self { task_id, kind }
    }

    pub fn all(task_id: TaskId) -> [TimerKey; 3] {
        TransitionKind::ALL.map(|kind| TimerKey::new(task_id, kind))
    }
}

impl fmt::Display for TimerKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            TransitionKind::Remind => write!(f, "{}", self.task_id),
            TransitionKind::Activate => write!(f, "{}-active", self.task_id),
            TransitionKind::Expire => write!(f, "{}-missed", self.task_id),
        }
    }
}

/// Durable row: enough to re-arm a timer after a restart.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScheduledTransition {
    pub task_id: TaskId,
    pub kind: TransitionKind,
    pub fire_at: DateTime<Utc>,
}

impl ScheduledTransition {
    pub fn key(&self) -> TimerKey {
        TimerKey::new(self.task_id, self.kind)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ulid::Ulid;

    #[test]
    fn keys_render_like_job_names() {
        let id = TaskId::from_ulid(Ulid::new());
        let [activate, remind, expire] = TimerKey::all(id);
        assert_eq!(remind.to_string(), id.to_string());
        assert_eq!(activate.to_string(), format!("{id}-active"));
        assert_eq!(expire.to_string(), format!("{id}-missed"));
    }
}
