//! Task status state machine.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Task status.
///
/// State transitions:
/// - Active -> InProgress (work started)
/// - Active | InProgress -> Missed (due date passed)
/// - Active | InProgress | Missed -> Completed (explicit completion)
/// - any -> Deleted (soft delete)
///
/// Tasks are created `Active`; there is no separate "pending" state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TaskStatus {
    Active,
    InProgress,
    Missed,
    Completed,
    Deleted,
}

impl TaskStatus {
    /// No lifecycle timer may act on a task in this state.
    pub fn is_settled(self) -> bool {
        matches!(
            self,
            TaskStatus::Missed | TaskStatus::Completed | TaskStatus::Deleted
        )
    }

    /// Still waiting on someone to finish it.
    pub fn is_open(self) -> bool {
        matches!(self, TaskStatus::Active | TaskStatus::InProgress)
    }

    /// Can an explicit completion be accepted?
    ///
    /// A missed task may still be completed late.
    pub fn can_complete(self) -> bool {
        matches!(
            self,
            TaskStatus::Active | TaskStatus::InProgress | TaskStatus::Missed
        )
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            TaskStatus::Active => "Active",
            TaskStatus::InProgress => "InProgress",
            TaskStatus::Missed => "Missed",
            TaskStatus::Completed => "Completed",
            TaskStatus::Deleted => "Deleted",
        };
        f.write_str(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(TaskStatus::Active, false, true, true)]
    #[case(TaskStatus::InProgress, false, true, true)]
    #[case(TaskStatus::Missed, true, false, true)]
    #[case(TaskStatus::Completed, true, false, false)]
    #[case(TaskStatus::Deleted, true, false, false)]
    fn classification(
        #[case] status: TaskStatus,
        #[case] settled: bool,
        #[case] open: bool,
        #[case] completable: bool,
    ) {
        assert_eq!(status.is_settled(), settled);
        assert_eq!(status.is_open(), open);
        assert_eq!(status.can_complete(), completable);
    }
}
