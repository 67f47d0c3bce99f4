//! Domain model (IDs, recurrence, tasks, projects, errors, ...).
//!
//! I/O を持たない純粋な型と計算だけを置きます。
//! - recurrence / expander: 繰り返しルールと展開
//! - task / project / status: エンティティと状態遷移
//! - directory / reference: 外部ディレクトリのレコード
//! - transition / events: タイマーと通知の種類

pub mod directory;
pub mod errors;
pub mod events;
pub mod expander;
pub mod ids;
pub mod project;
pub mod recurrence;
pub mod reference;
pub mod status;
pub mod task;
pub mod transition;

pub use directory::{Location, Team, User};
pub use errors::{ErrorKind, OpsError};
pub use events::Notification;
pub use expander::{Occurrence, RecurrenceExpander};
pub use ids::{LocationId, ProjectId, RoleId, TaskId, TeamId, UserId};
pub use project::{Project, ProjectGroup, ProjectTemplate};
pub use recurrence::{DueType, Frequency, RecurrenceInput, RecurrenceRule, Termination, WeekdaySpec};
pub use reference::{Reference, UserRef};
pub use status::TaskStatus;
pub use task::{Comment, NewTask, Task, TaskFilter, TaskUpdate};
pub use transition::{ScheduledTransition, TimerKey, TransitionKind};
