//! TransitionStore port - 予定されたライフサイクル遷移の永続化
//!
//! タイマー自体はプロセスと一緒に消えます。ここに `(task_id, kind, fire_at)`
//! を残しておき、起動時に `pending_transitions` から張り直します。

use async_trait::async_trait;

use super::task_store::StoreError;
use crate::domain::{ScheduledTransition, TaskId, TimerKey};

#[async_trait]
pub trait TransitionStore: Send + Sync {
    /// Upsert rows by their `(task_id, kind)` key.
    async fn put_transitions(&self, rows: &[ScheduledTransition]) -> Result<(), StoreError>;

    async fn remove_transition(&self, key: TimerKey) -> Result<(), StoreError>;

    /// Remove the row only if it is still exactly `row`.
    ///
    /// A rescheduled task reuses its keys, so a timer for the old time must
    /// not delete the row written for the new one. Returns whether a row was
    /// removed.
    async fn remove_fired(&self, row: &ScheduledTransition) -> Result<bool, StoreError>;

    async fn remove_task_transitions(&self, task: TaskId) -> Result<(), StoreError>;

    /// Every row not yet fired or cancelled, earliest first.
    async fn pending_transitions(&self) -> Result<Vec<ScheduledTransition>, StoreError>;
}
