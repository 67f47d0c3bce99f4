//! TaskLifecycleScheduler - タスクごとの時刻トリガー遷移
//!
//! # 遷移
//! | キー | 発火時刻 | 作用 |
//! |---|---|---|
//! | `{id}-active` | date_start（登録時に未来の場合のみ） | 通知 activated |
//! | `{id}` | due_date - reminder lead | 通知 reminder |
//! | `{id}-missed` | due_date | Active/InProgress → Missed、通知 missed |
//!
//! # 設計原則
//! - 発火時は必ずタスクを読み直す。settled（Missed/Completed/Deleted）なら何もしない
//! - 状態の書き込みが先、通知は後（fire-and-forget）
//! - 予定は TransitionStore に永続化し、起動時に `restore` で張り直す
//! - 再スケジュールは cancel → 登録の順
//! - 発火した行の時刻がタスクの現在の日付と合わなければ古い予定なので何もしない

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use futures::FutureExt;
use tracing::{debug, error, info, warn};

use super::notify::NotificationDispatcher;
use crate::domain::{
    Notification, OpsError, ScheduledTransition, Task, TaskId, TaskStatus, TimerKey,
    TransitionKind,
};
use crate::ports::{Clock, StoreError, TaskStore, Timer, TimerJob, TransitionStore};

/// Result of one timer firing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FireOutcome {
    /// The transition ran; a notification was dispatched.
    Fired,
    /// The task was already in a state this transition does not act on.
    Skipped(TaskStatus),
    /// The task was rescheduled after this timer was armed, or another
    /// writer changed it between the read and the write.
    Superseded,
    /// The task no longer exists.
    Missing,
}

struct Inner {
    tasks: Arc<dyn TaskStore>,
    transitions: Arc<dyn TransitionStore>,
    timer: Arc<dyn Timer>,
    clock: Arc<dyn Clock>,
    dispatcher: NotificationDispatcher,
    reminder_lead: Duration,
}

/// Cheap to clone; every clone drives the same timers.
#[derive(Clone)]
pub struct TaskLifecycleScheduler {
    inner: Arc<Inner>,
}

impl TaskLifecycleScheduler {
    pub fn new(
        tasks: Arc<dyn TaskStore>,
        transitions: Arc<dyn TransitionStore>,
        timer: Arc<dyn Timer>,
        clock: Arc<dyn Clock>,
        dispatcher: NotificationDispatcher,
        reminder_lead: Duration,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                tasks,
                transitions,
                timer,
                clock,
                dispatcher,
                reminder_lead,
            }),
        }
    }

    /// Transitions `task` needs as of `now`.
    ///
    /// Activation and reminder times already past are dropped; expiry is
    /// always kept and fires at once if overdue.
    pub fn plan(&self, task: &Task, now: DateTime<Utc>) -> Vec<ScheduledTransition> {
        if task.status.is_settled() {
            return Vec::new();
        }
        TransitionKind::ALL
            .into_iter()
            .map(|kind| self.transition(task, kind))
            .filter(|row| match row.kind {
                TransitionKind::Activate => {
                    task.status == TaskStatus::Active && row.fire_at > now
                }
                TransitionKind::Remind => row.fire_at > now,
                TransitionKind::Expire => true,
            })
            .collect()
    }

    /// When `kind` is due for `task` as it stands now.
    pub fn transition(&self, task: &Task, kind: TransitionKind) -> ScheduledTransition {
        let fire_at = match kind {
            TransitionKind::Activate => task.date_start,
            TransitionKind::Remind => task.due_date - self.inner.reminder_lead,
            TransitionKind::Expire => task.due_date,
        };
        ScheduledTransition {
            task_id: task.id,
            kind,
            fire_at,
        }
    }

    /// Register `task`'s transitions, replacing any it already had.
    pub async fn schedule(&self, task: &Task) -> Result<Vec<ScheduledTransition>, OpsError> {
        self.cancel(task.id).await?;
        let rows = self.plan(task, self.inner.clock.now());
        if rows.is_empty() {
            return Ok(rows);
        }
        self.inner.transitions.put_transitions(&rows).await?;
        for row in &rows {
            self.arm(*row);
        }
        debug!(task_id = %task.id, timers = rows.len(), "task scheduled");
        Ok(rows)
    }

    /// Schedule tasks that are already committed. Returns the timer count.
    ///
    /// A task whose timers cannot be stored is logged and skipped; the
    /// others are still armed.
    pub async fn schedule_all(&self, tasks: &[Task]) -> usize {
        let mut armed = 0;
        for task in tasks {
            match self.schedule(task).await {
                Ok(rows) => armed += rows.len(),
                Err(err) => warn!(task_id = %task.id, error = %err, "task timers not armed"),
            }
        }
        armed
    }

    /// Arm the in-process timer for a persisted row.
    fn arm(&self, row: ScheduledTransition) {
        let this = self.clone();
        let key = row.key();
        let job: TimerJob = Box::new(move || {
            async move {
                if let Err(err) = this.fire(row).await {
                    error!(timer = %key, error = %err, "lifecycle transition failed");
                }
            }
            .boxed()
        });
        self.inner.timer.schedule(key, row.fire_at, job);
    }

    /// Remove every pending transition of `task`.
    pub async fn cancel(&self, task: TaskId) -> Result<(), OpsError> {
        let mut cancelled = 0;
        for key in TimerKey::all(task) {
            if self.inner.timer.cancel(key) {
                cancelled += 1;
            }
        }
        self.inner.transitions.remove_task_transitions(task).await?;
        if cancelled > 0 {
            debug!(task_id = %task, cancelled, "task timers cancelled");
        }
        Ok(())
    }

    /// Run the transition `row` against the task's current state.
    ///
    /// A row whose time no longer matches the task (the task was rescheduled
    /// after it was armed) is `Superseded` and leaves everything alone.
    pub async fn fire(&self, row: ScheduledTransition) -> Result<FireOutcome, OpsError> {
        let key = row.key();
        let applied = self.apply(row).await?;
        // 発火した行だけ消す。張り直された同じキーの行は残す
        self.inner.transitions.remove_fired(&row).await?;
        let (task, notification) = match applied {
            Applied::Notify(task, notification) => (task, notification),
            Applied::Nothing(outcome) => {
                debug!(timer = %key, ?outcome, "lifecycle transition skipped");
                return Ok(outcome);
            }
        };

        info!(
            task_id = %task.id,
            kind = notification.label(),
            status = %task.status,
            "lifecycle transition fired"
        );
        let _ = self
            .inner
            .dispatcher
            .notify_detached(task, notification, Vec::new());
        Ok(FireOutcome::Fired)
    }

    async fn apply(&self, row: ScheduledTransition) -> Result<Applied, OpsError> {
        let Some(mut task) = self.inner.tasks.get_task(row.task_id).await? else {
            return Ok(Applied::Nothing(FireOutcome::Missing));
        };
        if self.transition(&task, row.kind) != row {
            return Ok(Applied::Nothing(FireOutcome::Superseded));
        }

        match row.kind {
            TransitionKind::Activate => {
                if task.status != TaskStatus::Active {
                    return Ok(Applied::Nothing(FireOutcome::Skipped(task.status)));
                }
                Ok(Applied::Notify(task, Notification::Activated))
            }
            TransitionKind::Remind => {
                if !task.status.is_open() {
                    return Ok(Applied::Nothing(FireOutcome::Skipped(task.status)));
                }
                Ok(Applied::Notify(task, Notification::Reminder))
            }
            TransitionKind::Expire => {
                let before = task.status;
                if !task.mark_missed(self.inner.clock.now()) {
                    return Ok(Applied::Nothing(FireOutcome::Skipped(before)));
                }
                match self.inner.tasks.save_task(&task, before).await {
                    Ok(()) => {}
                    Err(StoreError::Stale { .. }) => {
                        return Ok(Applied::Nothing(FireOutcome::Superseded));
                    }
                    Err(err) => return Err(err.into()),
                }
                // 期限切れ後に残った activate / remind は不要
                for kind in [TransitionKind::Activate, TransitionKind::Remind] {
                    let stale = TimerKey::new(task.id, kind);
                    self.inner.timer.cancel(stale);
                    self.inner.transitions.remove_transition(stale).await?;
                }
                Ok(Applied::Notify(task, Notification::Missed))
            }
        }
    }

    /// Re-arm every persisted transition. Call once at startup.
    ///
    /// Rows for missing or settled tasks are dropped; rows whose time passed
    /// while the process was down fire immediately.
    pub async fn restore(&self) -> Result<usize, OpsError> {
        let rows = self.inner.transitions.pending_transitions().await?;
        let mut armed = 0;
        for row in rows {
            let live = self
                .inner
                .tasks
                .get_task(row.task_id)
                .await?
                .is_some_and(|task| !task.status.is_settled());
            if !live {
                self.inner.transitions.remove_fired(&row).await?;
                continue;
            }
            self.arm(row);
            armed += 1;
        }
        info!(armed, "lifecycle timers restored");
        Ok(armed)
    }
}

enum Applied {
    Notify(Task, Notification),
    Nothing(FireOutcome),
}
