use chrono::Duration;

use super::{Org, WAIT};
use crate::app::FireOutcome;
use crate::domain::{
    ErrorKind, RecurrenceInput, TaskFilter, TaskStatus, TaskUpdate, TransitionKind,
};
use crate::ports::TransitionStore;

async fn first_task(org: &Org) -> crate::domain::Task {
    let created = org
        .runtime
        .create_recurring_project(org.safety_check())
        .await
        .unwrap();
    org.runtime.get_task(created.tasks[0]).await.unwrap()
}

#[tokio::test]
async fn completing_cancels_timers_and_later_firing_is_a_no_op() {
    let org = Org::new().await;
    let task = first_task(&org).await;
    let rows = org.store.pending_transitions().await.unwrap();
    assert!(rows.iter().any(|r| r.task_id == task.id));

    let done = org
        .runtime
        .complete_task(task.id, org.workers[0].id)
        .await
        .unwrap();
    assert_eq!(done.status, TaskStatus::Completed);
    assert_eq!(done.submitted_by, Some(org.workers[0].id));
    assert!(done.date_completed.is_some());

    let rows = org.store.pending_transitions().await.unwrap();
    assert!(rows.iter().all(|r| r.task_id != task.id));

    let outcome = org
        .runtime
        .scheduler()
        .fire(org.runtime.scheduler().transition(&task, TransitionKind::Expire))
        .await
        .unwrap();
    assert_eq!(outcome, FireOutcome::Skipped(TaskStatus::Completed));
    assert_eq!(
        org.runtime.get_task(task.id).await.unwrap().status,
        TaskStatus::Completed
    );

    // 完了通知: assignees 2 人 + 作成者
    let sent = org.sink.wait_for(3, WAIT).await;
    assert_eq!(sent.len(), 3);
    assert!(sent.iter().all(|m| m.subject.starts_with("Task Completed")));

    let project = org.runtime.get_project(task.project.unwrap()).await.unwrap();
    assert_eq!(project.no_of_tasks_closed, 1);
}

#[tokio::test]
async fn completing_twice_is_idempotent() {
    let org = Org::new().await;
    let task = first_task(&org).await;
    org.runtime
        .complete_task(task.id, org.workers[0].id)
        .await
        .unwrap();
    let again = org
        .runtime
        .complete_task(task.id, org.workers[1].id)
        .await
        .unwrap();
    assert_eq!(again.submitted_by, Some(org.workers[0].id));

    let project = org.runtime.get_project(task.project.unwrap()).await.unwrap();
    assert_eq!(project.no_of_tasks_closed, 1);
}

#[tokio::test]
async fn deleted_task_ignores_every_timer() {
    let org = Org::new().await;
    let task = first_task(&org).await;

    let deleted = org.runtime.delete_task(task.id).await.unwrap();
    assert_eq!(deleted.status, TaskStatus::Deleted);

    for kind in TransitionKind::ALL {
        let outcome = org
            .runtime
            .scheduler()
            .fire(org.runtime.scheduler().transition(&task, kind))
            .await
            .unwrap();
        assert_eq!(outcome, FireOutcome::Skipped(TaskStatus::Deleted));
    }
    assert_eq!(
        org.runtime.get_task(task.id).await.unwrap().status,
        TaskStatus::Deleted
    );

    let err = org
        .runtime
        .complete_task(task.id, org.workers[0].id)
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Conflict);

    // 論理削除なので一覧には残る
    let listed = org
        .runtime
        .list_tasks(&TaskFilter::project(task.project.unwrap()))
        .await
        .unwrap();
    assert_eq!(listed.len(), 6);
}

#[tokio::test]
async fn expiry_marks_missed_and_missed_task_can_still_be_completed() {
    let org = Org::new().await;
    let task = first_task(&org).await;

    org.clock.set(task.due_date);
    let outcome = org
        .runtime
        .scheduler()
        .fire(org.runtime.scheduler().transition(&task, TransitionKind::Expire))
        .await
        .unwrap();
    assert_eq!(outcome, FireOutcome::Fired);
    assert_eq!(
        org.runtime.get_task(task.id).await.unwrap().status,
        TaskStatus::Missed
    );
    let sent = org.sink.wait_for(3, WAIT).await;
    assert!(sent.iter().all(|m| m.subject.starts_with("Missed Task")));

    let done = org
        .runtime
        .complete_task(task.id, org.workers[1].id)
        .await
        .unwrap();
    assert_eq!(done.status, TaskStatus::Completed);
}

#[tokio::test]
async fn starting_work_keeps_the_task_open() {
    let org = Org::new().await;
    let task = first_task(&org).await;

    let started = org.runtime.start_task(task.id).await.unwrap();
    assert_eq!(started.status, TaskStatus::InProgress);

    let outcome = org
        .runtime
        .scheduler()
        .fire(org.runtime.scheduler().transition(&task, TransitionKind::Expire))
        .await
        .unwrap();
    assert_eq!(outcome, FireOutcome::Fired);
    assert_eq!(
        org.runtime.get_task(task.id).await.unwrap().status,
        TaskStatus::Missed
    );
    assert_eq!(
        org.runtime.start_task(task.id).await.unwrap_err().kind(),
        ErrorKind::Conflict
    );
}

#[tokio::test]
async fn moving_the_due_date_replaces_the_timers() {
    let org = Org::new().await;
    let task = first_task(&org).await;
    let new_due = task.due_date + Duration::days(5);

    let updated = org
        .runtime
        .update_task(
            task.id,
            TaskUpdate {
                due_date: Some(new_due),
                ..TaskUpdate::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(updated.due_date, new_due);

    let rows: Vec<_> = org
        .store
        .pending_transitions()
        .await
        .unwrap()
        .into_iter()
        .filter(|r| r.task_id == task.id)
        .collect();
    let expire = rows
        .iter()
        .find(|r| r.kind == TransitionKind::Expire)
        .unwrap();
    assert_eq!(expire.fire_at, new_due);
    let remind = rows
        .iter()
        .find(|r| r.kind == TransitionKind::Remind)
        .unwrap();
    assert_eq!(remind.fire_at, new_due - Duration::hours(24));
}

#[tokio::test]
async fn expiry_for_the_old_due_date_leaves_a_moved_task_open() {
    let org = Org::new().await;
    let task = first_task(&org).await;
    let scheduler = org.runtime.scheduler();
    let old_expire = scheduler.transition(&task, TransitionKind::Expire);

    let moved = org
        .runtime
        .update_task(
            task.id,
            TaskUpdate {
                due_date: Some(task.due_date + Duration::days(5)),
                ..TaskUpdate::default()
            },
        )
        .await
        .unwrap();

    // 古い期限を過ぎたところで、古いタイマーが遅れて走る
    org.clock.set(task.due_date + Duration::minutes(1));
    let outcome = scheduler.fire(old_expire).await.unwrap();
    assert_eq!(outcome, FireOutcome::Superseded);
    assert_eq!(
        org.runtime.get_task(task.id).await.unwrap().status,
        TaskStatus::Active
    );

    let rows = org.store.pending_transitions().await.unwrap();
    assert!(rows.contains(&scheduler.transition(&moved, TransitionKind::Expire)));
    assert!(rows.contains(&scheduler.transition(&moved, TransitionKind::Remind)));
}

#[tokio::test]
async fn late_reminder_keeps_the_rescheduled_reminder() {
    let org = Org::new().await;
    let created = org
        .runtime
        .create_recurring_project(org.safety_check())
        .await
        .unwrap();
    let mut tasks = Vec::new();
    for id in &created.tasks {
        tasks.push(org.runtime.get_task(*id).await.unwrap());
    }
    // 3 日目のタスクだけがリマインダーを持つ
    let task = tasks
        .into_iter()
        .max_by_key(|t| t.due_date)
        .unwrap();
    let scheduler = org.runtime.scheduler();
    let old_remind = scheduler.transition(&task, TransitionKind::Remind);
    assert!(
        org.store
            .pending_transitions()
            .await
            .unwrap()
            .contains(&old_remind)
    );

    let moved = org
        .runtime
        .update_task(
            task.id,
            TaskUpdate {
                due_date: Some(task.due_date + Duration::days(2)),
                ..TaskUpdate::default()
            },
        )
        .await
        .unwrap();
    let rearmed = scheduler.transition(&moved, TransitionKind::Remind);

    assert_eq!(
        scheduler.fire(old_remind).await.unwrap(),
        FireOutcome::Superseded
    );
    assert!(
        org.store
            .pending_transitions()
            .await
            .unwrap()
            .contains(&rearmed)
    );
}

#[tokio::test]
async fn comment_notifies_participants_and_extra_users() {
    let org = Org::new().await;
    let task = first_task(&org).await;
    let outsider = super::user("Zed", None);
    // ディレクトリに居ないユーザーは飛ばされる
    let comment = org
        .runtime
        .add_comment(task.id, org.manager.id, "  Exit B is blocked ", &[outsider.id])
        .await
        .unwrap();
    assert_eq!(comment.text, "Exit B is blocked");
    assert_eq!(comment.author, org.manager.id);

    let sent = org.sink.wait_for(3, WAIT).await;
    assert_eq!(sent.len(), 3);
    assert!(sent[0].body.contains("Mia has added a new comment"));

    let stored = org.runtime.get_task(task.id).await.unwrap();
    assert_eq!(stored.comments.len(), 1);
}

#[tokio::test]
async fn notification_failure_does_not_undo_completion() {
    let org = Org::new().await;
    org.sink.fail_for("ana@example.com");
    let task = first_task(&org).await;

    let done = org
        .runtime
        .complete_task(task.id, org.workers[1].id)
        .await
        .unwrap();
    assert_eq!(done.status, TaskStatus::Completed);

    let sent = org.sink.wait_for(2, WAIT).await;
    assert_eq!(sent.len(), 2);
    assert!(sent.iter().all(|m| m.address != "ana@example.com"));
    assert_eq!(
        org.runtime.get_task(task.id).await.unwrap().status,
        TaskStatus::Completed
    );
}

#[tokio::test]
async fn unknown_task_is_not_found() {
    let org = Org::new().await;
    let id = crate::domain::TaskId::from_ulid(ulid::Ulid::new());
    assert_eq!(
        org.runtime.get_task(id).await.unwrap_err().kind(),
        ErrorKind::NotFound
    );
    assert_eq!(
        org.runtime
            .complete_task(id, org.workers[0].id)
            .await
            .unwrap_err()
            .kind(),
        ErrorKind::NotFound
    );
}

#[tokio::test(start_paused = true)]
async fn due_date_passing_marks_tasks_missed() {
    let org = Org::new().await;
    let created = org
        .runtime
        .create_recurring_project(org.request(
            "Lock Up",
            org.operations.id,
            RecurrenceInput::after("once", 1, 1),
        ))
        .await
        .unwrap();
    assert_eq!(created.tasks.len(), 2);

    // 09:00 → 23:59 まで進める
    let until_due = Duration::hours(15);
    org.clock.advance(until_due);
    tokio::time::sleep(until_due.to_std().unwrap()).await;

    for id in &created.tasks {
        assert_eq!(
            org.runtime.get_task(*id).await.unwrap().status,
            TaskStatus::Missed
        );
    }
    assert!(org.store.pending_transitions().await.unwrap().is_empty());
    org.runtime.shutdown().await;
}
