use std::sync::Arc;

use super::Org;
use crate::domain::TaskStatus;
use crate::ports::{FixedClock, TransitionStore};

#[tokio::test]
async fn timers_come_back_after_a_restart() {
    let clock = Arc::new(FixedClock::new(super::start_time()));
    let store = Arc::new(crate::impls::InMemoryStore::new());

    let first = Org::with_store(clock.clone(), store.clone()).await;
    let created = first
        .runtime
        .create_recurring_project(first.safety_check())
        .await
        .unwrap();
    first
        .runtime
        .complete_task(created.tasks[0], first.workers[0].id)
        .await
        .unwrap();
    let rows = store.pending_transitions().await.unwrap();
    first.runtime.shutdown().await;

    // 同じ store で起動し直す
    let second = Org::with_store(clock.clone(), store.clone()).await;
    assert_eq!(store.pending_transitions().await.unwrap(), rows);
    assert!(rows.iter().all(|r| r.task_id != created.tasks[0]));

    let task = second.runtime.get_task(created.tasks[1]).await.unwrap();
    assert_eq!(task.status, TaskStatus::Active);
    second.runtime.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn overdue_transitions_fire_on_restart() {
    let clock = Arc::new(FixedClock::new(super::start_time()));
    let store = Arc::new(crate::impls::InMemoryStore::new());

    let first = Org::with_store(clock.clone(), store.clone()).await;
    let created = first
        .runtime
        .create_recurring_project(first.safety_check())
        .await
        .unwrap();
    first.runtime.shutdown().await;

    // 停止中に 2 日経過
    clock.advance(chrono::Duration::days(2));
    let second = Org::with_store(clock.clone(), store.clone()).await;
    tokio::time::sleep(std::time::Duration::from_millis(10)).await;

    // day 0 と day 1 の分は期限切れ、day 2 はまだ
    let tasks = second
        .runtime
        .list_tasks(&crate::domain::TaskFilter::project(created.parent.id))
        .await
        .unwrap();
    let missed = tasks
        .iter()
        .filter(|t| t.status == TaskStatus::Missed)
        .count();
    assert_eq!(missed, 4);
    second.runtime.shutdown().await;
}
