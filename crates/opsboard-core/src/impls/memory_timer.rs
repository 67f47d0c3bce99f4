//! InMemoryTimer - プロセス内のタイマー（Timer port 実装）
//!
//! # 構成
//! - 発火予定は `BinaryHeap` の min-heap（早いものが先頭）
//! - dispatcher タスクが先頭の時刻まで `sleep_until` し、期限が来た job を
//!   worker へ渡す
//! - worker は `n` 本。異なるキーの job の実行順は保証しない
//!
//! # キャンセルの安全性
//! job は `pending` から取り出された時点で「実行中」になります。
//! 取り出しも `cancel` も同じロックの下で行うので、`cancel` が `true` を
//! 返した job は二度と実行されません。

use std::cmp::Ordering;
use std::collections::{BinaryHeap, HashMap};
use std::sync::{Arc, Mutex, PoisonError};

use chrono::{DateTime, Utc};
use tokio::sync::{Notify, mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, warn};

use crate::domain::TimerKey;
use crate::ports::{Clock, Timer, TimerJob};

/// Heap entry. `seq` tells a live entry from one superseded by a reschedule.
#[derive(Debug, Clone, PartialEq, Eq)]
struct Scheduled {
    at: Instant,
    seq: u64,
    key: TimerKey,
}

impl PartialOrd for Scheduled {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Scheduled {
    fn cmp(&self, other: &Self) -> Ordering {
        // Reverse ordering: earlier times have higher priority
        other
            .at
            .cmp(&self.at)
            .then_with(|| other.seq.cmp(&self.seq))
    }
}

#[derive(Default)]
struct TimerState {
    heap: BinaryHeap<Scheduled>,
    pending: HashMap<TimerKey, (u64, TimerJob)>,
    next_seq: u64,
}

impl TimerState {
    /// Pop every entry due at `now`, claiming its job.
    fn take_due(&mut self, now: Instant) -> Vec<(TimerKey, TimerJob)> {
        let mut due = Vec::new();
        while let Some(entry) = self.heap.peek() {
            if entry.at > now {
                break; // Heap is sorted, so we can stop
            }
            let Some(entry) = self.heap.pop() else { break };
            // cancel / reschedule 済みのエントリは捨てる
            if self
                .pending
                .get(&entry.key)
                .is_some_and(|(seq, _)| *seq == entry.seq)
                && let Some((_, job)) = self.pending.remove(&entry.key)
            {
                due.push((entry.key, job));
            }
        }
        due
    }

    /// Drop heap entries left behind by cancel / reschedule once they
    /// outnumber the live ones.
    fn compact_if_sparse(&mut self) {
        if self.heap.len() <= COMPACT_MIN || self.heap.len() <= 2 * self.pending.len() {
            return;
        }
        let pending = &self.pending;
        self.heap
            .retain(|entry| pending.get(&entry.key).is_some_and(|(seq, _)| *seq == entry.seq));
    }
}

/// Heap size below which stale entries are left for `take_due` to skip.
const COMPACT_MIN: usize = 64;

struct Shared {
    state: Mutex<TimerState>,
    notify: Notify,
}

impl Shared {
    fn lock(&self) -> std::sync::MutexGuard<'_, TimerState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Timer backed by a dispatcher task and a worker pool.
///
/// Fire times are wall-clock instants; the delay is measured against the
/// injected `Clock` when the job is scheduled.
pub struct InMemoryTimer {
    shared: Arc<Shared>,
    clock: Arc<dyn Clock>,
    shutdown_tx: watch::Sender<bool>,
    joins: Mutex<Vec<JoinHandle<()>>>,
}

impl InMemoryTimer {
    /// Spawn the dispatcher and `workers` workers on the current runtime.
    pub fn start(clock: Arc<dyn Clock>, workers: usize) -> Self {
        let shared = Arc::new(Shared {
            state: Mutex::new(TimerState::default()),
            notify: Notify::new(),
        });
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let (jobs_tx, jobs_rx) = mpsc::unbounded_channel::<(TimerKey, TimerJob)>();
        let jobs_rx = Arc::new(tokio::sync::Mutex::new(jobs_rx));

        let workers = workers.max(1);
        let mut joins = Vec::with_capacity(workers + 1);
        joins.push(tokio::spawn(dispatch_loop(
            Arc::clone(&shared),
            jobs_tx,
            shutdown_rx.clone(),
        )));
        for worker_id in 0..workers {
            joins.push(tokio::spawn(worker_loop(
                worker_id,
                Arc::clone(&jobs_rx),
                shutdown_rx.clone(),
            )));
        }

        Self {
            shared,
            clock,
            shutdown_tx,
            joins: Mutex::new(joins),
        }
    }

    /// Stop dispatching and wait for the dispatcher and workers to exit.
    ///
    /// Jobs still pending are dropped; jobs already running finish first.
    pub async fn shutdown_and_join(&self) {
        // ignore send error: receivers may already be dropped
        let _ = self.shutdown_tx.send(true);
        // 未発火の job はロックの外で捨てる（job が抱える参照もここで解放される）
        let dropped = {
            let mut state = self.shared.lock();
            state.heap.clear();
            std::mem::take(&mut state.pending)
        };
        drop(dropped);
        let joins = std::mem::take(&mut *self.joins.lock().unwrap_or_else(PoisonError::into_inner));
        for join in joins {
            let _ = join.await;
        }
    }

    fn deadline(&self, fire_at: DateTime<Utc>) -> Instant {
        let delay = (fire_at - self.clock.now()).to_std().unwrap_or_default();
        Instant::now() + delay
    }
}

impl Timer for InMemoryTimer {
    fn schedule(&self, key: TimerKey, fire_at: DateTime<Utc>, job: TimerJob) {
        let at = self.deadline(fire_at);
        {
            let mut state = self.shared.lock();
            let seq = state.next_seq;
            state.next_seq += 1;
            state.pending.insert(key, (seq, job));
            state.heap.push(Scheduled { at, seq, key });
            state.compact_if_sparse();
        }
        debug!(timer = %key, %fire_at, "timer armed");
        self.shared.notify.notify_one();
    }

    fn cancel(&self, key: TimerKey) -> bool {
        let removed = {
            let mut state = self.shared.lock();
            let removed = state.pending.remove(&key).is_some();
            state.compact_if_sparse();
            removed
        };
        if removed {
            debug!(timer = %key, "timer cancelled");
        }
        removed
    }

    fn pending(&self) -> Vec<TimerKey> {
        let mut keys: Vec<_> = self.shared.lock().pending.keys().copied().collect();
        keys.sort();
        keys
    }
}

async fn dispatch_loop(
    shared: Arc<Shared>,
    jobs_tx: mpsc::UnboundedSender<(TimerKey, TimerJob)>,
    mut shutdown_rx: watch::Receiver<bool>,
) {
    loop {
        if *shutdown_rx.borrow() {
            break;
        }

        let next_wake = {
            let mut state = shared.lock();
            for (key, job) in state.take_due(Instant::now()) {
                if jobs_tx.send((key, job)).is_err() {
                    warn!(timer = %key, "no timer worker left, job dropped");
                }
            }
            state.heap.peek().map(|entry| entry.at)
        };

        // 新しい予定 OR 次の発火時刻 OR shutdown を待つ
        match next_wake {
            Some(wake_at) => {
                tokio::select! {
                    changed = shutdown_rx.changed() => if changed.is_err() { break },
                    _ = shared.notify.notified() => {},
                    _ = tokio::time::sleep_until(wake_at) => {},
                }
            }
            None => {
                tokio::select! {
                    changed = shutdown_rx.changed() => if changed.is_err() { break },
                    _ = shared.notify.notified() => {},
                }
            }
        }
    }
}

async fn worker_loop(
    worker_id: usize,
    jobs_rx: Arc<tokio::sync::Mutex<mpsc::UnboundedReceiver<(TimerKey, TimerJob)>>>,
    mut shutdown_rx: watch::Receiver<bool>,
) {
    loop {
        if *shutdown_rx.borrow() {
            break;
        }

        let next = tokio::select! {
            changed = shutdown_rx.changed() => {
                if changed.is_err() {
                    break;
                }
                continue;
            }
            next = async { jobs_rx.lock().await.recv().await } => next,
        };

        let Some((key, job)) = next else { break };
        debug!(worker_id, timer = %key, "timer fired");
        job().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{TaskId, TransitionKind};
    use crate::ports::FixedClock;
    use chrono::{Duration, TimeZone};
    use futures::FutureExt;
    use std::sync::atomic::{AtomicUsize, Ordering as AtomicOrdering};
    use ulid::Ulid;

    fn clock() -> Arc<FixedClock> {
        Arc::new(FixedClock::new(
            Utc.with_ymd_and_hms(2025, 1, 15, 9, 0, 0).unwrap(),
        ))
    }

    fn key(kind: TransitionKind) -> TimerKey {
        TimerKey::new(TaskId::from_ulid(Ulid::new()), kind)
    }

    fn counting_job(counter: &Arc<AtomicUsize>) -> TimerJob {
        let counter = Arc::clone(counter);
        Box::new(move || {
            async move {
                counter.fetch_add(1, AtomicOrdering::SeqCst);
            }
            .boxed()
        })
    }

    #[tokio::test(start_paused = true)]
    async fn fires_at_the_scheduled_time() {
        let clock = clock();
        let timer = InMemoryTimer::start(clock.clone(), 2);
        let fired = Arc::new(AtomicUsize::new(0));

        let k = key(TransitionKind::Expire);
        timer.schedule(k, clock.now() + Duration::minutes(10), counting_job(&fired));
        assert_eq!(timer.pending(), vec![k]);

        tokio::time::sleep(std::time::Duration::from_secs(9 * 60)).await;
        assert_eq!(fired.load(AtomicOrdering::SeqCst), 0);

        tokio::time::sleep(std::time::Duration::from_secs(2 * 60)).await;
        assert_eq!(fired.load(AtomicOrdering::SeqCst), 1);
        assert!(timer.pending().is_empty());

        timer.shutdown_and_join().await;
    }

    #[tokio::test(start_paused = true)]
    async fn cancelled_job_never_fires() {
        let clock = clock();
        let timer = InMemoryTimer::start(clock.clone(), 1);
        let fired = Arc::new(AtomicUsize::new(0));

        let k = key(TransitionKind::Remind);
        timer.schedule(k, clock.now() + Duration::minutes(1), counting_job(&fired));
        assert!(timer.cancel(k));
        assert!(!timer.cancel(k));

        tokio::time::sleep(std::time::Duration::from_secs(120)).await;
        assert_eq!(fired.load(AtomicOrdering::SeqCst), 0);

        timer.shutdown_and_join().await;
    }

    #[tokio::test(start_paused = true)]
    async fn reschedule_replaces_previous_job() {
        let clock = clock();
        let timer = InMemoryTimer::start(clock.clone(), 1);
        let fired = Arc::new(AtomicUsize::new(0));

        let k = key(TransitionKind::Expire);
        timer.schedule(k, clock.now() + Duration::minutes(1), counting_job(&fired));
        timer.schedule(k, clock.now() + Duration::minutes(5), counting_job(&fired));

        tokio::time::sleep(std::time::Duration::from_secs(120)).await;
        assert_eq!(fired.load(AtomicOrdering::SeqCst), 0);

        tokio::time::sleep(std::time::Duration::from_secs(240)).await;
        assert_eq!(fired.load(AtomicOrdering::SeqCst), 1);

        timer.shutdown_and_join().await;
    }

    #[tokio::test(start_paused = true)]
    async fn stale_entries_do_not_pile_up() {
        let clock = clock();
        let timer = InMemoryTimer::start(clock.clone(), 1);
        let fired = Arc::new(AtomicUsize::new(0));

        let k = key(TransitionKind::Expire);
        let far = clock.now() + Duration::days(365);
        for _ in 0..500 {
            timer.schedule(k, far, counting_job(&fired));
        }
        let cancelled: Vec<_> = (0..500).map(|_| key(TransitionKind::Remind)).collect();
        for c in &cancelled {
            timer.schedule(*c, far, counting_job(&fired));
        }
        for c in &cancelled {
            assert!(timer.cancel(*c));
        }

        assert!(timer.shared.lock().heap.len() <= COMPACT_MIN + 1);
        assert_eq!(timer.pending(), vec![k]);
        timer.shutdown_and_join().await;
    }

    #[tokio::test(start_paused = true)]
    async fn past_fire_time_runs_immediately() {
        let clock = clock();
        let timer = InMemoryTimer::start(clock.clone(), 1);
        let fired = Arc::new(AtomicUsize::new(0));

        timer.schedule(
            key(TransitionKind::Expire),
            clock.now() - Duration::hours(3),
            counting_job(&fired),
        );
        tokio::time::sleep(std::time::Duration::from_millis(10)).await;
        assert_eq!(fired.load(AtomicOrdering::SeqCst), 1);

        timer.shutdown_and_join().await;
    }
}
