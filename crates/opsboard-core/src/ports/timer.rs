//! Timer port - キー付きの時刻トリガー
//!
//! # 契約
//! - 同じキーで `schedule` すると前の予定を置き換える
//! - `cancel` が戻った後、そのキーの job は実行されない
//!   （すでに取り出されて実行中のものは止めない）

use chrono::{DateTime, Utc};
use futures::future::BoxFuture;

use crate::domain::TimerKey;

/// A unit of work run when a timer fires.
pub type TimerJob = Box<dyn FnOnce() -> BoxFuture<'static, ()> + Send>;

pub trait Timer: Send + Sync {
    /// Run `job` at `fire_at` (immediately if it is already past).
    fn schedule(&self, key: TimerKey, fire_at: DateTime<Utc>, job: TimerJob);

    /// Returns whether a pending job was removed.
    fn cancel(&self, key: TimerKey) -> bool;

    /// Keys currently waiting to fire.
    fn pending(&self) -> Vec<TimerKey>;
}
