//! Ports - 抽象化レイヤー
//!
//! Hexagonal Architecture の「ポート」を定義します。
//! 各 trait は外部システム（ドキュメント DB、ディレクトリ、メール配送など）への
//! インターフェースで、実装の詳細を隠蔽します。
//!
//! # 設計原則
//! - タスク / プロジェクト / 遷移の正本は store 側
//! - タイマーは揮発性。永続化された遷移から起動時に再構築する
//! - ディレクトリの失敗は致命的、通知の失敗はログのみ

pub mod clock;
pub mod directory;
pub mod id_generator;
pub mod notification_sink;
pub mod project_store;
pub mod task_store;
pub mod timer;
pub mod transition_store;

// 主要な trait を再エクスポート
pub use self::clock::{Clock, FixedClock, SystemClock};
pub use self::directory::{DirectoryError, TeamDirectory, UserDirectory};
pub use self::id_generator::{IdGenerator, UlidGenerator};
pub use self::notification_sink::{NotificationSink, SinkError};
pub use self::project_store::ProjectStore;
pub use self::task_store::{StoreError, TaskStore};
pub use self::timer::{Timer, TimerJob};
pub use self::transition_store::TransitionStore;
