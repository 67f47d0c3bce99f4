//! Impls - 実装（開発用・テスト用）
//!
//! ports のプロセス内実装です。
//!
//! # 含まれる実装
//! - **InMemoryStore**: TaskStore / ProjectStore / TransitionStore
//! - **InMemoryDirectory**: TeamDirectory / UserDirectory
//! - **InMemoryTimer**: Timer（min-heap + worker pool）
//! - **RecordingSink**: 送信内容を記録する NotificationSink
//!
//! 本番用の実装（ドキュメント DB、メール配送）は別クレートに置く想定です。

pub mod memory_directory;
pub mod memory_store;
pub mod memory_timer;
pub mod recording_sink;

// 主要な型を再エクスポート
pub use self::memory_directory::InMemoryDirectory;
pub use self::memory_store::InMemoryStore;
pub use self::memory_timer::InMemoryTimer;
pub use self::recording_sink::{RecordingSink, SentMessage};
