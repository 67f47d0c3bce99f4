//! App - アプリケーション層
//!
//! ports を組み合わせてアプリケーションロジックを実装します。
//!
//! # 主要コンポーネント
//! - **AppBuilder**: ports の注入と起動時検証、タイマーの復元
//! - **Runtime**: core の公開操作
//! - **ProjectMaterializer**: 繰り返しプロジェクトとタスクの生成
//! - **TaskLifecycleScheduler**: activate / remind / missed の時刻トリガー
//! - **TeamLocationResolver**: チームとロケーションの範囲決定
//! - **NotificationDispatcher**: 通知の重複排除と配送

pub mod builder;
pub mod config;
pub mod lifecycle;
pub mod materializer;
pub mod notify;
pub mod resolver;
pub mod runtime;
pub mod templates;

// 主要な型を再エクスポート
pub use self::builder::{AppBuilder, BuildError};
pub use self::config::{Config, ConfigError, Settings};
pub use self::lifecycle::{FireOutcome, TaskLifecycleScheduler};
pub use self::materializer::{CreateProject, CreatedProject, ProjectMaterializer};
pub use self::notify::{DeliveryReport, NotificationDispatcher};
pub use self::resolver::{TeamLocationResolver, TeamScope};
pub use self::runtime::Runtime;
pub use self::templates::{Message, MessageTemplates};
