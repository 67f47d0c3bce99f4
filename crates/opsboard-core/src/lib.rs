//! opsboard-core
//!
//! Recurrence-driven task scheduling engine for the Opsboard backend.
//!
//! # モジュール構成
//! - **domain**: ドメインモデル（ids, recurrence, expander, task, project, status, errors, ...）
//! - **ports**: 抽象化レイヤー（TaskStore, ProjectStore, TransitionStore, Directory, Timer, ...）
//! - **app**: アプリケーションロジック（builder, runtime, materializer, lifecycle, ...）
//! - **impls**: 実装（InMemoryStore, InMemoryTimer など開発用）

pub mod app;
pub mod domain;
pub mod impls;
pub mod ports;

pub use app::{AppBuilder, Config, CreateProject, CreatedProject, Runtime, Settings};
pub use domain::{ErrorKind, OpsError};

#[cfg(test)]
mod tests;
