//! NotificationSink port - メッセージ配送（メールなど）
//!
//! 失敗は呼び出し側でログに残すだけで、core の操作を失敗させません。

use async_trait::async_trait;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SinkError {
    #[error("delivery to {address} failed: {reason}")]
    Delivery { address: String, reason: String },
}

#[async_trait]
pub trait NotificationSink: Send + Sync {
    async fn send(&self, address: &str, subject: &str, body: &str) -> Result<(), SinkError>;
}
