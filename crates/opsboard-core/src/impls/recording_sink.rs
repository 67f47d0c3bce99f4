//! RecordingSink - 送信内容を記録するだけの NotificationSink
//!
//! 指定したアドレスへの送信を失敗させられるので、配送失敗の扱いを
//! テストできます。

use std::collections::HashSet;
use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::Notify;

use crate::ports::{NotificationSink, SinkError};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SentMessage {
    pub address: String,
    pub subject: String,
    pub body: String,
}

#[derive(Default)]
pub struct RecordingSink {
    sent: Mutex<Vec<SentMessage>>,
    failing: Mutex<HashSet<String>>,
    failures: Mutex<Vec<String>>,
    notify: Notify,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every send to `address` fails from now on.
    pub fn fail_for(&self, address: &str) {
        self.failing
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(address.to_string());
    }

    pub fn messages(&self) -> Vec<SentMessage> {
        self.sent
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Addresses whose delivery was refused, in attempt order.
    pub fn failures(&self) -> Vec<String> {
        self.failures
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Wait until at least `count` messages were delivered or `timeout`
    /// elapses, then return what was delivered.
    pub async fn wait_for(&self, count: usize, timeout: Duration) -> Vec<SentMessage> {
        let waiting = async {
            loop {
                let notified = self.notify.notified();
                if self.messages().len() >= count {
                    break;
                }
                notified.await;
            }
        };
        let _ = tokio::time::timeout(timeout, waiting).await;
        self.messages()
    }
}

#[async_trait]
impl NotificationSink for RecordingSink {
    async fn send(&self, address: &str, subject: &str, body: &str) -> Result<(), SinkError> {
        let refused = self
            .failing
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .contains(address);
        if refused {
            self.failures
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .push(address.to_string());
            return Err(SinkError::Delivery {
                address: address.to_string(),
                reason: "refused by recording sink".into(),
            });
        }

        self.sent
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(SentMessage {
                address: address.to_string(),
                subject: subject.to_string(),
                body: body.to_string(),
            });
        self.notify.notify_waiters();
        Ok(())
    }
}
