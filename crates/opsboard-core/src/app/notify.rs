//! NotificationDispatcher - ライフサイクルイベントの配信
//!
//! # 流れ
//! 1. 受信者 id を集める（assignees, creator, followers, 追加分）
//! 2. UserDirectory で `Reference<User>` に join
//! 3. 解決できなかった参照は飛ばす
//! 4. アドレスを初出順で重複排除し、1 通ずつ送信
//!
//! 送信失敗はログに残すだけで、残りの送信は続けます。

use std::sync::Arc;

use tokio::task::JoinHandle;
use tracing::{debug, warn};

use super::templates::MessageTemplates;
use crate::domain::{Notification, Reference, Task, UserId, UserRef};
use crate::ports::{NotificationSink, UserDirectory};

/// What happened to one fan-out.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DeliveryReport {
    pub delivered: usize,
    pub failed: usize,
    /// Recipients whose directory record could not be joined.
    pub skipped: usize,
}

#[derive(Clone)]
pub struct NotificationDispatcher {
    users: Arc<dyn UserDirectory>,
    sink: Arc<dyn NotificationSink>,
    templates: MessageTemplates,
}

impl NotificationDispatcher {
    pub fn new(
        users: Arc<dyn UserDirectory>,
        sink: Arc<dyn NotificationSink>,
        templates: MessageTemplates,
    ) -> Self {
        Self {
            users,
            sink,
            templates,
        }
    }

    /// Send `kind` for `task` to every participant plus `extra`.
    pub async fn notify(&self, task: &Task, kind: &Notification, extra: &[UserId]) -> DeliveryReport {
        let mut ids = task.participants();
        for id in extra {
            if !ids.contains(id) {
                ids.push(*id);
            }
        }

        let users = match self.users.find_by_ids(&ids).await {
            Ok(users) => users,
            Err(err) => {
                // ディレクトリが落ちていても状態遷移は済んでいるので、送れないだけ
                warn!(task_id = %task.id, error = %err, "recipient lookup failed");
                Vec::new()
            }
        };
        let refs = UserRef::join(&ids, &users);
        let skipped = refs.iter().filter(|r| !r.is_resolved()).count();

        let message = self.templates.render(task, kind);
        let mut report = DeliveryReport {
            skipped,
            ..DeliveryReport::default()
        };
        for address in recipient_addresses(&refs) {
            match self.sink.send(&address, &message.subject, &message.body).await {
                Ok(()) => report.delivered += 1,
                Err(err) => {
                    report.failed += 1;
                    warn!(
                        task_id = %task.id,
                        kind = kind.label(),
                        error = %err,
                        "notification delivery failed"
                    );
                }
            }
        }

        debug!(
            task_id = %task.id,
            kind = kind.label(),
            delivered = report.delivered,
            failed = report.failed,
            skipped = report.skipped,
            "notification dispatched"
        );
        report
    }

    /// Fire-and-forget variant of [`notify`](Self::notify).
    pub fn notify_detached(
        &self,
        task: Task,
        kind: Notification,
        extra: Vec<UserId>,
    ) -> JoinHandle<DeliveryReport> {
        let this = self.clone();
        tokio::spawn(async move { this.notify(&task, &kind, &extra).await })
    }

    /// Display name for `user`, falling back to the id when unknown.
    pub async fn display_name(&self, user: UserId) -> String {
        match self.users.find_by_ids(&[user]).await {
            Ok(users) => users
                .first()
                .map(|u| u.display_name())
                .unwrap_or_else(|| user.to_string()),
            Err(err) => {
                warn!(user_id = %user, error = %err, "display name lookup failed");
                user.to_string()
            }
        }
    }
}

/// Addresses of resolved references, deduplicated in first-seen order.
fn recipient_addresses(refs: &[UserRef]) -> Vec<String> {
    let mut out: Vec<String> = Vec::new();
    for r in refs {
        match r {
            Reference::Resolved(user) => {
                let address = user.email.trim();
                if !address.is_empty() && !out.iter().any(|a| a.eq_ignore_ascii_case(address)) {
                    out.push(address.to_string());
                }
            }
            Reference::Id(_) => {}
        }
    }
    out
}
