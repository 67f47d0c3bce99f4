//! Events - 通知の種類
//!
//! ライフサイクル上の出来事のうち、人に知らせるものを表現します。

use serde::{Deserialize, Serialize};

/// What happened to a task, from the recipients' point of view.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Notification {
    Activated,
    Reminder,
    Missed,
    Completed,
    CommentAdded { author: String, text: String },
}

impl Notification {
    pub fn label(&self) -> &'static str {
        match self {
            Notification::Activated => "activated",
            Notification::Reminder => "reminder",
            Notification::Missed => "missed",
            Notification::Completed => "completed",
            Notification::CommentAdded { .. } => "comment_added",
        }
    }
}
