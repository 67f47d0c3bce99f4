//! Message templates for lifecycle notifications.

use chrono_tz::Tz;

use crate::domain::{Notification, Task};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    pub subject: String,
    pub body: String,
}

/// Renders one message per notification kind.
///
/// Dates are shown in `tz`; every body ends with `signature`.
#[derive(Debug, Clone)]
pub struct MessageTemplates {
    tz: Tz,
    signature: String,
}

impl MessageTemplates {
    pub fn new(tz: Tz, signature: impl Into<String>) -> Self {
        Self {
            tz,
            signature: signature.into(),
        }
    }

    pub fn render(&self, task: &Task, kind: &Notification) -> Message {
        let title = &task.title;
        let due = task
            .due_date
            .with_timezone(&self.tz)
            .format("%Y-%m-%d %H:%M %Z");

        let (subject, text) = match kind {
            Notification::Activated => (
                format!("Task Started: \"{title}\""),
                format!("The task \"{title}\" is now active and due on {due}."),
            ),
            Notification::Reminder => (
                format!("Reminder: Task \"{title}\" is due soon"),
                format!(
                    "This is a reminder that the task \"{title}\" is due on {due}.\n\n\
                     Please ensure that the necessary actions are taken before the deadline."
                ),
            ),
            Notification::Missed => (
                format!("Missed Task: \"{title}\""),
                format!(
                    "The task \"{title}\" has been marked as missed because the due date \
                     has passed and it was not completed."
                ),
            ),
            Notification::Completed => (
                format!("Task Completed: \"{title}\""),
                format!("The task \"{title}\" has been completed.\n\nThank you for your effort!"),
            ),
            Notification::CommentAdded { author, text } => (
                format!("New Comment on Task: {title}"),
                format!("{author} has added a new comment to the task \"{title}\":\n\n\"{text}\""),
            ),
        };

        Message {
            subject,
            body: format!("Hello,\n\n{text}\n\nBest regards,\n{}", self.signature),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{LocationId, NewTask, TaskId, UserId};
    use chrono::{TimeZone, Utc};
    use ulid::Ulid;

    fn task() -> Task {
        let start = Utc.with_ymd_and_hms(2025, 1, 15, 9, 0, 0).unwrap();
        Task::new(
            TaskId::from_ulid(Ulid::new()),
            NewTask {
                title: "Fire drill".into(),
                description: String::new(),
                assignees: vec![UserId::from_ulid(Ulid::new())],
                creator: UserId::from_ulid(Ulid::new()),
                followers: vec![],
                location: LocationId::from_ulid(Ulid::new()),
                team: None,
                project: None,
                date_start: start,
                due_date: Utc.with_ymd_and_hms(2025, 1, 16, 4, 59, 0).unwrap(),
            },
            start,
        )
        .unwrap()
    }

    #[test]
    fn reminder_shows_local_due_date() {
        let templates = MessageTemplates::new(chrono_tz::America::New_York, "OPS-360");
        let msg = templates.render(&task(), &Notification::Reminder);
        assert_eq!(msg.subject, "Reminder: Task \"Fire drill\" is due soon");
        assert!(msg.body.contains("2025-01-15 23:59 EST"), "{}", msg.body);
        assert!(msg.body.ends_with("OPS-360"));
    }

    #[test]
    fn comment_names_the_author() {
        let templates = MessageTemplates::new(chrono_tz::UTC, "Ops");
        let msg = templates.render(
            &task(),
            &Notification::CommentAdded {
                author: "Ana Silva".into(),
                text: "Exit B is blocked".into(),
            },
        );
        assert_eq!(msg.subject, "New Comment on Task: Fire drill");
        assert!(msg.body.contains("Ana Silva has added a new comment"));
        assert!(msg.body.contains("\"Exit B is blocked\""));
    }
}
