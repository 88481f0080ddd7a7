use serde::{Deserialize, Serialize};

use super::task::{Task, iso_timestamp};

pub const REMINDER_TITLE: &str = "Reminder";

/// `Notifier` に渡す (title, body, timestamp)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    pub title: String,
    pub body: String,
    pub timestamp: String,
}

impl Notification {
    pub fn reminder(task: &Task) -> Self {
        Self {
            title: REMINDER_TITLE.to_string(),
            body: task.content().to_string(),
            timestamp: iso_timestamp(&task.due()),
        }
    }
}
