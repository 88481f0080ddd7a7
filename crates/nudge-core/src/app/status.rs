//! Status - キャッシュ中のタスクとその状態の一覧

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::{Task, TaskIdentity, TaskState, iso_timestamp};

/// `scan` / ステータス表示用のタスク 1 件
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskStatusView {
    pub identity: TaskIdentity,
    pub content: String,
    pub due: String,
    pub state: TaskState,
    /// 未通知で期限切れ（次の sweep で通知される）
    pub overdue: bool,
}

impl TaskStatusView {
    pub fn new(task: &Task, state: TaskState, now: DateTime<Utc>) -> Self {
        Self {
            identity: task.identity().clone(),
            content: task.content().to_string(),
            due: iso_timestamp(&task.due()),
            state,
            overdue: state == TaskState::Pending && task.is_due_at(now),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskCounts {
    pub pending: usize,
    pub overdue: usize,
    pub fired: usize,
}

impl TaskCounts {
    pub fn from_views(views: &[TaskStatusView]) -> Self {
        let mut counts = Self::default();
        for view in views {
            match (view.state, view.overdue) {
                (TaskState::Fired, _) => counts.fired += 1,
                (TaskState::Pending, true) => counts.overdue += 1,
                (TaskState::Pending, false) => counts.pending += 1,
            }
        }
        counts
    }
}
