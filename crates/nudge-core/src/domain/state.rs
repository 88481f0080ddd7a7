//! State - タスクの通知状態
//!
//! # 状態遷移
//! - Pending -> Fired（一度だけ）
//! - Fired -> Pending は存在しない

use serde::{Deserialize, Serialize};

/// タスクの通知状態
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskState {
    /// 期限前、または期限切れだがまだ sweep されていない
    Pending,

    /// identity が通知済み集合にある（終端）
    Fired,
}

impl TaskState {
    pub fn from_fired(fired: bool) -> Self {
        if fired {
            TaskState::Fired
        } else {
            TaskState::Pending
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, TaskState::Fired)
    }
}
