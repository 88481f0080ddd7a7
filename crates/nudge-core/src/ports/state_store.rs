//! StateStore port - 永続化される状態（settings + notifiedTasks）
//!
//! 2 つの論理レコードを 1 つのドキュメントとして読み書きします。
//! - settings: 通知先（コアからは不透明）
//! - notifiedTasks: 通知済みタスクの identity

use serde::{Deserialize, Serialize};

use crate::domain::{NudgeError, TaskIdentity};

/// 通知先の設定。スケジューラからは不透明
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct StoredSettings {
    pub webhook_url: Option<String>,
}

impl StoredSettings {
    /// 空でない通知先
    pub fn endpoint(&self) -> Option<&str> {
        self.webhook_url
            .as_deref()
            .map(str::trim)
            .filter(|url| !url.is_empty())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PersistedState {
    pub settings: StoredSettings,
    pub notified_tasks: Vec<TaskIdentity>,
}

/// `PersistedState` の永続化先
///
/// 未保存なら `load` は `Ok(None)`。壊れた内容は `Err` で、致命的かどうかは
/// 呼び出し側が決める
pub trait StateStore: Send + Sync {
    fn load(&self) -> Result<Option<PersistedState>, NudgeError>;

    fn save(&self, state: &PersistedState) -> Result<(), NudgeError>;
}
