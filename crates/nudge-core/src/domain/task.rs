use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Dedup key of a task: `content` + `-` + due time in UTC ISO-8601.
///
/// 同じ content と due を持つタスクは、どのドキュメントから抽出されても同一。
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TaskIdentity(String);

impl TaskIdentity {
    pub fn new(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    pub fn of(content: &str, due: &DateTime<Utc>) -> Self {
        Self(format!("{content}-{}", iso_timestamp(due)))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TaskIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// identity と通知ペイロードで使うタイムゾーン非依存の表記
/// （例: `2025-01-01T09:00:00.000Z`）
pub fn iso_timestamp(at: &DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// マーカーから抽出したリマインダー
///
/// identity は生成時に一度だけ計算する。同じテキストを何度抽出しても等しい値になる
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    content: String,
    due: DateTime<Utc>,
    identity: TaskIdentity,
}

impl Task {
    pub fn new(content: impl Into<String>, due: DateTime<Utc>) -> Self {
        let content = content.into();
        let identity = TaskIdentity::of(&content, &due);
        Self {
            content,
            due,
            identity,
        }
    }

    pub fn content(&self) -> &str {
        &self.content
    }

    pub fn due(&self) -> DateTime<Utc> {
        self.due
    }

    pub fn identity(&self) -> &TaskIdentity {
        &self.identity
    }

    /// `due <= now`。静的な比較なので期限切れは常に due
    pub fn is_due_at(&self, now: DateTime<Utc>) -> bool {
        self.due <= now
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    #[test]
    fn identity_uses_millisecond_utc_timestamp() {
        let due = Utc.with_ymd_and_hms(2025, 1, 1, 9, 0, 0).unwrap();
        let task = Task::new("Buy milk", due);
        assert_eq!(task.identity().as_str(), "Buy milk-2025-01-01T09:00:00.000Z");
    }

    #[test]
    fn same_content_and_due_share_identity() {
        let due = Utc.with_ymd_and_hms(2025, 3, 4, 18, 30, 0).unwrap();
        assert_eq!(Task::new("call", due).identity(), Task::new("call", due).identity());
        assert_ne!(
            Task::new("call", due).identity(),
            Task::new("call", due + Duration::minutes(1)).identity()
        );
    }

    #[test]
    fn due_comparison_is_inclusive() {
        let due = Utc.with_ymd_and_hms(2025, 1, 1, 9, 0, 0).unwrap();
        let task = Task::new("x", due);
        assert!(!task.is_due_at(due - Duration::seconds(1)));
        assert!(task.is_due_at(due));
        assert!(task.is_due_at(due + Duration::days(365)));
    }

    #[test]
    fn identity_serializes_as_plain_string() {
        let id = TaskIdentity::new("a-2025-01-01T09:00:00.000Z");
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, "\"a-2025-01-01T09:00:00.000Z\"");
    }
}
