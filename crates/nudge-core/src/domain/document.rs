//! Document - ドキュメントストアとの境界で流れるデータ

use serde::{Deserialize, Serialize};
use std::fmt;

/// ドキュメントの安定したキー（vault 相対パスなど）
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DocumentId(String);

impl DocumentId {
    pub fn new(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DocumentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// ドキュメント 1 件の全文
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Document {
    pub id: DocumentId,
    pub text: String,
}

impl Document {
    pub fn new(id: DocumentId, text: impl Into<String>) -> Self {
        Self {
            id,
            text: text.into(),
        }
    }
}

/// ドキュメントストアからの変更通知
///
/// コアは自分で変更を検知しない。これを受けて反応するだけ
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DocumentEvent {
    /// 作成・更新（新しい全文を持つ）
    Changed(Document),

    /// 削除。タスクはキャッシュから消える
    Removed(DocumentId),

    /// 移動。タスクも一緒に移る
    Renamed { from: DocumentId, to: DocumentId },
}
