//! DocumentSource port - ドキュメントストア
//!
//! 起動時のフルスキャンにだけ使う。以後の変更は `DocumentEvent` で届く。

use async_trait::async_trait;

use crate::domain::{Document, NudgeError};

#[async_trait]
pub trait DocumentSource: Send + Sync {
    async fn all_documents(&self) -> Result<Vec<Document>, NudgeError>;
}
