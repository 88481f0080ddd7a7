//! Impls - ports の実装
//!
//! # 含まれる実装
//! - **JsonFileStateStore**: JSON ファイルへの永続化（本番用）
//! - **InMemoryStateStore**: テスト・開発用の永続化
//! - **WebhookNotifier**: Discord 互換 webhook への配送
//! - **RecordingNotifier** / **LogNotifier**: テスト・dry-run 用
//! - **FsDocumentSource**: ノートディレクトリのスキャンと監視

pub mod fs_documents;
pub mod json_store;
pub mod memory_store;
pub mod recording;
pub mod webhook;

pub use self::fs_documents::FsDocumentSource;
pub use self::json_store::JsonFileStateStore;
pub use self::memory_store::InMemoryStateStore;
pub use self::recording::{LogNotifier, RecordingNotifier};
pub use self::webhook::{DEFAULT_REQUEST_TIMEOUT, WebhookNotifier};
