//! Errors - エラー型
//!
//! - NudgeError: コア全体のエラー
//! - DeliveryError: 通知の配送失敗（Notifier が返す）

use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum NudgeError {
    #[error("state store error: {0}")]
    Store(String),

    #[error("io error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("config error: {0}")]
    Config(String),

    #[error("watch error: {0}")]
    Watch(String),

    #[error(transparent)]
    Delivery(#[from] DeliveryError),
}

impl NudgeError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        NudgeError::Io {
            path: path.into(),
            source,
        }
    }
}

/// 通知が届かなかった理由
#[derive(Debug, Error)]
pub enum DeliveryError {
    #[error("no notification endpoint configured")]
    NotConfigured,

    #[error("transport failed: {0}")]
    Transport(String),

    #[error("sink rejected notification with status {status}")]
    Status { status: u16 },
}
