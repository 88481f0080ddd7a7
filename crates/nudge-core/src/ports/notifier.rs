//! Notifier port - 通知の配送先
//!
//! コアは `deliver` の成否だけを見る。リトライはしない。

use async_trait::async_trait;

use crate::domain::{DeliveryError, Notification};

#[async_trait]
pub trait Notifier: Send + Sync {
    async fn deliver(&self, notification: &Notification) -> Result<(), DeliveryError>;

    /// 通知先が未設定なら `false`。評価器は配送をスキップする
    fn is_configured(&self) -> bool {
        true
    }
}
