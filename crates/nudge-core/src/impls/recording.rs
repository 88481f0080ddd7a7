//! RecordingNotifier / LogNotifier - 開発用の Notifier
//!
//! - RecordingNotifier: 配送内容を記録する（失敗・未設定を注入可能）
//! - LogNotifier: ログに出すだけ（dry-run 用）

use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use tracing::info;

use crate::domain::{DeliveryError, Notification};
use crate::ports::Notifier;

#[derive(Debug)]
pub struct RecordingNotifier {
    delivered: Mutex<Vec<Notification>>,
    attempts: Mutex<Vec<Notification>>,
    failing: AtomicBool,
    configured: AtomicBool,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self {
            delivered: Mutex::new(Vec::new()),
            attempts: Mutex::new(Vec::new()),
            failing: AtomicBool::new(false),
            configured: AtomicBool::new(true),
        }
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    pub fn set_configured(&self, configured: bool) {
        self.configured.store(configured, Ordering::SeqCst);
    }

    /// Successfully delivered notifications, in order.
    pub fn delivered(&self) -> Vec<Notification> {
        self.delivered.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    /// Every `deliver` call, failed or not.
    pub fn attempts(&self) -> Vec<Notification> {
        self.attempts.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }
}

impl Default for RecordingNotifier {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn deliver(&self, notification: &Notification) -> Result<(), DeliveryError> {
        self.attempts
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(notification.clone());
        if self.failing.load(Ordering::SeqCst) {
            return Err(DeliveryError::Transport("injected failure".into()));
        }
        self.delivered
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(notification.clone());
        Ok(())
    }

    fn is_configured(&self) -> bool {
        self.configured.load(Ordering::SeqCst)
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn deliver(&self, notification: &Notification) -> Result<(), DeliveryError> {
        info!(
            title = %notification.title,
            body = %notification.body,
            due = %notification.timestamp,
            "dry-run notification"
        );
        Ok(())
    }
}
