//! WebhookNotifier - Discord 互換 webhook への配送
//!
//! Payload:
//! `{ "embeds": [{ "title": ..., "description": ..., "timestamp": ... }] }`

use std::time::Duration;

use async_trait::async_trait;
use tracing::debug;

use crate::domain::{DeliveryError, Notification, NudgeError};
use crate::ports::Notifier;

pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Clone)]
pub struct WebhookNotifier {
    endpoint: Option<String>,
    client: reqwest::Client,
}

impl WebhookNotifier {
    /// `endpoint` が無い・空なら未設定の notifier になる
    pub fn new(endpoint: Option<&str>, timeout: Duration) -> Result<Self, NudgeError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| NudgeError::Config(format!("cannot build http client: {e}")))?;
        let endpoint = endpoint
            .map(str::trim)
            .filter(|url| !url.is_empty())
            .map(str::to_string);
        Ok(Self { endpoint, client })
    }

    pub fn endpoint(&self) -> Option<&str> {
        self.endpoint.as_deref()
    }
}

pub fn embed_payload(notification: &Notification) -> serde_json::Value {
    serde_json::json!({
        "embeds": [{
            "title": notification.title,
            "description": notification.body,
            "timestamp": notification.timestamp,
        }]
    })
}

#[async_trait]
impl Notifier for WebhookNotifier {
    async fn deliver(&self, notification: &Notification) -> Result<(), DeliveryError> {
        let Some(endpoint) = self.endpoint.as_deref() else {
            return Err(DeliveryError::NotConfigured);
        };

        let resp = self
            .client
            .post(endpoint)
            .json(&embed_payload(notification))
            .send()
            .await
            .map_err(|e| DeliveryError::Transport(e.to_string()))?;

        let status = resp.status();
        if !status.is_success() {
            return Err(DeliveryError::Status {
                status: status.as_u16(),
            });
        }
        debug!(status = status.as_u16(), "webhook accepted notification");
        Ok(())
    }

    fn is_configured(&self) -> bool {
        self.endpoint.is_some()
    }
}
