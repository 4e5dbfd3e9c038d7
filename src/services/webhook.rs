//! Outbound completion webhooks.

use async_trait::async_trait;
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, warn};

use super::errors::{CollaboratorError, CollaboratorResult};

const USER_AGENT: &str = concat!("speechflow-core-rs/", env!("CARGO_PKG_VERSION"));

/// Result of a delivered webhook
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WebhookDelivery {
    pub status: u16,
    pub payload_size: usize,
}

#[async_trait]
pub trait WebhookNotifier: Send + Sync {
    async fn notify(&self, url: &str, payload: &Value) -> CollaboratorResult<WebhookDelivery>;
}

/// POSTs the payload as JSON; any non-2xx status is an error
#[derive(Debug, Clone)]
pub struct HttpWebhookNotifier {
    http_client: reqwest::Client,
}

impl HttpWebhookNotifier {
    pub fn new(timeout: Duration) -> CollaboratorResult<Self> {
        let http_client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(timeout)
            .build()
            .map_err(|e| CollaboratorError::failed("webhook", e.to_string()))?;

        Ok(Self { http_client })
    }
}

#[async_trait]
impl WebhookNotifier for HttpWebhookNotifier {
    async fn notify(&self, url: &str, payload: &Value) -> CollaboratorResult<WebhookDelivery> {
        let payload_size = serde_json::to_vec(payload)?.len();

        let response = self.http_client.post(url).json(payload).send().await?;
        let status = response.status();

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!(url = %url, status = status.as_u16(), "Webhook rejected");
            return Err(CollaboratorError::failed(
                "webhook",
                format!("HTTP {}: {}", status.as_u16(), body),
            ));
        }

        debug!(url = %url, status = status.as_u16(), payload_size = payload_size, "Webhook delivered");
        Ok(WebhookDelivery {
            status: status.as_u16(),
            payload_size,
        })
    }
}
