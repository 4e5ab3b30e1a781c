use super::{Notification, Notifier, NotifyError};
use async_trait::async_trait;
use std::time::Duration;

/// Posts notifications as JSON to the push gateway
pub struct PushGatewayNotifier {
    client: reqwest::Client,
    url: String,
}

impl PushGatewayNotifier {
    pub fn new(url: impl Into<String>) -> Result<Self, NotifyError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()?;
        Ok(Self {
            client,
            url: url.into(),
        })
    }
}

#[async_trait]
impl Notifier for PushGatewayNotifier {
    async fn send(&self, notification: Notification) -> Result<(), NotifyError> {
        let response = self.client.post(&self.url).json(&notification).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(NotifyError::Rejected(status.as_u16()));
        }
        tracing::debug!(recipient = ?notification.recipient, title = %notification.title, "Push notification sent");
        Ok(())
    }
}

/// Used when no gateway is configured
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn send(&self, notification: Notification) -> Result<(), NotifyError> {
        tracing::info!(
            recipient = ?notification.recipient,
            title = %notification.title,
            body = %notification.body,
            "Notification"
        );
        Ok(())
    }
}
