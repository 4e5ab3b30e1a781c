//! Outbound notifications
//!
//! Push delivery (FCM/Expo) lives behind an external gateway; this module
//! only decides who hears about what. Every send is best-effort: callers
//! log failures and move on.

mod memory;
mod push;
mod worker;

pub use memory::MemoryNotifier;
pub use push::{LogNotifier, PushGatewayNotifier};
pub use worker::NotificationWorker;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "id", rename_all = "snake_case")]
pub enum Recipient {
    User(String),
    /// Every admin and regional manager
    Admins,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Notification {
    pub recipient: Recipient,
    pub title: String,
    pub body: String,
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub data: HashMap<String, String>,
}

impl Notification {
    pub fn new(recipient: Recipient, title: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            recipient,
            title: title.into(),
            body: body.into(),
            data: HashMap::new(),
        }
    }

    pub fn with_data(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.data.insert(key.into(), value.into());
        self
    }
}

#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("Push gateway request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Push gateway rejected notification with status {0}")]
    Rejected(u16),

    #[error("Notifier unavailable: {0}")]
    Unavailable(String),
}

#[async_trait]
pub trait Notifier: Send + Sync {
    async fn send(&self, notification: Notification) -> Result<(), NotifyError>;
}

/// Send and log the outcome; never fails
pub async fn send_best_effort(notifier: &dyn Notifier, notification: Notification) {
    let recipient = notification.recipient.clone();
    let title = notification.title.clone();
    if let Err(e) = notifier.send(notification).await {
        tracing::warn!(recipient = ?recipient, title = %title, error = %e, "Notification failed");
    }
}
