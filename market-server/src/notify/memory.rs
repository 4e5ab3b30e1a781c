use super::{Notification, Notifier, NotifyError, Recipient};
use async_trait::async_trait;
use tokio::sync::RwLock;

/// Records notifications in memory; can be told to fail
#[derive(Default)]
pub struct MemoryNotifier {
    sent: RwLock<Vec<Notification>>,
    attempts: RwLock<Vec<Notification>>,
    fail_on_send: RwLock<bool>,
}

impl MemoryNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn set_fail_on_send(&self, fail: bool) {
        *self.fail_on_send.write().await = fail;
    }

    /// Successfully delivered notifications
    pub async fn sent(&self) -> Vec<Notification> {
        self.sent.read().await.clone()
    }

    /// Every send call, including failed ones
    pub async fn attempts(&self) -> Vec<Notification> {
        self.attempts.read().await.clone()
    }

    pub async fn sent_to(&self, recipient: &Recipient) -> Vec<Notification> {
        self.sent
            .read()
            .await
            .iter()
            .filter(|n| &n.recipient == recipient)
            .cloned()
            .collect()
    }
}

#[async_trait]
impl Notifier for MemoryNotifier {
    async fn send(&self, notification: Notification) -> Result<(), NotifyError> {
        self.attempts.write().await.push(notification.clone());
        if *self.fail_on_send.read().await {
            return Err(NotifyError::Unavailable("memory notifier set to fail".into()));
        }
        self.sent.write().await.push(notification);
        Ok(())
    }
}
