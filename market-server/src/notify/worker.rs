use super::{Notification, Notifier, Recipient, send_best_effort};
use crate::orders::{OrderEvent, OrderEventKind};
use shared::models::OrderStatus;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

/// Turns order events into customer and admin notifications
pub struct NotificationWorker {
    notifier: Arc<dyn Notifier>,
}

impl NotificationWorker {
    pub fn new(notifier: Arc<dyn Notifier>) -> Self {
        Self { notifier }
    }

    pub async fn run(
        self,
        mut event_rx: mpsc::Receiver<Arc<OrderEvent>>,
        shutdown: CancellationToken,
    ) {
        tracing::info!("Notification worker started");
        loop {
            tokio::select! {
                _ = shutdown.cancelled() => break,
                event = event_rx.recv() => match event {
                    Some(event) => self.handle(&event).await,
                    None => {
                        tracing::info!("Notification channel closed, worker stopping");
                        break;
                    }
                },
            }
        }
    }

    async fn handle(&self, event: &OrderEvent) {
        for notification in notifications_for(event) {
            send_best_effort(self.notifier.as_ref(), notification).await;
        }
    }
}

/// Messages an event produces
///
/// System cancellations are left out: the reaper notifies the customer
/// itself.
pub fn notifications_for(event: &OrderEvent) -> Vec<Notification> {
    let order_id = event.order_id.as_str();
    let customer = Recipient::User(event.customer_id.clone());

    let notification = match &event.kind {
        OrderEventKind::Created { status } => Notification::new(
            Recipient::Admins,
            "Đơn hàng mới",
            format!("Order {order_id} was placed ({})", status.label()),
        ),
        OrderEventKind::ShipperAssigned { shipper_id } => Notification::new(
            customer,
            "Đã có tài xế",
            format!("A shipper accepted order {order_id}"),
        )
        .with_data("shipper_id", shipper_id.clone()),
        OrderEventKind::StatusChanged { to, .. } => match to {
            OrderStatus::PendingCustomerConfirmation => Notification::new(
                customer,
                "Báo giá đơn hàng",
                format!("The seller sent a quote for order {order_id}"),
            ),
            OrderStatus::Delivering => Notification::new(
                customer,
                to.label(),
                format!("Order {order_id} is on its way"),
            ),
            OrderStatus::Delivered => Notification::new(
                customer,
                to.label(),
                format!("Order {order_id} was delivered"),
            ),
            _ => return Vec::new(),
        },
        OrderEventKind::Canceled {
            by_system: true, ..
        } => return Vec::new(),
        OrderEventKind::Canceled { reason, .. } => Notification::new(
            customer,
            OrderStatus::Canceled.label(),
            match reason {
                Some(reason) => format!("Order {order_id} was canceled: {reason}"),
                None => format!("Order {order_id} was canceled"),
            },
        ),
    };

    vec![notification.with_data("order_id", order_id)]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notify::MemoryNotifier;

    fn event(kind: OrderEventKind) -> OrderEvent {
        OrderEvent {
            event_id: "e-1".into(),
            order_id: "o-1".into(),
            customer_id: "c-1".into(),
            shipper_id: None,
            kind,
            timestamp: 0,
        }
    }

    #[test]
    fn test_created_order_notifies_admins() {
        let notes = notifications_for(&event(OrderEventKind::Created {
            status: OrderStatus::PendingConfirmation,
        }));
        assert_eq!(notes.len(), 1);
        assert_eq!(notes[0].recipient, Recipient::Admins);
        assert_eq!(notes[0].data.get("order_id").map(String::as_str), Some("o-1"));
    }

    #[test]
    fn test_system_cancel_is_left_to_the_reaper() {
        let notes = notifications_for(&event(OrderEventKind::Canceled {
            from: OrderStatus::PendingConfirmation,
            reason: None,
            by_system: true,
        }));
        assert!(notes.is_empty());
    }

    #[test]
    fn test_processing_is_silent() {
        let notes = notifications_for(&event(OrderEventKind::StatusChanged {
            from: OrderStatus::PendingConfirmation,
            to: OrderStatus::Processing,
        }));
        assert!(notes.is_empty());
    }

    #[tokio::test]
    async fn test_worker_survives_failing_notifier() {
        let notifier = Arc::new(MemoryNotifier::new());
        notifier.set_fail_on_send(true).await;
        let (tx, rx) = mpsc::channel(4);
        let shutdown = CancellationToken::new();
        let handle = tokio::spawn(
            NotificationWorker::new(notifier.clone()).run(rx, shutdown.clone()),
        );

        tx.send(Arc::new(event(OrderEventKind::StatusChanged {
            from: OrderStatus::Delivering,
            to: OrderStatus::Delivered,
        })))
        .await
        .unwrap();
        drop(tx);
        handle.await.unwrap();

        assert_eq!(notifier.attempts().await.len(), 1);
        assert!(notifier.sent().await.is_empty());
    }
}
