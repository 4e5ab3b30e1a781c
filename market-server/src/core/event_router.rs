//! Event router
//!
//! Decouples the order manager from the workers that react to it.
//!
//! ```text
//! OrdersManager (broadcast)
//!        │
//!        └── EventRouter
//!               ├── mpsc ──► LedgerWorker (entered delivered) [CRITICAL]
//!               ├── mpsc ──► AssignmentWorker (needs a shipper) [CRITICAL]
//!               └── mpsc ──► NotificationWorker (all events) [best-effort]
//! ```
//!
//! Ledger and assignment sends block until there is room. The ledger outbox
//! makes a lost wake-up recoverable, but a late credit is still a visible
//! bug. Notifications are dropped when their channel is full.

use crate::orders::OrderEvent;
use std::sync::Arc;
use tokio::sync::{broadcast, mpsc};
use tokio_util::sync::CancellationToken;

pub struct EventChannels {
    pub ledger_rx: mpsc::Receiver<Arc<OrderEvent>>,
    pub assignment_rx: mpsc::Receiver<Arc<OrderEvent>>,
    pub notify_rx: mpsc::Receiver<Arc<OrderEvent>>,
}

pub struct EventRouter {
    ledger_tx: mpsc::Sender<Arc<OrderEvent>>,
    assignment_tx: mpsc::Sender<Arc<OrderEvent>>,
    notify_tx: mpsc::Sender<Arc<OrderEvent>>,
}

impl EventRouter {
    /// `critical_buffer` sizes the ledger and assignment channels,
    /// `notify_buffer` the best-effort notification channel
    pub fn new(critical_buffer: usize, notify_buffer: usize) -> (Self, EventChannels) {
        let (ledger_tx, ledger_rx) = mpsc::channel(critical_buffer);
        let (assignment_tx, assignment_rx) = mpsc::channel(critical_buffer);
        let (notify_tx, notify_rx) = mpsc::channel(notify_buffer);

        let router = Self {
            ledger_tx,
            assignment_tx,
            notify_tx,
        };
        let channels = EventChannels {
            ledger_rx,
            assignment_rx,
            notify_rx,
        };
        (router, channels)
    }

    /// Route until the source closes or shutdown is requested
    pub async fn run(
        self,
        mut source: broadcast::Receiver<OrderEvent>,
        shutdown: CancellationToken,
    ) {
        tracing::info!("Event router started");

        loop {
            tokio::select! {
                _ = shutdown.cancelled() => {
                    tracing::info!("Event router stopping");
                    break;
                }
                received = source.recv() => match received {
                    Ok(event) => self.dispatch(event).await,
                    Err(broadcast::error::RecvError::Lagged(n)) => {
                        // Ledger jobs survive in the outbox and assignment
                        // records are swept by the reaper, so this is loud but recoverable
                        tracing::error!(skipped = n, "Event router lagged, events skipped");
                    }
                    Err(broadcast::error::RecvError::Closed) => {
                        tracing::info!("Source channel closed, event router stopping");
                        break;
                    }
                },
            }
        }
    }

    async fn dispatch(&self, event: OrderEvent) {
        let event = Arc::new(event);

        if event.is_delivered() && self.ledger_tx.send(Arc::clone(&event)).await.is_err() {
            tracing::error!(order_id = %event.order_id, "Ledger channel closed, credit left to the outbox scan");
        }

        if event.needs_shipper() && self.assignment_tx.send(Arc::clone(&event)).await.is_err() {
            tracing::error!(order_id = %event.order_id, "Assignment channel closed");
        }

        match self.notify_tx.try_send(Arc::clone(&event)) {
            Ok(()) => {}
            Err(mpsc::error::TrySendError::Full(_)) => {
                tracing::warn!(
                    order_id = %event.order_id,
                    kind = ?event.kind,
                    "Notification channel full, event dropped"
                );
            }
            Err(mpsc::error::TrySendError::Closed(_)) => {
                tracing::debug!("Notification channel closed");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::orders::OrderEventKind;
    use shared::models::OrderStatus;

    fn event(kind: OrderEventKind) -> OrderEvent {
        OrderEvent {
            event_id: shared::util::new_id(),
            order_id: "o-1".into(),
            customer_id: "c-1".into(),
            shipper_id: None,
            kind,
            timestamp: 0,
        }
    }

    #[tokio::test]
    async fn test_created_order_goes_to_assignment_and_notify() {
        let (router, mut channels) = EventRouter::new(16, 16);
        let (tx, rx) = broadcast::channel(16);
        let shutdown = CancellationToken::new();
        tokio::spawn(router.run(rx, shutdown.clone()));

        tx.send(event(OrderEventKind::Created {
            status: OrderStatus::PendingConfirmation,
        }))
        .unwrap();

        assert!(channels.assignment_rx.recv().await.is_some());
        assert!(channels.notify_rx.recv().await.is_some());
        assert!(channels.ledger_rx.try_recv().is_err());
        shutdown.cancel();
    }

    #[tokio::test]
    async fn test_delivered_goes_to_ledger() {
        let (router, mut channels) = EventRouter::new(16, 16);
        let (tx, rx) = broadcast::channel(16);
        let shutdown = CancellationToken::new();
        tokio::spawn(router.run(rx, shutdown.clone()));

        tx.send(event(OrderEventKind::StatusChanged {
            from: OrderStatus::Delivering,
            to: OrderStatus::Delivered,
        }))
        .unwrap();

        let routed = channels.ledger_rx.recv().await.unwrap();
        assert_eq!(routed.order_id, "o-1");
        assert!(channels.notify_rx.recv().await.is_some());
        assert!(channels.assignment_rx.try_recv().is_err());
        shutdown.cancel();
    }

    #[tokio::test]
    async fn test_consultation_order_skips_assignment() {
        let (router, mut channels) = EventRouter::new(16, 16);
        let (tx, rx) = broadcast::channel(16);
        let shutdown = CancellationToken::new();
        tokio::spawn(router.run(rx, shutdown.clone()));

        tx.send(event(OrderEventKind::Created {
            status: OrderStatus::PendingConsultation,
        }))
        .unwrap();

        assert!(channels.notify_rx.recv().await.is_some());
        assert!(channels.assignment_rx.try_recv().is_err());
        shutdown.cancel();
    }

    #[tokio::test]
    async fn test_router_stops_when_source_closes() {
        let (router, _channels) = EventRouter::new(4, 4);
        let (tx, rx) = broadcast::channel::<OrderEvent>(4);
        let handle = tokio::spawn(router.run(rx, CancellationToken::new()));
        drop(tx);
        handle.await.unwrap();
    }
}
