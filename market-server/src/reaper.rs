//! Stuck-order reaper
//!
//! Cancels regular orders that have waited in `pending_confirmation`
//! without a shipper for longer than the grace period, then tells the
//! customer. Notification failures never undo a cancellation.

use crate::assignment::AssignmentScheduler;
use crate::notify::{Notification, Notifier, Recipient, send_best_effort};
use crate::orders::OrdersManager;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

pub const REAPER_CANCEL_REASON: &str = "Không tìm được tài xế - hệ thống tự động hủy";

/// What one sweep did
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct SweepReport {
    pub canceled: Vec<String>,
    pub purged_deliveries: usize,
}

pub struct StuckOrderReaper {
    orders: Arc<OrdersManager>,
    scheduler: Arc<AssignmentScheduler>,
    notifier: Arc<dyn Notifier>,
    grace: Duration,
    interval: Duration,
}

impl StuckOrderReaper {
    pub fn new(
        orders: Arc<OrdersManager>,
        scheduler: Arc<AssignmentScheduler>,
        notifier: Arc<dyn Notifier>,
        grace: Duration,
        interval: Duration,
    ) -> Self {
        Self {
            orders,
            scheduler,
            notifier,
            grace,
            interval,
        }
    }

    pub async fn run(self, shutdown: CancellationToken) {
        tracing::info!(
            interval_secs = self.interval.as_secs(),
            grace_secs = self.grace.as_secs(),
            "Stuck-order reaper started"
        );
        let mut tick = tokio::time::interval(self.interval);
        tick.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = shutdown.cancelled() => {
                    tracing::info!("Stuck-order reaper stopping");
                    break;
                }
                _ = tick.tick() => {
                    self.sweep(shared::util::now_millis()).await;
                }
            }
        }
    }

    pub async fn sweep(&self, now: i64) -> SweepReport {
        let mut report = SweepReport::default();
        let cutoff = now - self.grace.as_millis() as i64;

        let candidates = match self.orders.storage().pending_order_ids_created_before(cutoff) {
            Ok(ids) => ids,
            Err(e) => {
                tracing::error!(error = %e, "Reaper failed to list pending orders");
                Vec::new()
            }
        };

        for order_id in candidates {
            let order = match self
                .orders
                .cancel_unassigned_at(&order_id, REAPER_CANCEL_REASON, now)
            {
                Ok(Some(order)) => order,
                // Taken or moved on since the scan
                Ok(None) => continue,
                Err(e) => {
                    tracing::error!(order_id = %order_id, error = %e, "Reaper failed to cancel order");
                    continue;
                }
            };

            tracing::warn!(
                order_id = %order.id,
                customer_id = %order.customer_id,
                waited_ms = now - order.timestamps.created_at,
                "Order auto-canceled: no shipper found"
            );
            send_best_effort(
                self.notifier.as_ref(),
                Notification::new(
                    Recipient::User(order.customer_id.clone()),
                    "Đơn hàng đã bị hủy",
                    REAPER_CANCEL_REASON,
                )
                .with_data("order_id", order.id.as_str()),
            )
            .await;
            report.canceled.push(order.id);
        }

        match self.scheduler.purge_expired(now) {
            Ok(purged) => report.purged_deliveries = purged,
            Err(e) => tracing::error!(error = %e, "Reaper failed to purge expired deliveries"),
        }

        if !report.canceled.is_empty() {
            tracing::info!(count = report.canceled.len(), "Reaper sweep canceled orders");
        }
        report
    }
}
