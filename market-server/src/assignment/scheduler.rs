//! Nearest-shipper assignment
//!
//! Each order waiting for a shipper has a persisted [`PendingDelivery`]
//! task. An attempt offers the order to the nearest available shipper not
//! yet tried and schedules the next attempt `retry_delay` later. The task
//! ends when the order is taken, when no untried shipper is left within
//! the radius, or after `max_attempts` offers. Attempts are driven by
//! [`AssignmentScheduler::process_due`], never by timers of their own.

use super::error::{AssignmentError, AssignmentResult};
use super::geo::haversine_km;
use crate::core::FulfillmentConfig;
use crate::notify::{Notification, Notifier, Recipient, send_best_effort};
use crate::storage::MarketStorage;
use shared::models::{
    OrderStatus, PendingDelivery, PendingDeliveryStatus, Shipper, ShipperLocationUpdate,
};
use std::sync::Arc;

/// Result of one attempt
#[derive(Debug, Clone, PartialEq)]
pub enum AttemptOutcome {
    /// Offered to this shipper; next attempt scheduled
    Offered { shipper_id: String, distance_km: f64 },
    /// Order was taken or left `pending_confirmation`; task closed
    Resolved,
    /// No untried shipper within range; task failed
    Exhausted,
    /// Offer budget used up; task failed
    DeadLettered,
    /// No open task for the order
    Inactive,
}

#[derive(Clone)]
pub struct AssignmentScheduler {
    storage: MarketStorage,
    notifier: Arc<dyn Notifier>,
    radius_km: f64,
    retry_delay_ms: i64,
    max_attempts: u32,
    ttl_ms: i64,
}

impl AssignmentScheduler {
    pub fn new(
        storage: MarketStorage,
        notifier: Arc<dyn Notifier>,
        config: &FulfillmentConfig,
    ) -> Self {
        Self {
            storage,
            notifier,
            radius_km: config.assignment_radius_km,
            retry_delay_ms: config.assignment_retry.as_millis() as i64,
            max_attempts: config.assignment_max_attempts,
            ttl_ms: config.pending_delivery_ttl.as_millis() as i64,
        }
    }

    /// Open the task for an order (once) and make the first offer
    pub async fn start(&self, order_id: &str, now: i64) -> AssignmentResult<AttemptOutcome> {
        let txn = self.storage.begin_write()?;
        let existing = self.storage.get_pending_delivery_txn(&txn, order_id)?;
        match existing {
            Some(record) if !record.is_pending() => {
                tracing::debug!(order_id = %order_id, status = ?record.status, "Assignment task already closed");
                return Ok(AttemptOutcome::Inactive);
            }
            Some(_) => {}
            None => {
                let record = PendingDelivery::new(order_id, now, self.ttl_ms);
                self.storage.put_pending_delivery_txn(&txn, &record)?;
            }
        }
        txn.commit().map_err(crate::storage::StorageError::from)?;

        self.attempt(order_id, now).await
    }

    /// One selection round for an order
    pub async fn attempt(&self, order_id: &str, now: i64) -> AssignmentResult<AttemptOutcome> {
        let txn = self.storage.begin_write()?;
        let Some(mut record) = self.storage.get_pending_delivery_txn(&txn, order_id)? else {
            return Ok(AttemptOutcome::Inactive);
        };
        if !record.is_pending() {
            return Ok(AttemptOutcome::Inactive);
        }

        let order = self.storage.get_order_txn(&txn, order_id)?;
        let waiting = order.as_ref().filter(|o| {
            o.status == OrderStatus::PendingConfirmation && o.shipper_id.is_none()
        });
        let Some(order) = waiting else {
            let (status, why) = match &order {
                None => (PendingDeliveryStatus::Failed, "order missing"),
                Some(o) if o.status == OrderStatus::Canceled => {
                    (PendingDeliveryStatus::Failed, "order canceled")
                }
                Some(_) => (PendingDeliveryStatus::Assigned, "order no longer waiting"),
            };
            record.status = status;
            record.assigned_shipper = order.as_ref().and_then(|o| o.shipper_id.clone());
            record.next_attempt_at = None;
            if status == PendingDeliveryStatus::Failed {
                record.last_error = Some(why.to_string());
            }
            self.storage.put_pending_delivery_txn(&txn, &record)?;
            txn.commit().map_err(crate::storage::StorageError::from)?;
            tracing::debug!(order_id = %order_id, reason = why, "Assignment task closed");
            return Ok(AttemptOutcome::Resolved);
        };

        if record.attempts >= self.max_attempts {
            record.status = PendingDeliveryStatus::Failed;
            record.next_attempt_at = None;
            record.last_error = Some(format!("no acceptance after {} offers", record.attempts));
            self.storage.put_pending_delivery_txn(&txn, &record)?;
            txn.commit().map_err(crate::storage::StorageError::from)?;
            tracing::warn!(order_id = %order_id, attempts = record.attempts, "Assignment dead-lettered");
            return Ok(AttemptOutcome::DeadLettered);
        }

        let destination = order.shipping_location;
        let nearest = self
            .storage
            .available_shippers()?
            .into_iter()
            .filter(|s| !record.was_offered_to(&s.id))
            .map(|s| {
                let distance = haversine_km(s.location, destination);
                (s, distance)
            })
            .filter(|(_, distance)| *distance <= self.radius_km)
            .min_by(|a, b| a.1.total_cmp(&b.1));

        let Some((shipper, distance_km)) = nearest else {
            record.status = PendingDeliveryStatus::Failed;
            record.next_attempt_at = None;
            record.last_error = Some(format!("no available shipper within {} km", self.radius_km));
            self.storage.put_pending_delivery_txn(&txn, &record)?;
            txn.commit().map_err(crate::storage::StorageError::from)?;
            tracing::warn!(order_id = %order_id, tried = record.tried_shippers.len(), "No shipper left to offer");
            return Ok(AttemptOutcome::Exhausted);
        };

        record.tried_shippers.push(shipper.id.clone());
        record.attempts += 1;
        record.next_attempt_at = Some(now + self.retry_delay_ms);
        self.storage.put_pending_delivery_txn(&txn, &record)?;
        txn.commit().map_err(crate::storage::StorageError::from)?;

        tracing::info!(
            order_id = %order_id,
            shipper_id = %shipper.id,
            distance_km = format!("{distance_km:.2}"),
            attempt = record.attempts,
            "Order offered to shipper"
        );

        send_best_effort(
            self.notifier.as_ref(),
            Notification::new(
                Recipient::User(shipper.id.clone()),
                "Đơn hàng mới gần bạn",
                format!("Order {order_id} is {distance_km:.1} km away"),
            )
            .with_data("order_id", order_id),
        )
        .await;
        send_best_effort(
            self.notifier.as_ref(),
            Notification::new(
                Recipient::Admins,
                "Đang tìm tài xế",
                format!("Order {order_id} offered to {} (attempt {})", shipper.name, record.attempts),
            )
            .with_data("order_id", order_id),
        )
        .await;

        Ok(AttemptOutcome::Offered {
            shipper_id: shipper.id,
            distance_km,
        })
    }

    /// Run every attempt whose offer has timed out
    pub async fn process_due(&self, now: i64) -> Vec<(String, AttemptOutcome)> {
        let due = match self.storage.due_pending_deliveries(now) {
            Ok(due) => due,
            Err(e) => {
                tracing::error!(error = %e, "Failed to load due assignment tasks");
                return Vec::new();
            }
        };

        let mut outcomes = Vec::with_capacity(due.len());
        for record in due {
            match self.attempt(&record.order_id, now).await {
                Ok(outcome) => outcomes.push((record.order_id, outcome)),
                Err(e) => {
                    tracing::error!(order_id = %record.order_id, error = %e, "Assignment attempt failed");
                }
            }
        }
        outcomes
    }

    /// Drop tasks past their TTL
    pub fn purge_expired(&self, now: i64) -> AssignmentResult<usize> {
        let purged = self.storage.purge_expired_deliveries(now)?;
        if purged > 0 {
            tracing::info!(count = purged, "Expired assignment tasks purged");
        }
        Ok(purged)
    }

    /// Position and availability reported by the shipper app
    pub fn update_shipper_location(
        &self,
        shipper_id: &str,
        update: ShipperLocationUpdate,
        now: i64,
    ) -> AssignmentResult<Shipper> {
        if !update.location.is_valid() {
            return Err(AssignmentError::InvalidLocation(format!(
                "{}, {}",
                update.location.lat, update.location.lng
            )));
        }
        let name = match update.name {
            Some(name) if !name.trim().is_empty() => name.trim().to_string(),
            Some(_) => return Err(AssignmentError::MissingName),
            None => self
                .storage
                .get_shipper(shipper_id)?
                .map(|s| s.name)
                .unwrap_or_else(|| shipper_id.to_string()),
        };

        let shipper = Shipper {
            id: shipper_id.to_string(),
            name,
            location: update.location,
            available: update.available,
            updated_at: now,
        };
        self.storage.upsert_shipper(&shipper)?;
        tracing::debug!(shipper_id = %shipper_id, available = shipper.available, "Shipper location updated");
        Ok(shipper)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notify::MemoryNotifier;
    use shared::models::{
        GeoPoint, Order, OrderItem, OrderTimestamps, PaymentMethod, ShippingFee,
    };

    const T0: i64 = 1_714_626_000_000;
    const RETRY: i64 = 30_000;

    fn config(max_attempts: u32) -> FulfillmentConfig {
        FulfillmentConfig {
            assignment_max_attempts: max_attempts,
            ..FulfillmentConfig::default()
        }
    }

    fn waiting_order(id: &str) -> Order {
        Order {
            id: id.into(),
            customer_id: "c-1".into(),
            customer_name: "An".into(),
            phone: "0900000000".into(),
            shipping_address: "1 Lê Lợi".into(),
            shipping_location: GeoPoint::new(10.7757, 106.7004),
            items: vec![OrderItem {
                product_id: "p-1".into(),
                name: "Phở".into(),
                quantity: 1,
                unit_price: 50_000,
                seller_id: "s-1".into(),
                commission_amount: 5_000,
            }],
            shipping_fee: ShippingFee::default(),
            surcharge: 0,
            voucher_discount: 0,
            total: 50_000,
            payment_method: PaymentMethod::Cod,
            status: OrderStatus::PendingConfirmation,
            is_consultation: false,
            shipper_id: None,
            cancel_reason: None,
            note: None,
            timestamps: OrderTimestamps {
                created_at: T0,
                ..Default::default()
            },
            updated_at: T0,
        }
    }

    /// Shipper `km` kilometres north of the delivery point
    fn shipper_at(id: &str, km: f64) -> Shipper {
        Shipper {
            id: id.into(),
            name: format!("Tài xế {id}"),
            location: GeoPoint::new(10.7757 + km / 111.19, 106.7004),
            available: true,
            updated_at: T0,
        }
    }

    fn setup(
        max_attempts: u32,
        shippers: &[Shipper],
    ) -> (MarketStorage, Arc<MemoryNotifier>, AssignmentScheduler) {
        let storage = MarketStorage::open_in_memory().unwrap();
        let txn = storage.begin_write().unwrap();
        storage.put_order_txn(&txn, &waiting_order("o-1")).unwrap();
        for shipper in shippers {
            storage.put_shipper_txn(&txn, shipper).unwrap();
        }
        txn.commit().unwrap();

        let notifier = Arc::new(MemoryNotifier::new());
        let scheduler = AssignmentScheduler::new(storage.clone(), notifier.clone(), &config(max_attempts));
        (storage, notifier, scheduler)
    }

    fn offered_to(outcome: &AttemptOutcome) -> Option<&str> {
        match outcome {
            AttemptOutcome::Offered { shipper_id, .. } => Some(shipper_id),
            _ => None,
        }
    }

    async fn shipper_offers(notifier: &MemoryNotifier) -> Vec<String> {
        notifier
            .sent()
            .await
            .into_iter()
            .filter_map(|n| match n.recipient {
                Recipient::User(id) => Some(id),
                Recipient::Admins => None,
            })
            .collect()
    }

    #[tokio::test]
    async fn test_offers_nearest_then_next_until_exhausted() {
        let (storage, notifier, scheduler) = setup(
            10,
            &[
                shipper_at("far", 4.0),
                shipper_at("near", 0.5),
                shipper_at("mid", 2.0),
                shipper_at("outside", 8.0),
            ],
        );

        let first = scheduler.start("o-1", T0).await.unwrap();
        assert_eq!(offered_to(&first), Some("near"));

        // Not due yet
        assert!(scheduler.process_due(T0 + RETRY - 1).await.is_empty());

        let second = scheduler.process_due(T0 + RETRY).await;
        assert_eq!(offered_to(&second[0].1), Some("mid"));
        let third = scheduler.process_due(T0 + 2 * RETRY).await;
        assert_eq!(offered_to(&third[0].1), Some("far"));

        let fourth = scheduler.process_due(T0 + 3 * RETRY).await;
        assert_eq!(fourth[0].1, AttemptOutcome::Exhausted);

        let record = storage.get_pending_delivery("o-1").unwrap().unwrap();
        assert_eq!(record.status, PendingDeliveryStatus::Failed);
        assert_eq!(record.tried_shippers, vec!["near", "mid", "far"]);

        // Nothing else is offered once the pool is exhausted
        assert!(scheduler.process_due(T0 + 10 * RETRY).await.is_empty());
        assert_eq!(shipper_offers(&notifier).await, vec!["near", "mid", "far"]);
    }

    #[tokio::test]
    async fn test_no_shipper_in_range_fails_immediately() {
        let (storage, notifier, scheduler) = setup(10, &[shipper_at("outside", 6.0)]);
        assert_eq!(
            scheduler.start("o-1", T0).await.unwrap(),
            AttemptOutcome::Exhausted
        );
        assert!(notifier.sent().await.is_empty());
        let record = storage.get_pending_delivery("o-1").unwrap().unwrap();
        assert!(record.last_error.is_some());
    }

    #[tokio::test]
    async fn test_unavailable_shippers_are_skipped() {
        let mut busy = shipper_at("busy", 0.1);
        busy.available = false;
        let (_storage, _notifier, scheduler) = setup(10, &[busy, shipper_at("free", 1.0)]);
        let outcome = scheduler.start("o-1", T0).await.unwrap();
        assert_eq!(offered_to(&outcome), Some("free"));
    }

    #[tokio::test]
    async fn test_attempt_cap_dead_letters() {
        let shippers: Vec<Shipper> = (0..5).map(|i| shipper_at(&format!("sh-{i}"), 0.5 + i as f64 * 0.1)).collect();
        let (storage, notifier, scheduler) = setup(2, &shippers);

        scheduler.start("o-1", T0).await.unwrap();
        scheduler.process_due(T0 + RETRY).await;
        let last = scheduler.process_due(T0 + 2 * RETRY).await;
        assert_eq!(last[0].1, AttemptOutcome::DeadLettered);

        let record = storage.get_pending_delivery("o-1").unwrap().unwrap();
        assert_eq!(record.status, PendingDeliveryStatus::Failed);
        assert_eq!(record.attempts, 2);
        assert_eq!(shipper_offers(&notifier).await.len(), 2);
    }

    #[tokio::test]
    async fn test_taken_order_closes_task() {
        let (storage, _notifier, scheduler) =
            setup(10, &[shipper_at("a", 0.5), shipper_at("b", 1.0)]);
        scheduler.start("o-1", T0).await.unwrap();

        // Seller pushes the order forward without a shipper
        let mut order = storage.get_order("o-1").unwrap().unwrap();
        order.status = OrderStatus::Processing;
        let txn = storage.begin_write().unwrap();
        storage.put_order_txn(&txn, &order).unwrap();
        txn.commit().unwrap();

        let outcomes = scheduler.process_due(T0 + RETRY).await;
        assert_eq!(outcomes[0].1, AttemptOutcome::Resolved);
        let record = storage.get_pending_delivery("o-1").unwrap().unwrap();
        assert_eq!(record.status, PendingDeliveryStatus::Assigned);
        assert_eq!(record.tried_shippers, vec!["a"]);
    }

    #[tokio::test]
    async fn test_start_is_idempotent_for_closed_tasks() {
        let (_storage, _notifier, scheduler) = setup(10, &[]);
        assert_eq!(
            scheduler.start("o-1", T0).await.unwrap(),
            AttemptOutcome::Exhausted
        );
        assert_eq!(
            scheduler.start("o-1", T0 + 1).await.unwrap(),
            AttemptOutcome::Inactive
        );
    }

    #[tokio::test]
    async fn test_failing_notifier_does_not_stop_offers() {
        let (storage, notifier, scheduler) = setup(10, &[shipper_at("a", 0.5)]);
        notifier.set_fail_on_send(true).await;
        let outcome = scheduler.start("o-1", T0).await.unwrap();
        assert_eq!(offered_to(&outcome), Some("a"));
        assert_eq!(notifier.attempts().await.len(), 2);
        let record = storage.get_pending_delivery("o-1").unwrap().unwrap();
        assert_eq!(record.attempts, 1);
    }

    #[test]
    fn test_update_shipper_location() {
        let (storage, _notifier, scheduler) = setup(10, &[]);
        let update = ShipperLocationUpdate {
            location: GeoPoint::new(10.8, 106.7),
            available: true,
            name: Some("Minh".into()),
        };
        let shipper = scheduler.update_shipper_location("sh-9", update, T0).unwrap();
        assert_eq!(shipper.name, "Minh");

        let moved = scheduler
            .update_shipper_location(
                "sh-9",
                ShipperLocationUpdate {
                    location: GeoPoint::new(10.81, 106.71),
                    available: false,
                    name: None,
                },
                T0 + 1,
            )
            .unwrap();
        assert_eq!(moved.name, "Minh");
        assert!(storage.available_shippers().unwrap().is_empty());

        assert!(matches!(
            scheduler.update_shipper_location(
                "sh-9",
                ShipperLocationUpdate {
                    location: GeoPoint::new(120.0, 0.0),
                    available: true,
                    name: None,
                },
                T0
            ),
            Err(AssignmentError::InvalidLocation(_))
        ));
    }
}
