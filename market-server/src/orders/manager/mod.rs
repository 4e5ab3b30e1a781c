//! OrdersManager - order lifecycle
//!
//! Every mutation follows the same flow:
//!
//! ```text
//! operation(order_id, actor, ...)
//!     ├─ 1. Begin write transaction
//!     ├─ 2. Load order, check transition table + ownership
//!     ├─ 3. Side effects that must commit together
//!     │      (stock, ledger job, reversal, assignment record)
//!     ├─ 4. Persist order (indexes follow status)
//!     ├─ 5. Commit
//!     └─ 6. Broadcast OrderEvent (workers react asynchronously)
//! ```

use super::error::{OrderError, OrderResult};
use super::event::{OrderEvent, OrderEventKind};
use super::machine::{Actor, ActorRole, check_transition};
use crate::ledger::LedgerEngine;
use crate::storage::MarketStorage;
use crate::utils::validation::{
    MAX_ADDRESS_LEN, MAX_NAME_LEN, MAX_NOTE_LEN, MAX_SHORT_TEXT_LEN, validate_non_negative,
    validate_optional_text, validate_required_text,
};
use chrono::NaiveTime;
use chrono_tz::Tz;
use redb::WriteTransaction;
use shared::error::AppError;
use shared::models::{
    MAX_UNIT_PRICE, Order, OrderCreate, OrderItem, OrderQuote, OrderStatus, OrderTimestamps,
    PendingDeliveryStatus, SaleWindow,
};
use tokio::sync::broadcast;

/// Event broadcast channel capacity
const EVENT_CHANNEL_CAPACITY: usize = 4096;

/// Client totals may differ from ours by this much rounding noise
const TOTAL_TOLERANCE: u64 = 1;

/// Is `now_local` inside the daily window?
///
/// `start > end` wraps past midnight; `start == end` is open all day.
/// Malformed bounds never block a sale.
pub fn validate_sale_time(window: &SaleWindow, now_local: NaiveTime) -> bool {
    let Some((start, end)) = window.bounds() else {
        tracing::warn!(start = %window.start, end = %window.end, "Malformed sale window ignored");
        return true;
    };
    if start == end {
        true
    } else if start < end {
        start <= now_local && now_local <= end
    } else {
        now_local >= start || now_local <= end
    }
}

struct Transition<'a> {
    to: OrderStatus,
    actor: &'a Actor,
    reason: Option<String>,
    /// Fail with `NotCancelable` unless the order is in this state
    only_from: Option<OrderStatus>,
    now: i64,
}

pub struct OrdersManager {
    storage: MarketStorage,
    ledger: LedgerEngine,
    timezone: Tz,
    event_tx: broadcast::Sender<OrderEvent>,
}

impl std::fmt::Debug for OrdersManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OrdersManager")
            .field("timezone", &self.timezone)
            .field("event_tx", &"<broadcast::Sender>")
            .finish()
    }
}

impl OrdersManager {
    pub fn new(storage: MarketStorage, ledger: LedgerEngine, timezone: Tz) -> Self {
        let (event_tx, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self {
            storage,
            ledger,
            timezone,
            event_tx,
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<OrderEvent> {
        self.event_tx.subscribe()
    }

    pub fn storage(&self) -> &MarketStorage {
        &self.storage
    }

    fn broadcast(&self, events: Vec<OrderEvent>) {
        for event in events {
            if self.event_tx.send(event).is_err() {
                tracing::debug!("Order event not delivered: no active receivers");
            }
        }
    }

    // ========== Creation ==========

    pub fn create_order(&self, customer_id: &str, input: OrderCreate) -> OrderResult<Order> {
        self.create_order_at(customer_id, input, shared::util::now_millis())
    }

    /// Reserve stock for every item and store the order, all or nothing
    pub fn create_order_at(
        &self,
        customer_id: &str,
        input: OrderCreate,
        now: i64,
    ) -> OrderResult<Order> {
        validate_create(&input)?;
        let now_local = shared::util::local_time_of_day(now, self.timezone);

        let txn = self.storage.begin_write()?;
        let mut items = Vec::with_capacity(input.items.len());
        let mut consultation = input.consultation;

        for line in &input.items {
            let mut product = self
                .storage
                .get_product_txn(&txn, &line.product_id)?
                .ok_or_else(|| OrderError::ProductNotFound(line.product_id.clone()))?;

            if let Some(window) = &product.sale_window
                && !validate_sale_time(window, now_local)
            {
                return Err(OrderError::SaleWindowClosed {
                    product_id: product.id,
                    name: product.name,
                });
            }
            if product.stock < line.quantity {
                return Err(OrderError::OutOfStock {
                    product_id: product.id,
                    name: product.name,
                    requested: line.quantity,
                    available: product.stock,
                });
            }

            product.stock -= line.quantity;
            product.updated_at = now;
            self.storage.put_product_txn(&txn, &product)?;

            consultation |= product.requires_consultation;
            items.push(OrderItem {
                product_id: product.id.clone(),
                name: product.name.clone(),
                quantity: line.quantity,
                unit_price: product.price,
                seller_id: product.seller_id.clone(),
                commission_amount: product
                    .commission_for(product.price, line.quantity)
                    .ok_or_else(|| amount_out_of_range(&product.id))?,
            });
        }

        let status = if consultation {
            OrderStatus::PendingConsultation
        } else {
            OrderStatus::PendingConfirmation
        };
        let mut order = Order {
            id: shared::util::new_id(),
            customer_id: customer_id.to_string(),
            customer_name: input.customer_name.trim().to_string(),
            phone: input.phone.trim().to_string(),
            shipping_address: input.shipping_address.trim().to_string(),
            shipping_location: input.shipping_location,
            items,
            shipping_fee: input.shipping_fee,
            surcharge: input.surcharge,
            voucher_discount: input.voucher_discount,
            total: 0,
            payment_method: input.payment_method,
            status,
            is_consultation: consultation,
            shipper_id: None,
            cancel_reason: None,
            note: input.note,
            timestamps: OrderTimestamps {
                created_at: now,
                ..Default::default()
            },
            updated_at: now,
        };

        let computed = order
            .checked_total()
            .ok_or_else(|| OrderError::Validation("Order amounts are out of range".into()))?;
        // Consultation prices are provisional until the seller quotes
        if !consultation
            && let Some(submitted) = input.total
            && submitted.abs_diff(computed) > TOTAL_TOLERANCE
        {
            return Err(OrderError::TotalMismatch {
                submitted,
                computed,
            });
        }
        if computed < 0 {
            return Err(OrderError::Validation(
                "Voucher discount exceeds the order value".into(),
            ));
        }
        order.total = computed;

        self.storage.put_order_txn(&txn, &order)?;
        txn.commit().map_err(crate::storage::StorageError::from)?;

        tracing::info!(
            order_id = %order.id,
            customer_id = %customer_id,
            items = order.items.len(),
            total = order.total,
            status = %order.status,
            "Order created"
        );
        self.broadcast(vec![OrderEvent::new(
            &order,
            OrderEventKind::Created { status },
            now,
        )]);
        Ok(order)
    }

    // ========== Queries ==========

    /// Load an order the viewer may see
    ///
    /// Customers see their own orders, sellers orders with their items,
    /// shippers orders assigned or offered to them, staff everything.
    pub fn get_order(&self, order_id: &str, viewer: &Actor) -> OrderResult<Order> {
        let order = self
            .storage
            .get_order(order_id)?
            .ok_or_else(|| OrderError::NotFound(order_id.to_string()))?;

        let visible = match viewer.role {
            ActorRole::Staff | ActorRole::System => true,
            ActorRole::Customer => order.customer_id == viewer.id,
            ActorRole::Seller => order.involves_seller(&viewer.id),
            ActorRole::Shipper => {
                order.shipper_id.as_deref() == Some(viewer.id.as_str())
                    || self
                        .storage
                        .get_pending_delivery(order_id)?
                        .is_some_and(|pd| pd.was_offered_to(&viewer.id))
            }
        };
        if !visible {
            return Err(OrderError::Forbidden("You cannot view this order".into()));
        }
        Ok(order)
    }

    // ========== Transitions ==========

    /// Generic status change
    ///
    /// A shipper moving an order to `processing` is an acceptance. Quotes
    /// have their own operation since they carry prices.
    pub fn update_status(
        &self,
        order_id: &str,
        to: OrderStatus,
        actor: &Actor,
    ) -> OrderResult<Order> {
        if to == OrderStatus::Processing && actor.role == ActorRole::Shipper {
            return self.accept_order(order_id, actor);
        }
        if to == OrderStatus::PendingCustomerConfirmation {
            return Err(OrderError::Validation(
                "Consultation orders are priced through a quote".into(),
            ));
        }
        self.transition(
            order_id,
            Transition {
                to,
                actor,
                reason: None,
                only_from: None,
                now: shared::util::now_millis(),
            },
        )
    }

    /// Cancel an order that is still waiting for a shipper
    pub fn cancel_order(
        &self,
        order_id: &str,
        actor: &Actor,
        reason: Option<String>,
    ) -> OrderResult<Order> {
        if !matches!(actor.role, ActorRole::Customer | ActorRole::Staff) {
            return Err(OrderError::Forbidden(
                "Only the customer or staff can cancel an order".into(),
            ));
        }
        self.transition(
            order_id,
            Transition {
                to: OrderStatus::Canceled,
                actor,
                reason,
                only_from: Some(OrderStatus::PendingConfirmation),
                now: shared::util::now_millis(),
            },
        )
    }

    /// System cancellation of an order nobody accepted
    ///
    /// Returns `None` when the order moved on in the meantime.
    pub fn cancel_unassigned_at(
        &self,
        order_id: &str,
        reason: &str,
        now: i64,
    ) -> OrderResult<Option<Order>> {
        let system = Actor::system();
        match self.transition(
            order_id,
            Transition {
                to: OrderStatus::Canceled,
                actor: &system,
                reason: Some(reason.to_string()),
                only_from: Some(OrderStatus::PendingConfirmation),
                now,
            },
        ) {
            Ok(order) => Ok(Some(order)),
            Err(OrderError::NotCancelable(_)) | Err(OrderError::AlreadyAssigned) => Ok(None),
            Err(e) => Err(e),
        }
    }

    fn transition(&self, order_id: &str, t: Transition<'_>) -> OrderResult<Order> {
        let txn = self.storage.begin_write()?;
        let mut order = self
            .storage
            .get_order_txn(&txn, order_id)?
            .ok_or_else(|| OrderError::NotFound(order_id.to_string()))?;
        let from = order.status;

        if let Some(required) = t.only_from
            && from != required
        {
            return Err(OrderError::NotCancelable(from));
        }
        check_transition(from, t.to, t.actor.role)?;
        ensure_party(&order, t.actor)?;
        if t.actor.role == ActorRole::System && order.shipper_id.is_some() {
            return Err(OrderError::AlreadyAssigned);
        }

        match (from, t.to) {
            (_, OrderStatus::Delivered) => {
                self.storage.queue_ledger_job_txn(&txn, order_id, t.now)?;
            }
            (OrderStatus::Delivered, OrderStatus::Canceled) => {
                let reason = t.reason.as_deref().unwrap_or("order canceled after delivery");
                self.ledger
                    .reverse_order_completion_txn(&txn, order_id, reason, t.now)?;
            }
            (_, OrderStatus::Canceled) => {
                self.release_stock_txn(&txn, &order, t.now)?;
                self.stop_assignment_txn(&txn, order_id, "order canceled")?;
            }
            _ => {}
        }

        order.status = t.to;
        order.timestamps.stamp(t.to, t.now);
        order.updated_at = t.now;
        if t.to == OrderStatus::Canceled {
            order.cancel_reason = t.reason.clone();
        }
        self.storage.put_order_txn(&txn, &order)?;
        txn.commit().map_err(crate::storage::StorageError::from)?;

        tracing::info!(
            order_id = %order_id,
            from = %from,
            to = %t.to,
            actor_id = %t.actor.id,
            actor_role = ?t.actor.role,
            "Order status changed"
        );

        let kind = if t.to == OrderStatus::Canceled {
            OrderEventKind::Canceled {
                from,
                reason: t.reason,
                by_system: t.actor.role == ActorRole::System,
            }
        } else {
            OrderEventKind::StatusChanged { from, to: t.to }
        };
        self.broadcast(vec![OrderEvent::new(&order, kind, t.now)]);
        Ok(order)
    }

    /// Put reserved units back on the shelf
    fn release_stock_txn(&self, txn: &WriteTransaction, order: &Order, now: i64) -> OrderResult<()> {
        for item in &order.items {
            match self.storage.get_product_txn(txn, &item.product_id)? {
                Some(mut product) => {
                    product.stock = product.stock.saturating_add(item.quantity);
                    product.updated_at = now;
                    self.storage.put_product_txn(txn, &product)?;
                }
                None => {
                    tracing::warn!(order_id = %order.id, product_id = %item.product_id, "Product gone, stock not released");
                }
            }
        }
        Ok(())
    }

    fn stop_assignment_txn(
        &self,
        txn: &WriteTransaction,
        order_id: &str,
        why: &str,
    ) -> OrderResult<()> {
        if let Some(mut record) = self.storage.get_pending_delivery_txn(txn, order_id)?
            && record.is_pending()
        {
            record.status = PendingDeliveryStatus::Failed;
            record.next_attempt_at = None;
            record.last_error = Some(why.to_string());
            self.storage.put_pending_delivery_txn(txn, &record)?;
        }
        Ok(())
    }

    // ========== Shipper acceptance ==========

    /// A shipper takes an order they were offered
    pub fn accept_order(&self, order_id: &str, shipper: &Actor) -> OrderResult<Order> {
        self.accept_order_at(order_id, shipper, shared::util::now_millis())
    }

    pub fn accept_order_at(&self, order_id: &str, shipper: &Actor, now: i64) -> OrderResult<Order> {
        let txn = self.storage.begin_write()?;
        let mut order = self
            .storage
            .get_order_txn(&txn, order_id)?
            .ok_or_else(|| OrderError::NotFound(order_id.to_string()))?;

        if order.shipper_id.is_some() {
            return Err(OrderError::AlreadyAssigned);
        }
        check_transition(order.status, OrderStatus::Processing, shipper.role)?;
        if shipper.role != ActorRole::Shipper {
            return Err(OrderError::Forbidden("Only shippers accept orders".into()));
        }

        let mut record = self
            .storage
            .get_pending_delivery_txn(&txn, order_id)?
            .filter(|pd| pd.was_offered_to(&shipper.id))
            .ok_or(OrderError::NotOffered)?;
        record.status = PendingDeliveryStatus::Assigned;
        record.assigned_shipper = Some(shipper.id.clone());
        record.next_attempt_at = None;
        self.storage.put_pending_delivery_txn(&txn, &record)?;

        let from = order.status;
        order.shipper_id = Some(shipper.id.clone());
        order.status = OrderStatus::Processing;
        order.timestamps.stamp(OrderStatus::Processing, now);
        order.updated_at = now;
        self.storage.put_order_txn(&txn, &order)?;
        txn.commit().map_err(crate::storage::StorageError::from)?;

        tracing::info!(order_id = %order_id, shipper_id = %shipper.id, "Order accepted by shipper");
        self.broadcast(vec![
            OrderEvent::new(
                &order,
                OrderEventKind::ShipperAssigned {
                    shipper_id: shipper.id.clone(),
                },
                now,
            ),
            OrderEvent::new(
                &order,
                OrderEventKind::StatusChanged {
                    from,
                    to: OrderStatus::Processing,
                },
                now,
            ),
        ]);
        Ok(order)
    }

    // ========== Consultation ==========

    /// Seller prices a consultation order and hands it to the customer
    pub fn submit_quote(
        &self,
        order_id: &str,
        actor: &Actor,
        quote: OrderQuote,
    ) -> OrderResult<Order> {
        if quote.lines.is_empty() {
            return Err(OrderError::Validation("Quote has no lines".into()));
        }
        let now = shared::util::now_millis();
        let txn = self.storage.begin_write()?;
        let mut order = self
            .storage
            .get_order_txn(&txn, order_id)?
            .ok_or_else(|| OrderError::NotFound(order_id.to_string()))?;
        let from = order.status;
        let to = OrderStatus::PendingCustomerConfirmation;

        check_transition(from, to, actor.role)?;
        ensure_party(&order, actor)?;

        for line in &quote.lines {
            if line.unit_price <= 0 || line.unit_price > MAX_UNIT_PRICE {
                return Err(OrderError::Validation(format!(
                    "Price for {} must be between 1 and {MAX_UNIT_PRICE}",
                    line.product_id
                )));
            }
            let product = self
                .storage
                .get_product_txn(&txn, &line.product_id)?
                .ok_or_else(|| OrderError::ProductNotFound(line.product_id.clone()))?;

            let mut matched = false;
            for item in order.items.iter_mut().filter(|i| i.product_id == line.product_id) {
                if actor.role == ActorRole::Seller && item.seller_id != actor.id {
                    return Err(OrderError::Forbidden(
                        "Sellers can only price their own items".into(),
                    ));
                }
                item.unit_price = line.unit_price;
                item.commission_amount = product
                    .commission_for(line.unit_price, item.quantity)
                    .ok_or_else(|| amount_out_of_range(&product.id))?;
                matched = true;
            }
            if !matched {
                return Err(OrderError::Validation(format!(
                    "Product {} is not part of this order",
                    line.product_id
                )));
            }
        }

        order.total = order
            .checked_total()
            .ok_or_else(|| OrderError::Validation("Quoted amounts are out of range".into()))?;
        if order.total < 0 {
            return Err(OrderError::Validation(
                "Voucher discount exceeds the quoted value".into(),
            ));
        }
        order.status = to;
        order.timestamps.stamp(to, now);
        order.updated_at = now;
        self.storage.put_order_txn(&txn, &order)?;
        txn.commit().map_err(crate::storage::StorageError::from)?;

        tracing::info!(order_id = %order_id, seller_id = %actor.id, total = order.total, "Quote submitted");
        self.broadcast(vec![OrderEvent::new(
            &order,
            OrderEventKind::StatusChanged { from, to },
            now,
        )]);
        Ok(order)
    }
}

fn amount_out_of_range(product_id: &str) -> OrderError {
    OrderError::Validation(format!("Amounts for {product_id} are out of range"))
}

fn validate_create(input: &OrderCreate) -> OrderResult<()> {
    if input.items.is_empty() {
        return Err(OrderError::EmptyCart);
    }
    if input.total.is_some_and(|total| total < 0) {
        return Err(OrderError::Validation("total must not be negative".into()));
    }
    if let Some(line) = input.items.iter().find(|l| l.quantity == 0) {
        return Err(OrderError::Validation(format!(
            "Quantity for {} must be at least 1",
            line.product_id
        )));
    }
    let checks: [Result<(), AppError>; 7] = [
        validate_required_text(&input.customer_name, "customer_name", MAX_NAME_LEN),
        validate_required_text(&input.phone, "phone", MAX_SHORT_TEXT_LEN),
        validate_required_text(&input.shipping_address, "shipping_address", MAX_ADDRESS_LEN),
        validate_optional_text(&input.note, "note", MAX_NOTE_LEN),
        validate_non_negative(input.shipping_fee.customer_paid, "shipping_fee.customer_paid"),
        validate_non_negative(input.surcharge, "surcharge"),
        validate_non_negative(input.voucher_discount, "voucher_discount"),
    ];
    for check in checks {
        check.map_err(|e| OrderError::Validation(e.message))?;
    }
    if input.shipping_fee.actual < 0 {
        return Err(OrderError::Validation(
            "shipping_fee.actual must not be negative".into(),
        ));
    }
    if !input.shipping_location.is_valid() {
        return Err(OrderError::Validation("shipping_location is not a valid coordinate".into()));
    }
    Ok(())
}

/// Ownership on top of the role check
fn ensure_party(order: &Order, actor: &Actor) -> OrderResult<()> {
    let ok = match actor.role {
        ActorRole::Staff | ActorRole::System => true,
        ActorRole::Customer => order.customer_id == actor.id,
        ActorRole::Seller => order.involves_seller(&actor.id),
        ActorRole::Shipper => order.shipper_id.as_deref() == Some(actor.id.as_str()),
    };
    if ok {
        Ok(())
    } else {
        Err(OrderError::Forbidden("This order does not belong to you".into()))
    }
}

#[cfg(test)]
mod tests;
