use serde::{Deserialize, Serialize};
use shared::models::{Order, OrderStatus};

/// What happened to an order
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum OrderEventKind {
    Created {
        status: OrderStatus,
    },
    StatusChanged {
        from: OrderStatus,
        to: OrderStatus,
    },
    ShipperAssigned {
        shipper_id: String,
    },
    Canceled {
        from: OrderStatus,
        reason: Option<String>,
        /// Canceled by the reaper rather than a person
        by_system: bool,
    },
}

/// Broadcast after a committed order change
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderEvent {
    pub event_id: String,
    pub order_id: String,
    pub customer_id: String,
    pub shipper_id: Option<String>,
    pub kind: OrderEventKind,
    pub timestamp: i64,
}

impl OrderEvent {
    pub fn new(order: &Order, kind: OrderEventKind, timestamp: i64) -> Self {
        Self {
            event_id: shared::util::new_id(),
            order_id: order.id.clone(),
            customer_id: order.customer_id.clone(),
            shipper_id: order.shipper_id.clone(),
            kind,
            timestamp,
        }
    }

    /// Status the order ended up in, when the event moved it
    pub fn new_status(&self) -> Option<OrderStatus> {
        match &self.kind {
            OrderEventKind::Created { status } => Some(*status),
            OrderEventKind::StatusChanged { to, .. } => Some(*to),
            OrderEventKind::Canceled { .. } => Some(OrderStatus::Canceled),
            OrderEventKind::ShipperAssigned { .. } => None,
        }
    }

    /// The order now waits for a shipper
    pub fn needs_shipper(&self) -> bool {
        self.new_status() == Some(OrderStatus::PendingConfirmation)
    }

    pub fn is_delivered(&self) -> bool {
        matches!(
            self.kind,
            OrderEventKind::StatusChanged {
                to: OrderStatus::Delivered,
                ..
            }
        )
    }
}
