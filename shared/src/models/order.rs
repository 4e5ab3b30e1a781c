//! Order Model

use super::delivery::GeoPoint;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Order lifecycle status
///
/// Wire values are snake_case. The Vietnamese labels shown in the apps are
/// accepted as aliases so older clients keep working.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    #[serde(alias = "Chờ tư vấn")]
    PendingConsultation,
    #[serde(alias = "Đang tư vấn")]
    InConsultation,
    #[serde(alias = "Chờ khách xác nhận")]
    PendingCustomerConfirmation,
    #[serde(alias = "Chờ xác nhận")]
    PendingConfirmation,
    #[serde(alias = "Đang xử lý")]
    Processing,
    #[serde(alias = "Đang giao")]
    Delivering,
    #[serde(alias = "Đã giao")]
    Delivered,
    #[serde(alias = "Đã hủy")]
    Canceled,
}

impl OrderStatus {
    pub const ALL: [OrderStatus; 8] = [
        Self::PendingConsultation,
        Self::InConsultation,
        Self::PendingCustomerConfirmation,
        Self::PendingConfirmation,
        Self::Processing,
        Self::Delivering,
        Self::Delivered,
        Self::Canceled,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::PendingConsultation => "pending_consultation",
            Self::InConsultation => "in_consultation",
            Self::PendingCustomerConfirmation => "pending_customer_confirmation",
            Self::PendingConfirmation => "pending_confirmation",
            Self::Processing => "processing",
            Self::Delivering => "delivering",
            Self::Delivered => "delivered",
            Self::Canceled => "canceled",
        }
    }

    /// Display label used by the mobile apps
    pub fn label(&self) -> &'static str {
        match self {
            Self::PendingConsultation => "Chờ tư vấn",
            Self::InConsultation => "Đang tư vấn",
            Self::PendingCustomerConfirmation => "Chờ khách xác nhận",
            Self::PendingConfirmation => "Chờ xác nhận",
            Self::Processing => "Đang xử lý",
            Self::Delivering => "Đang giao",
            Self::Delivered => "Đã giao",
            Self::Canceled => "Đã hủy",
        }
    }

    pub fn is_consultation(&self) -> bool {
        matches!(
            self,
            Self::PendingConsultation | Self::InConsultation | Self::PendingCustomerConfirmation
        )
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    /// Cash on delivery, collected by the shipper
    #[default]
    #[serde(alias = "COD")]
    Cod,
    BankTransfer,
}

/// Shipping fee split: what delivery actually costs vs. what the customer pays
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct ShippingFee {
    pub actual: i64,
    pub customer_paid: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderItem {
    pub product_id: String,
    pub name: String,
    pub quantity: u32,
    pub unit_price: i64,
    pub seller_id: String,
    /// Platform commission for the whole line, fixed at order time
    pub commission_amount: i64,
}

impl OrderItem {
    /// `None` when price times quantity does not fit in an `i64`
    pub fn checked_line_total(&self) -> Option<i64> {
        self.unit_price.checked_mul(i64::from(self.quantity))
    }

    /// Saturating; stored orders passed [`Order::checked_total`] on the way in
    pub fn line_total(&self) -> i64 {
        self.unit_price.saturating_mul(i64::from(self.quantity))
    }

    /// What the seller earns from this line once delivered
    pub fn seller_net(&self) -> i64 {
        self.line_total().saturating_sub(self.commission_amount)
    }
}

/// One timestamp per lifecycle step (Unix millis)
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderTimestamps {
    pub created_at: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub consultation_at: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quoted_at: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confirmed_at: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub accepted_at: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub delivering_at: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub delivered_at: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub canceled_at: Option<i64>,
}

impl OrderTimestamps {
    /// Record entry into `status`
    pub fn stamp(&mut self, status: OrderStatus, at: i64) {
        let slot = match status {
            OrderStatus::PendingConsultation => return,
            OrderStatus::InConsultation => &mut self.consultation_at,
            OrderStatus::PendingCustomerConfirmation => &mut self.quoted_at,
            OrderStatus::PendingConfirmation => &mut self.confirmed_at,
            OrderStatus::Processing => &mut self.accepted_at,
            OrderStatus::Delivering => &mut self.delivering_at,
            OrderStatus::Delivered => &mut self.delivered_at,
            OrderStatus::Canceled => &mut self.canceled_at,
        };
        *slot = Some(at);
    }
}

/// Order entity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Order {
    pub id: String,
    pub customer_id: String,
    pub customer_name: String,
    pub phone: String,
    pub shipping_address: String,
    pub shipping_location: GeoPoint,
    pub items: Vec<OrderItem>,
    pub shipping_fee: ShippingFee,
    #[serde(default)]
    pub surcharge: i64,
    #[serde(default)]
    pub voucher_discount: i64,
    pub total: i64,
    pub payment_method: PaymentMethod,
    pub status: OrderStatus,
    #[serde(default)]
    pub is_consultation: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shipper_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cancel_reason: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
    pub timestamps: OrderTimestamps,
    pub updated_at: i64,
}

impl Order {
    pub fn items_subtotal(&self) -> i64 {
        self.items
            .iter()
            .fold(0i64, |acc, item| acc.saturating_add(item.line_total()))
    }

    /// items + customer-paid shipping + surcharge − voucher discount
    ///
    /// `None` when any step leaves the `i64` range.
    pub fn checked_total(&self) -> Option<i64> {
        let mut total = 0i64;
        for item in &self.items {
            total = total.checked_add(item.checked_line_total()?)?;
        }
        total
            .checked_add(self.shipping_fee.customer_paid)?
            .checked_add(self.surcharge)?
            .checked_sub(self.voucher_discount)
    }

    pub fn is_cod(&self) -> bool {
        self.payment_method == PaymentMethod::Cod
    }

    pub fn involves_seller(&self, seller_id: &str) -> bool {
        self.items.iter().any(|i| i.seller_id == seller_id)
    }

    /// Net income per seller (line totals minus commission), sorted by seller id
    pub fn seller_net_income(&self) -> BTreeMap<String, i64> {
        let mut net = BTreeMap::new();
        for item in &self.items {
            let entry = net.entry(item.seller_id.clone()).or_insert(0i64);
            *entry = entry.saturating_add(item.seller_net());
        }
        net
    }
}

// ============================================================================
// Request payloads
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderItemInput {
    pub product_id: String,
    pub quantity: u32,
}

/// Create order payload
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderCreate {
    pub items: Vec<OrderItemInput>,
    pub customer_name: String,
    pub phone: String,
    pub shipping_address: String,
    pub shipping_location: GeoPoint,
    #[serde(default)]
    pub payment_method: PaymentMethod,
    #[serde(default)]
    pub shipping_fee: ShippingFee,
    #[serde(default)]
    pub surcharge: i64,
    #[serde(default)]
    pub voucher_discount: i64,
    /// Total the client displayed; checked against the computed total
    pub total: Option<i64>,
    /// Ask the seller for a quote before confirming
    #[serde(default)]
    pub consultation: bool,
    pub note: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderStatusUpdate {
    pub status: OrderStatus,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OrderCancel {
    pub reason: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuoteLine {
    pub product_id: String,
    pub unit_price: i64,
}

/// Seller quote for a consultation order
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderQuote {
    pub lines: Vec<QuoteLine>,
}
