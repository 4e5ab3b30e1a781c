//! Product Model
//!
//! Reservation view of the catalog: just what order creation needs to
//! check price, stock and the daily sale window.

use chrono::NaiveTime;
use serde::{Deserialize, Serialize};

/// Highest unit price a product or quote line may carry (base units)
pub const MAX_UNIT_PRICE: i64 = 1_000_000_000_000;

/// Daily sale window in business-local time, `HH:MM` on both ends.
///
/// A window whose start is later than its end wraps past midnight
/// (22:00–06:00 covers 23:30 and 05:00 but not 12:00).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SaleWindow {
    pub start: String,
    pub end: String,
}

impl SaleWindow {
    pub fn new(start: impl Into<String>, end: impl Into<String>) -> Self {
        Self {
            start: start.into(),
            end: end.into(),
        }
    }

    /// Parse both bounds; `None` when either is not `HH:MM`
    pub fn bounds(&self) -> Option<(NaiveTime, NaiveTime)> {
        let start = NaiveTime::parse_from_str(self.start.trim(), "%H:%M").ok()?;
        let end = NaiveTime::parse_from_str(self.end.trim(), "%H:%M").ok()?;
        Some((start, end))
    }
}

/// Product entity
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Product {
    pub id: String,
    pub seller_id: String,
    pub name: String,
    /// Unit price in base currency units
    pub price: i64,
    /// Platform commission in basis points of the line value (1000 = 10%)
    pub commission_bps: u32,
    pub stock: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sale_window: Option<SaleWindow>,
    /// Price is agreed with the seller before the order is confirmed
    #[serde(default)]
    pub requires_consultation: bool,
    pub updated_at: i64,
}

impl Product {
    /// Commission owed to the platform for `quantity` units at `unit_price`
    ///
    /// `None` when the result does not fit in an `i64`.
    pub fn commission_for(&self, unit_price: i64, quantity: u32) -> Option<i64> {
        let value =
            i128::from(unit_price) * i128::from(quantity) * i128::from(self.commission_bps) / 10_000;
        i64::try_from(value).ok()
    }
}

/// Upsert payload pushed by the catalog service (stock, price, window sync)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProductUpsert {
    /// Ignored for sellers, who can only write their own products
    pub seller_id: Option<String>,
    pub name: String,
    pub price: i64,
    #[serde(default)]
    pub commission_bps: u32,
    pub stock: u32,
    pub sale_window: Option<SaleWindow>,
    #[serde(default)]
    pub requires_consultation: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_commission_rounds_down() {
        let product = Product {
            id: "p".into(),
            seller_id: "s".into(),
            name: "Rice".into(),
            price: 33_333,
            commission_bps: 1000,
            stock: 1,
            sale_window: None,
            requires_consultation: false,
            updated_at: 0,
        };
        assert_eq!(product.commission_for(33_333, 1), Some(3_333));
        assert_eq!(product.commission_for(50_000, 2), Some(10_000));
    }

    #[test]
    fn test_commission_out_of_range() {
        let product = Product {
            id: "p".into(),
            seller_id: "s".into(),
            name: "Rice".into(),
            price: i64::MAX / 2,
            commission_bps: 10_000,
            stock: 3,
            sale_window: None,
            requires_consultation: false,
            updated_at: 0,
        };
        assert_eq!(product.commission_for(i64::MAX / 2, 3), None);
        assert_eq!(product.commission_for(i64::MAX / 2, 1), Some(i64::MAX / 2));
    }

    #[test]
    fn test_sale_window_bounds() {
        let window = SaleWindow::new("22:00", "06:00");
        let (start, end) = window.bounds().unwrap();
        assert!(start > end);
        assert!(SaleWindow::new("25:00", "06:00").bounds().is_none());
    }
}
