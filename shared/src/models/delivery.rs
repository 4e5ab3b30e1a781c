//! Delivery assignment models: shipper positions and pending offers

use serde::{Deserialize, Serialize};

/// WGS84 coordinate
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub lat: f64,
    pub lng: f64,
}

impl GeoPoint {
    pub fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }

    pub fn is_valid(&self) -> bool {
        self.lat.is_finite()
            && self.lng.is_finite()
            && (-90.0..=90.0).contains(&self.lat)
            && (-180.0..=180.0).contains(&self.lng)
    }
}

/// Last known shipper position and availability
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Shipper {
    pub id: String,
    pub name: String,
    pub location: GeoPoint,
    pub available: bool,
    pub updated_at: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShipperLocationUpdate {
    pub location: GeoPoint,
    pub available: bool,
    pub name: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PendingDeliveryStatus {
    /// Offers still going out
    Pending,
    /// A shipper accepted, or the order left `pending_confirmation`
    Assigned,
    /// Candidate pool exhausted or attempt budget spent
    Failed,
}

/// Assignment task for one order
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PendingDelivery {
    pub order_id: String,
    /// Shippers already offered the order, oldest first
    pub tried_shippers: Vec<String>,
    pub status: PendingDeliveryStatus,
    pub attempts: u32,
    /// When the current offer times out and the next shipper is tried
    pub next_attempt_at: Option<i64>,
    pub created_at: i64,
    /// Record is purged after this instant if still unresolved
    pub expires_at: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assigned_shipper: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_error: Option<String>,
}

impl PendingDelivery {
    pub fn new(order_id: impl Into<String>, now: i64, ttl_ms: i64) -> Self {
        Self {
            order_id: order_id.into(),
            tried_shippers: Vec::new(),
            status: PendingDeliveryStatus::Pending,
            attempts: 0,
            next_attempt_at: Some(now),
            created_at: now,
            expires_at: now + ttl_ms,
            assigned_shipper: None,
            last_error: None,
        }
    }

    pub fn was_offered_to(&self, shipper_id: &str) -> bool {
        self.tried_shippers.iter().any(|s| s == shipper_id)
    }

    pub fn is_pending(&self) -> bool {
        self.status == PendingDeliveryStatus::Pending
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_geo_point_validity() {
        assert!(GeoPoint::new(10.77, 106.70).is_valid());
        assert!(!GeoPoint::new(91.0, 0.0).is_valid());
        assert!(!GeoPoint::new(f64::NAN, 0.0).is_valid());
    }

    #[test]
    fn test_new_pending_delivery_is_due_now() {
        let record = PendingDelivery::new("o-1", 1_000, 600_000);
        assert!(record.is_pending());
        assert_eq!(record.next_attempt_at, Some(1_000));
        assert_eq!(record.expires_at, 601_000);
        assert!(!record.was_offered_to("s-1"));
    }
}
