//! Shipper cash-on-delivery remittance models

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RemittanceRequestStatus {
    Pending,
    Approved,
    Rejected,
}

/// Shipper's claim to have handed over collected cash
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemittanceRequest {
    pub id: String,
    pub shipper_id: String,
    pub amount: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
    pub status: RemittanceRequestStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub admin_notes: Option<String>,
    /// Part of `amount` that found debt days on approval
    #[serde(default)]
    pub allocated_amount: i64,
    pub created_at: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub processed_at: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub processed_by: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemittanceTransaction {
    pub request_id: String,
    pub amount: i64,
    pub created_at: i64,
}

/// Amount remitted for one shipper and one business day
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Remittance {
    pub shipper_id: String,
    /// `YYYY-MM-DD` in the business timezone
    pub date: String,
    pub amount: i64,
    pub transactions: Vec<RemittanceTransaction>,
    pub created_at: i64,
    pub updated_at: i64,
}

impl Remittance {
    /// Storage key, unique per shipper and day
    pub fn key(shipper_id: &str, date: &str) -> String {
        format!("{shipper_id}:{date}")
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DebtDay {
    pub date: String,
    pub cod: i64,
    pub remitted: i64,
    pub outstanding: i64,
}

/// Cash a shipper still owes the platform
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShipperDebt {
    pub shipper_id: String,
    pub total_cod: i64,
    pub total_remitted: i64,
    /// `total_cod - total_remitted`, never below zero
    pub outstanding: i64,
    /// Oldest first
    pub days: Vec<DebtDay>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RemittanceRequestCreate {
    pub amount: i64,
    pub note: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RemittanceAction {
    Approve,
    Reject,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RemittanceProcess {
    pub action: RemittanceAction,
    pub admin_notes: Option<String>,
}
