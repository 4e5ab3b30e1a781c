//! Seller ledger and payout models

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntryType {
    Credit,
    Debit,
}

/// Append-only ledger row; `balance_after` is the running balance
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerEntry {
    pub id: String,
    pub seller_id: String,
    /// Per-seller sequence number, 1-based and gap-free
    pub seq: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub order_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payout_request_id: Option<String>,
    pub entry_type: EntryType,
    pub amount: i64,
    pub description: String,
    pub balance_after: i64,
    pub created_at: i64,
}

impl LedgerEntry {
    /// Signed effect on the balance
    pub fn delta(&self) -> i64 {
        match self.entry_type {
            EntryType::Credit => self.amount,
            EntryType::Debit => -self.amount,
        }
    }
}

/// Ledger row as returned to seller apps
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LedgerEntryView {
    #[serde(rename = "type")]
    pub entry_type: EntryType,
    pub amount: i64,
    pub description: String,
    pub balance_after: i64,
    pub created_at: i64,
}

impl From<&LedgerEntry> for LedgerEntryView {
    fn from(entry: &LedgerEntry) -> Self {
        Self {
            entry_type: entry.entry_type,
            amount: entry.amount,
            description: entry.description.clone(),
            balance_after: entry.balance_after,
            created_at: entry.created_at,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PayoutStatus {
    Pending,
    Processing,
    Completed,
    Rejected,
}

impl PayoutStatus {
    /// Still holding the seller's reserved balance
    pub fn is_open(&self) -> bool {
        matches!(self, Self::Pending | Self::Processing)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PayoutRequest {
    pub id: String,
    pub seller_id: String,
    pub amount: i64,
    pub status: PayoutStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rejection_reason: Option<String>,
    pub created_at: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub processed_at: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub processed_by: Option<String>,
}

/// Admin payload to move a payout request forward
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PayoutSettle {
    pub status: PayoutStatus,
    pub reason: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SellerBalance {
    pub seller_id: String,
    pub balance: i64,
}
