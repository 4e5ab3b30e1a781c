//! Seller ledger
//!
//! Each seller has an append-only chain of entries numbered 1, 2, 3, ...
//! An append reads the head sequence and the balance of the head entry and
//! writes the next entry plus the new head inside one redb write
//! transaction. redb serializes write transactions, so two appends for the
//! same seller can never both build on the same previous balance.
//!
//! Balance only decreases at payout request time. Completing a payout is a
//! status flip; rejecting it posts a credit that gives the money back.

use super::error::{LedgerError, LedgerResult};
use crate::storage::MarketStorage;
use redb::WriteTransaction;
use shared::models::{
    EntryType, LedgerEntry, OrderStatus, PayoutRequest, PayoutStatus, SellerBalance,
};

pub const DEFAULT_LEDGER_LIMIT: usize = 50;
pub const MAX_LEDGER_LIMIT: usize = 200;

/// What a new entry refers to
#[derive(Debug, Clone, Default)]
pub struct EntryRef<'a> {
    pub order_id: Option<&'a str>,
    pub payout_request_id: Option<&'a str>,
}

impl<'a> EntryRef<'a> {
    pub fn order(order_id: &'a str) -> Self {
        Self {
            order_id: Some(order_id),
            payout_request_id: None,
        }
    }

    pub fn payout(request_id: &'a str) -> Self {
        Self {
            order_id: None,
            payout_request_id: Some(request_id),
        }
    }
}

#[derive(Clone)]
pub struct LedgerEngine {
    storage: MarketStorage,
}

impl LedgerEngine {
    pub fn new(storage: MarketStorage) -> Self {
        Self { storage }
    }

    // ========== Appends ==========

    /// Balance after the seller's head entry, inside `txn`
    pub fn balance_txn(&self, txn: &WriteTransaction, seller_id: &str) -> LedgerResult<i64> {
        let head = self.storage.ledger_head_txn(txn, seller_id)?;
        if head == 0 {
            return Ok(0);
        }
        self.storage
            .ledger_entry_txn(txn, seller_id, head)?
            .map(|entry| entry.balance_after)
            .ok_or_else(|| LedgerError::Corrupted {
                seller_id: seller_id.to_string(),
                seq: head,
            })
    }

    /// Append one entry to the seller's chain
    ///
    /// Debits that would take the balance below zero are refused.
    pub fn append_txn(
        &self,
        txn: &WriteTransaction,
        seller_id: &str,
        entry_type: EntryType,
        amount: i64,
        refs: EntryRef<'_>,
        description: impl Into<String>,
        now: i64,
    ) -> LedgerResult<LedgerEntry> {
        if amount <= 0 {
            return Err(LedgerError::InvalidAmount(amount));
        }

        let head = self.storage.ledger_head_txn(txn, seller_id)?;
        let balance = self.balance_txn(txn, seller_id)?;
        let balance_after = match entry_type {
            EntryType::Credit => balance + amount,
            EntryType::Debit => balance - amount,
        };
        if balance_after < 0 {
            return Err(LedgerError::InsufficientBalance {
                seller_id: seller_id.to_string(),
                balance,
                amount,
            });
        }

        let entry = LedgerEntry {
            id: shared::util::new_id(),
            seller_id: seller_id.to_string(),
            seq: head + 1,
            order_id: refs.order_id.map(str::to_string),
            payout_request_id: refs.payout_request_id.map(str::to_string),
            entry_type,
            amount,
            description: description.into(),
            balance_after,
            created_at: now,
        };
        self.storage.append_ledger_entry_txn(txn, &entry)?;

        tracing::debug!(
            seller_id = %seller_id,
            seq = entry.seq,
            entry_type = ?entry_type,
            amount,
            balance_after,
            "Ledger entry appended"
        );
        Ok(entry)
    }

    // ========== Order completion ==========

    /// Credit every seller of a delivered order with their net income
    ///
    /// All sellers are credited in one transaction. Sellers already
    /// credited for the order are skipped, so replays are harmless. The
    /// outbox job for the order is cleared in the same transaction.
    pub fn post_order_completion(&self, order_id: &str) -> LedgerResult<Vec<LedgerEntry>> {
        let now = shared::util::now_millis();
        let txn = self.storage.begin_write()?;
        let entries = self.post_order_completion_txn(&txn, order_id, now)?;
        self.storage.remove_ledger_job_txn(&txn, order_id)?;
        txn.commit().map_err(crate::storage::StorageError::from)?;

        if !entries.is_empty() {
            let total: i64 = entries.iter().map(|e| e.amount).sum();
            tracing::info!(order_id = %order_id, sellers = entries.len(), total, "Order completion credited");
        }
        Ok(entries)
    }

    pub fn post_order_completion_txn(
        &self,
        txn: &WriteTransaction,
        order_id: &str,
        now: i64,
    ) -> LedgerResult<Vec<LedgerEntry>> {
        let order = self
            .storage
            .get_order_txn(txn, order_id)?
            .ok_or_else(|| LedgerError::OrderNotFound(order_id.to_string()))?;

        if order.status != OrderStatus::Delivered {
            tracing::debug!(order_id = %order_id, status = %order.status, "Order not delivered, nothing to credit");
            return Ok(Vec::new());
        }

        let credited: Vec<String> = self
            .storage
            .order_credits_txn(txn, order_id)?
            .into_iter()
            .map(|(seller_id, _)| seller_id)
            .collect();

        let mut entries = Vec::new();
        for (seller_id, net) in order.seller_net_income() {
            if net <= 0 || credited.contains(&seller_id) {
                continue;
            }
            let entry = self.append_txn(
                txn,
                &seller_id,
                EntryType::Credit,
                net,
                EntryRef::order(order_id),
                format!("Income from order {order_id}"),
                now,
            )?;
            self.storage
                .record_order_credit_txn(txn, order_id, &seller_id, entry.seq)?;
            entries.push(entry);
        }
        Ok(entries)
    }

    // ========== Reversal ==========

    /// Debit back every credit the order produced
    pub fn reverse_order_completion(
        &self,
        order_id: &str,
        reason: &str,
    ) -> LedgerResult<Vec<LedgerEntry>> {
        let now = shared::util::now_millis();
        let txn = self.storage.begin_write()?;
        let entries = self.reverse_order_completion_txn(&txn, order_id, reason, now)?;
        txn.commit().map_err(crate::storage::StorageError::from)?;
        Ok(entries)
    }

    /// Reversal inside the caller's transaction
    ///
    /// An order whose credit is still queued just loses its job; an order
    /// that was never credited is a no-op. Each (order, seller) pair is
    /// reversed at most once.
    pub fn reverse_order_completion_txn(
        &self,
        txn: &WriteTransaction,
        order_id: &str,
        reason: &str,
        now: i64,
    ) -> LedgerResult<Vec<LedgerEntry>> {
        if self.storage.ledger_job_txn(txn, order_id)?.is_some() {
            self.storage.remove_ledger_job_txn(txn, order_id)?;
            tracing::info!(order_id = %order_id, "Queued completion credit dropped");
        }

        let mut entries = Vec::new();
        for (seller_id, seq) in self.storage.order_credits_txn(txn, order_id)? {
            if self.storage.is_order_reversed_txn(txn, order_id, &seller_id)? {
                continue;
            }
            let credit = self
                .storage
                .ledger_entry_txn(txn, &seller_id, seq)?
                .ok_or_else(|| LedgerError::Corrupted {
                    seller_id: seller_id.clone(),
                    seq,
                })?;
            let entry = self.append_txn(
                txn,
                &seller_id,
                EntryType::Debit,
                credit.amount,
                EntryRef::order(order_id),
                format!("Reversal of order {order_id}: {reason}"),
                now,
            )?;
            self.storage
                .record_order_reversal_txn(txn, order_id, &seller_id, entry.seq)?;
            entries.push(entry);
        }

        if !entries.is_empty() {
            tracing::info!(order_id = %order_id, sellers = entries.len(), "Order completion reversed");
        }
        Ok(entries)
    }

    // ========== Payouts ==========

    /// Open a payout for the seller's whole balance and reserve it
    pub fn request_payout(&self, seller_id: &str) -> LedgerResult<PayoutRequest> {
        self.request_payout_at(seller_id, shared::util::now_millis())
    }

    pub fn request_payout_at(&self, seller_id: &str, now: i64) -> LedgerResult<PayoutRequest> {
        let txn = self.storage.begin_write()?;

        if let Some(open) = self.storage.open_payout_txn(&txn, seller_id)? {
            return Err(LedgerError::PayoutAlreadyOpen(open));
        }
        let balance = self.balance_txn(&txn, seller_id)?;
        if balance <= 0 {
            return Err(LedgerError::NothingToPayOut(balance));
        }

        let request = PayoutRequest {
            id: shared::util::new_id(),
            seller_id: seller_id.to_string(),
            amount: balance,
            status: PayoutStatus::Pending,
            rejection_reason: None,
            created_at: now,
            processed_at: None,
            completed_at: None,
            processed_by: None,
        };
        self.storage.put_payout_txn(&txn, &request)?;
        self.append_txn(
            &txn,
            seller_id,
            EntryType::Debit,
            balance,
            EntryRef::payout(&request.id),
            format!("Payout request {}", request.id),
            now,
        )?;
        txn.commit().map_err(crate::storage::StorageError::from)?;

        tracing::info!(seller_id = %seller_id, request_id = %request.id, amount = balance, "Payout requested");
        Ok(request)
    }

    /// Admin decision on a payout request
    ///
    /// `pending → processing`, `pending|processing → completed` and
    /// `pending|processing → rejected` are legal. Rejection credits the
    /// reserved amount back.
    pub fn settle_payout(
        &self,
        request_id: &str,
        status: PayoutStatus,
        reason: Option<String>,
        admin_id: &str,
    ) -> LedgerResult<PayoutRequest> {
        let now = shared::util::now_millis();
        let txn = self.storage.begin_write()?;

        let mut request = self
            .storage
            .get_payout_txn(&txn, request_id)?
            .ok_or_else(|| LedgerError::PayoutNotFound(request_id.to_string()))?;

        if !request.status.is_open() {
            return Err(LedgerError::PayoutAlreadySettled(
                request.id,
                request.status,
            ));
        }
        let legal = matches!(
            (request.status, status),
            (PayoutStatus::Pending, PayoutStatus::Processing)
                | (_, PayoutStatus::Completed)
                | (_, PayoutStatus::Rejected)
        );
        if !legal {
            return Err(LedgerError::InvalidPayoutTransition {
                from: request.status,
                to: status,
            });
        }

        if request.processed_at.is_none() {
            request.processed_at = Some(now);
        }
        request.processed_by = Some(admin_id.to_string());
        request.status = status;

        match status {
            PayoutStatus::Completed => request.completed_at = Some(now),
            PayoutStatus::Rejected => {
                let reason = reason.unwrap_or_else(|| "Rejected".to_string());
                self.append_txn(
                    &txn,
                    &request.seller_id,
                    EntryType::Credit,
                    request.amount,
                    EntryRef::payout(&request.id),
                    format!("Payout {} rejected: {reason}", request.id),
                    now,
                )?;
                request.rejection_reason = Some(reason);
            }
            PayoutStatus::Pending | PayoutStatus::Processing => {}
        }

        self.storage.put_payout_txn(&txn, &request)?;
        txn.commit().map_err(crate::storage::StorageError::from)?;

        tracing::info!(request_id = %request.id, status = ?request.status, admin_id = %admin_id, "Payout settled");
        Ok(request)
    }

    // ========== Queries ==========

    pub fn get_balance(&self, seller_id: &str) -> LedgerResult<SellerBalance> {
        let balance = self
            .storage
            .last_ledger_entry(seller_id)?
            .map(|entry| entry.balance_after)
            .unwrap_or(0);
        Ok(SellerBalance {
            seller_id: seller_id.to_string(),
            balance,
        })
    }

    /// Newest first; `limit` defaults to 50 and is clamped to 1..=200
    pub fn get_ledger(&self, seller_id: &str, limit: Option<usize>) -> LedgerResult<Vec<LedgerEntry>> {
        let limit = limit
            .unwrap_or(DEFAULT_LEDGER_LIMIT)
            .clamp(1, MAX_LEDGER_LIMIT);
        Ok(self.storage.recent_ledger_entries(seller_id, limit)?)
    }

    pub fn list_payouts(&self, seller_id: &str) -> LedgerResult<Vec<PayoutRequest>> {
        Ok(self.storage.payouts_for_seller(seller_id)?)
    }

    /// Σ credits − Σ debits over the whole chain
    pub fn recompute_balance(&self, seller_id: &str) -> LedgerResult<i64> {
        Ok(self
            .storage
            .all_ledger_entries(seller_id)?
            .iter()
            .map(LedgerEntry::delta)
            .sum())
    }
}
