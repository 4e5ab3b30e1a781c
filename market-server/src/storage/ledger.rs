use super::{
    LEDGER_CREDITS_TABLE, LEDGER_DEAD_LETTER_TABLE, LEDGER_HEADS_TABLE, LEDGER_JOBS_TABLE,
    LEDGER_REVERSALS_TABLE, LEDGER_TABLE, MarketStorage, StorageResult, get_doc_txn, put_doc_txn,
    remove_doc_txn,
};
use redb::{ReadableTable, TableDefinition, WriteTransaction};
use serde::{Deserialize, Serialize};
use shared::models::LedgerEntry;

/// Outbox record: an order entered `delivered` and its sellers are owed a credit
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LedgerJob {
    pub order_id: String,
    pub created_at: i64,
    pub retry_count: u32,
    pub last_error: Option<String>,
}

/// Credit job that exhausted its retries
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LedgerDeadLetter {
    pub order_id: String,
    pub created_at: i64,
    pub failed_at: i64,
    pub retry_count: u32,
    pub last_error: String,
}

type OrderSellerIndex = TableDefinition<'static, (&'static str, &'static str), u64>;

impl MarketStorage {
    // ========== Entries ==========

    /// Last sequence number written for the seller (0 when none)
    pub fn ledger_head_txn(&self, txn: &WriteTransaction, seller_id: &str) -> StorageResult<u64> {
        let table = txn.open_table(LEDGER_HEADS_TABLE)?;
        Ok(table.get(seller_id)?.map(|guard| guard.value()).unwrap_or(0))
    }

    pub fn ledger_entry_txn(
        &self,
        txn: &WriteTransaction,
        seller_id: &str,
        seq: u64,
    ) -> StorageResult<Option<LedgerEntry>> {
        let table = txn.open_table(LEDGER_TABLE)?;
        match table.get((seller_id, seq))? {
            Some(value) => Ok(Some(serde_json::from_slice(value.value())?)),
            None => Ok(None),
        }
    }

    /// Write an entry and advance the seller's head to its sequence
    pub fn append_ledger_entry_txn(
        &self,
        txn: &WriteTransaction,
        entry: &LedgerEntry,
    ) -> StorageResult<()> {
        {
            let mut table = txn.open_table(LEDGER_TABLE)?;
            let value = serde_json::to_vec(entry)?;
            table.insert((entry.seller_id.as_str(), entry.seq), value.as_slice())?;
        }
        let mut heads = txn.open_table(LEDGER_HEADS_TABLE)?;
        heads.insert(entry.seller_id.as_str(), entry.seq)?;
        Ok(())
    }

    /// Most recent entry for the seller
    pub fn last_ledger_entry(&self, seller_id: &str) -> StorageResult<Option<LedgerEntry>> {
        let read_txn = self.begin_read()?;
        let table = read_txn.open_table(LEDGER_TABLE)?;
        match table.range((seller_id, 0u64)..=(seller_id, u64::MAX))?.next_back() {
            Some(result) => {
                let (_key, value) = result?;
                Ok(Some(serde_json::from_slice(value.value())?))
            }
            None => Ok(None),
        }
    }

    /// Newest first, at most `limit` entries
    pub fn recent_ledger_entries(
        &self,
        seller_id: &str,
        limit: usize,
    ) -> StorageResult<Vec<LedgerEntry>> {
        let read_txn = self.begin_read()?;
        let table = read_txn.open_table(LEDGER_TABLE)?;

        let mut entries = Vec::new();
        for result in table
            .range((seller_id, 0u64)..=(seller_id, u64::MAX))?
            .rev()
            .take(limit)
        {
            let (_key, value) = result?;
            entries.push(serde_json::from_slice(value.value())?);
        }
        Ok(entries)
    }

    /// Oldest first
    pub fn all_ledger_entries(&self, seller_id: &str) -> StorageResult<Vec<LedgerEntry>> {
        let read_txn = self.begin_read()?;
        let table = read_txn.open_table(LEDGER_TABLE)?;

        let mut entries = Vec::new();
        for result in table.range((seller_id, 0u64)..=(seller_id, u64::MAX))? {
            let (_key, value) = result?;
            entries.push(serde_json::from_slice(value.value())?);
        }
        Ok(entries)
    }

    // ========== Per-order credit / reversal indexes ==========

    /// Sellers credited for the order, with the sequence of each credit
    pub fn order_credits_txn(
        &self,
        txn: &WriteTransaction,
        order_id: &str,
    ) -> StorageResult<Vec<(String, u64)>> {
        scan_order_index(txn, LEDGER_CREDITS_TABLE, order_id)
    }

    pub fn record_order_credit_txn(
        &self,
        txn: &WriteTransaction,
        order_id: &str,
        seller_id: &str,
        seq: u64,
    ) -> StorageResult<()> {
        let mut table = txn.open_table(LEDGER_CREDITS_TABLE)?;
        table.insert((order_id, seller_id), seq)?;
        Ok(())
    }

    pub fn is_order_reversed_txn(
        &self,
        txn: &WriteTransaction,
        order_id: &str,
        seller_id: &str,
    ) -> StorageResult<bool> {
        let table = txn.open_table(LEDGER_REVERSALS_TABLE)?;
        Ok(table.get((order_id, seller_id))?.is_some())
    }

    pub fn record_order_reversal_txn(
        &self,
        txn: &WriteTransaction,
        order_id: &str,
        seller_id: &str,
        seq: u64,
    ) -> StorageResult<()> {
        let mut table = txn.open_table(LEDGER_REVERSALS_TABLE)?;
        table.insert((order_id, seller_id), seq)?;
        Ok(())
    }

    // ========== Credit outbox ==========

    /// Queue an order for crediting (within the transition's transaction)
    pub fn queue_ledger_job_txn(
        &self,
        txn: &WriteTransaction,
        order_id: &str,
        now: i64,
    ) -> StorageResult<()> {
        let job = LedgerJob {
            order_id: order_id.to_string(),
            created_at: now,
            retry_count: 0,
            last_error: None,
        };
        put_doc_txn(txn, LEDGER_JOBS_TABLE, order_id, &job)
    }

    pub fn ledger_job_txn(
        &self,
        txn: &WriteTransaction,
        order_id: &str,
    ) -> StorageResult<Option<LedgerJob>> {
        get_doc_txn(txn, LEDGER_JOBS_TABLE, order_id)
    }

    pub fn remove_ledger_job_txn(&self, txn: &WriteTransaction, order_id: &str) -> StorageResult<()> {
        remove_doc_txn(txn, LEDGER_JOBS_TABLE, order_id)
    }

    pub fn pending_ledger_jobs(&self) -> StorageResult<Vec<LedgerJob>> {
        self.all_docs(LEDGER_JOBS_TABLE)
    }

    /// Bump the retry counter and remember the error
    pub fn mark_ledger_job_failed(&self, order_id: &str, error: &str) -> StorageResult<()> {
        let txn = self.begin_write()?;
        if let Some(mut job) = get_doc_txn::<LedgerJob>(&txn, LEDGER_JOBS_TABLE, order_id)? {
            job.retry_count += 1;
            job.last_error = Some(error.to_string());
            put_doc_txn(&txn, LEDGER_JOBS_TABLE, order_id, &job)?;
        }
        txn.commit()?;
        Ok(())
    }

    /// Move a job to the dead letter table
    pub fn move_ledger_job_to_dead_letter(
        &self,
        order_id: &str,
        error: &str,
        now: i64,
    ) -> StorageResult<()> {
        let txn = self.begin_write()?;
        if let Some(job) = get_doc_txn::<LedgerJob>(&txn, LEDGER_JOBS_TABLE, order_id)? {
            let dead = LedgerDeadLetter {
                order_id: job.order_id.clone(),
                created_at: job.created_at,
                failed_at: now,
                retry_count: job.retry_count,
                last_error: error.to_string(),
            };
            put_doc_txn(&txn, LEDGER_DEAD_LETTER_TABLE, order_id, &dead)?;
            remove_doc_txn(&txn, LEDGER_JOBS_TABLE, order_id)?;
        }
        txn.commit()?;
        Ok(())
    }

    pub fn ledger_dead_letters(&self) -> StorageResult<Vec<LedgerDeadLetter>> {
        self.all_docs(LEDGER_DEAD_LETTER_TABLE)
    }
}

fn scan_order_index(
    txn: &WriteTransaction,
    def: OrderSellerIndex,
    order_id: &str,
) -> StorageResult<Vec<(String, u64)>> {
    let table = txn.open_table(def)?;
    let mut sellers = Vec::new();
    for result in table.range((order_id, "")..)? {
        let (key, seq) = result?;
        let (owner, seller_id) = key.value();
        if owner != order_id {
            break;
        }
        sellers.push((seller_id.to_string(), seq.value()));
    }
    Ok(sellers)
}
