use super::{
    MarketStorage, PENDING_DELIVERIES_TABLE, SHIPPERS_TABLE, StorageResult, all_docs_txn,
    get_doc_txn, put_doc_txn, remove_doc_txn,
};
use redb::WriteTransaction;
use shared::models::{PendingDelivery, Shipper};

impl MarketStorage {
    // ========== Pending deliveries ==========

    pub fn get_pending_delivery(&self, order_id: &str) -> StorageResult<Option<PendingDelivery>> {
        self.get_doc(PENDING_DELIVERIES_TABLE, order_id)
    }

    pub fn get_pending_delivery_txn(
        &self,
        txn: &WriteTransaction,
        order_id: &str,
    ) -> StorageResult<Option<PendingDelivery>> {
        get_doc_txn(txn, PENDING_DELIVERIES_TABLE, order_id)
    }

    pub fn put_pending_delivery_txn(
        &self,
        txn: &WriteTransaction,
        record: &PendingDelivery,
    ) -> StorageResult<()> {
        put_doc_txn(txn, PENDING_DELIVERIES_TABLE, &record.order_id, record)
    }

    pub fn all_pending_deliveries(&self) -> StorageResult<Vec<PendingDelivery>> {
        self.all_docs(PENDING_DELIVERIES_TABLE)
    }

    /// Records still offering whose current offer has timed out
    pub fn due_pending_deliveries(&self, now: i64) -> StorageResult<Vec<PendingDelivery>> {
        Ok(self
            .all_pending_deliveries()?
            .into_iter()
            .filter(|r| r.is_pending() && r.next_attempt_at.is_some_and(|at| at <= now))
            .collect())
    }

    /// Drop every record past its TTL, returning how many were removed
    pub fn purge_expired_deliveries(&self, now: i64) -> StorageResult<usize> {
        let txn = self.begin_write()?;
        let expired: Vec<String> = all_docs_txn::<PendingDelivery>(&txn, PENDING_DELIVERIES_TABLE)?
            .into_iter()
            .filter(|r| r.expires_at <= now)
            .map(|r| r.order_id)
            .collect();
        for order_id in &expired {
            remove_doc_txn(&txn, PENDING_DELIVERIES_TABLE, order_id)?;
        }
        txn.commit()?;
        Ok(expired.len())
    }

    // ========== Shippers ==========

    pub fn get_shipper(&self, shipper_id: &str) -> StorageResult<Option<Shipper>> {
        self.get_doc(SHIPPERS_TABLE, shipper_id)
    }

    pub fn put_shipper_txn(&self, txn: &WriteTransaction, shipper: &Shipper) -> StorageResult<()> {
        put_doc_txn(txn, SHIPPERS_TABLE, &shipper.id, shipper)
    }

    pub fn upsert_shipper(&self, shipper: &Shipper) -> StorageResult<()> {
        let txn = self.begin_write()?;
        self.put_shipper_txn(&txn, shipper)?;
        txn.commit()?;
        Ok(())
    }

    pub fn available_shippers(&self) -> StorageResult<Vec<Shipper>> {
        Ok(self
            .all_docs::<Shipper>(SHIPPERS_TABLE)?
            .into_iter()
            .filter(|s| s.available)
            .collect())
    }
}
