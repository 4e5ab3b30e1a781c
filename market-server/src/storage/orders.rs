use super::{
    MarketStorage, ORDERS_TABLE, PENDING_ORDERS_TABLE, SHIPPER_ORDERS_TABLE, StorageResult,
    get_doc_txn, put_doc_txn, read_doc,
};
use redb::{ReadableTable, WriteTransaction};
use shared::models::{Order, OrderStatus};

impl MarketStorage {
    /// Store an order and keep the pending/shipper indexes in step with it
    ///
    /// Consultation orders never enter the pending index: the reaper leaves
    /// them alone.
    pub fn put_order_txn(&self, txn: &WriteTransaction, order: &Order) -> StorageResult<()> {
        put_doc_txn(txn, ORDERS_TABLE, &order.id, order)?;

        let mut pending = txn.open_table(PENDING_ORDERS_TABLE)?;
        if order.status == OrderStatus::PendingConfirmation
            && order.shipper_id.is_none()
            && !order.is_consultation
        {
            pending.insert(order.id.as_str(), order.timestamps.created_at)?;
        } else {
            pending.remove(order.id.as_str())?;
        }

        if let Some(shipper_id) = order.shipper_id.as_deref() {
            let mut by_shipper = txn.open_table(SHIPPER_ORDERS_TABLE)?;
            by_shipper.insert((shipper_id, order.id.as_str()), ())?;
        }
        Ok(())
    }

    pub fn get_order(&self, order_id: &str) -> StorageResult<Option<Order>> {
        self.get_doc(ORDERS_TABLE, order_id)
    }

    pub fn get_order_txn(
        &self,
        txn: &WriteTransaction,
        order_id: &str,
    ) -> StorageResult<Option<Order>> {
        get_doc_txn(txn, ORDERS_TABLE, order_id)
    }

    /// Ids of orders awaiting a shipper that were created strictly before `cutoff`
    pub fn pending_order_ids_created_before(&self, cutoff: i64) -> StorageResult<Vec<String>> {
        let read_txn = self.begin_read()?;
        let table = read_txn.open_table(PENDING_ORDERS_TABLE)?;

        let mut ids = Vec::new();
        for result in table.iter()? {
            let (key, created_at) = result?;
            if created_at.value() < cutoff {
                ids.push(key.value().to_string());
            }
        }
        Ok(ids)
    }

    /// Orders ever accepted by a shipper
    pub fn orders_for_shipper(&self, shipper_id: &str) -> StorageResult<Vec<Order>> {
        let read_txn = self.begin_read()?;
        let index = read_txn.open_table(SHIPPER_ORDERS_TABLE)?;
        let orders = read_txn.open_table(ORDERS_TABLE)?;

        let mut result = Vec::new();
        for entry in index.range((shipper_id, "")..)? {
            let (key, _) = entry?;
            let (owner, order_id) = key.value();
            if owner != shipper_id {
                break;
            }
            if let Some(order) = read_doc(&orders, order_id)? {
                result.push(order);
            }
        }
        Ok(result)
    }

    /// Same as [`orders_for_shipper`](Self::orders_for_shipper) inside a write transaction
    pub fn orders_for_shipper_txn(
        &self,
        txn: &WriteTransaction,
        shipper_id: &str,
    ) -> StorageResult<Vec<Order>> {
        let index = txn.open_table(SHIPPER_ORDERS_TABLE)?;
        let orders = txn.open_table(ORDERS_TABLE)?;

        let mut result = Vec::new();
        for entry in index.range((shipper_id, "")..)? {
            let (key, _) = entry?;
            let (owner, order_id) = key.value();
            if owner != shipper_id {
                break;
            }
            if let Some(order) = read_doc(&orders, order_id)? {
                result.push(order);
            }
        }
        Ok(result)
    }
}
