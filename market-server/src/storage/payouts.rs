use super::{
    MarketStorage, OPEN_PAYOUTS_TABLE, PAYOUTS_TABLE, StorageResult, get_doc_txn, put_doc_txn,
};
use redb::{ReadableTable, WriteTransaction};
use shared::models::PayoutRequest;

impl MarketStorage {
    /// Store a payout request; the open-payout index follows its status
    pub fn put_payout_txn(&self, txn: &WriteTransaction, payout: &PayoutRequest) -> StorageResult<()> {
        put_doc_txn(txn, PAYOUTS_TABLE, &payout.id, payout)?;

        let mut open = txn.open_table(OPEN_PAYOUTS_TABLE)?;
        if payout.status.is_open() {
            open.insert(payout.seller_id.as_str(), payout.id.as_str())?;
        } else {
            open.remove(payout.seller_id.as_str())?;
        }
        Ok(())
    }

    pub fn get_payout(&self, request_id: &str) -> StorageResult<Option<PayoutRequest>> {
        self.get_doc(PAYOUTS_TABLE, request_id)
    }

    pub fn get_payout_txn(
        &self,
        txn: &WriteTransaction,
        request_id: &str,
    ) -> StorageResult<Option<PayoutRequest>> {
        get_doc_txn(txn, PAYOUTS_TABLE, request_id)
    }

    /// Id of the seller's pending or processing request, if any
    pub fn open_payout_txn(
        &self,
        txn: &WriteTransaction,
        seller_id: &str,
    ) -> StorageResult<Option<String>> {
        let table = txn.open_table(OPEN_PAYOUTS_TABLE)?;
        Ok(table.get(seller_id)?.map(|guard| guard.value().to_string()))
    }

    /// Newest first
    pub fn payouts_for_seller(&self, seller_id: &str) -> StorageResult<Vec<PayoutRequest>> {
        let mut payouts: Vec<PayoutRequest> = self
            .all_docs::<PayoutRequest>(PAYOUTS_TABLE)?
            .into_iter()
            .filter(|p| p.seller_id == seller_id)
            .collect();
        payouts.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(payouts)
    }
}
