use super::{
    MarketStorage, PENDING_REMITTANCES_TABLE, REMITTANCE_REQUESTS_TABLE, REMITTANCES_TABLE,
    StorageResult, get_doc_txn, put_doc_txn,
};
use redb::{ReadableTable, WriteTransaction};
use shared::models::{Remittance, RemittanceRequest, RemittanceRequestStatus};

impl MarketStorage {
    // ========== Requests ==========

    /// Store a request; the pending index follows its status
    pub fn put_remittance_request_txn(
        &self,
        txn: &WriteTransaction,
        request: &RemittanceRequest,
    ) -> StorageResult<()> {
        put_doc_txn(txn, REMITTANCE_REQUESTS_TABLE, &request.id, request)?;

        let mut pending = txn.open_table(PENDING_REMITTANCES_TABLE)?;
        if request.status == RemittanceRequestStatus::Pending {
            pending.insert(request.shipper_id.as_str(), request.id.as_str())?;
        } else {
            pending.remove(request.shipper_id.as_str())?;
        }
        Ok(())
    }

    pub fn get_remittance_request(
        &self,
        request_id: &str,
    ) -> StorageResult<Option<RemittanceRequest>> {
        self.get_doc(REMITTANCE_REQUESTS_TABLE, request_id)
    }

    pub fn get_remittance_request_txn(
        &self,
        txn: &WriteTransaction,
        request_id: &str,
    ) -> StorageResult<Option<RemittanceRequest>> {
        get_doc_txn(txn, REMITTANCE_REQUESTS_TABLE, request_id)
    }

    pub fn pending_remittance_request_txn(
        &self,
        txn: &WriteTransaction,
        shipper_id: &str,
    ) -> StorageResult<Option<String>> {
        let table = txn.open_table(PENDING_REMITTANCES_TABLE)?;
        Ok(table.get(shipper_id)?.map(|guard| guard.value().to_string()))
    }

    /// Oldest first, optionally filtered by status
    pub fn list_remittance_requests(
        &self,
        status: Option<RemittanceRequestStatus>,
    ) -> StorageResult<Vec<RemittanceRequest>> {
        let mut requests: Vec<RemittanceRequest> = self
            .all_docs::<RemittanceRequest>(REMITTANCE_REQUESTS_TABLE)?
            .into_iter()
            .filter(|r| status.is_none_or(|s| r.status == s))
            .collect();
        requests.sort_by_key(|r| r.created_at);
        Ok(requests)
    }

    // ========== Per-day remittances ==========

    pub fn get_remittance_txn(
        &self,
        txn: &WriteTransaction,
        shipper_id: &str,
        date: &str,
    ) -> StorageResult<Option<Remittance>> {
        get_doc_txn(txn, REMITTANCES_TABLE, &Remittance::key(shipper_id, date))
    }

    pub fn put_remittance_txn(
        &self,
        txn: &WriteTransaction,
        remittance: &Remittance,
    ) -> StorageResult<()> {
        let key = Remittance::key(&remittance.shipper_id, &remittance.date);
        put_doc_txn(txn, REMITTANCES_TABLE, &key, remittance)
    }

    /// All per-day documents of the shipper, oldest day first
    pub fn remittances_for_shipper(&self, shipper_id: &str) -> StorageResult<Vec<Remittance>> {
        let read_txn = self.begin_read()?;
        let table = read_txn.open_table(REMITTANCES_TABLE)?;
        collect_for_shipper(&table, shipper_id)
    }

    pub fn remittances_for_shipper_txn(
        &self,
        txn: &WriteTransaction,
        shipper_id: &str,
    ) -> StorageResult<Vec<Remittance>> {
        let table = txn.open_table(REMITTANCES_TABLE)?;
        collect_for_shipper(&table, shipper_id)
    }
}

fn collect_for_shipper(
    table: &impl ReadableTable<&'static str, &'static [u8]>,
    shipper_id: &str,
) -> StorageResult<Vec<Remittance>> {
    let prefix = format!("{shipper_id}:");
    let mut remittances = Vec::new();
    for result in table.range(prefix.as_str()..)? {
        let (key, value) = result?;
        if !key.value().starts_with(&prefix) {
            break;
        }
        remittances.push(serde_json::from_slice(value.value())?);
    }
    Ok(remittances)
}
