//! redb-based storage layer
//!
//! Every collection is a table of JSON documents keyed by id; the rest are
//! index tables that keep hot queries off full scans.
//!
//! # Tables
//!
//! | Table | Key | Value | Purpose |
//! |-------|-----|-------|---------|
//! | `orders` | `order_id` | `Order` | Orders (never deleted) |
//! | `pending_orders` | `order_id` | `created_at` | Orders awaiting a shipper |
//! | `shipper_orders` | `(shipper_id, order_id)` | `()` | Orders accepted per shipper |
//! | `products` | `product_id` | `Product` | Stock / price / sale window |
//! | `ledger_entries` | `(seller_id, seq)` | `LedgerEntry` | Append-only seller ledger |
//! | `ledger_heads` | `seller_id` | `u64` | Last sequence per seller |
//! | `ledger_credits` | `(order_id, seller_id)` | `seq` | Completion credit per order |
//! | `ledger_reversals` | `(order_id, seller_id)` | `seq` | Reversal per order |
//! | `ledger_jobs` | `order_id` | `LedgerJob` | Credit outbox |
//! | `ledger_dead_letter` | `order_id` | `LedgerDeadLetter` | Permanently failed credits |
//! | `payouts` | `request_id` | `PayoutRequest` | Seller payout requests |
//! | `open_payouts` | `seller_id` | `request_id` | At most one open payout per seller |
//! | `remittance_requests` | `request_id` | `RemittanceRequest` | Shipper remittance claims |
//! | `pending_remittances` | `shipper_id` | `request_id` | At most one pending claim per shipper |
//! | `remittances` | `shipper_id:date` | `Remittance` | Per-day remitted cash |
//! | `pending_deliveries` | `order_id` | `PendingDelivery` | Assignment tasks |
//! | `shippers` | `shipper_id` | `Shipper` | Position and availability |
//!
//! # Transactions
//!
//! redb admits one write transaction at a time. Every multi-document change
//! (stock reservation, ledger append, remittance allocation) runs inside a
//! single `WriteTransaction`; dropping it without `commit()` rolls back.

mod deliveries;
mod ledger;
mod orders;
mod payouts;
mod products;
mod remittances;

pub use ledger::{LedgerDeadLetter, LedgerJob};

use redb::{
    Database, ReadTransaction, ReadableDatabase, ReadableTable, TableDefinition,
    WriteTransaction,
};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::path::Path;
use std::sync::Arc;
use thiserror::Error;

type DocTable = TableDefinition<'static, &'static str, &'static [u8]>;

const ORDERS_TABLE: DocTable = TableDefinition::new("orders");
const PENDING_ORDERS_TABLE: TableDefinition<&str, i64> = TableDefinition::new("pending_orders");
const SHIPPER_ORDERS_TABLE: TableDefinition<(&str, &str), ()> =
    TableDefinition::new("shipper_orders");
const PRODUCTS_TABLE: DocTable = TableDefinition::new("products");

const LEDGER_TABLE: TableDefinition<(&str, u64), &[u8]> = TableDefinition::new("ledger_entries");
const LEDGER_HEADS_TABLE: TableDefinition<&str, u64> = TableDefinition::new("ledger_heads");
const LEDGER_CREDITS_TABLE: TableDefinition<(&str, &str), u64> =
    TableDefinition::new("ledger_credits");
const LEDGER_REVERSALS_TABLE: TableDefinition<(&str, &str), u64> =
    TableDefinition::new("ledger_reversals");
const LEDGER_JOBS_TABLE: DocTable = TableDefinition::new("ledger_jobs");
const LEDGER_DEAD_LETTER_TABLE: DocTable = TableDefinition::new("ledger_dead_letter");

const PAYOUTS_TABLE: DocTable = TableDefinition::new("payouts");
const OPEN_PAYOUTS_TABLE: TableDefinition<&str, &str> = TableDefinition::new("open_payouts");

const REMITTANCE_REQUESTS_TABLE: DocTable = TableDefinition::new("remittance_requests");
const PENDING_REMITTANCES_TABLE: TableDefinition<&str, &str> =
    TableDefinition::new("pending_remittances");
const REMITTANCES_TABLE: DocTable = TableDefinition::new("remittances");

const PENDING_DELIVERIES_TABLE: DocTable = TableDefinition::new("pending_deliveries");
const SHIPPERS_TABLE: DocTable = TableDefinition::new("shippers");

/// Storage errors
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Database error: {0}")]
    Database(#[from] redb::DatabaseError),

    #[error("Transaction error: {0}")]
    Transaction(#[from] redb::TransactionError),

    #[error("Table error: {0}")]
    Table(#[from] redb::TableError),

    #[error("Storage error: {0}")]
    Storage(#[from] redb::StorageError),

    #[error("Commit error: {0}")]
    Commit(#[from] redb::CommitError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

pub type StorageResult<T> = Result<T, StorageError>;

impl From<StorageError> for shared::error::AppError {
    fn from(err: StorageError) -> Self {
        shared::error::AppError::database(err.to_string())
    }
}

/// Marketplace storage backed by redb
#[derive(Clone)]
pub struct MarketStorage {
    db: Arc<Database>,
}

impl MarketStorage {
    /// Open or create the database at the given path
    ///
    /// redb commits are durable once `commit()` returns (copy-on-write with
    /// an atomic root swap), so a crash never leaves half a transaction.
    pub fn open(path: impl AsRef<Path>) -> StorageResult<Self> {
        let db = Database::create(path)?;
        Self::init(db)
    }

    /// Open an in-memory database (for tests)
    pub fn open_in_memory() -> StorageResult<Self> {
        let db = Database::builder().create_with_backend(redb::backends::InMemoryBackend::new())?;
        Self::init(db)
    }

    fn init(db: Database) -> StorageResult<Self> {
        let write_txn = db.begin_write()?;
        {
            // Create all tables so read transactions never hit a missing table
            let _ = write_txn.open_table(ORDERS_TABLE)?;
            let _ = write_txn.open_table(PENDING_ORDERS_TABLE)?;
            let _ = write_txn.open_table(SHIPPER_ORDERS_TABLE)?;
            let _ = write_txn.open_table(PRODUCTS_TABLE)?;
            let _ = write_txn.open_table(LEDGER_TABLE)?;
            let _ = write_txn.open_table(LEDGER_HEADS_TABLE)?;
            let _ = write_txn.open_table(LEDGER_CREDITS_TABLE)?;
            let _ = write_txn.open_table(LEDGER_REVERSALS_TABLE)?;
            let _ = write_txn.open_table(LEDGER_JOBS_TABLE)?;
            let _ = write_txn.open_table(LEDGER_DEAD_LETTER_TABLE)?;
            let _ = write_txn.open_table(PAYOUTS_TABLE)?;
            let _ = write_txn.open_table(OPEN_PAYOUTS_TABLE)?;
            let _ = write_txn.open_table(REMITTANCE_REQUESTS_TABLE)?;
            let _ = write_txn.open_table(PENDING_REMITTANCES_TABLE)?;
            let _ = write_txn.open_table(REMITTANCES_TABLE)?;
            let _ = write_txn.open_table(PENDING_DELIVERIES_TABLE)?;
            let _ = write_txn.open_table(SHIPPERS_TABLE)?;
        }
        write_txn.commit()?;

        Ok(Self { db: Arc::new(db) })
    }

    /// Begin a write transaction
    pub fn begin_write(&self) -> StorageResult<WriteTransaction> {
        Ok(self.db.begin_write()?)
    }

    fn begin_read(&self) -> StorageResult<ReadTransaction> {
        Ok(self.db.begin_read()?)
    }

    // ========== Document helpers ==========

    fn get_doc<T: DeserializeOwned>(&self, def: DocTable, key: &str) -> StorageResult<Option<T>> {
        let read_txn = self.begin_read()?;
        let table = read_txn.open_table(def)?;
        read_doc(&table, key)
    }

    fn all_docs<T: DeserializeOwned>(&self, def: DocTable) -> StorageResult<Vec<T>> {
        let read_txn = self.begin_read()?;
        let table = read_txn.open_table(def)?;
        collect_docs(&table)
    }
}

fn get_doc_txn<T: DeserializeOwned>(
    txn: &WriteTransaction,
    def: DocTable,
    key: &str,
) -> StorageResult<Option<T>> {
    let table = txn.open_table(def)?;
    read_doc(&table, key)
}

fn put_doc_txn<T: Serialize>(
    txn: &WriteTransaction,
    def: DocTable,
    key: &str,
    doc: &T,
) -> StorageResult<()> {
    let mut table = txn.open_table(def)?;
    let value = serde_json::to_vec(doc)?;
    table.insert(key, value.as_slice())?;
    Ok(())
}

fn remove_doc_txn(txn: &WriteTransaction, def: DocTable, key: &str) -> StorageResult<()> {
    let mut table = txn.open_table(def)?;
    table.remove(key)?;
    Ok(())
}

fn all_docs_txn<T: DeserializeOwned>(
    txn: &WriteTransaction,
    def: DocTable,
) -> StorageResult<Vec<T>> {
    let table = txn.open_table(def)?;
    collect_docs(&table)
}

fn read_doc<T: DeserializeOwned>(
    table: &impl ReadableTable<&'static str, &'static [u8]>,
    key: &str,
) -> StorageResult<Option<T>> {
    match table.get(key)? {
        Some(value) => Ok(Some(serde_json::from_slice(value.value())?)),
        None => Ok(None),
    }
}

fn collect_docs<T: DeserializeOwned>(
    table: &impl ReadableTable<&'static str, &'static [u8]>,
) -> StorageResult<Vec<T>> {
    let mut docs = Vec::new();
    for result in table.iter()? {
        let (_key, value) = result?;
        docs.push(serde_json::from_slice(value.value())?);
    }
    Ok(docs)
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared::models::{GeoPoint, Shipper};

    #[test]
    fn test_open_file_backed_database() {
        let dir = tempfile::tempdir().unwrap();
        let storage = MarketStorage::open(dir.path().join("market.redb")).unwrap();

        let txn = storage.begin_write().unwrap();
        storage
            .put_shipper_txn(
                &txn,
                &Shipper {
                    id: "sh-1".into(),
                    name: "Binh".into(),
                    location: GeoPoint::new(10.0, 106.0),
                    available: true,
                    updated_at: 1,
                },
            )
            .unwrap();
        txn.commit().unwrap();
        drop(storage);

        // Reopen and read back
        let storage = MarketStorage::open(dir.path().join("market.redb")).unwrap();
        let shipper = storage.get_shipper("sh-1").unwrap().unwrap();
        assert_eq!(shipper.name, "Binh");
    }

    #[test]
    fn test_dropped_transaction_rolls_back() {
        let storage = MarketStorage::open_in_memory().unwrap();
        {
            let txn = storage.begin_write().unwrap();
            storage
                .put_shipper_txn(
                    &txn,
                    &Shipper {
                        id: "sh-1".into(),
                        name: "Binh".into(),
                        location: GeoPoint::new(10.0, 106.0),
                        available: true,
                        updated_at: 1,
                    },
                )
                .unwrap();
            // no commit
        }
        assert!(storage.get_shipper("sh-1").unwrap().is_none());
    }
}
