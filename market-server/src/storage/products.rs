use super::{MarketStorage, PRODUCTS_TABLE, StorageResult, get_doc_txn, put_doc_txn};
use redb::WriteTransaction;
use shared::models::Product;

impl MarketStorage {
    pub fn get_product(&self, product_id: &str) -> StorageResult<Option<Product>> {
        self.get_doc(PRODUCTS_TABLE, product_id)
    }

    pub fn get_product_txn(
        &self,
        txn: &WriteTransaction,
        product_id: &str,
    ) -> StorageResult<Option<Product>> {
        get_doc_txn(txn, PRODUCTS_TABLE, product_id)
    }

    pub fn put_product_txn(&self, txn: &WriteTransaction, product: &Product) -> StorageResult<()> {
        put_doc_txn(txn, PRODUCTS_TABLE, &product.id, product)
    }

    /// Insert or replace a product in its own transaction
    pub fn upsert_product(&self, product: &Product) -> StorageResult<()> {
        let txn = self.begin_write()?;
        self.put_product_txn(&txn, product)?;
        txn.commit()?;
        Ok(())
    }
}
