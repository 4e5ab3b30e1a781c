//! Shipper COD remittance reconciliation
//!
//! Seller payouts go the other way and live in the ledger module.

mod error;
mod remittance;

pub use error::{ReconciliationError, ReconciliationResult};
pub use remittance::{RemittanceService, compute_debt};
