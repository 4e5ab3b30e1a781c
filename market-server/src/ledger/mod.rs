//! Seller ledger, payouts and the credit outbox worker

mod engine;
mod error;
mod worker;

pub use engine::{DEFAULT_LEDGER_LIMIT, EntryRef, LedgerEngine, MAX_LEDGER_LIMIT};
pub use error::{LedgerError, LedgerResult};
pub use worker::LedgerWorker;
