//! Data models
//!
//! Shared between market-server and the mobile/web clients (via API).
//! Stored as JSON documents; all money is `i64` in base currency units and
//! all timestamps are Unix milliseconds.

pub mod delivery;
pub mod ledger;
pub mod order;
pub mod product;
pub mod remittance;
pub mod role;

// Re-exports
pub use delivery::*;
pub use ledger::*;
pub use order::*;
pub use product::*;
pub use remittance::*;
pub use role::*;
