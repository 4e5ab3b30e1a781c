//! Market Server - marketplace fulfillment and seller ledger backend
//!
//! # Module layout
//!
//! ```text
//! market-server/src/
//! ├── core/            # config, state, event router, background tasks, server
//! ├── auth/            # JWT validation, extractor, middleware
//! ├── api/             # HTTP routes and handlers
//! ├── storage/         # redb document store and indexes
//! ├── orders/          # order state machine and manager
//! ├── ledger/          # seller ledger, payouts, credit outbox worker
//! ├── assignment/      # nearest-shipper offers
//! ├── reconciliation/  # shipper COD remittances
//! ├── notify/          # push notifications
//! ├── reaper.rs        # stuck-order cancellation
//! └── utils/           # logging, validation
//! ```

pub mod api;
pub mod assignment;
pub mod auth;
pub mod core;
pub mod ledger;
pub mod notify;
pub mod orders;
pub mod reaper;
pub mod reconciliation;
pub mod storage;
pub mod utils;

pub use auth::{CurrentUser, JwtService};
pub use core::{Config, Server, ServerState};
pub use orders::OrdersManager;
pub use storage::MarketStorage;
pub use utils::logger::{init_logger, init_logger_with_file};

// Security logging macro - tracing target "security"
#[macro_export]
macro_rules! security_log {
    ($level:expr, $event:expr, $($key:ident = $value:expr),*) => {
        tracing::info!(
            target: "security",
            level = $level,
            event = $event,
            $($key = $value),*
        );
    };
}
