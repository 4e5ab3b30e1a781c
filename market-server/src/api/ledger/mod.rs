//! Seller ledger API
//!
//! Sellers read their own ledger; staff read any seller's.

mod handler;

use axum::{Router, routing::get};

use crate::core::ServerState;

pub fn router() -> Router<ServerState> {
    Router::new()
        .route("/api/ledger", get(handler::my_ledger))
        .route("/api/ledger/balance", get(handler::my_balance))
}

/// Mounted under `/api/admin`
pub fn admin_routes() -> Router<ServerState> {
    Router::new()
        .route("/sellers/{id}/ledger", get(handler::seller_ledger))
        .route("/sellers/{id}/balance", get(handler::seller_balance))
}
