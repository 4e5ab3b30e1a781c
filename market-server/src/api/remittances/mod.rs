//! Shipper remittance API

mod handler;

use axum::{
    Router,
    routing::{get, post, put},
};

use crate::core::ServerState;

pub fn router() -> Router<ServerState> {
    Router::new()
        .route("/api/remittances", post(handler::create))
        .route("/api/remittances/debt", get(handler::my_debt))
}

/// Mounted under `/api/admin`
pub fn admin_routes() -> Router<ServerState> {
    Router::new()
        .route("/remittances", get(handler::list))
        .route("/remittances/{id}", put(handler::process))
        .route("/shippers/{id}/debt", get(handler::shipper_debt))
}
