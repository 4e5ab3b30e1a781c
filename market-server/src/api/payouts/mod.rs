//! Seller payout API

mod handler;

use axum::{
    Router,
    routing::{get, put},
};

use crate::core::ServerState;

pub fn router() -> Router<ServerState> {
    Router::new().route("/api/payouts", get(handler::list).post(handler::request))
}

/// Mounted under `/api/admin`
pub fn admin_routes() -> Router<ServerState> {
    Router::new().route("/payouts/{id}", put(handler::settle))
}
