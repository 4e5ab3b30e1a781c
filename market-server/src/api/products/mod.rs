//! Product sync from the catalog service
//!
//! Only the fields order creation needs: price, commission, stock and the
//! daily sale window.

mod handler;

use axum::{Router, routing::put};

use crate::core::ServerState;

pub fn router() -> Router<ServerState> {
    Router::new().route("/api/products/{id}", put(handler::upsert).get(handler::get_by_id))
}
