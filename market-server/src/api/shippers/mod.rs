//! Shipper position reporting

mod handler;

use axum::{Router, routing::put};

use crate::core::ServerState;

pub fn router() -> Router<ServerState> {
    Router::new().route("/api/shippers/me/location", put(handler::update_location))
}
