//! Order API
//!
//! | Path | Method | Caller |
//! |------|--------|--------|
//! | /api/orders | POST | customer |
//! | /api/orders/{id} | GET | involved party, staff |
//! | /api/orders/{id}/status | PUT | per transition table |
//! | /api/orders/{id}/cancel | POST | customer, staff |
//! | /api/orders/{id}/accept | POST | offered shipper |
//! | /api/orders/{id}/quote | POST | seller |

mod handler;

use axum::{
    Router,
    routing::{get, post, put},
};

use crate::core::ServerState;

pub fn router() -> Router<ServerState> {
    Router::new().nest("/api/orders", routes())
}

fn routes() -> Router<ServerState> {
    Router::new()
        .route("/", post(handler::create))
        .route("/{id}", get(handler::get_by_id))
        .route("/{id}/status", put(handler::update_status))
        .route("/{id}/cancel", post(handler::cancel))
        .route("/{id}/accept", post(handler::accept))
        .route("/{id}/quote", post(handler::quote))
}
