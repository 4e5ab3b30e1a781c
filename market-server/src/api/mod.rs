//! HTTP API
//!
//! - [`health`] - liveness (public)
//! - [`orders`] - order lifecycle
//! - [`ledger`] - seller ledger and balance
//! - [`payouts`] - seller payouts
//! - [`remittances`] - shipper COD remittances
//! - [`shippers`] - shipper location reports
//! - [`products`] - catalog sync
//!
//! Everything under `/api/` needs a bearer token; `/api/admin/` also
//! needs an admin or manager role.

pub mod health;
pub mod ledger;
pub mod orders;
pub mod payouts;
pub mod products;
pub mod remittances;
pub mod shippers;

use axum::{Router, middleware};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::auth::{require_auth, require_staff};
use crate::core::ServerState;

/// Routes without state or layers
pub fn routes() -> Router<ServerState> {
    let admin = Router::new()
        .merge(ledger::admin_routes())
        .merge(payouts::admin_routes())
        .merge(remittances::admin_routes())
        .route_layer(middleware::from_fn(require_staff));

    Router::<ServerState>::new()
        .merge(health::router())
        .merge(orders::router())
        .merge(ledger::router())
        .merge(payouts::router())
        .merge(remittances::router())
        .merge(shippers::router())
        .merge(products::router())
        .nest("/api/admin", admin)
}

/// Full application with authentication, tracing and CORS
pub fn build_app(state: ServerState) -> Router {
    routes()
        .layer(middleware::from_fn_with_state(state.clone(), require_auth))
        .with_state(state)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
}
