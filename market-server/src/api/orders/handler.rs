//! Order API Handlers

use axum::{
    Json,
    extract::{Path, State},
};
use shared::error::{ApiResponse, AppResult};
use shared::models::{Order, OrderCancel, OrderCreate, OrderQuote, OrderStatusUpdate, Role};

use crate::auth::{CurrentUser, require_role};
use crate::core::ServerState;
use crate::orders::Actor;

/// Place an order
pub async fn create(
    State(state): State<ServerState>,
    user: CurrentUser,
    Json(payload): Json<OrderCreate>,
) -> AppResult<ApiResponse<Order>> {
    require_role(&user, Role::Customer)?;
    let order = state.orders.create_order(&user.id, payload)?;
    Ok(ApiResponse::success(order))
}

pub async fn get_by_id(
    State(state): State<ServerState>,
    user: CurrentUser,
    Path(id): Path<String>,
) -> AppResult<ApiResponse<Order>> {
    let order = state.orders.get_order(&id, &Actor::from(&user))?;
    Ok(ApiResponse::success(order))
}

pub async fn update_status(
    State(state): State<ServerState>,
    user: CurrentUser,
    Path(id): Path<String>,
    Json(payload): Json<OrderStatusUpdate>,
) -> AppResult<ApiResponse<Order>> {
    let order = state
        .orders
        .update_status(&id, payload.status, &Actor::from(&user))?;
    Ok(ApiResponse::success(order))
}

pub async fn cancel(
    State(state): State<ServerState>,
    user: CurrentUser,
    Path(id): Path<String>,
    payload: Option<Json<OrderCancel>>,
) -> AppResult<ApiResponse<Order>> {
    let reason = payload.and_then(|Json(body)| body.reason);
    let order = state
        .orders
        .cancel_order(&id, &Actor::from(&user), reason)?;
    Ok(ApiResponse::success(order))
}

/// Shipper takes an offered order
pub async fn accept(
    State(state): State<ServerState>,
    user: CurrentUser,
    Path(id): Path<String>,
) -> AppResult<ApiResponse<Order>> {
    require_role(&user, Role::Shipper)?;
    let order = state.orders.accept_order(&id, &Actor::from(&user))?;
    Ok(ApiResponse::success(order))
}

/// Seller prices a consultation order
pub async fn quote(
    State(state): State<ServerState>,
    user: CurrentUser,
    Path(id): Path<String>,
    Json(payload): Json<OrderQuote>,
) -> AppResult<ApiResponse<Order>> {
    require_role(&user, Role::Seller)?;
    let order = state
        .orders
        .submit_quote(&id, &Actor::from(&user), payload)?;
    Ok(ApiResponse::success(order))
}
