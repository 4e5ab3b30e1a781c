//! Remittance API Handlers

use axum::{
    Json,
    extract::{Path, Query, State},
};
use serde::Deserialize;
use shared::error::{ApiResponse, AppResult};
use shared::models::{
    RemittanceProcess, RemittanceRequest, RemittanceRequestCreate, RemittanceRequestStatus, Role,
    ShipperDebt,
};

use crate::auth::{CurrentUser, require_role};
use crate::core::ServerState;

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    pub status: Option<RemittanceRequestStatus>,
}

pub async fn create(
    State(state): State<ServerState>,
    user: CurrentUser,
    Json(payload): Json<RemittanceRequestCreate>,
) -> AppResult<ApiResponse<RemittanceRequest>> {
    require_role(&user, Role::Shipper)?;
    let request = state
        .remittances
        .create_remittance_request(&user.id, payload)?;
    Ok(ApiResponse::success(request))
}

pub async fn my_debt(
    State(state): State<ServerState>,
    user: CurrentUser,
) -> AppResult<ApiResponse<ShipperDebt>> {
    require_role(&user, Role::Shipper)?;
    Ok(ApiResponse::success(state.remittances.shipper_debt(&user.id)?))
}

pub async fn shipper_debt(
    State(state): State<ServerState>,
    Path(shipper_id): Path<String>,
) -> AppResult<ApiResponse<ShipperDebt>> {
    Ok(ApiResponse::success(
        state.remittances.shipper_debt(&shipper_id)?,
    ))
}

pub async fn list(
    State(state): State<ServerState>,
    Query(query): Query<ListQuery>,
) -> AppResult<ApiResponse<Vec<RemittanceRequest>>> {
    Ok(ApiResponse::success(
        state.remittances.list_remittance_requests(query.status)?,
    ))
}

/// Approve or reject (`{action, admin_notes}`)
pub async fn process(
    State(state): State<ServerState>,
    user: CurrentUser,
    Path(id): Path<String>,
    Json(payload): Json<RemittanceProcess>,
) -> AppResult<ApiResponse<RemittanceRequest>> {
    let request = state
        .remittances
        .process_remittance_request(&id, payload, &user.id)?;
    Ok(ApiResponse::success(request))
}
