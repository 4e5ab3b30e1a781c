//! Payout API Handlers

use axum::{
    Json,
    extract::{Path, State},
};
use shared::error::{ApiResponse, AppResult};
use shared::models::{PayoutRequest, PayoutSettle, Role};

use crate::auth::{CurrentUser, require_role};
use crate::core::ServerState;
use crate::utils::validation::{MAX_NOTE_LEN, validate_optional_text};

/// Request a payout of the whole balance
pub async fn request(
    State(state): State<ServerState>,
    user: CurrentUser,
) -> AppResult<ApiResponse<PayoutRequest>> {
    require_role(&user, Role::Seller)?;
    Ok(ApiResponse::success(state.ledger.request_payout(&user.id)?))
}

pub async fn list(
    State(state): State<ServerState>,
    user: CurrentUser,
) -> AppResult<ApiResponse<Vec<PayoutRequest>>> {
    require_role(&user, Role::Seller)?;
    Ok(ApiResponse::success(state.ledger.list_payouts(&user.id)?))
}

pub async fn settle(
    State(state): State<ServerState>,
    user: CurrentUser,
    Path(id): Path<String>,
    Json(payload): Json<PayoutSettle>,
) -> AppResult<ApiResponse<PayoutRequest>> {
    validate_optional_text(&payload.reason, "reason", MAX_NOTE_LEN)?;
    let payout = state
        .ledger
        .settle_payout(&id, payload.status, payload.reason, &user.id)?;
    Ok(ApiResponse::success(payout))
}
