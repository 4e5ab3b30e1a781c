//! Ledger API Handlers

use axum::extract::{Path, Query, State};
use serde::Deserialize;
use shared::error::{ApiResponse, AppResult};
use shared::models::{LedgerEntryView, Role, SellerBalance};

use crate::auth::{CurrentUser, require_role};
use crate::core::ServerState;

#[derive(Debug, Deserialize)]
pub struct LedgerQuery {
    /// Defaults to 50, capped at 200
    pub limit: Option<usize>,
}

pub async fn my_ledger(
    State(state): State<ServerState>,
    user: CurrentUser,
    Query(query): Query<LedgerQuery>,
) -> AppResult<ApiResponse<Vec<LedgerEntryView>>> {
    require_role(&user, Role::Seller)?;
    ledger_view(&state, &user.id, query.limit)
}

pub async fn my_balance(
    State(state): State<ServerState>,
    user: CurrentUser,
) -> AppResult<ApiResponse<SellerBalance>> {
    require_role(&user, Role::Seller)?;
    Ok(ApiResponse::success(state.ledger.get_balance(&user.id)?))
}

pub async fn seller_ledger(
    State(state): State<ServerState>,
    Path(seller_id): Path<String>,
    Query(query): Query<LedgerQuery>,
) -> AppResult<ApiResponse<Vec<LedgerEntryView>>> {
    ledger_view(&state, &seller_id, query.limit)
}

pub async fn seller_balance(
    State(state): State<ServerState>,
    Path(seller_id): Path<String>,
) -> AppResult<ApiResponse<SellerBalance>> {
    Ok(ApiResponse::success(state.ledger.get_balance(&seller_id)?))
}

fn ledger_view(
    state: &ServerState,
    seller_id: &str,
    limit: Option<usize>,
) -> AppResult<ApiResponse<Vec<LedgerEntryView>>> {
    let entries = state.ledger.get_ledger(seller_id, limit)?;
    Ok(ApiResponse::success(
        entries.iter().map(LedgerEntryView::from).collect(),
    ))
}
