use axum::{Json, extract::State};
use shared::error::{ApiResponse, AppResult};
use shared::models::{Role, Shipper, ShipperLocationUpdate};
use shared::util::now_millis;

use crate::auth::{CurrentUser, require_role};
use crate::core::ServerState;

/// Location and availability from the shipper app
///
/// A shipper first seen without a name is registered under their username.
pub async fn update_location(
    State(state): State<ServerState>,
    user: CurrentUser,
    Json(mut payload): Json<ShipperLocationUpdate>,
) -> AppResult<ApiResponse<Shipper>> {
    require_role(&user, Role::Shipper)?;
    if payload.name.is_none() && state.storage.get_shipper(&user.id)?.is_none() {
        payload.name = Some(user.username.clone()).filter(|n| !n.trim().is_empty());
    }
    let shipper = state
        .assignment
        .update_shipper_location(&user.id, payload, now_millis())?;
    Ok(ApiResponse::success(shipper))
}
