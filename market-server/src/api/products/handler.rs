//! Product API Handlers

use axum::{
    Json,
    extract::{Path, State},
};
use shared::error::{ApiResponse, AppError, AppResult, ErrorCode};
use shared::models::{MAX_UNIT_PRICE, Product, ProductUpsert, Role};
use shared::util::now_millis;

use crate::auth::CurrentUser;
use crate::core::ServerState;
use crate::utils::validation::{MAX_NAME_LEN, validate_non_negative, validate_required_text};

/// Basis points cap (100%)
const MAX_COMMISSION_BPS: u32 = 10_000;

pub async fn get_by_id(
    State(state): State<ServerState>,
    Path(id): Path<String>,
) -> AppResult<ApiResponse<Product>> {
    let product = state
        .storage
        .get_product(&id)?
        .ok_or_else(|| AppError::with_message(ErrorCode::ProductNotFound, format!("Product not found: {id}")))?;
    Ok(ApiResponse::success(product))
}

/// Create or replace a product; sellers may only write their own
pub async fn upsert(
    State(state): State<ServerState>,
    user: CurrentUser,
    Path(id): Path<String>,
    Json(payload): Json<ProductUpsert>,
) -> AppResult<ApiResponse<Product>> {
    validate_required_text(&payload.name, "name", MAX_NAME_LEN)?;
    validate_non_negative(payload.price, "price")
        .map_err(|e| AppError::with_message(ErrorCode::ProductInvalidPrice, e.message))?;
    if payload.price > MAX_UNIT_PRICE {
        return Err(AppError::with_message(
            ErrorCode::ProductInvalidPrice,
            format!("price must be at most {MAX_UNIT_PRICE}"),
        ));
    }
    if payload.commission_bps > MAX_COMMISSION_BPS {
        return Err(AppError::with_message(
            ErrorCode::ValueOutOfRange,
            format!("commission_bps must be at most {MAX_COMMISSION_BPS}"),
        ));
    }

    let existing = state.storage.get_product(&id)?;
    let seller_id = match user.role {
        Role::Seller => {
            if existing.as_ref().is_some_and(|p| p.seller_id != user.id) {
                return Err(AppError::forbidden("Product belongs to another seller"));
            }
            user.id.clone()
        }
        _ if user.is_staff() => payload
            .seller_id
            .clone()
            .or_else(|| existing.as_ref().map(|p| p.seller_id.clone()))
            .ok_or_else(|| AppError::validation("seller_id is required"))?,
        _ => return Err(AppError::forbidden("Only sellers and staff manage products")),
    };

    // Malformed windows are stored as-is and ignored at order time
    if let Some(window) = &payload.sale_window
        && window.bounds().is_none()
    {
        tracing::warn!(product_id = %id, start = %window.start, end = %window.end, "Malformed sale window");
    }

    let product = Product {
        id: id.clone(),
        seller_id,
        name: payload.name.trim().to_string(),
        price: payload.price,
        commission_bps: payload.commission_bps,
        stock: payload.stock,
        sale_window: payload.sale_window,
        requires_consultation: payload.requires_consultation,
        updated_at: now_millis(),
    };
    state.storage.upsert_product(&product)?;
    tracing::info!(product_id = %id, seller_id = %product.seller_id, stock = product.stock, "Product synced");
    Ok(ApiResponse::success(product))
}
