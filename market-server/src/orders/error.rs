use crate::ledger::LedgerError;
use crate::storage::StorageError;
use shared::error::{AppError, ErrorCode};
use shared::models::OrderStatus;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum OrderError {
    #[error("Order not found: {0}")]
    NotFound(String),

    #[error("Order has no items")]
    EmptyCart,

    #[error("Invalid order: {0}")]
    Validation(String),

    #[error("Product not found: {0}")]
    ProductNotFound(String),

    #[error("{name} is not on sale at this time")]
    SaleWindowClosed { product_id: String, name: String },

    #[error("Not enough stock for {name}: requested {requested}, available {available}")]
    OutOfStock {
        product_id: String,
        name: String,
        requested: u32,
        available: u32,
    },

    #[error("Order total {submitted} does not match computed total {computed}")]
    TotalMismatch { submitted: i64, computed: i64 },

    #[error("Cannot move order from {from} to {to}")]
    InvalidTransition { from: OrderStatus, to: OrderStatus },

    #[error("Not allowed to move order from {from} to {to}")]
    TransitionForbidden { from: OrderStatus, to: OrderStatus },

    #[error("Only orders awaiting confirmation can be canceled (current: {0})")]
    NotCancelable(OrderStatus),

    #[error("Order already has a shipper")]
    AlreadyAssigned,

    #[error("Order was not offered to this shipper")]
    NotOffered,

    #[error("{0}")]
    Forbidden(String),

    #[error(transparent)]
    Ledger(#[from] LedgerError),

    #[error(transparent)]
    Storage(#[from] StorageError),
}

pub type OrderResult<T> = Result<T, OrderError>;

impl From<OrderError> for AppError {
    fn from(err: OrderError) -> Self {
        let message = err.to_string();
        match err {
            OrderError::NotFound(id) => {
                AppError::with_message(ErrorCode::OrderNotFound, message).with_detail("order_id", id)
            }
            OrderError::EmptyCart => AppError::with_message(ErrorCode::OrderEmpty, message),
            OrderError::Validation(_) => AppError::validation(message),
            OrderError::ProductNotFound(id) => {
                AppError::with_message(ErrorCode::ProductNotFound, message)
                    .with_detail("product_id", id)
            }
            OrderError::SaleWindowClosed { product_id, .. } => {
                AppError::with_message(ErrorCode::SaleWindowClosed, message)
                    .with_detail("product_id", product_id)
            }
            OrderError::OutOfStock {
                product_id,
                available,
                ..
            } => AppError::with_message(ErrorCode::ProductOutOfStock, message)
                .with_detail("product_id", product_id)
                .with_detail("available", available),
            OrderError::TotalMismatch { computed, .. } => {
                AppError::with_message(ErrorCode::OrderTotalMismatch, message)
                    .with_detail("computed_total", computed)
            }
            OrderError::InvalidTransition { from, to } => {
                AppError::with_message(ErrorCode::InvalidStatusTransition, message)
                    .with_detail("from", from.as_str())
                    .with_detail("to", to.as_str())
            }
            OrderError::TransitionForbidden { .. } => {
                AppError::with_message(ErrorCode::PermissionDenied, message)
            }
            OrderError::NotCancelable(status) => {
                AppError::with_message(ErrorCode::OrderNotCancelable, message)
                    .with_detail("status", status.as_str())
            }
            OrderError::AlreadyAssigned => {
                AppError::with_message(ErrorCode::OrderAlreadyAssigned, message)
            }
            OrderError::NotOffered => AppError::with_message(ErrorCode::DeliveryNotOffered, message),
            OrderError::Forbidden(msg) => AppError::forbidden(msg),
            OrderError::Ledger(e) => e.into(),
            OrderError::Storage(e) => e.into(),
        }
    }
}
