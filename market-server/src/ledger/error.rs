use crate::storage::StorageError;
use shared::error::{AppError, ErrorCode};
use shared::models::PayoutStatus;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("Order not found: {0}")]
    OrderNotFound(String),

    #[error("Ledger amounts must be positive, got {0}")]
    InvalidAmount(i64),

    #[error("Balance {balance} of seller {seller_id} cannot cover {amount}")]
    InsufficientBalance {
        seller_id: String,
        balance: i64,
        amount: i64,
    },

    #[error("Nothing to pay out (balance {0})")]
    NothingToPayOut(i64),

    #[error("A payout request is already open: {0}")]
    PayoutAlreadyOpen(String),

    #[error("Payout request not found: {0}")]
    PayoutNotFound(String),

    #[error("Payout request {0} is already {1:?}")]
    PayoutAlreadySettled(String, PayoutStatus),

    #[error("Cannot move payout from {from:?} to {to:?}")]
    InvalidPayoutTransition { from: PayoutStatus, to: PayoutStatus },

    #[error("Ledger of seller {seller_id} is missing entry {seq}")]
    Corrupted { seller_id: String, seq: u64 },

    #[error(transparent)]
    Storage(#[from] StorageError),
}

pub type LedgerResult<T> = Result<T, LedgerError>;

impl From<LedgerError> for AppError {
    fn from(err: LedgerError) -> Self {
        let message = err.to_string();
        match err {
            LedgerError::OrderNotFound(id) => {
                AppError::with_message(ErrorCode::OrderNotFound, message).with_detail("order_id", id)
            }
            LedgerError::InvalidAmount(_) => AppError::validation(message),
            LedgerError::InsufficientBalance {
                seller_id,
                balance,
                amount,
            } => AppError::with_message(ErrorCode::InsufficientBalance, message)
                .with_detail("seller_id", seller_id)
                .with_detail("balance", balance)
                .with_detail("amount", amount),
            LedgerError::NothingToPayOut(balance) => {
                AppError::with_message(ErrorCode::InsufficientBalance, message)
                    .with_detail("balance", balance)
            }
            LedgerError::PayoutAlreadyOpen(id) => {
                AppError::with_message(ErrorCode::PayoutAlreadyPending, message)
                    .with_detail("request_id", id)
            }
            LedgerError::PayoutNotFound(_) => {
                AppError::with_message(ErrorCode::PayoutNotFound, message)
            }
            LedgerError::PayoutAlreadySettled(..) => {
                AppError::with_message(ErrorCode::PayoutAlreadySettled, message)
            }
            LedgerError::InvalidPayoutTransition { .. } => {
                AppError::with_message(ErrorCode::InvalidPayoutTransition, message)
            }
            LedgerError::Corrupted { .. } => AppError::internal(message),
            LedgerError::Storage(e) => e.into(),
        }
    }
}
