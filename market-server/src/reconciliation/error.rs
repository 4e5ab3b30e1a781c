use crate::storage::StorageError;
use shared::error::{AppError, ErrorCode};
use shared::models::RemittanceRequestStatus;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ReconciliationError {
    #[error("Remittance amount must be positive, got {0}")]
    InvalidAmount(i64),

    #[error("{0}")]
    Validation(String),

    #[error("Shipper already has a pending remittance request: {0}")]
    AlreadyPending(String),

    #[error("Remittance request not found: {0}")]
    RequestNotFound(String),

    #[error("Remittance request {0} is already {1:?}")]
    AlreadyProcessed(String, RemittanceRequestStatus),

    #[error(transparent)]
    Storage(#[from] StorageError),
}

pub type ReconciliationResult<T> = Result<T, ReconciliationError>;

impl From<ReconciliationError> for AppError {
    fn from(err: ReconciliationError) -> Self {
        let message = err.to_string();
        match err {
            ReconciliationError::InvalidAmount(amount) => {
                AppError::with_message(ErrorCode::RemittanceInvalidAmount, message)
                    .with_detail("amount", amount)
            }
            ReconciliationError::Validation(msg) => AppError::validation(msg),
            ReconciliationError::AlreadyPending(id) => {
                AppError::with_message(ErrorCode::RemittanceAlreadyPending, message)
                    .with_detail("request_id", id)
            }
            ReconciliationError::RequestNotFound(id) => {
                AppError::with_message(ErrorCode::RemittanceNotFound, message)
                    .with_detail("request_id", id)
            }
            ReconciliationError::AlreadyProcessed(id, _) => {
                AppError::with_message(ErrorCode::RemittanceAlreadyProcessed, message)
                    .with_detail("request_id", id)
            }
            ReconciliationError::Storage(e) => e.into(),
        }
    }
}
