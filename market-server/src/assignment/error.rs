use crate::storage::StorageError;
use shared::error::{AppError, ErrorCode};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AssignmentError {
    #[error("Invalid location: {0}")]
    InvalidLocation(String),

    #[error("Shipper name must not be empty")]
    MissingName,

    #[error(transparent)]
    Storage(#[from] StorageError),
}

pub type AssignmentResult<T> = Result<T, AssignmentError>;

impl From<AssignmentError> for AppError {
    fn from(err: AssignmentError) -> Self {
        let message = err.to_string();
        match err {
            AssignmentError::InvalidLocation(_) => {
                AppError::with_message(ErrorCode::LocationInvalid, message)
            }
            AssignmentError::MissingName => AppError::with_message(ErrorCode::RequiredField, message),
            AssignmentError::Storage(e) => e.into(),
        }
    }
}
