//! Unified error codes for the marketplace services
//!
//! Error codes are organized by category:
//! - 0xxx: General errors
//! - 1xxx: Authentication errors
//! - 2xxx: Permission errors
//! - 4xxx: Order errors
//! - 5xxx: Ledger and payout errors
//! - 6xxx: Product errors
//! - 7xxx: Delivery assignment errors
//! - 8xxx: Remittance errors
//! - 9xxx: System errors

use serde::{Deserialize, Serialize};
use std::fmt;

/// Unified error code enum
///
/// All error codes are represented as u16 values so mobile and web clients
/// can switch on them without parsing messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "u16", try_from = "u16")]
#[repr(u16)]
pub enum ErrorCode {
    // ==================== 0xxx: General ====================
    /// Operation completed successfully
    Success = 0,
    /// Unknown error
    Unknown = 1,
    /// Validation failed
    ValidationFailed = 2,
    /// Resource not found
    NotFound = 3,
    /// Resource already exists
    AlreadyExists = 4,
    /// Invalid request
    InvalidRequest = 5,
    /// Required field missing
    RequiredField = 7,
    /// Value out of range
    ValueOutOfRange = 8,
    /// Business rule violation
    BusinessRule = 9,

    // ==================== 1xxx: Auth ====================
    /// User is not authenticated
    NotAuthenticated = 1001,
    /// Token has expired
    TokenExpired = 1003,
    /// Token is invalid
    TokenInvalid = 1004,

    // ==================== 2xxx: Permission ====================
    /// Permission denied
    PermissionDenied = 2001,
    /// Specific role required
    RoleRequired = 2002,
    /// Admin role required
    AdminRequired = 2003,

    // ==================== 4xxx: Order ====================
    /// Order not found
    OrderNotFound = 4001,
    /// Order has no items
    OrderEmpty = 4002,
    /// Transition not allowed from the current status
    InvalidStatusTransition = 4003,
    /// Order can no longer be canceled
    OrderNotCancelable = 4004,
    /// Order already has a shipper
    OrderAlreadyAssigned = 4005,
    /// Client total does not match the computed total
    OrderTotalMismatch = 4006,
    /// Shipping address incomplete
    ShippingAddressInvalid = 4007,

    // ==================== 5xxx: Ledger / Payout ====================
    /// Balance is zero or negative
    InsufficientBalance = 5001,
    /// Seller already has an open payout request
    PayoutAlreadyPending = 5002,
    /// Payout request not found
    PayoutNotFound = 5003,
    /// Payout request already settled
    PayoutAlreadySettled = 5004,
    /// Invalid payout status change
    InvalidPayoutTransition = 5005,

    // ==================== 6xxx: Product ====================
    /// Product not found
    ProductNotFound = 6001,
    /// Product out of stock
    ProductOutOfStock = 6002,
    /// Product is outside its sale window
    SaleWindowClosed = 6003,
    /// Product price invalid
    ProductInvalidPrice = 6004,

    // ==================== 7xxx: Delivery ====================
    /// No pending delivery record for the order
    DeliveryNotFound = 7001,
    /// Shipper was not offered this order
    DeliveryNotOffered = 7002,
    /// Shipper not found
    ShipperNotFound = 7003,
    /// Coordinates invalid
    LocationInvalid = 7004,

    // ==================== 8xxx: Remittance ====================
    /// Remittance request not found
    RemittanceNotFound = 8001,
    /// Remittance request already processed
    RemittanceAlreadyProcessed = 8002,
    /// Shipper already has a pending remittance request
    RemittanceAlreadyPending = 8003,
    /// Amount must be positive
    RemittanceInvalidAmount = 8004,

    // ==================== 9xxx: System ====================
    /// Internal server error
    InternalError = 9001,
    /// Database error
    DatabaseError = 9002,
    /// Network error
    NetworkError = 9003,
    /// Timeout error
    TimeoutError = 9004,
    /// Configuration error
    ConfigError = 9005,
    /// Notification delivery failed
    NotificationFailed = 9006,
}

impl ErrorCode {
    /// Get the numeric code value
    #[inline]
    pub const fn code(&self) -> u16 {
        *self as u16
    }

    /// Check if this is a success code
    pub const fn is_success(&self) -> bool {
        matches!(self, Self::Success)
    }

    /// Get the default message for this error code
    pub const fn message(&self) -> &'static str {
        match self {
            Self::Success => "Success",
            Self::Unknown => "Unknown error",
            Self::ValidationFailed => "Validation failed",
            Self::NotFound => "Resource not found",
            Self::AlreadyExists => "Resource already exists",
            Self::InvalidRequest => "Invalid request",
            Self::RequiredField => "Required field missing",
            Self::ValueOutOfRange => "Value out of range",
            Self::BusinessRule => "Business rule violation",

            Self::NotAuthenticated => "Not authenticated",
            Self::TokenExpired => "Token has expired",
            Self::TokenInvalid => "Invalid token",

            Self::PermissionDenied => "Permission denied",
            Self::RoleRequired => "Role required",
            Self::AdminRequired => "Admin role required",

            Self::OrderNotFound => "Order not found",
            Self::OrderEmpty => "Order has no items",
            Self::InvalidStatusTransition => "Status transition not allowed",
            Self::OrderNotCancelable => "Order can no longer be canceled",
            Self::OrderAlreadyAssigned => "Order already has a shipper",
            Self::OrderTotalMismatch => "Order total does not match items",
            Self::ShippingAddressInvalid => "Shipping address is incomplete",

            Self::InsufficientBalance => "Insufficient balance",
            Self::PayoutAlreadyPending => "A payout request is already open",
            Self::PayoutNotFound => "Payout request not found",
            Self::PayoutAlreadySettled => "Payout request already settled",
            Self::InvalidPayoutTransition => "Payout status change not allowed",

            Self::ProductNotFound => "Product not found",
            Self::ProductOutOfStock => "Product out of stock",
            Self::SaleWindowClosed => "Product is not on sale at this time",
            Self::ProductInvalidPrice => "Invalid product price",

            Self::DeliveryNotFound => "Delivery record not found",
            Self::DeliveryNotOffered => "Order was not offered to this shipper",
            Self::ShipperNotFound => "Shipper not found",
            Self::LocationInvalid => "Invalid coordinates",

            Self::RemittanceNotFound => "Remittance request not found",
            Self::RemittanceAlreadyProcessed => "Remittance request already processed",
            Self::RemittanceAlreadyPending => "A remittance request is already pending",
            Self::RemittanceInvalidAmount => "Remittance amount must be positive",

            Self::InternalError => "Internal server error",
            Self::DatabaseError => "Database error",
            Self::NetworkError => "Network error",
            Self::TimeoutError => "Operation timed out",
            Self::ConfigError => "Configuration error",
            Self::NotificationFailed => "Notification delivery failed",
        }
    }
}

impl From<ErrorCode> for u16 {
    #[inline]
    fn from(code: ErrorCode) -> Self {
        code as u16
    }
}

/// Error returned when converting an unknown u16 to [`ErrorCode`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InvalidErrorCode(pub u16);

impl fmt::Display for InvalidErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid error code: {}", self.0)
    }
}

impl std::error::Error for InvalidErrorCode {}

impl TryFrom<u16> for ErrorCode {
    type Error = InvalidErrorCode;

    fn try_from(value: u16) -> Result<Self, Self::Error> {
        match value {
            // General
            0 => Ok(ErrorCode::Success),
            1 => Ok(ErrorCode::Unknown),
            2 => Ok(ErrorCode::ValidationFailed),
            3 => Ok(ErrorCode::NotFound),
            4 => Ok(ErrorCode::AlreadyExists),
            5 => Ok(ErrorCode::InvalidRequest),
            7 => Ok(ErrorCode::RequiredField),
            8 => Ok(ErrorCode::ValueOutOfRange),
            9 => Ok(ErrorCode::BusinessRule),

            // Auth
            1001 => Ok(ErrorCode::NotAuthenticated),
            1003 => Ok(ErrorCode::TokenExpired),
            1004 => Ok(ErrorCode::TokenInvalid),

            // Permission
            2001 => Ok(ErrorCode::PermissionDenied),
            2002 => Ok(ErrorCode::RoleRequired),
            2003 => Ok(ErrorCode::AdminRequired),

            // Order
            4001 => Ok(ErrorCode::OrderNotFound),
            4002 => Ok(ErrorCode::OrderEmpty),
            4003 => Ok(ErrorCode::InvalidStatusTransition),
            4004 => Ok(ErrorCode::OrderNotCancelable),
            4005 => Ok(ErrorCode::OrderAlreadyAssigned),
            4006 => Ok(ErrorCode::OrderTotalMismatch),
            4007 => Ok(ErrorCode::ShippingAddressInvalid),

            // Ledger / Payout
            5001 => Ok(ErrorCode::InsufficientBalance),
            5002 => Ok(ErrorCode::PayoutAlreadyPending),
            5003 => Ok(ErrorCode::PayoutNotFound),
            5004 => Ok(ErrorCode::PayoutAlreadySettled),
            5005 => Ok(ErrorCode::InvalidPayoutTransition),

            // Product
            6001 => Ok(ErrorCode::ProductNotFound),
            6002 => Ok(ErrorCode::ProductOutOfStock),
            6003 => Ok(ErrorCode::SaleWindowClosed),
            6004 => Ok(ErrorCode::ProductInvalidPrice),

            // Delivery
            7001 => Ok(ErrorCode::DeliveryNotFound),
            7002 => Ok(ErrorCode::DeliveryNotOffered),
            7003 => Ok(ErrorCode::ShipperNotFound),
            7004 => Ok(ErrorCode::LocationInvalid),

            // Remittance
            8001 => Ok(ErrorCode::RemittanceNotFound),
            8002 => Ok(ErrorCode::RemittanceAlreadyProcessed),
            8003 => Ok(ErrorCode::RemittanceAlreadyPending),
            8004 => Ok(ErrorCode::RemittanceInvalidAmount),

            // System
            9001 => Ok(ErrorCode::InternalError),
            9002 => Ok(ErrorCode::DatabaseError),
            9003 => Ok(ErrorCode::NetworkError),
            9004 => Ok(ErrorCode::TimeoutError),
            9005 => Ok(ErrorCode::ConfigError),
            9006 => Ok(ErrorCode::NotificationFailed),

            _ => Err(InvalidErrorCode(value)),
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}
