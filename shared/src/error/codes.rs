//! Unified error codes for the marketplace
//!
//! Error codes are organized by category:
//! - 0xxx: General errors
//! - 1xxx: Authentication errors
//! - 2xxx: Permission errors
//! - 4xxx: Order errors
//! - 5xxx: Payment errors
//! - 6xxx: Listing errors
//! - 9xxx: System errors

use serde::{Deserialize, Serialize};
use std::fmt;

/// Unified error code enum
///
/// All error codes are represented as u16 values so clients can switch on them
/// without parsing messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "u16", try_from = "u16")]
#[repr(u16)]
pub enum ErrorCode {
    // ==================== 0xxx: General ====================
    /// Operation completed successfully
    Success = 0,
    /// Validation failed
    ValidationFailed = 2,
    /// Invalid request
    InvalidRequest = 5,

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
    /// Farmer account awaits admin approval
    AccountPendingApproval = 2006,

    // ==================== 4xxx: Order ====================
    /// Order not found
    OrderNotFound = 4001,
    /// Order is empty
    OrderEmpty = 4007,
    /// Order status does not allow this operation
    OrderInvalidState = 4008,
    /// Line quantity must be a positive integer
    InvalidQuantity = 4009,
    /// Order total does not fit the stored money range
    OrderTotalTooLarge = 4010,

    // ==================== 5xxx: Payment ====================
    /// Payment provider rejected or could not be reached
    PaymentGatewayFailed = 5006,
    /// No contact number on file for the payer
    ContactMissing = 5007,
    /// Checkout request id already recorded
    DuplicateCheckoutRequest = 5008,
    /// Payment callback envelope could not be understood
    InvalidCallback = 5009,
    /// No transaction matches the callback correlation id
    TransactionNotFound = 5010,

    // ==================== 6xxx: Listing ====================
    /// Listing not found
    ListingNotFound = 6001,
    /// Not enough stock to fill the requested quantity
    InsufficientStock = 6003,
    /// Listing is referenced by existing orders
    ListingInUse = 6004,
    /// Caller does not own the listing
    ListingNotOwned = 6005,

    // ==================== 9xxx: System ====================
    /// Internal server error
    InternalError = 9001,
    /// Database error
    DatabaseError = 9002,
}

impl ErrorCode {
    /// Get the numeric code value
    #[inline]
    pub const fn code(&self) -> u16 {
        *self as u16
    }

    /// Check if this is a success code
    #[inline]
    pub const fn is_success(&self) -> bool {
        matches!(self, ErrorCode::Success)
    }

    /// Get the developer-facing English message for this error code
    pub const fn message(&self) -> &'static str {
        match self {
            // General
            ErrorCode::Success => "Operation completed successfully",
            ErrorCode::ValidationFailed => "Validation failed",
            ErrorCode::InvalidRequest => "Invalid request",

            // Auth
            ErrorCode::NotAuthenticated => "User is not authenticated",
            ErrorCode::TokenExpired => "Authentication token has expired",
            ErrorCode::TokenInvalid => "Authentication token is invalid",

            // Permission
            ErrorCode::PermissionDenied => "Permission denied",
            ErrorCode::RoleRequired => "Specific role is required",
            ErrorCode::AccountPendingApproval => "Your farmer account is pending approval",

            // Order
            ErrorCode::OrderNotFound => "Order not found",
            ErrorCode::OrderEmpty => "Order must contain at least one item",
            ErrorCode::OrderInvalidState => "Order is not in a valid state for this operation",
            ErrorCode::InvalidQuantity => "Quantity must be greater than zero",
            ErrorCode::OrderTotalTooLarge => "Order total is too large",

            // Payment
            ErrorCode::PaymentGatewayFailed => "Failed to initiate payment",
            ErrorCode::ContactMissing => "No phone number on file for this user",
            ErrorCode::DuplicateCheckoutRequest => "Checkout request already recorded",
            ErrorCode::InvalidCallback => "Invalid callback data",
            ErrorCode::TransactionNotFound => "Transaction not found",

            // Listing
            ErrorCode::ListingNotFound => "Produce not found",
            ErrorCode::InsufficientStock => "Insufficient stock",
            ErrorCode::ListingInUse => "Produce is part of existing orders",
            ErrorCode::ListingNotOwned => "Unauthorized: You do not own this listing",

            // System
            ErrorCode::InternalError => "Internal server error",
            ErrorCode::DatabaseError => "Database error",
        }
    }
}

impl From<ErrorCode> for u16 {
    #[inline]
    fn from(code: ErrorCode) -> Self {
        code.code()
    }
}

/// Error when converting from an invalid u16 to ErrorCode
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
            2 => Ok(ErrorCode::ValidationFailed),
            5 => Ok(ErrorCode::InvalidRequest),

            // Auth
            1001 => Ok(ErrorCode::NotAuthenticated),
            1003 => Ok(ErrorCode::TokenExpired),
            1004 => Ok(ErrorCode::TokenInvalid),

            // Permission
            2001 => Ok(ErrorCode::PermissionDenied),
            2002 => Ok(ErrorCode::RoleRequired),
            2006 => Ok(ErrorCode::AccountPendingApproval),

            // Order
            4001 => Ok(ErrorCode::OrderNotFound),
            4007 => Ok(ErrorCode::OrderEmpty),
            4008 => Ok(ErrorCode::OrderInvalidState),
            4009 => Ok(ErrorCode::InvalidQuantity),
            4010 => Ok(ErrorCode::OrderTotalTooLarge),

            // Payment
            5006 => Ok(ErrorCode::PaymentGatewayFailed),
            5007 => Ok(ErrorCode::ContactMissing),
            5008 => Ok(ErrorCode::DuplicateCheckoutRequest),
            5009 => Ok(ErrorCode::InvalidCallback),
            5010 => Ok(ErrorCode::TransactionNotFound),

            // Listing
            6001 => Ok(ErrorCode::ListingNotFound),
            6003 => Ok(ErrorCode::InsufficientStock),
            6004 => Ok(ErrorCode::ListingInUse),
            6005 => Ok(ErrorCode::ListingNotOwned),

            // System
            9001 => Ok(ErrorCode::InternalError),
            9002 => Ok(ErrorCode::DatabaseError),

            _ => Err(InvalidErrorCode(value)),
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}
