//! Unified error types for the wallet core.
//!
//! Every variant renders as a message that can be shown to the user as-is.
//! Only [`Error::BackendUnavailable`] is safe to retry; everything else needs the
//! user to change their input (pick another coupon, earn more points).

use thiserror::Error;

/// Every failure a wallet operation can report.
#[derive(Debug, Error)]
pub enum Error {
    /// The catalog query failed or timed out
    #[error("The coupon catalog is unavailable right now: {message}")]
    CatalogUnavailable {
        /// Backend detail
        message: String,
    },

    /// The coupon is unknown, inactive or past its expiry date
    #[error("Coupon {coupon_id} is no longer available")]
    CouponUnavailable {
        /// Catalog coupon id
        coupon_id: i64,
    },

    /// The balance does not cover the coupon's cost
    #[error("Not enough points: you have {available}, this coupon costs {required}")]
    InsufficientPoints {
        /// Balance seen when the request was refused
        available: i64,
        /// Points the coupon costs
        required: i64,
    },

    /// An active copy is held and the redemption policy forbids another
    #[error("You already hold an active redemption of coupon {coupon_id}")]
    AlreadyOwned {
        /// Catalog coupon id
        coupon_id: i64,
    },

    /// Network or backend fault; the request did not apply and may be retried
    #[error("The service is unavailable, please try again: {message}")]
    BackendUnavailable {
        /// Backend detail
        message: String,
    },

    /// No owned coupon with this id belongs to the user
    #[error("Owned coupon {owned_coupon_id} not found")]
    CouponNotFound {
        /// Owned coupon id
        owned_coupon_id: i64,
    },

    /// The owned coupon's stored status does not allow the requested move
    #[error("Cannot move coupon from {from} to {to}")]
    InvalidStatusTransition {
        /// Status observed in the database
        from: String,
        /// Status that was requested
        to: String,
    },

    /// A point amount outside the allowed range
    #[error("Invalid point amount: {points}")]
    InvalidPoints {
        /// Offending amount
        points: i64,
    },

    /// A negative or non-finite price
    #[error("Invalid amount: {amount}")]
    InvalidAmount {
        /// Offending price
        amount: f64,
    },

    /// Invalid configuration or input text
    #[error("Configuration error: {message}")]
    Config {
        /// What was wrong
        message: String,
    },
}

impl Error {
    /// Whether a manual retry of the same request may succeed.
    ///
    /// Only transport and backend faults qualify. The transaction did not apply in
    /// that case, though callers that never saw a response should confirm through
    /// the wallet before retrying a redemption.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(self, Self::BackendUnavailable { .. })
    }
}

impl From<sea_orm::DbErr> for Error {
    fn from(value: sea_orm::DbErr) -> Self {
        Self::BackendUnavailable {
            message: value.to_string(),
        }
    }
}

/// Convenience `Result` type
pub type Result<T> = std::result::Result<T, Error>;
