//! Checkout error types.

use domain::OrderError;
use gateway::GatewayError;
use store::StoreError;
use thiserror::Error;

/// Errors that can occur during checkout operations.
#[derive(Debug, Error)]
pub enum CheckoutError {
    /// Order validation error.
    #[error("Order error: {0}")]
    Order(#[from] OrderError),

    /// Store error.
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    /// Payment gateway error.
    #[error("Gateway error: {0}")]
    Gateway(#[from] GatewayError),
}

/// Convenience type alias for checkout results.
pub type Result<T> = std::result::Result<T, CheckoutError>;
