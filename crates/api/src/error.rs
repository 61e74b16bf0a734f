//! API error types with HTTP response mapping.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use checkout::CheckoutError;
use domain::OrderError;
use gateway::GatewayError;
use store::StoreError;

/// API-level error type that maps to HTTP responses.
#[derive(Debug)]
pub enum ApiError {
    /// Resource not found.
    NotFound(String),
    /// Bad request from the client.
    BadRequest(String),
    /// Missing buyer identity on an endpoint that requires one.
    Unauthorized(String),
    /// Checkout-layer error.
    Checkout(CheckoutError),
    /// Internal server error.
    Internal(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            ApiError::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, msg),
            ApiError::Checkout(err) => checkout_error_to_response(err),
            ApiError::Internal(msg) => {
                tracing::error!(error = %msg, "internal server error");
                (StatusCode::INTERNAL_SERVER_ERROR, msg)
            }
        };

        let body = serde_json::json!({ "error": message });
        (status, axum::Json(body)).into_response()
    }
}

fn checkout_error_to_response(err: CheckoutError) -> (StatusCode, String) {
    match &err {
        // Validation failures are client errors; a status-machine conflict is
        // a state the client can observe and retry around.
        CheckoutError::Order(order_err) => match order_err {
            OrderError::InvalidStatusTransition { .. } => (StatusCode::CONFLICT, err.to_string()),
            OrderError::NoItems
            | OrderError::GuestEmailRequired
            | OrderError::InvalidQuantity { .. }
            | OrderError::DeclaredTotalMismatch { .. } => {
                (StatusCode::BAD_REQUEST, err.to_string())
            }
        },
        CheckoutError::Store(store_err) => match store_err {
            StoreError::ProductNotFound(_)
            | StoreError::OrderNotFound(_)
            | StoreError::AttemptNotFound(_) => (StatusCode::NOT_FOUND, err.to_string()),
            StoreError::OutOfStock { .. } | StoreError::Order(_) => {
                (StatusCode::CONFLICT, err.to_string())
            }
            _ => {
                tracing::error!(error = %err, "store failure");
                (StatusCode::INTERNAL_SERVER_ERROR, err.to_string())
            }
        },
        CheckoutError::Gateway(gateway_err) => match gateway_err {
            // A configuration gap, not a user fault.
            GatewayError::MissingCredentials => (StatusCode::SERVICE_UNAVAILABLE, err.to_string()),
            GatewayError::InvalidPhone | GatewayError::Rejected { .. } => {
                (StatusCode::BAD_REQUEST, err.to_string())
            }
            GatewayError::Unreachable(_) => (StatusCode::BAD_GATEWAY, err.to_string()),
        },
    }
}

impl From<CheckoutError> for ApiError {
    fn from(err: CheckoutError) -> Self {
        ApiError::Checkout(err)
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        ApiError::Checkout(CheckoutError::Store(err))
    }
}

impl From<GatewayError> for ApiError {
    fn from(err: GatewayError) -> Self {
        ApiError::Checkout(CheckoutError::Gateway(err))
    }
}
