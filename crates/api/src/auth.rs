//! Buyer context supplied by the upstream auth collaborator.
//!
//! Token verification happens upstream; identity reaches this service as
//! pre-verified `x-buyer-id` / `x-buyer-email` headers. Absence of both
//! means an anonymous (guest) request.

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use common::UserId;
use domain::Buyer;
use uuid::Uuid;

use crate::error::ApiError;

/// The already-verified identity of the requester, when present.
#[derive(Debug, Clone)]
pub struct BuyerContext(pub Option<Buyer>);

impl BuyerContext {
    /// Returns the buyer, or a 401-style error for endpoints that require one.
    pub fn require(self) -> Result<Buyer, ApiError> {
        self.0
            .ok_or_else(|| ApiError::Unauthorized("Authentication required".to_string()))
    }
}

impl<S: Send + Sync> FromRequestParts<S> for BuyerContext {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let id = parts
            .headers
            .get("x-buyer-id")
            .and_then(|value| value.to_str().ok());
        let email = parts
            .headers
            .get("x-buyer-email")
            .and_then(|value| value.to_str().ok());

        match (id, email) {
            (Some(id), Some(email)) if !email.is_empty() => {
                let uuid = Uuid::parse_str(id).map_err(|e| {
                    ApiError::BadRequest(format!("Invalid x-buyer-id header: {e}"))
                })?;
                Ok(BuyerContext(Some(Buyer {
                    id: UserId::from_uuid(uuid),
                    email: email.to_string(),
                })))
            }
            _ => Ok(BuyerContext(None)),
        }
    }
}
