use async_trait::async_trait;
use domain::Money;

use crate::Result;
use crate::provider::ProviderState;

/// A request to push a payment prompt to a buyer's phone.
#[derive(Debug, Clone)]
pub struct PushRequest {
    pub amount: Money,

    /// Raw phone input; the gateway normalizes and validates it.
    pub phone: String,

    pub email: String,

    pub full_name: String,

    /// Merchant-side reference carried through the provider, typically the
    /// order ID the payment settles.
    pub api_ref: String,
}

/// Acknowledgement of an accepted push.
#[derive(Debug, Clone)]
pub struct PushReceipt {
    /// The provider's reference for this payment attempt.
    pub invoice_id: String,

    pub state: ProviderState,

    /// Raw provider payload, stored opaquely for audit.
    pub raw: serde_json::Value,
}

/// Outcome of a push initiation.
///
/// Missing credentials are an `Ok` outcome, not an error, so callers can
/// present a "payment not available" state distinct from a provider failure.
#[derive(Debug, Clone)]
pub enum InitiateOutcome {
    /// The gateway has no credentials; no push was attempted.
    NotConfigured,

    /// The provider accepted the push.
    Initiated(PushReceipt),
}

/// A point-in-time view of a payment attempt's provider state.
#[derive(Debug, Clone)]
pub struct StatusSnapshot {
    pub invoice_id: String,

    pub state: ProviderState,

    pub raw: serde_json::Value,
}

/// Trait for mobile-money provider operations.
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    /// Initiates a payment prompt on the buyer's phone.
    async fn initiate_push(&self, request: PushRequest) -> Result<InitiateOutcome>;

    /// Polls the provider for the state of a payment attempt.
    ///
    /// Implementations must map ambiguous or transient provider responses to
    /// [`ProviderState::Pending`]; only the provider's explicit failure
    /// vocabulary may surface as [`ProviderState::Failed`].
    async fn poll_status(&self, invoice_id: &str) -> Result<StatusSnapshot>;
}
