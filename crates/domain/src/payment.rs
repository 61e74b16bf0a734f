//! Payment attempt state machine.

use chrono::{DateTime, Utc};
use common::OrderId;
use serde::{Deserialize, Serialize};

use crate::order::PaymentMethod;

/// The state of a single payment attempt against an order.
///
/// ```text
/// Initiated ──► Pending ──┬──► Confirmed
///                         ├──► Failed
///                         └──► Abandoned
/// ```
///
/// `Abandoned` is reached only by exhausting the reconciliation poll bound
/// and is distinct from an explicit provider-reported failure; both leave the
/// order retryable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum AttemptState {
    /// Push accepted by the provider, reconciliation not yet running.
    #[default]
    Initiated,

    /// Reconciliation is polling the provider.
    Pending,

    /// Provider confirmed payment (terminal state).
    Confirmed,

    /// Provider explicitly reported failure or cancellation (terminal state).
    Failed,

    /// Poll bound exhausted without a terminal provider state (terminal state).
    Abandoned,
}

impl AttemptState {
    /// Returns true if no further reconciliation will run for this attempt.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            AttemptState::Confirmed | AttemptState::Failed | AttemptState::Abandoned
        )
    }

    /// Returns the state name as stored and served.
    pub fn as_str(&self) -> &'static str {
        match self {
            AttemptState::Initiated => "initiated",
            AttemptState::Pending => "pending",
            AttemptState::Confirmed => "confirmed",
            AttemptState::Failed => "failed",
            AttemptState::Abandoned => "abandoned",
        }
    }

    /// Parses a stored state name.
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "initiated" => Some(AttemptState::Initiated),
            "pending" => Some(AttemptState::Pending),
            "confirmed" => Some(AttemptState::Confirmed),
            "failed" => Some(AttemptState::Failed),
            "abandoned" => Some(AttemptState::Abandoned),
            _ => None,
        }
    }
}

impl std::fmt::Display for AttemptState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A single attempt to settle an order through the payment provider.
///
/// Keyed by the provider's invoice reference. At most one non-terminal
/// attempt exists per order; a retry after failure or abandonment records a
/// fresh attempt against the same order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentAttempt {
    /// The external provider's reference for this attempt.
    pub invoice_id: String,

    pub order_id: OrderId,

    pub channel: PaymentMethod,

    pub state: AttemptState,

    pub created_at: DateTime<Utc>,

    pub updated_at: DateTime<Utc>,
}

impl PaymentAttempt {
    /// Creates a freshly initiated attempt.
    pub fn initiated(invoice_id: impl Into<String>, order_id: OrderId, channel: PaymentMethod) -> Self {
        let now = Utc::now();
        Self {
            invoice_id: invoice_id.into(),
            order_id,
            channel,
            state: AttemptState::Initiated,
            created_at: now,
            updated_at: now,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_terminal_states() {
        assert!(!AttemptState::Initiated.is_terminal());
        assert!(!AttemptState::Pending.is_terminal());
        assert!(AttemptState::Confirmed.is_terminal());
        assert!(AttemptState::Failed.is_terminal());
        assert!(AttemptState::Abandoned.is_terminal());
    }

    #[test]
    fn test_parse_roundtrip() {
        for state in [
            AttemptState::Initiated,
            AttemptState::Pending,
            AttemptState::Confirmed,
            AttemptState::Failed,
            AttemptState::Abandoned,
        ] {
            assert_eq!(AttemptState::parse(state.as_str()), Some(state));
        }
        assert_eq!(AttemptState::parse("settled"), None);
    }

    #[test]
    fn test_initiated_attempt() {
        let order_id = OrderId::new();
        let attempt = PaymentAttempt::initiated("INV-001", order_id, PaymentMethod::MobileMoney);
        assert_eq!(attempt.invoice_id, "INV-001");
        assert_eq!(attempt.order_id, order_id);
        assert_eq!(attempt.state, AttemptState::Initiated);
    }
}
