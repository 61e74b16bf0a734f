//! Normalization of the provider's loosely-typed payloads.
//!
//! The provider reports payment state under alternate field names and an open
//! vocabulary. Everything is mapped onto a closed three-state enum at this
//! boundary; raw provider strings never leak past the adapter.

use serde::{Deserialize, Serialize};

/// Closed payment state vocabulary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderState {
    /// Not yet settled, or anything the provider reports that we do not
    /// recognize. Ambiguous vocabulary must land here, never on `Failed`,
    /// so a transient provider hiccup cannot flap a payment to failed.
    Pending,

    /// Provider confirmed the payment.
    Paid,

    /// Provider explicitly reported failure or cancellation.
    Failed,
}

impl ProviderState {
    /// Maps a raw provider state string onto the closed vocabulary.
    pub fn from_raw(raw: &str) -> Self {
        match raw.trim().to_lowercase().as_str() {
            "complete" | "completed" | "success" | "succeeded" | "paid" => ProviderState::Paid,
            "failed" | "cancelled" | "canceled" | "declined" => ProviderState::Failed,
            _ => ProviderState::Pending,
        }
    }

    /// Returns true if this is a settled-successfully state.
    pub fn is_paid(&self) -> bool {
        matches!(self, ProviderState::Paid)
    }

    /// Returns true if this is an explicit failure state.
    pub fn is_failed(&self) -> bool {
        matches!(self, ProviderState::Failed)
    }
}

impl std::fmt::Display for ProviderState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            ProviderState::Pending => "pending",
            ProviderState::Paid => "paid",
            ProviderState::Failed => "failed",
        };
        write!(f, "{name}")
    }
}

/// Extracts the raw state string from a provider payload, checking the
/// alternate field spellings the provider uses.
pub fn state_field(data: &serde_json::Value) -> &str {
    data.get("state")
        .and_then(|v| v.as_str())
        .or_else(|| data.get("status").and_then(|v| v.as_str()))
        .unwrap_or("")
}

/// Extracts the invoice reference from a provider payload.
///
/// The provider nests it under `invoice.invoice_id` on push responses and
/// flattens it to `invoice_id` or `id` elsewhere.
pub fn invoice_id(data: &serde_json::Value) -> Option<String> {
    data.get("invoice")
        .and_then(|invoice| invoice.get("invoice_id"))
        .or_else(|| data.get("invoice_id"))
        .or_else(|| data.get("id"))
        .and_then(|v| v.as_str())
        .map(str::to_string)
}

/// Extracts a human-readable error detail from a provider error payload.
pub fn error_detail(data: &serde_json::Value) -> String {
    if let Some(text) = data.as_str() {
        return text.to_string();
    }

    if let Some(errors) = data.get("errors").and_then(|v| v.as_array())
        && let Some(first) = errors.first()
    {
        if let Some(detail) = first
            .get("detail")
            .or_else(|| first.get("message"))
            .and_then(|v| v.as_str())
        {
            return detail.to_string();
        }
        return first.to_string();
    }

    for key in ["detail", "message", "error"] {
        if let Some(text) = data.get(key).and_then(|v| v.as_str()) {
            return text.to_string();
        }
    }

    String::new()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_paid_vocabulary() {
        for raw in ["COMPLETE", "completed", "Success", "succeeded", "paid"] {
            assert_eq!(ProviderState::from_raw(raw), ProviderState::Paid, "{raw}");
        }
    }

    #[test]
    fn test_failed_vocabulary() {
        for raw in ["FAILED", "cancelled", "canceled", "Declined"] {
            assert_eq!(ProviderState::from_raw(raw), ProviderState::Failed, "{raw}");
        }
    }

    #[test]
    fn test_unknown_vocabulary_is_pending() {
        for raw in ["", "PROCESSING", "queued", "retry", "unknown-state"] {
            assert_eq!(ProviderState::from_raw(raw), ProviderState::Pending, "{raw}");
        }
    }

    #[test]
    fn test_state_field_alternates() {
        assert_eq!(state_field(&json!({"state": "PAID"})), "PAID");
        assert_eq!(state_field(&json!({"status": "FAILED"})), "FAILED");
        assert_eq!(state_field(&json!({"other": 1})), "");
    }

    #[test]
    fn test_invoice_id_alternates() {
        assert_eq!(
            invoice_id(&json!({"invoice": {"invoice_id": "INV-1"}})),
            Some("INV-1".to_string())
        );
        assert_eq!(
            invoice_id(&json!({"invoice_id": "INV-2"})),
            Some("INV-2".to_string())
        );
        assert_eq!(invoice_id(&json!({"id": "INV-3"})), Some("INV-3".to_string()));
        assert_eq!(invoice_id(&json!({})), None);
    }

    #[test]
    fn test_error_detail_shapes() {
        assert_eq!(error_detail(&json!("plain text")), "plain text");
        assert_eq!(
            error_detail(&json!({"errors": [{"detail": "bad phone"}]})),
            "bad phone"
        );
        assert_eq!(
            error_detail(&json!({"errors": [{"message": "rejected"}]})),
            "rejected"
        );
        assert_eq!(error_detail(&json!({"detail": "nope"})), "nope");
        assert_eq!(error_detail(&json!({"message": "denied"})), "denied");
        assert_eq!(error_detail(&json!({"error": "oops"})), "oops");
        assert_eq!(error_detail(&json!({})), "");
    }
}
