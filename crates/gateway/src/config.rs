//! Payment provider configuration loaded from environment variables.

/// Provider connection settings with sandbox defaults.
///
/// Reads from environment variables:
/// - `MOBILE_MONEY_PUBLIC_KEY` / `MOBILE_MONEY_SECRET_KEY` — credentials;
///   either missing means the gateway reports itself unconfigured
/// - `MOBILE_MONEY_STK_PUSH_URL` — push endpoint
/// - `MOBILE_MONEY_STATUS_URL` — status endpoint; may carry an
///   `{invoiceId}` placeholder
/// - `MOBILE_MONEY_BUSINESS_NAME` — shown on the payment prompt and used for
///   payment references
/// - `MOBILE_MONEY_CURRENCY` — ISO currency code (default `KES`)
#[derive(Debug, Clone)]
pub struct GatewayConfig {
    pub public_key: String,
    pub secret_key: String,
    pub stk_push_url: String,
    pub status_url: String,
    pub business_name: String,
    pub currency: String,
}

impl GatewayConfig {
    /// Loads configuration from environment variables, falling back to defaults.
    pub fn from_env() -> Self {
        Self {
            public_key: std::env::var("MOBILE_MONEY_PUBLIC_KEY").unwrap_or_default(),
            secret_key: std::env::var("MOBILE_MONEY_SECRET_KEY").unwrap_or_default(),
            stk_push_url: std::env::var("MOBILE_MONEY_STK_PUSH_URL").unwrap_or_else(|_| {
                "https://sandbox.intasend.com/api/v1/payment/mpesa-stk-push/".to_string()
            }),
            status_url: std::env::var("MOBILE_MONEY_STATUS_URL").unwrap_or_else(|_| {
                "https://sandbox.intasend.com/api/v1/payment/status/".to_string()
            }),
            business_name: std::env::var("MOBILE_MONEY_BUSINESS_NAME")
                .unwrap_or_else(|_| "Savanna Store".to_string()),
            currency: std::env::var("MOBILE_MONEY_CURRENCY").unwrap_or_else(|_| "KES".to_string()),
        }
    }

    /// Returns true if both credentials are present.
    pub fn is_configured(&self) -> bool {
        !self.public_key.is_empty() && !self.secret_key.is_empty()
    }

    /// Returns the uppercase alphanumeric reference prefix derived from the
    /// business name, used when the caller supplies no payment reference.
    pub fn reference_prefix(&self) -> String {
        let safe: String = self
            .business_name
            .chars()
            .filter(|c| c.is_ascii_alphanumeric())
            .collect::<String>()
            .to_uppercase();
        if safe.is_empty() { "STORE".to_string() } else { safe }
    }
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            public_key: String::new(),
            secret_key: String::new(),
            stk_push_url: "https://sandbox.intasend.com/api/v1/payment/mpesa-stk-push/"
                .to_string(),
            status_url: "https://sandbox.intasend.com/api/v1/payment/status/".to_string(),
            business_name: "Savanna Store".to_string(),
            currency: "KES".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_unconfigured() {
        let config = GatewayConfig::default();
        assert!(!config.is_configured());
    }

    #[test]
    fn test_configured_requires_both_keys() {
        let mut config = GatewayConfig::default();
        config.public_key = "pk_test".to_string();
        assert!(!config.is_configured());

        config.secret_key = "sk_test".to_string();
        assert!(config.is_configured());
    }

    #[test]
    fn test_reference_prefix_strips_punctuation() {
        let config = GatewayConfig {
            business_name: "Savanna Store Ltd.".to_string(),
            ..GatewayConfig::default()
        };
        assert_eq!(config.reference_prefix(), "SAVANNASTORELTD");
    }

    #[test]
    fn test_reference_prefix_fallback() {
        let config = GatewayConfig {
            business_name: "---".to_string(),
            ..GatewayConfig::default()
        };
        assert_eq!(config.reference_prefix(), "STORE");
    }
}
