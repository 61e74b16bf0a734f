use async_trait::async_trait;
use serde_json::json;

use crate::adapter::{InitiateOutcome, PaymentGateway, PushReceipt, PushRequest, StatusSnapshot};
use crate::config::GatewayConfig;
use crate::error::{GatewayError, Result};
use crate::phone;
use crate::provider::{self, ProviderState};

/// HTTP implementation of the payment gateway against the real provider.
#[derive(Clone)]
pub struct HttpPaymentGateway {
    config: GatewayConfig,
    client: reqwest::Client,
}

impl HttpPaymentGateway {
    /// Creates a gateway from configuration, with a default HTTP client.
    pub fn new(config: GatewayConfig) -> Self {
        Self {
            config,
            client: reqwest::Client::new(),
        }
    }

    /// Creates a gateway with an explicit HTTP client.
    pub fn with_client(config: GatewayConfig, client: reqwest::Client) -> Self {
        Self { config, client }
    }

    /// Returns the configuration in use.
    pub fn config(&self) -> &GatewayConfig {
        &self.config
    }

    fn status_request(&self, invoice_id: &str) -> reqwest::RequestBuilder {
        if self.config.status_url.contains("{invoiceId}") {
            let url = self.config.status_url.replace("{invoiceId}", invoice_id);
            self.client.get(url)
        } else {
            self.client
                .get(&self.config.status_url)
                .query(&[("invoice_id", invoice_id)])
        }
    }
}

#[async_trait]
impl PaymentGateway for HttpPaymentGateway {
    #[tracing::instrument(skip(self, request), fields(api_ref = %request.api_ref))]
    async fn initiate_push(&self, request: PushRequest) -> Result<InitiateOutcome> {
        if !self.config.is_configured() {
            return Ok(InitiateOutcome::NotConfigured);
        }

        let msisdn = phone::normalize_phone(&request.phone);
        if !phone::is_valid_msisdn(&msisdn) {
            return Err(GatewayError::InvalidPhone);
        }

        let mut names = request.full_name.split_whitespace();
        let first_name = names.next().unwrap_or("");
        let last_name = names.collect::<Vec<_>>().join(" ");

        let payload = json!({
            "public_key": self.config.public_key,
            "amount": request.amount.as_major(),
            "currency": self.config.currency,
            "phone_number": msisdn,
            "email": request.email,
            "first_name": first_name,
            "last_name": last_name,
            "api_ref": request.api_ref,
        });

        let response = self
            .client
            .post(&self.config.stk_push_url)
            .bearer_auth(&self.config.secret_key)
            .json(&payload)
            .send()
            .await?;

        let status = response.status();
        let data: serde_json::Value = response.json().await.unwrap_or_else(|_| json!({}));

        if !status.is_success() {
            let detail = provider::error_detail(&data);
            tracing::error!(%status, %detail, "mobile-money push rejected");
            return Err(GatewayError::Rejected {
                detail: if detail.is_empty() {
                    "Failed to initiate mobile-money push".to_string()
                } else {
                    detail
                },
            });
        }

        let invoice_id = provider::invoice_id(&data).ok_or_else(|| GatewayError::Rejected {
            detail: "Provider response carried no invoice reference".to_string(),
        })?;
        let state = ProviderState::from_raw(provider::state_field(&data));

        tracing::info!(%invoice_id, %state, "mobile-money push accepted");

        Ok(InitiateOutcome::Initiated(PushReceipt {
            invoice_id,
            state,
            raw: data,
        }))
    }

    #[tracing::instrument(skip(self))]
    async fn poll_status(&self, invoice_id: &str) -> Result<StatusSnapshot> {
        if self.config.secret_key.is_empty() {
            return Err(GatewayError::MissingCredentials);
        }

        let response = self
            .status_request(invoice_id)
            .bearer_auth(&self.config.secret_key)
            .send()
            .await?;

        let status = response.status();
        let data: serde_json::Value = response.json().await.unwrap_or_else(|_| json!({}));

        if !status.is_success() {
            // The provider returns non-2xx for transient lookup states. Only
            // its explicit failure vocabulary ends the attempt; everything
            // else stays pending so polling continues safely.
            let detail = provider::error_detail(&data);
            let raw_state = provider::state_field(&data);
            let candidate = if raw_state.is_empty() { detail.as_str() } else { raw_state };

            let state = if ProviderState::from_raw(candidate).is_failed() {
                ProviderState::Failed
            } else {
                tracing::debug!(%status, %detail, "transient status response, still pending");
                ProviderState::Pending
            };

            return Ok(StatusSnapshot {
                invoice_id: invoice_id.to_string(),
                state,
                raw: data,
            });
        }

        let state = ProviderState::from_raw(provider::state_field(&data));

        Ok(StatusSnapshot {
            invoice_id: invoice_id.to_string(),
            state,
            raw: data,
        })
    }
}
