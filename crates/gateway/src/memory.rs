use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use serde_json::json;

use crate::adapter::{InitiateOutcome, PaymentGateway, PushReceipt, PushRequest, StatusSnapshot};
use crate::error::{GatewayError, Result};
use crate::phone;
use crate::provider::ProviderState;

#[derive(Debug)]
struct InMemoryGatewayState {
    configured: bool,
    fail_on_initiate: bool,
    next_id: u32,
    /// States scripted for the next initiated invoice.
    pending_script: VecDeque<ProviderState>,
    /// Per-invoice scripted poll states; the last entry repeats forever.
    scripts: HashMap<String, VecDeque<ProviderState>>,
    push_count: usize,
    poll_counts: HashMap<String, u32>,
}

impl Default for InMemoryGatewayState {
    fn default() -> Self {
        Self {
            configured: true,
            fail_on_initiate: false,
            next_id: 0,
            pending_script: VecDeque::new(),
            scripts: HashMap::new(),
            push_count: 0,
            poll_counts: HashMap::new(),
        }
    }
}

/// In-memory payment gateway for testing.
///
/// Poll responses are scripted: [`InMemoryPaymentGateway::script_states`]
/// queues the states the next initiated invoice will report, one per poll,
/// with the final state repeating on every later poll. An unscripted invoice
/// reports pending forever.
#[derive(Debug, Clone, Default)]
pub struct InMemoryPaymentGateway {
    state: Arc<RwLock<InMemoryGatewayState>>,
}

impl InMemoryPaymentGateway {
    /// Creates a new configured in-memory gateway.
    pub fn new() -> Self {
        Self::default()
    }

    /// Configures whether the gateway reports credentials as present.
    pub fn set_configured(&self, configured: bool) {
        self.state.write().unwrap().configured = configured;
    }

    /// Configures the gateway to reject the next push.
    pub fn set_fail_on_initiate(&self, fail: bool) {
        self.state.write().unwrap().fail_on_initiate = fail;
    }

    /// Queues the poll states the next initiated invoice will report.
    pub fn script_states(&self, states: impl IntoIterator<Item = ProviderState>) {
        self.state.write().unwrap().pending_script = states.into_iter().collect();
    }

    /// Returns the number of pushes accepted.
    pub fn push_count(&self) -> usize {
        self.state.read().unwrap().push_count
    }

    /// Returns the number of polls served for an invoice.
    pub fn poll_count(&self, invoice_id: &str) -> u32 {
        self.state
            .read()
            .unwrap()
            .poll_counts
            .get(invoice_id)
            .copied()
            .unwrap_or(0)
    }
}

#[async_trait]
impl PaymentGateway for InMemoryPaymentGateway {
    async fn initiate_push(&self, request: PushRequest) -> Result<InitiateOutcome> {
        let mut state = self.state.write().unwrap();

        if !state.configured {
            return Ok(InitiateOutcome::NotConfigured);
        }

        let msisdn = phone::normalize_phone(&request.phone);
        if !phone::is_valid_msisdn(&msisdn) {
            return Err(GatewayError::InvalidPhone);
        }

        if state.fail_on_initiate {
            return Err(GatewayError::Rejected {
                detail: "Push declined".to_string(),
            });
        }

        state.next_id += 1;
        state.push_count += 1;
        let invoice_id = format!("MM-{:04}", state.next_id);

        let script = std::mem::take(&mut state.pending_script);
        state.scripts.insert(invoice_id.clone(), script);

        Ok(InitiateOutcome::Initiated(PushReceipt {
            invoice_id: invoice_id.clone(),
            state: ProviderState::Pending,
            raw: json!({
                "invoice": { "invoice_id": invoice_id },
                "state": "PENDING",
                "api_ref": request.api_ref,
            }),
        }))
    }

    async fn poll_status(&self, invoice_id: &str) -> Result<StatusSnapshot> {
        let mut state = self.state.write().unwrap();

        if !state.configured {
            return Err(GatewayError::MissingCredentials);
        }

        *state.poll_counts.entry(invoice_id.to_string()).or_insert(0) += 1;

        let provider_state = match state.scripts.get_mut(invoice_id) {
            Some(script) if script.len() > 1 => {
                script.pop_front().unwrap_or(ProviderState::Pending)
            }
            Some(script) => script.front().copied().unwrap_or(ProviderState::Pending),
            None => ProviderState::Pending,
        };

        Ok(StatusSnapshot {
            invoice_id: invoice_id.to_string(),
            state: provider_state,
            raw: json!({ "invoice_id": invoice_id, "state": provider_state.to_string() }),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use domain::Money;

    fn push_request() -> PushRequest {
        PushRequest {
            amount: Money::from_cents(50_000),
            phone: "0712345678".to_string(),
            email: "buyer@example.com".to_string(),
            full_name: "Wanjiku Kamau".to_string(),
            api_ref: "ORDER-1".to_string(),
        }
    }

    #[tokio::test]
    async fn test_push_assigns_sequential_invoices() {
        let gateway = InMemoryPaymentGateway::new();

        let first = gateway.initiate_push(push_request()).await.unwrap();
        let second = gateway.initiate_push(push_request()).await.unwrap();

        let InitiateOutcome::Initiated(first) = first else {
            panic!("expected initiated");
        };
        let InitiateOutcome::Initiated(second) = second else {
            panic!("expected initiated");
        };
        assert_eq!(first.invoice_id, "MM-0001");
        assert_eq!(second.invoice_id, "MM-0002");
        assert_eq!(gateway.push_count(), 2);
    }

    #[tokio::test]
    async fn test_unconfigured_gateway_reports_not_configured() {
        let gateway = InMemoryPaymentGateway::new();
        gateway.set_configured(false);

        let outcome = gateway.initiate_push(push_request()).await.unwrap();
        assert!(matches!(outcome, InitiateOutcome::NotConfigured));

        let result = gateway.poll_status("MM-0001").await;
        assert!(matches!(result, Err(GatewayError::MissingCredentials)));
    }

    #[tokio::test]
    async fn test_invalid_phone_rejected() {
        let gateway = InMemoryPaymentGateway::new();
        let mut request = push_request();
        request.phone = "12345".to_string();

        let result = gateway.initiate_push(request).await;
        assert!(matches!(result, Err(GatewayError::InvalidPhone)));
    }

    #[tokio::test]
    async fn test_scripted_states_play_in_order_and_last_repeats() {
        let gateway = InMemoryPaymentGateway::new();
        gateway.script_states([
            ProviderState::Pending,
            ProviderState::Pending,
            ProviderState::Paid,
        ]);

        let InitiateOutcome::Initiated(receipt) =
            gateway.initiate_push(push_request()).await.unwrap()
        else {
            panic!("expected initiated");
        };

        let states: Vec<ProviderState> = {
            let mut out = Vec::new();
            for _ in 0..5 {
                out.push(gateway.poll_status(&receipt.invoice_id).await.unwrap().state);
            }
            out
        };
        assert_eq!(
            states,
            [
                ProviderState::Pending,
                ProviderState::Pending,
                ProviderState::Paid,
                ProviderState::Paid,
                ProviderState::Paid,
            ]
        );
        assert_eq!(gateway.poll_count(&receipt.invoice_id), 5);
    }

    #[tokio::test]
    async fn test_unscripted_invoice_stays_pending() {
        let gateway = InMemoryPaymentGateway::new();
        let snapshot = gateway.poll_status("MM-9999").await.unwrap();
        assert_eq!(snapshot.state, ProviderState::Pending);
    }
}
