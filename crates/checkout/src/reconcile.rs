//! Payment reconciliation engine.
//!
//! Ties an order to a payment attempt and drives the attempt to a terminal
//! state from two independent, unordered signal sources: a bounded poll loop
//! against the provider, and server-to-server webhook deliveries. Both
//! funnel through the same idempotent paid transition, so whichever signal
//! arrives first wins and the other is a harmless no-op.

use std::sync::Arc;
use std::time::Duration;

use common::OrderId;
use domain::AttemptState;
use gateway::{PaymentGateway, ProviderState};
use store::{Store, StoreError};

use crate::error::{CheckoutError, Result};
use crate::orders::OrderService;

/// Bounds for the reconciliation poll loop.
///
/// The attempt bound is the cancellation mechanism: once exhausted the
/// attempt is abandoned, a terminal non-paid outcome distinct from an
/// explicit provider failure, and the order stays retryable.
#[derive(Debug, Clone, Copy)]
pub struct ReconcilePolicy {
    /// Delay between provider polls.
    pub interval: Duration,

    /// Maximum number of polls before the attempt is abandoned.
    pub max_attempts: u32,
}

impl Default for ReconcilePolicy {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(5),
            max_attempts: 12,
        }
    }
}

/// Terminal outcome of a reconciliation run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReconcileOutcome {
    /// Provider confirmed payment; the order was marked paid.
    Confirmed,

    /// Provider explicitly reported failure; the order stays pending.
    Failed,

    /// Poll bound exhausted without a terminal provider state.
    Abandoned,
}

/// A payload delivered by the provider's webhook.
#[derive(Debug, Clone)]
pub struct WebhookNotice {
    pub order_id: OrderId,

    /// Raw provider status vocabulary; normalized here, never upstream.
    pub status: String,

    /// Provider payment reference, when the payload carries one.
    pub payment_id: Option<String>,

    /// The full payload, stored opaquely as the order's payment result.
    pub raw: serde_json::Value,
}

/// How a webhook delivery was handled. All dispositions are acknowledged
/// with success so the provider does not retry indefinitely on conditions
/// that are not actually wrong.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WebhookDisposition {
    /// A success payload marked the order paid.
    Applied,

    /// The order was already paid; idempotent no-op.
    AlreadyPaid,

    /// Unknown order, non-success status, or unpayable order; no-op.
    Ignored,
}

/// Drives payment attempts to a terminal state.
pub struct Reconciler<S> {
    orders: OrderService<S>,
    gateway: Arc<dyn PaymentGateway>,
    policy: ReconcilePolicy,
}

impl<S: Clone> Clone for Reconciler<S> {
    fn clone(&self) -> Self {
        Self {
            orders: self.orders.clone(),
            gateway: self.gateway.clone(),
            policy: self.policy,
        }
    }
}

impl<S: Store + Clone + 'static> Reconciler<S> {
    /// Creates a reconciler over the order service and gateway.
    pub fn new(
        orders: OrderService<S>,
        gateway: Arc<dyn PaymentGateway>,
        policy: ReconcilePolicy,
    ) -> Self {
        Self {
            orders,
            gateway,
            policy,
        }
    }

    /// Runs the bounded poll loop for one payment attempt.
    ///
    /// Transport errors and ambiguous provider states keep the loop polling;
    /// only the provider's explicit vocabulary settles the attempt early.
    /// The caller's order-creation transaction has long since committed;
    /// no storage transaction is held across this loop.
    #[tracing::instrument(skip(self))]
    pub async fn reconcile(&self, invoice_id: &str, order_id: OrderId) -> Result<ReconcileOutcome> {
        let started = std::time::Instant::now();

        self.orders
            .store()
            .update_attempt_state(invoice_id, AttemptState::Pending)
            .await?;

        for attempt in 1..=self.policy.max_attempts {
            tokio::time::sleep(self.policy.interval).await;

            match self.gateway.poll_status(invoice_id).await {
                Ok(snapshot) if snapshot.state.is_paid() => {
                    self.orders.mark_paid(order_id, snapshot.raw).await?;
                    self.orders
                        .store()
                        .update_attempt_state(invoice_id, AttemptState::Confirmed)
                        .await?;

                    metrics::counter!("payment_reconcile_confirmed_total").increment(1);
                    metrics::histogram!("payment_reconcile_duration_seconds")
                        .record(started.elapsed().as_secs_f64());
                    tracing::info!(%order_id, attempt, "payment confirmed by poll");
                    return Ok(ReconcileOutcome::Confirmed);
                }
                Ok(snapshot) if snapshot.state.is_failed() => {
                    self.orders
                        .store()
                        .update_attempt_state(invoice_id, AttemptState::Failed)
                        .await?;

                    metrics::counter!("payment_reconcile_failed_total").increment(1);
                    tracing::warn!(%order_id, attempt, "provider reported payment failure");
                    return Ok(ReconcileOutcome::Failed);
                }
                Ok(_) => {
                    tracing::debug!(%order_id, attempt, "payment still pending");
                }
                Err(err) => {
                    tracing::warn!(%order_id, attempt, error = %err, "status poll errored, retrying");
                }
            }
        }

        self.orders
            .store()
            .update_attempt_state(invoice_id, AttemptState::Abandoned)
            .await?;

        metrics::counter!("payment_reconcile_abandoned_total").increment(1);
        tracing::warn!(%order_id, "payment attempt abandoned after poll bound");
        Ok(ReconcileOutcome::Abandoned)
    }

    /// Spawns the poll loop as a background task, off the request path.
    pub fn spawn(&self, invoice_id: String, order_id: OrderId) -> tokio::task::JoinHandle<()> {
        let reconciler = self.clone();
        tokio::spawn(async move {
            if let Err(err) = reconciler.reconcile(&invoice_id, order_id).await {
                tracing::error!(%order_id, %invoice_id, error = %err, "reconciliation task failed");
            }
        })
    }

    /// Applies a webhook delivery.
    ///
    /// The second enforcement point of the at-most-once guarantee: the order
    /// is flipped through the same idempotent paid transition as the poll
    /// path. Unknown orders and already-paid orders acknowledge successfully
    /// without changing anything.
    #[tracing::instrument(skip(self, notice), fields(order_id = %notice.order_id))]
    pub async fn apply_webhook(&self, notice: WebhookNotice) -> Result<WebhookDisposition> {
        let state = ProviderState::from_raw(&notice.status);
        if !state.is_paid() {
            tracing::debug!(status = %notice.status, "non-success webhook acknowledged");
            return Ok(WebhookDisposition::Ignored);
        }

        let Some(order) = self.orders.store().get_order(notice.order_id).await? else {
            tracing::warn!("webhook for unknown order acknowledged");
            return Ok(WebhookDisposition::Ignored);
        };

        if order.is_paid {
            return Ok(WebhookDisposition::AlreadyPaid);
        }

        match self.orders.mark_paid(notice.order_id, notice.raw).await {
            Ok(_) => {}
            // A cancelled order cannot become paid; acknowledge and move on.
            Err(CheckoutError::Store(StoreError::Order(_))) => {
                return Ok(WebhookDisposition::Ignored);
            }
            Err(err) => return Err(err),
        }

        if let Some(payment_id) = &notice.payment_id
            && self.orders.store().get_attempt(payment_id).await?.is_some()
        {
            self.orders
                .store()
                .update_attempt_state(payment_id, AttemptState::Confirmed)
                .await?;
        }

        metrics::counter!("payment_webhook_applied_total").increment(1);
        Ok(WebhookDisposition::Applied)
    }
}
