//! Order application service: stock-safe creation and paid/delivered
//! transitions with their side effects.

use std::sync::Arc;

use common::OrderId;
use domain::{Money, NewOrder, Order, OrderDraft, OrderLine};
use store::{Store, StoreError};

use crate::error::Result;
use crate::services::{AuditLog, Notifier};

/// Service sequencing a single checkout request: validate, price, persist
/// atomically, then emit best-effort side effects.
///
/// The service owns no concurrency logic of its own; the stock invariant and
/// the at-most-once paid flip come from the store's transactional contract.
pub struct OrderService<S> {
    store: S,
    notifier: Arc<dyn Notifier>,
    audit: Arc<dyn AuditLog>,
}

impl<S: Clone> Clone for OrderService<S> {
    fn clone(&self) -> Self {
        Self {
            store: self.store.clone(),
            notifier: self.notifier.clone(),
            audit: self.audit.clone(),
        }
    }
}

impl<S: Store> OrderService<S> {
    /// Creates a new order service over a store and its collaborators.
    pub fn new(store: S, notifier: Arc<dyn Notifier>, audit: Arc<dyn AuditLog>) -> Self {
        Self {
            store,
            notifier,
            audit,
        }
    }

    /// Returns the underlying store.
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Creates an order from a candidate draft.
    ///
    /// Line prices are snapshotted from the live catalog (the client's
    /// declared prices are never trusted) and the declared totals must agree
    /// with the server-side computation before anything is persisted. All
    /// stock decrements and inserts then commit in one transaction; receipt
    /// and audit dispatch happen post-commit and are fire-and-forget.
    #[tracing::instrument(skip(self, draft), fields(lines = draft.lines.len()))]
    pub async fn create_order(&self, draft: OrderDraft) -> Result<Order> {
        draft.validate()?;

        let mut lines = Vec::with_capacity(draft.lines.len());
        let mut items_total = Money::zero();
        for requested in &draft.lines {
            let product = self
                .store
                .get_product(requested.product_id)
                .await?
                .ok_or(StoreError::ProductNotFound(requested.product_id))?;

            if !product.can_fulfill(requested.quantity) {
                metrics::counter!("checkout_out_of_stock_total").increment(1);
                return Err(StoreError::OutOfStock {
                    product_id: product.id,
                    name: product.name,
                }
                .into());
            }

            let line = OrderLine {
                product_id: product.id,
                name: product.name,
                image: product.image,
                unit_price: product.price,
                quantity: requested.quantity,
            };
            items_total += line.gross_amount();
            lines.push(line);
        }

        draft.check_declared_totals(items_total)?;

        // validate() guarantees a receipt address exists.
        let receipt_email = draft.receipt_email().unwrap_or_default().to_string();

        let new_order = NewOrder {
            user_id: draft.buyer.as_ref().map(|buyer| buyer.id),
            is_guest: draft.buyer.is_none(),
            guest_email: receipt_email,
            shipping_address: draft.shipping_address.clone(),
            payment_method: draft.payment_method,
            totals: draft.declared,
            lines,
        };

        let order = match self.store.create_order(new_order).await {
            Ok(order) => order,
            Err(err) => {
                if matches!(err, StoreError::OutOfStock { .. }) {
                    metrics::counter!("checkout_out_of_stock_total").increment(1);
                }
                return Err(err.into());
            }
        };

        metrics::counter!("checkout_orders_created_total").increment(1);
        tracing::info!(order_id = %order.id, total = %order.totals.total_price, "order created");

        self.notify(
            order.recipient_email(),
            &format!("Order created #{}", order.id),
            &format!(
                "Your order was placed successfully. Total: {}",
                order.totals.total_price
            ),
        )
        .await;

        if let Some(buyer) = &draft.buyer
            && let Err(err) = self
                .audit
                .record(
                    "PURCHASE",
                    buyer.id,
                    &format!(
                        "Order {} placed. Total: {}",
                        order.id, order.totals.total_price
                    ),
                )
                .await
        {
            tracing::warn!(error = %err, order_id = %order.id, "audit write failed");
        }

        Ok(order)
    }

    /// Transitions an order to paid, idempotently.
    ///
    /// The first caller wins: the store applies the flip at most once and the
    /// payment-confirmed notification goes out only on that call. A repeat
    /// call returns the stored order unchanged and dispatches nothing.
    #[tracing::instrument(skip(self, payment_result))]
    pub async fn mark_paid(
        &self,
        order_id: OrderId,
        payment_result: serde_json::Value,
    ) -> Result<Order> {
        let transition = self.store.mark_paid(order_id, payment_result).await?;

        if transition.newly_paid {
            metrics::counter!("checkout_payments_confirmed_total").increment(1);
            tracing::info!(%order_id, "payment confirmed");

            self.notify(
                transition.order.recipient_email(),
                &format!("Payment confirmed #{order_id}"),
                &format!("Payment confirmed for order #{order_id}."),
            )
            .await;
        }

        Ok(transition.order)
    }

    /// Marks a paid order as delivered.
    #[tracing::instrument(skip(self))]
    pub async fn mark_delivered(&self, order_id: OrderId) -> Result<Order> {
        let order = self.store.mark_delivered(order_id).await?;
        tracing::info!(%order_id, "order delivered");
        Ok(order)
    }

    /// Cancels a pending order.
    #[tracing::instrument(skip(self))]
    pub async fn cancel_order(&self, order_id: OrderId) -> Result<Order> {
        let order = self.store.cancel_order(order_id).await?;
        tracing::info!(%order_id, "order cancelled");
        Ok(order)
    }

    async fn notify(&self, to: &str, subject: &str, body: &str) {
        if let Err(err) = self.notifier.send(to, subject, body).await {
            tracing::warn!(error = %err, to, subject, "notification dispatch failed");
        }
    }
}
