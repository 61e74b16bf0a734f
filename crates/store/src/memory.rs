use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use common::{OrderId, ProductId, UserId};
use domain::{
    AttemptState, Money, NewOrder, Order, OrderError, OrderStatus, PaymentAttempt, Product,
};
use tokio::sync::RwLock;

use crate::{
    CartItem, PaidTransition, Result, StoreError,
    store::Store,
};

#[derive(Default)]
struct InMemoryState {
    products: HashMap<ProductId, Product>,
    orders: HashMap<OrderId, Order>,
    carts: HashMap<UserId, HashMap<ProductId, u32>>,
    attempts: HashMap<String, PaymentAttempt>,
}

/// In-memory store implementation for testing and the default binary.
///
/// Provides the same interface and guarantees as the PostgreSQL
/// implementation: every multi-step operation runs under a single write
/// guard, so concurrent checkouts serialize exactly as conflicting database
/// transactions would.
#[derive(Clone, Default)]
pub struct InMemoryStore {
    state: Arc<RwLock<InMemoryState>>,
}

impl InMemoryStore {
    /// Creates a new empty in-memory store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of stored orders.
    pub async fn order_count(&self) -> usize {
        self.state.read().await.orders.len()
    }

    /// Clears all stored data.
    pub async fn clear(&self) {
        let mut state = self.state.write().await;
        state.products.clear();
        state.orders.clear();
        state.carts.clear();
        state.attempts.clear();
    }
}

#[async_trait]
impl Store for InMemoryStore {
    async fn insert_product(&self, product: Product) -> Result<()> {
        let mut state = self.state.write().await;
        state.products.insert(product.id, product);
        Ok(())
    }

    async fn get_product(&self, id: ProductId) -> Result<Option<Product>> {
        let state = self.state.read().await;
        Ok(state.products.get(&id).cloned())
    }

    async fn update_product_price(&self, id: ProductId, price: Money) -> Result<()> {
        let mut state = self.state.write().await;
        let product = state
            .products
            .get_mut(&id)
            .ok_or(StoreError::ProductNotFound(id))?;
        product.price = price;
        Ok(())
    }

    async fn create_order(&self, new_order: NewOrder) -> Result<Order> {
        let mut state = self.state.write().await;

        // Validate every line against current stock before touching anything,
        // so a late failure leaves no partial decrement.
        for line in &new_order.lines {
            let product = state
                .products
                .get(&line.product_id)
                .ok_or(StoreError::ProductNotFound(line.product_id))?;
            if !product.can_fulfill(line.quantity) {
                return Err(StoreError::OutOfStock {
                    product_id: line.product_id,
                    name: product.name.clone(),
                });
            }
        }

        for line in &new_order.lines {
            if let Some(product) = state.products.get_mut(&line.product_id) {
                product.count_in_stock -= line.quantity;
            }
        }

        if let Some(user_id) = new_order.user_id
            && let Some(cart) = state.carts.get_mut(&user_id)
        {
            for line in &new_order.lines {
                cart.remove(&line.product_id);
            }
        }

        let now = Utc::now();
        let order = Order {
            id: OrderId::new(),
            user_id: new_order.user_id,
            is_guest: new_order.is_guest,
            guest_email: new_order.guest_email,
            shipping_address: new_order.shipping_address,
            payment_method: new_order.payment_method,
            totals: new_order.totals,
            lines: new_order.lines,
            is_paid: false,
            paid_at: None,
            payment_result: None,
            is_delivered: false,
            delivered_at: None,
            status: OrderStatus::Pending,
            created_at: now,
            updated_at: now,
        };
        state.orders.insert(order.id, order.clone());

        Ok(order)
    }

    async fn get_order(&self, id: OrderId) -> Result<Option<Order>> {
        let state = self.state.read().await;
        Ok(state.orders.get(&id).cloned())
    }

    async fn orders_for_user(&self, user_id: UserId) -> Result<Vec<Order>> {
        let state = self.state.read().await;
        let mut orders: Vec<Order> = state
            .orders
            .values()
            .filter(|order| order.user_id == Some(user_id))
            .cloned()
            .collect();
        orders.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(orders)
    }

    async fn list_orders(&self, status: Option<OrderStatus>) -> Result<Vec<Order>> {
        let state = self.state.read().await;
        let mut orders: Vec<Order> = state
            .orders
            .values()
            .filter(|order| status.is_none_or(|s| order.status == s))
            .cloned()
            .collect();
        orders.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(orders)
    }

    async fn mark_paid(
        &self,
        id: OrderId,
        payment_result: serde_json::Value,
    ) -> Result<PaidTransition> {
        let mut state = self.state.write().await;
        let order = state
            .orders
            .get_mut(&id)
            .ok_or(StoreError::OrderNotFound(id))?;

        if order.is_paid {
            return Ok(PaidTransition {
                order: order.clone(),
                newly_paid: false,
            });
        }

        if !order.status.can_pay() {
            return Err(StoreError::Order(OrderError::InvalidStatusTransition {
                current: order.status,
                action: "pay",
            }));
        }

        order.is_paid = true;
        order.paid_at = Some(Utc::now());
        order.status = OrderStatus::Paid;
        order.payment_result = Some(payment_result);
        order.updated_at = Utc::now();

        Ok(PaidTransition {
            order: order.clone(),
            newly_paid: true,
        })
    }

    async fn mark_delivered(&self, id: OrderId) -> Result<Order> {
        let mut state = self.state.write().await;
        let order = state
            .orders
            .get_mut(&id)
            .ok_or(StoreError::OrderNotFound(id))?;

        if !order.status.can_deliver() {
            return Err(StoreError::Order(OrderError::InvalidStatusTransition {
                current: order.status,
                action: "deliver",
            }));
        }

        order.is_delivered = true;
        order.delivered_at = Some(Utc::now());
        order.status = OrderStatus::Delivered;
        order.updated_at = Utc::now();

        Ok(order.clone())
    }

    async fn cancel_order(&self, id: OrderId) -> Result<Order> {
        let mut state = self.state.write().await;
        let order = state
            .orders
            .get_mut(&id)
            .ok_or(StoreError::OrderNotFound(id))?;

        if !order.status.can_cancel() {
            return Err(StoreError::Order(OrderError::InvalidStatusTransition {
                current: order.status,
                action: "cancel",
            }));
        }

        order.status = OrderStatus::Cancelled;
        order.updated_at = Utc::now();

        Ok(order.clone())
    }

    async fn upsert_cart_item(
        &self,
        user_id: UserId,
        product_id: ProductId,
        quantity: u32,
    ) -> Result<()> {
        let mut state = self.state.write().await;
        state
            .carts
            .entry(user_id)
            .or_default()
            .insert(product_id, quantity);
        Ok(())
    }

    async fn cart_items(&self, user_id: UserId) -> Result<Vec<CartItem>> {
        let state = self.state.read().await;
        Ok(state
            .carts
            .get(&user_id)
            .map(|cart| {
                cart.iter()
                    .map(|(&product_id, &quantity)| CartItem {
                        product_id,
                        quantity,
                    })
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn insert_attempt(&self, attempt: PaymentAttempt) -> Result<()> {
        let mut state = self.state.write().await;

        // At most one active attempt per order.
        for existing in state.attempts.values_mut() {
            if existing.order_id == attempt.order_id && !existing.state.is_terminal() {
                existing.state = AttemptState::Abandoned;
                existing.updated_at = Utc::now();
            }
        }

        state.attempts.insert(attempt.invoice_id.clone(), attempt);
        Ok(())
    }

    async fn get_attempt(&self, invoice_id: &str) -> Result<Option<PaymentAttempt>> {
        let state = self.state.read().await;
        Ok(state.attempts.get(invoice_id).cloned())
    }

    async fn update_attempt_state(
        &self,
        invoice_id: &str,
        new_state: AttemptState,
    ) -> Result<PaymentAttempt> {
        let mut state = self.state.write().await;
        let attempt = state
            .attempts
            .get_mut(invoice_id)
            .ok_or_else(|| StoreError::AttemptNotFound(invoice_id.to_string()))?;

        attempt.state = new_state;
        attempt.updated_at = Utc::now();

        Ok(attempt.clone())
    }
}
