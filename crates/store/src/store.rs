use async_trait::async_trait;
use common::{OrderId, ProductId, UserId};
use domain::{AttemptState, Money, NewOrder, Order, OrderStatus, PaymentAttempt, Product};

use crate::Result;

/// Result of the idempotent paid transition.
#[derive(Debug, Clone)]
pub struct PaidTransition {
    /// The order after the call.
    pub order: Order,

    /// True if this call performed the pending→paid flip; false if the order
    /// was already paid and is returned unchanged. Callers use this to
    /// dispatch side effects exactly once.
    pub newly_paid: bool,
}

/// A row in a buyer's cart.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CartItem {
    pub product_id: ProductId,
    pub quantity: u32,
}

/// Core trait for storefront persistence.
///
/// All implementations must be thread-safe (Send + Sync). The two
/// concurrency-bearing operations carry their guarantees in the trait
/// contract, not in callers:
///
/// - [`Store::create_order`] runs every conditional stock decrement, the
///   order/line inserts, and the purchased-cart-row deletes in one atomic
///   unit; concurrent checkouts against the same product serialize on the
///   decrement and can never oversell.
/// - [`Store::mark_paid`] is a conditional update keyed on the order still
///   being unpaid, so racing confirmation signals (poll vs. webhook) apply
///   the transition at most once.
#[async_trait]
pub trait Store: Send + Sync {
    /// Inserts a product into the catalog.
    async fn insert_product(&self, product: Product) -> Result<()>;

    /// Fetches a product by ID.
    async fn get_product(&self, id: ProductId) -> Result<Option<Product>>;

    /// Updates a product's live price.
    ///
    /// Existing order lines keep their frozen snapshots.
    async fn update_product_price(&self, id: ProductId, price: Money) -> Result<()>;

    /// Atomically creates an order with its lines.
    ///
    /// Every line's stock decrement is a conditional read-modify-write
    /// (`count_in_stock >= quantity`); any violation aborts the whole
    /// transaction with [`StoreError::OutOfStock`](crate::StoreError::OutOfStock)
    /// and no partial decrement is ever visible. Purchased products are
    /// removed from the buyer's cart in the same transaction.
    async fn create_order(&self, new_order: NewOrder) -> Result<Order>;

    /// Fetches an order with its lines.
    async fn get_order(&self, id: OrderId) -> Result<Option<Order>>;

    /// Lists a user's orders, newest first.
    async fn orders_for_user(&self, user_id: UserId) -> Result<Vec<Order>>;

    /// Lists all orders, newest first, optionally filtered by status.
    async fn list_orders(&self, status: Option<OrderStatus>) -> Result<Vec<Order>>;

    /// Transitions an order to paid, at most once.
    ///
    /// If the order is already paid the stored order is returned unchanged
    /// with `newly_paid == false`; a paid flip from any status other than
    /// `pending` is rejected.
    async fn mark_paid(
        &self,
        id: OrderId,
        payment_result: serde_json::Value,
    ) -> Result<PaidTransition>;

    /// Transitions a paid order to delivered.
    async fn mark_delivered(&self, id: OrderId) -> Result<Order>;

    /// Cancels a pending order.
    async fn cancel_order(&self, id: OrderId) -> Result<Order>;

    /// Inserts or replaces a cart row for a user.
    async fn upsert_cart_item(
        &self,
        user_id: UserId,
        product_id: ProductId,
        quantity: u32,
    ) -> Result<()>;

    /// Returns a user's cart rows.
    async fn cart_items(&self, user_id: UserId) -> Result<Vec<CartItem>>;

    /// Records a freshly initiated payment attempt.
    ///
    /// Any prior non-terminal attempt for the same order is marked abandoned,
    /// keeping at most one active attempt per order.
    async fn insert_attempt(&self, attempt: PaymentAttempt) -> Result<()>;

    /// Fetches a payment attempt by provider invoice reference.
    async fn get_attempt(&self, invoice_id: &str) -> Result<Option<PaymentAttempt>>;

    /// Moves a payment attempt to a new state.
    async fn update_attempt_state(
        &self,
        invoice_id: &str,
        state: AttemptState,
    ) -> Result<PaymentAttempt>;
}
