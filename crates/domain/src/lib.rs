//! Domain layer for the storefront checkout core.
//!
//! This crate provides the shared domain language:
//! - `Money` in currency minor units with exact arithmetic
//! - The `Order`/`OrderLine` model with frozen price snapshots
//! - The order status state machine
//! - The per-line commission calculator
//! - Payment attempt states driven by the reconciliation engine

pub mod commission;
pub mod money;
pub mod order;
pub mod payment;
pub mod product;

pub use commission::{CommissionSplit, PLATFORM_COMMISSION_RATE_BPS};
pub use money::Money;
pub use order::{
    Buyer, DeliveryMethod, DraftLine, NewOrder, Order, OrderDraft, OrderError, OrderLine,
    OrderStatus, OrderTotals, PaymentMethod, ShippingAddress, TOTALS_TOLERANCE,
};
pub use payment::{AttemptState, PaymentAttempt};
pub use product::Product;
