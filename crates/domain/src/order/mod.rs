//! Order model and related types.

mod aggregate;
mod draft;
mod status;
mod value_objects;

pub use aggregate::Order;
pub use draft::{Buyer, DraftLine, NewOrder, OrderDraft};
pub use status::OrderStatus;
pub use value_objects::{
    DeliveryMethod, OrderLine, OrderTotals, PaymentMethod, ShippingAddress,
};

use common::ProductId;
use thiserror::Error;

use crate::money::Money;

/// Slack allowed between client-declared and server-computed totals, to
/// absorb decimal rounding on the client side.
pub const TOTALS_TOLERANCE: Money = Money::from_cents(100);

/// Errors that can occur while validating or transitioning an order.
#[derive(Debug, Error)]
pub enum OrderError {
    /// Order has no items.
    #[error("No order items")]
    NoItems,

    /// Guest checkout submitted without a contact email.
    #[error("Guest checkout requires email")]
    GuestEmailRequired,

    /// Invalid quantity.
    #[error("Invalid quantity {quantity} for product {product_id}")]
    InvalidQuantity {
        product_id: ProductId,
        quantity: u32,
    },

    /// Client-declared totals disagree with the server-side computation.
    #[error("Declared {field} {declared} does not match computed {computed}")]
    DeclaredTotalMismatch {
        field: &'static str,
        declared: Money,
        computed: Money,
    },

    /// Order is not in the expected status for the requested transition.
    #[error("Invalid status transition: cannot {action} from {current} status")]
    InvalidStatusTransition {
        current: OrderStatus,
        action: &'static str,
    },
}
