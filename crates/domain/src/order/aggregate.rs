//! The persisted order and its lines.

use chrono::{DateTime, Utc};
use common::{OrderId, ProductId, UserId};
use serde::{Deserialize, Serialize};

use super::{OrderLine, OrderStatus, OrderTotals, PaymentMethod, ShippingAddress};

/// An order row together with its owned lines.
///
/// Created once at checkout in `pending` status and mutated only through the
/// store's transition operations; never deleted. The paid flag carries the
/// invariant `is_paid ⇒ paid_at is set ∧ status ∈ {paid, delivered}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Order {
    pub id: OrderId,

    /// Owning user; `None` for guest checkouts.
    pub user_id: Option<UserId>,

    pub is_guest: bool,

    /// Receipt address: the guest's email, or the registered user's email.
    pub guest_email: String,

    pub shipping_address: ShippingAddress,

    pub payment_method: PaymentMethod,

    pub totals: OrderTotals,

    pub lines: Vec<OrderLine>,

    pub is_paid: bool,

    pub paid_at: Option<DateTime<Utc>>,

    /// Opaque provider payload recorded by the paid transition.
    pub payment_result: Option<serde_json::Value>,

    pub is_delivered: bool,

    pub delivered_at: Option<DateTime<Utc>>,

    pub status: OrderStatus,

    pub created_at: DateTime<Utc>,

    pub updated_at: DateTime<Utc>,
}

impl Order {
    /// Returns the email address receipts are sent to.
    pub fn recipient_email(&self) -> &str {
        &self.guest_email
    }

    /// Returns the line for a product, if the order contains one.
    pub fn line_for(&self, product_id: ProductId) -> Option<&OrderLine> {
        self.lines.iter().find(|line| line.product_id == product_id)
    }

    /// Returns the total quantity across all lines.
    pub fn total_quantity(&self) -> u32 {
        self.lines.iter().map(|line| line.quantity).sum()
    }

    /// Returns true if the paid-state fields are mutually consistent.
    pub fn paid_state_consistent(&self) -> bool {
        if self.is_paid {
            self.paid_at.is_some()
                && matches!(self.status, OrderStatus::Paid | OrderStatus::Delivered)
        } else {
            self.paid_at.is_none()
        }
    }
}
